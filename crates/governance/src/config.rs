//! Remediation safety policy
//!
//! An explicitly constructed, immutable policy value passed into the
//! remediation engine at call time. The engine defaults to inert: executing
//! a real revoke call requires `dry_run = false` AND `remediation_enabled =
//! true` AND the per-candidate gate to allow it. The denylist is checked
//! first and unconditionally; the allowlist can never override it.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default denylist markers: catastrophic entitlements that must never be
/// auto-revoked unless an operator explicitly constructs a policy without
/// them. An env-emptied denylist falls back to these.
pub const CATASTROPHIC_MARKERS: &[&str] = &["administratoraccess", "breakglass", "break-glass"];

/// Safety configuration for the remediation pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationPolicy {
    /// Evaluate and log only; never call the revoke boundary
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,

    /// Second, independent opt-in required for live revocation
    #[serde(default)]
    pub remediation_enabled: bool,

    /// Case-insensitive substrings that block revocation outright
    #[serde(default = "default_denylist")]
    pub denylist: Vec<String>,

    /// If non-empty, only entitlements matching one of these substrings may
    /// be revoked
    #[serde(default)]
    pub allowlist: Vec<String>,

    /// Bound on each external revoke call
    #[serde(default = "default_revoke_timeout_ms")]
    pub revoke_timeout_ms: u64,
}

fn default_dry_run() -> bool {
    true
}

fn default_denylist() -> Vec<String> {
    CATASTROPHIC_MARKERS.iter().map(|s| s.to_string()).collect()
}

fn default_revoke_timeout_ms() -> u64 {
    10_000
}

impl Default for RemediationPolicy {
    fn default() -> Self {
        Self {
            dry_run: default_dry_run(),
            remediation_enabled: false,
            denylist: default_denylist(),
            allowlist: Vec::new(),
            revoke_timeout_ms: default_revoke_timeout_ms(),
        }
    }
}

/// Per-candidate gate verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Allowed,
    DeniedByDenylist { pattern: String },
    NotInAllowlist,
}

impl GateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GateDecision::Allowed)
    }

    pub fn reason(&self) -> String {
        match self {
            GateDecision::Allowed => "Allowed".to_string(),
            GateDecision::DeniedByDenylist { pattern } => {
                format!("Denied by denylist match: {}", pattern)
            }
            GateDecision::NotInAllowlist => "Skipped: not in remediation allowlist".to_string(),
        }
    }
}

impl RemediationPolicy {
    /// Load policy from a JSON file; missing fields fall back to defaults
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        let policy: Self = serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(policy.normalized())
    }

    /// Apply environment overrides on top of this policy.
    ///
    /// Recognized variables: `DRY_RUN`, `ENABLE_REMEDIATION`,
    /// `REMEDIATION_DENYLIST`, `REMEDIATION_ALLOWLIST` (comma-separated).
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(value) = std::env::var("DRY_RUN") {
            self.dry_run = parse_bool(&value);
        }
        if let Ok(value) = std::env::var("ENABLE_REMEDIATION") {
            self.remediation_enabled = parse_bool(&value);
        }
        if let Ok(value) = std::env::var("REMEDIATION_DENYLIST") {
            self.denylist = split_list(&value);
            // A blank env value is a misconfiguration, not a request to run
            // without a denylist
            if self.denylist.is_empty() {
                self.denylist = default_denylist();
            }
        }
        if let Ok(value) = std::env::var("REMEDIATION_ALLOWLIST") {
            self.allowlist = split_list(&value);
        }
        self.normalized()
    }

    /// Lowercase and trim both lists for case-insensitive matching
    pub fn normalized(mut self) -> Self {
        self.denylist = normalize_list(&self.denylist);
        self.allowlist = normalize_list(&self.allowlist);
        self
    }

    /// True only when both explicit opt-ins are present
    pub fn is_live(&self) -> bool {
        !self.dry_run && self.remediation_enabled
    }

    pub fn revoke_timeout(&self) -> Duration {
        Duration::from_millis(self.revoke_timeout_ms)
    }

    /// Per-candidate decision. The denylist is evaluated first and cannot be
    /// overridden by the allowlist.
    pub fn should_act(&self, entitlement_name: &str) -> GateDecision {
        let name = entitlement_name.to_lowercase();

        if let Some(pattern) = self.denylist.iter().find(|deny| name.contains(deny.as_str())) {
            return GateDecision::DeniedByDenylist {
                pattern: pattern.clone(),
            };
        }

        if !self.allowlist.is_empty()
            && !self.allowlist.iter().any(|allow| name.contains(allow.as_str()))
        {
            return GateDecision::NotInAllowlist;
        }

        GateDecision::Allowed
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

fn normalize_list(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|item| item.trim().to_lowercase())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_inert() {
        let policy = RemediationPolicy::default();

        assert!(policy.dry_run);
        assert!(!policy.remediation_enabled);
        assert!(!policy.is_live());
        assert!(!policy.denylist.is_empty());
        assert!(policy.allowlist.is_empty());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "remediation_enabled": true }"#;
        let policy: RemediationPolicy = serde_json::from_str(json).unwrap();

        assert!(policy.dry_run); // default still true
        assert!(policy.remediation_enabled);
        assert!(!policy.is_live()); // one opt-in is not enough
    }

    #[test]
    fn test_live_requires_both_opt_ins() {
        let policy = RemediationPolicy {
            dry_run: false,
            remediation_enabled: true,
            ..Default::default()
        };
        assert!(policy.is_live());

        let only_enabled = RemediationPolicy {
            remediation_enabled: true,
            ..Default::default()
        };
        assert!(!only_enabled.is_live());

        let only_not_dry = RemediationPolicy {
            dry_run: false,
            ..Default::default()
        };
        assert!(!only_not_dry.is_live());
    }

    #[test]
    fn test_denylist_matches_case_insensitively() {
        let policy = RemediationPolicy::default();

        let decision = policy.should_act("AdministratorAccess");
        assert!(!decision.is_allowed());
        assert!(decision.reason().contains("denylist"));

        let decision = policy.should_act("Break-Glass-Prod");
        assert!(!decision.is_allowed());
    }

    #[test]
    fn test_denylist_wins_over_allowlist() {
        let policy = RemediationPolicy {
            allowlist: vec!["administratoraccess".to_string()],
            ..Default::default()
        }
        .normalized();

        // Matches both lists; denylist is evaluated first
        let decision = policy.should_act("AdministratorAccess");
        assert!(matches!(decision, GateDecision::DeniedByDenylist { .. }));
    }

    #[test]
    fn test_allowlist_restricts_when_non_empty() {
        let policy = RemediationPolicy {
            allowlist: vec!["s3".to_string()],
            ..Default::default()
        }
        .normalized();

        assert!(policy.should_act("AmazonS3ReadOnlyAccess").is_allowed());
        assert_eq!(
            policy.should_act("AmazonEC2ReadOnlyAccess"),
            GateDecision::NotInAllowlist
        );
    }

    #[test]
    fn test_empty_allowlist_is_no_restriction() {
        let policy = RemediationPolicy::default();
        assert!(policy.should_act("AmazonEC2ReadOnlyAccess").is_allowed());
    }

    #[test]
    fn test_explicitly_empty_denylist_matches_nothing() {
        // An operator may construct a policy without a denylist; only the
        // defaults and the env path insist on one
        let policy = RemediationPolicy {
            denylist: Vec::new(),
            ..Default::default()
        }
        .normalized();

        assert!(policy.should_act("AdministratorAccess").is_allowed());
    }

    #[test]
    fn test_absent_json_denylist_gets_defaults() {
        let policy: RemediationPolicy = serde_json::from_str("{}").unwrap();
        assert!(!policy.should_act("AdministratorAccess").is_allowed());
        assert!(!policy.should_act("prod-break-glass-role").is_allowed());
    }
}
