//! Entitlement risk classification
//!
//! `classify` is a pure function over the entitlement display name:
//! case-insensitive substring rules, evaluated in order, first match wins.
//! Every input maps to exactly one tier; unknown names default to LOW.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::error::CoreError;

/// Risk tier of an entitlement - ordered from lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low = 1,
    Medium = 2,
    High = 3,
}

impl RiskTier {
    /// Code string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskTier::Low => "LOW",
            RiskTier::Medium => "MEDIUM",
            RiskTier::High => "HIGH",
        }
    }

    /// Parse from the stored code string
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_uppercase().as_str() {
            "LOW" => Ok(RiskTier::Low),
            "MEDIUM" => Ok(RiskTier::Medium),
            "HIGH" => Ok(RiskTier::High),
            other => Err(CoreError::InvalidRiskTier(other.to_string())),
        }
    }
}

impl PartialOrd for RiskTier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RiskTier {
    fn cmp(&self, other: &Self) -> Ordering {
        (*self as u8).cmp(&(*other as u8))
    }
}

impl Default for RiskTier {
    fn default() -> Self {
        RiskTier::Low
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classify an entitlement display name into a risk tier.
///
/// Rule order is authoritative: the denylist-grade names win over the
/// write-level names, which win over read-only. Custom names that match
/// nothing are LOW.
pub fn classify(display_name: &str) -> RiskTier {
    let name = display_name.to_lowercase();

    if name.contains("administratoraccess") || name.contains("fullaccess") {
        RiskTier::High
    } else if name.contains("poweruser") || name.contains("write") {
        RiskTier::Medium
    } else if name.contains("readonly") {
        RiskTier::Low
    } else {
        RiskTier::Low
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_high() {
        assert_eq!(classify("AdministratorAccess"), RiskTier::High);
        assert_eq!(classify("AmazonS3FullAccess"), RiskTier::High);
    }

    #[test]
    fn test_classify_medium() {
        assert_eq!(classify("PowerUserAccess"), RiskTier::Medium);
        assert_eq!(classify("DynamoDBWriteOnlyAccess"), RiskTier::Medium);
    }

    #[test]
    fn test_classify_low() {
        assert_eq!(classify("ReadOnlyAccess"), RiskTier::Low);
    }

    #[test]
    fn test_classify_unknown_defaults_low() {
        assert_eq!(classify("SomethingElse"), RiskTier::Low);
        assert_eq!(classify(""), RiskTier::Low);
    }

    #[test]
    fn test_classify_case_insensitive() {
        assert_eq!(classify("administratoraccess"), RiskTier::High);
        assert_eq!(classify("ADMINISTRATORACCESS"), RiskTier::High);
        assert_eq!(classify("PoWeRuSeRaCcEsS"), RiskTier::Medium);
    }

    #[test]
    fn test_classify_first_match_wins() {
        // Matches both the HIGH and MEDIUM rule; HIGH is evaluated first
        assert_eq!(classify("FullAccessWriteEverything"), RiskTier::High);
        // Matches both MEDIUM and LOW; MEDIUM is evaluated first
        assert_eq!(classify("ReadOnlyPlusWrite"), RiskTier::Medium);
    }

    #[test]
    fn test_tier_ordering() {
        assert!(RiskTier::Low < RiskTier::Medium);
        assert!(RiskTier::Medium < RiskTier::High);
    }

    #[test]
    fn test_tier_round_trip() {
        for tier in [RiskTier::Low, RiskTier::Medium, RiskTier::High] {
            assert_eq!(RiskTier::parse(tier.as_str()).unwrap(), tier);
        }
        assert!(RiskTier::parse("CRITICAL").is_err());
    }
}
