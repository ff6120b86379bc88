//! Structured audit entries
//!
//! Every governance action produces one `AuditEvent`. Entries are append-only
//! once recorded; they are the system's evidentiary record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::CoreError;

/// Severity of an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl AuditLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditLevel::Debug => "DEBUG",
            AuditLevel::Info => "INFO",
            AuditLevel::Warn => "WARN",
            AuditLevel::Error => "ERROR",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_uppercase().as_str() {
            "DEBUG" => Ok(AuditLevel::Debug),
            "INFO" => Ok(AuditLevel::Info),
            "WARN" | "WARNING" => Ok(AuditLevel::Warn),
            "ERROR" => Ok(AuditLevel::Error),
            other => Err(CoreError::InvalidAuditLevel(other.to_string())),
        }
    }
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One immutable governance audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub log_id: String,
    pub timestamp: DateTime<Utc>,
    pub level: AuditLevel,
    /// Which pass or operation emitted the entry (e.g. "generate_campaign")
    pub action: String,
    /// Outcome keyword (e.g. "start", "success", "skip", "dry_run", "error")
    pub status: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    /// Free-form structured payload
    pub details: Option<serde_json::Value>,
}

impl AuditEvent {
    pub fn new(action: &str, status: &str, message: &str) -> Self {
        Self {
            log_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            level: AuditLevel::Info,
            action: action.to_string(),
            status: status.to_string(),
            message: message.to_string(),
            entity_type: None,
            entity_id: None,
            details: None,
        }
    }

    pub fn with_level(mut self, level: AuditLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_entity(mut self, entity_type: &str, entity_id: &str) -> Self {
        self.entity_type = Some(entity_type.to_string());
        self.entity_id = Some(entity_id.to_string());
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_builder() {
        let event = AuditEvent::new("generate_campaign", "success", "Campaign created")
            .with_entity("campaign", "CAMP-1")
            .with_details(json!({"reviews_created": 3}));

        assert_eq!(event.level, AuditLevel::Info);
        assert_eq!(event.entity_type.as_deref(), Some("campaign"));
        assert_eq!(event.details.unwrap()["reviews_created"], 3);
    }

    #[test]
    fn test_level_parse_accepts_warning_alias() {
        assert_eq!(AuditLevel::parse("WARNING").unwrap(), AuditLevel::Warn);
        assert!(AuditLevel::parse("FATAL").is_err());
    }
}
