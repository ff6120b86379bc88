//! Database row types
//!
//! Row structs for sqlx mapping from the SQLite tables, plus the joined
//! projections used by the governance passes. Domain enums are parsed here,
//! once, at the persistence boundary; everything above works with typed
//! records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use accessgov_core::{
    AuditEvent, AuditLevel, Entitlement, Principal, Review, ReviewStatus, RiskTier,
};

use crate::error::PersistenceError;

/// Row type for the `principals` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct PrincipalRow {
    pub principal_id: String,
    pub display_name: String,
    pub reference: String,
    pub discovered_at: DateTime<Utc>,
}

/// Row type for the `entitlements` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct EntitlementRow {
    pub entitlement_id: String,
    pub display_name: String,
    pub risk_tier: String,
}

/// Row type for the `grants` table joined with the entitlement's risk tier
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct GrantWithRiskRow {
    pub principal_id: String,
    pub entitlement_id: String,
    pub risk_tier: String,
}

/// Row type for the `campaigns` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct CampaignRow {
    pub campaign_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Row type for the `access_reviews` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ReviewRow {
    pub review_id: String,
    pub campaign_id: String,
    pub principal_id: String,
    pub entitlement_id: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_comment: Option<String>,
    pub remediated_at: Option<DateTime<Utc>>,
    pub risk_explanation: Option<String>,
}

/// REVOKED-but-not-remediated review joined with the references the revoke
/// boundary needs
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RevocationCandidateRow {
    pub review_id: String,
    pub principal_name: String,
    pub principal_reference: String,
    pub entitlement_id: String,
    pub entitlement_name: String,
}

/// Review joined with display context, used by the explanation pass
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ReviewContextRow {
    pub review_id: String,
    pub principal_id: String,
    pub entitlement_id: String,
    pub principal_name: String,
    pub entitlement_name: String,
    pub risk_tier: String,
}

/// Full-ledger row for the export builder
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct ExportRow {
    pub review_id: String,
    pub campaign_id: String,
    pub principal_name: String,
    pub entitlement_name: String,
    pub risk_tier: String,
    pub status: String,
    pub decision_comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub remediated_at: Option<DateTime<Utc>>,
    pub risk_explanation: Option<String>,
}

/// Row type for the `audit_logs` table
#[derive(Debug, Clone, sqlx::FromRow, Serialize, Deserialize)]
pub struct AuditLogRow {
    pub log_id: String,
    pub timestamp: DateTime<Utc>,
    pub level: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub status: String,
    pub message: String,
    pub details: Option<String>,
}

// === Conversion implementations (rows into domain records) ===

impl From<PrincipalRow> for Principal {
    fn from(row: PrincipalRow) -> Self {
        Self {
            principal_id: row.principal_id,
            display_name: row.display_name,
            reference: row.reference,
            discovered_at: row.discovered_at,
        }
    }
}

impl TryFrom<EntitlementRow> for Entitlement {
    type Error = PersistenceError;

    fn try_from(row: EntitlementRow) -> Result<Self, Self::Error> {
        let risk_tier = RiskTier::parse(&row.risk_tier)
            .map_err(|_| PersistenceError::invalid_enum("risk_tier", &row.risk_tier))?;
        Ok(Self {
            entitlement_id: row.entitlement_id,
            display_name: row.display_name,
            risk_tier,
        })
    }
}

impl TryFrom<ReviewRow> for Review {
    type Error = PersistenceError;

    fn try_from(row: ReviewRow) -> Result<Self, Self::Error> {
        let status = ReviewStatus::parse(&row.status)
            .map_err(|_| PersistenceError::invalid_enum("status", &row.status))?;
        Ok(Self {
            review_id: row.review_id,
            campaign_id: row.campaign_id,
            principal_id: row.principal_id,
            entitlement_id: row.entitlement_id,
            status,
            created_at: row.created_at,
            decided_at: row.decided_at,
            decision_comment: row.decision_comment,
            remediated_at: row.remediated_at,
            risk_explanation: row.risk_explanation,
        })
    }
}

impl TryFrom<AuditLogRow> for AuditEvent {
    type Error = PersistenceError;

    fn try_from(row: AuditLogRow) -> Result<Self, Self::Error> {
        let level = AuditLevel::parse(&row.level)
            .map_err(|_| PersistenceError::invalid_enum("level", &row.level))?;
        let details = row
            .details
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        Ok(Self {
            log_id: row.log_id,
            timestamp: row.timestamp,
            level,
            action: row.action,
            status: row.status,
            message: row.message,
            entity_type: row.entity_type,
            entity_id: row.entity_id,
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_row_round_trip() {
        let row = ReviewRow {
            review_id: "R1".to_string(),
            campaign_id: "C1".to_string(),
            principal_id: "U1".to_string(),
            entitlement_id: "E1".to_string(),
            status: "PENDING".to_string(),
            created_at: Utc::now(),
            decided_at: None,
            decision_comment: None,
            remediated_at: None,
            risk_explanation: None,
        };

        let review = Review::try_from(row).unwrap();
        assert_eq!(review.status, ReviewStatus::Pending);
    }

    #[test]
    fn test_bad_status_surfaces_typed_error() {
        let row = ReviewRow {
            review_id: "R1".to_string(),
            campaign_id: "C1".to_string(),
            principal_id: "U1".to_string(),
            entitlement_id: "E1".to_string(),
            status: "EXPIRED".to_string(),
            created_at: Utc::now(),
            decided_at: None,
            decision_comment: None,
            remediated_at: None,
            risk_explanation: None,
        };

        let result = Review::try_from(row);
        assert!(matches!(
            result,
            Err(PersistenceError::InvalidEnumValue { .. })
        ));
    }
}
