//! Review lifecycle - campaigns, reviews, and the decision state machine
//!
//! A review is created PENDING and may be decided exactly once, to APPROVED
//! or REVOKED. The state machine does not pick outcomes; it only enforces
//! legality and timestamps the transition. REVOKED reviews are later
//! finalized by the remediation scan, which sets `remediated_at` at most once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::CoreError;

/// Review lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewStatus {
    /// Awaiting a decision (initial)
    Pending,
    /// Access certified; terminal
    Approved,
    /// Access to be removed; terminal for decisions, input to remediation
    Revoked,
}

impl ReviewStatus {
    /// Code string stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "PENDING",
            ReviewStatus::Approved => "APPROVED",
            ReviewStatus::Revoked => "REVOKED",
        }
    }

    /// Parse from the stored code string
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(ReviewStatus::Pending),
            "APPROVED" => Ok(ReviewStatus::Approved),
            "REVOKED" => Ok(ReviewStatus::Revoked),
            other => Err(CoreError::InvalidStatus(other.to_string())),
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome chosen by a reviewer (or an external decision feed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Revoke,
}

impl ReviewDecision {
    /// The status this decision transitions a PENDING review to
    pub fn target_status(&self) -> ReviewStatus {
        match self {
            ReviewDecision::Approve => ReviewStatus::Approved,
            ReviewDecision::Revoke => ReviewStatus::Revoked,
        }
    }
}

/// A batch of reviews generated together; immutable once created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub campaign_id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Campaign {
    /// Create a campaign named after its generation time
    pub fn new_at(created_at: DateTime<Utc>) -> Self {
        Self {
            campaign_id: Uuid::new_v4().to_string(),
            name: format!("Access Campaign {}", created_at.format("%Y-%m-%d %H:%M:%S")),
            created_at,
        }
    }
}

/// A unit of work tracking a decision about one grant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub review_id: String,
    pub campaign_id: String,
    pub principal_id: String,
    pub entitlement_id: String,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub decision_comment: Option<String>,
    pub remediated_at: Option<DateTime<Utc>>,
    pub risk_explanation: Option<String>,
}

impl Review {
    /// Create a new PENDING review for a grant under a campaign
    pub fn pending(campaign_id: &str, principal_id: &str, entitlement_id: &str) -> Self {
        Self {
            review_id: Uuid::new_v4().to_string(),
            campaign_id: campaign_id.to_string(),
            principal_id: principal_id.to_string(),
            entitlement_id: entitlement_id.to_string(),
            status: ReviewStatus::Pending,
            created_at: Utc::now(),
            decided_at: None,
            decision_comment: None,
            remediated_at: None,
            risk_explanation: None,
        }
    }

    /// Apply a decision. Legal only from PENDING, exactly once.
    pub fn decide(
        &mut self,
        decision: ReviewDecision,
        comment: Option<&str>,
        decided_at: DateTime<Utc>,
    ) -> Result<(), CoreError> {
        if self.status != ReviewStatus::Pending {
            return Err(CoreError::InvalidTransition {
                review_id: self.review_id.clone(),
                status: self.status.to_string(),
            });
        }

        self.status = decision.target_status();
        self.decided_at = Some(decided_at);
        self.decision_comment = comment.map(|s| s.to_string());
        Ok(())
    }

    /// Whether the remediation scan should pick this review up
    pub fn awaits_remediation(&self) -> bool {
        self.status == ReviewStatus::Revoked && self.remediated_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_review() -> Review {
        Review::pending("CAMP-1", "U1", "arn:aws:iam::aws:policy/ReadOnlyAccess")
    }

    #[test]
    fn test_decide_approve() {
        let mut review = pending_review();
        review
            .decide(ReviewDecision::Approve, Some("still needed"), Utc::now())
            .unwrap();

        assert_eq!(review.status, ReviewStatus::Approved);
        assert!(review.decided_at.is_some());
        assert_eq!(review.decision_comment.as_deref(), Some("still needed"));
        assert!(!review.awaits_remediation());
    }

    #[test]
    fn test_decide_revoke_awaits_remediation() {
        let mut review = pending_review();
        review.decide(ReviewDecision::Revoke, None, Utc::now()).unwrap();

        assert_eq!(review.status, ReviewStatus::Revoked);
        assert!(review.awaits_remediation());
    }

    #[test]
    fn test_decide_twice_rejected() {
        let mut review = pending_review();
        review.decide(ReviewDecision::Approve, None, Utc::now()).unwrap();

        let result = review.decide(ReviewDecision::Revoke, None, Utc::now());
        assert!(matches!(result, Err(CoreError::InvalidTransition { .. })));
        // First decision stands
        assert_eq!(review.status, ReviewStatus::Approved);
    }

    #[test]
    fn test_status_round_trip() {
        for status in [ReviewStatus::Pending, ReviewStatus::Approved, ReviewStatus::Revoked] {
            assert_eq!(ReviewStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(ReviewStatus::parse("EXPIRED").is_err());
    }

    #[test]
    fn test_campaign_name_carries_timestamp() {
        let created_at = "2026-03-01T10:00:00Z".parse().unwrap();
        let campaign = Campaign::new_at(created_at);
        assert_eq!(campaign.name, "Access Campaign 2026-03-01 10:00:00");
    }
}
