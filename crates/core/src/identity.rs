//! Principals, entitlements, and the grants linking them
//!
//! All three are created by ingestion. The Engine never mutates or deletes
//! principals or grants; the only entitlement field it touches is the risk
//! tier, via the classification pass.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::risk::RiskTier;

/// An identity (user or service) that can hold entitlements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Stable opaque identifier from the identity provider
    pub principal_id: String,
    /// Human-readable name
    pub display_name: String,
    /// External reference used by the revoke boundary (e.g. an ARN)
    pub reference: String,
    /// When ingestion first observed this principal
    pub discovered_at: DateTime<Utc>,
}

impl Principal {
    pub fn new(principal_id: &str, display_name: &str, reference: &str) -> Self {
        Self {
            principal_id: principal_id.to_string(),
            display_name: display_name.to_string(),
            reference: reference.to_string(),
            discovered_at: Utc::now(),
        }
    }

    pub fn with_discovered_at(mut self, discovered_at: DateTime<Utc>) -> Self {
        self.discovered_at = discovered_at;
        self
    }
}

/// A grantable permission set (role/policy) with a classified risk tier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entitlement {
    /// Unique identifier; doubles as the external reference for revocation
    pub entitlement_id: String,
    pub display_name: String,
    /// Classified tier; ingestion creates entitlements as LOW
    pub risk_tier: RiskTier,
}

impl Entitlement {
    pub fn new(entitlement_id: &str, display_name: &str) -> Self {
        Self {
            entitlement_id: entitlement_id.to_string(),
            display_name: display_name.to_string(),
            risk_tier: RiskTier::default(),
        }
    }

    pub fn with_risk_tier(mut self, risk_tier: RiskTier) -> Self {
        self.risk_tier = risk_tier;
        self
    }
}

/// Current fact that a principal holds an entitlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub principal_id: String,
    pub entitlement_id: String,
}

impl Grant {
    pub fn new(principal_id: &str, entitlement_id: &str) -> Self {
        Self {
            principal_id: principal_id.to_string(),
            entitlement_id: entitlement_id.to_string(),
        }
    }
}
