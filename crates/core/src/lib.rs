//! # Accessgov Core
//!
//! Core domain types for access certification:
//! - Principal, Entitlement, Grant: identities and what they hold
//! - Campaign, Review: certification work items and their lifecycle
//! - RiskTier: deterministic entitlement risk classification
//! - AuditEvent: structured governance audit entries

pub mod audit;
pub mod error;
pub mod identity;
pub mod review;
pub mod risk;

pub use audit::{AuditEvent, AuditLevel};
pub use error::CoreError;
pub use identity::{Entitlement, Grant, Principal};
pub use review::{Campaign, Review, ReviewDecision, ReviewStatus};
pub use risk::{classify, RiskTier};
