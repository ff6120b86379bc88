//! Governance engine errors
//!
//! Invariant violations are typed so callers can tell them apart from
//! transient failures; per-item batch failures never surface here, they are
//! collected into the pass reports instead.

use thiserror::Error;

use accessgov_persistence::PersistenceError;

/// Errors from the governance engine
#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("Review not found: {0}")]
    ReviewNotFound(String),

    #[error("Illegal review transition: review {review_id} is {status}")]
    InvalidTransition { review_id: String, status: String },

    #[error("Identity source error: {0}")]
    IdentitySource(String),

    #[error("Identity source timed out after {0}ms")]
    IdentitySourceTimeout(u64),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Result type for governance operations
pub type GovernanceResult<T> = Result<T, GovernanceError>;
