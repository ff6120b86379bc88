//! Core domain errors

use thiserror::Error;

/// Errors from core domain rules
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Illegal review transition: review {review_id} is {status}, only PENDING reviews can be decided")]
    InvalidTransition { review_id: String, status: String },

    #[error("Invalid review status: {0}")]
    InvalidStatus(String),

    #[error("Invalid risk tier: {0}")]
    InvalidRiskTier(String),

    #[error("Invalid audit level: {0}")]
    InvalidAuditLevel(String),
}
