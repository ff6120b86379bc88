//! Review decision service
//!
//! Applies a reviewer's decision to a PENDING review. The engine does not
//! choose outcomes; it enforces that the transition is legal, timestamps it,
//! and audits it. Deciding a non-PENDING review is a typed error, never a
//! silent no-op.

use chrono::Utc;
use serde_json::json;

use accessgov_core::{AuditEvent, AuditLevel, Review, ReviewDecision};
use accessgov_persistence::ReviewRepo;

use crate::context::GovernanceContext;
use crate::error::{GovernanceError, GovernanceResult};

const ACTION: &str = "decide_review";

/// Apply a decision to a PENDING review, exactly once.
pub async fn decide_review(
    ctx: &GovernanceContext,
    review_id: &str,
    decision: ReviewDecision,
    comment: Option<&str>,
) -> GovernanceResult<Review> {
    let row = ReviewRepo::get_by_id(ctx.pool(), review_id)
        .await
        .map_err(|err| {
            if err.is_not_found() {
                GovernanceError::ReviewNotFound(review_id.to_string())
            } else {
                err.into()
            }
        })?;

    let mut review = Review::try_from(row)?;
    let decided_at = Utc::now();
    if review.decide(decision, comment, decided_at).is_err() {
        ctx.audit()
            .record(
                AuditEvent::new(
                    ACTION,
                    "rejected",
                    &format!("Illegal transition attempt: review is {}", review.status),
                )
                .with_level(AuditLevel::Warn)
                .with_entity("access_review", review_id),
            )
            .await;
        return Err(GovernanceError::InvalidTransition {
            review_id: review.review_id.clone(),
            status: review.status.to_string(),
        });
    }

    // The guarded UPDATE closes the race with a concurrent decision
    let transitioned =
        ReviewRepo::decide(ctx.pool(), review_id, review.status, decided_at, comment).await?;

    if !transitioned {
        let current = ReviewRepo::get_by_id(ctx.pool(), review_id).await?;
        ctx.audit()
            .record(
                AuditEvent::new(
                    ACTION,
                    "rejected",
                    &format!(
                        "Illegal transition attempt: review is {}",
                        current.status
                    ),
                )
                .with_level(AuditLevel::Warn)
                .with_entity("access_review", review_id),
            )
            .await;
        return Err(GovernanceError::InvalidTransition {
            review_id: review_id.to_string(),
            status: current.status,
        });
    }

    ctx.audit()
        .record(
            AuditEvent::new(
                ACTION,
                "success",
                &format!("Review decided: {}", review.status),
            )
            .with_entity("access_review", review_id)
            .with_details(json!({
                "status": review.status.as_str(),
                "comment": comment,
            })),
        )
        .await;

    Ok(review)
}

/// Fetch one review as a typed record
pub async fn get_review(ctx: &GovernanceContext, review_id: &str) -> GovernanceResult<Review> {
    let row = ReviewRepo::get_by_id(ctx.pool(), review_id)
        .await
        .map_err(|err| {
            if err.is_not_found() {
                GovernanceError::ReviewNotFound(review_id.to_string())
            } else {
                err.into()
            }
        })?;
    Ok(Review::try_from(row)?)
}
