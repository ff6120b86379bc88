//! Risk explanation pass
//!
//! Fills in a human-readable risk explanation for HIGH-tier reviews that do
//! not have one yet. The explainer is an optional collaborator: any failure
//! or timeout degrades to a canned fallback message, and the pass never
//! blocks a review transition.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use accessgov_core::{AuditEvent, AuditLevel};
use accessgov_persistence::{ReviewContextRow, ReviewRepo};

use crate::context::GovernanceContext;
use crate::error::GovernanceResult;

const ACTION: &str = "explain_risk";

/// Bound on one explain call
const EXPLAIN_TIMEOUT_MS: u64 = 5_000;

/// Canned message used whenever the explainer is unavailable or fails
pub const FALLBACK_EXPLANATION: &str =
    "High-risk access detected based on entitlement scope. Manual review recommended.";

/// Error from an explanation backend
#[derive(Debug, Error)]
pub enum ExplanationError {
    #[error("Explanation backend error: {0}")]
    Backend(String),

    #[error("Empty explanation returned")]
    Empty,
}

/// Optional enrichment boundary: turns review context into one explanatory
/// sentence
#[async_trait]
pub trait RiskExplainer: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    async fn explain(
        &self,
        principal_name: &str,
        entitlement_name: &str,
    ) -> Result<String, ExplanationError>;
}

/// Built-in explainer producing a static templated sentence
pub struct TemplateExplainer;

#[async_trait]
impl RiskExplainer for TemplateExplainer {
    fn name(&self) -> &str {
        "template"
    }

    async fn explain(
        &self,
        principal_name: &str,
        entitlement_name: &str,
    ) -> Result<String, ExplanationError> {
        Ok(format!(
            "{} grants broad privileges to {}; confirm this access is still required or revoke it.",
            entitlement_name, principal_name
        ))
    }
}

/// Outcome of one explanation pass
#[derive(Debug, Clone, Default)]
pub struct ExplanationSummary {
    pub explained: usize,
    pub fallbacks: usize,
    pub failed: usize,
}

/// Fill explanations for HIGH-tier reviews missing one.
///
/// Explainer errors degrade per-review to the canned fallback; only a
/// persistence failure on the write is counted as failed, and it never
/// aborts the pass.
pub async fn run_explanation_pass(
    ctx: &GovernanceContext,
    explainer: &dyn RiskExplainer,
) -> GovernanceResult<ExplanationSummary> {
    ctx.audit()
        .record(
            AuditEvent::new(ACTION, "start", "Starting risk explanation for HIGH-tier reviews")
                .with_details(json!({ "explainer": explainer.name() })),
        )
        .await;

    let reviews = ReviewRepo::list_high_risk_missing_explanation(ctx.pool()).await?;
    let mut summary = ExplanationSummary::default();

    for review in &reviews {
        let (text, fallback) = explain_with_fallback(explainer, review).await;

        match ReviewRepo::set_risk_explanation(ctx.pool(), &review.review_id, &text).await {
            Ok(()) => {
                if fallback {
                    summary.fallbacks += 1;
                } else {
                    summary.explained += 1;
                }
                ctx.audit()
                    .record(
                        AuditEvent::new(ACTION, "success", "Risk explanation stored")
                            .with_entity("access_review", &review.review_id)
                            .with_details(json!({ "fallback": fallback })),
                    )
                    .await;
            }
            Err(err) => {
                summary.failed += 1;
                ctx.audit()
                    .record(
                        AuditEvent::new(
                            ACTION,
                            "error",
                            &format!("Failed to store explanation: {}", err),
                        )
                        .with_level(AuditLevel::Error)
                        .with_entity("access_review", &review.review_id),
                    )
                    .await;
            }
        }
    }

    ctx.audit()
        .record(
            AuditEvent::new(
                ACTION,
                "success",
                &format!("Explanation pass complete ({} reviews)", reviews.len()),
            )
            .with_details(json!({
                "explained": summary.explained,
                "fallbacks": summary.fallbacks,
                "failed": summary.failed,
            })),
        )
        .await;

    Ok(summary)
}

async fn explain_with_fallback(
    explainer: &dyn RiskExplainer,
    review: &ReviewContextRow,
) -> (String, bool) {
    let call = explainer.explain(&review.principal_name, &review.entitlement_name);
    match timeout(Duration::from_millis(EXPLAIN_TIMEOUT_MS), call).await {
        Ok(Ok(text)) if !text.trim().is_empty() => (text, false),
        Ok(Ok(_)) | Ok(Err(_)) | Err(_) => {
            tracing::warn!(
                review_id = %review.review_id,
                "explainer unavailable; using fallback text"
            );
            (FALLBACK_EXPLANATION.to_string(), true)
        }
    }
}
