//! Remediation gate and executor
//!
//! Scans REVOKED reviews that have not been finalized and decides, per
//! candidate, whether a live revoke call may happen. A real call requires
//! `dry_run = false` AND `remediation_enabled = true` AND a passing gate;
//! every other combination is a logged no-op that still finalizes the
//! review's bookkeeping, which is what makes repeated scans idempotent.
//! A failed revoke call leaves `remediated_at` unset so a later pass retries
//! it; one failure never aborts the batch.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use std::sync::Mutex;
use thiserror::Error;
use tokio::time::timeout;

use accessgov_core::{AuditEvent, AuditLevel};
use accessgov_persistence::{RevocationCandidateRow, ReviewRepo};

use crate::config::{GateDecision, RemediationPolicy};
use crate::context::GovernanceContext;
use crate::error::GovernanceResult;

const ACTION: &str = "remediate_access";

/// How many candidates the inert-mode plan entry previews
const PLAN_PREVIEW_LIMIT: usize = 10;

/// Error from the external revoke boundary
#[derive(Debug, Error)]
pub enum RevokeError {
    #[error("Revoke backend error: {0}")]
    Backend(String),
}

/// External revoke boundary. Implementations must be safe to call at most
/// once per finalized review; the engine guarantees it never calls twice for
/// the same review once `remediated_at` is set.
#[async_trait]
pub trait EntitlementRevoker: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Detach the entitlement from the principal in the identity provider
    async fn revoke(
        &self,
        principal_reference: &str,
        entitlement_reference: &str,
    ) -> Result<(), RevokeError>;
}

/// Offline revoker that records every call instead of touching a live
/// system. Used by the CLI's mock mode and by tests.
#[derive(Default)]
pub struct MockRevoker {
    calls: Mutex<Vec<(String, String)>>,
}

impl MockRevoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every (principal_reference, entitlement_reference) pair revoked so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("revoker call log poisoned").clone()
    }
}

#[async_trait]
impl EntitlementRevoker for MockRevoker {
    fn name(&self) -> &str {
        "mock"
    }

    async fn revoke(
        &self,
        principal_reference: &str,
        entitlement_reference: &str,
    ) -> Result<(), RevokeError> {
        tracing::info!(
            principal = principal_reference,
            entitlement = entitlement_reference,
            "mock revoke executed"
        );
        self.calls
            .lock()
            .expect("revoker call log poisoned")
            .push((principal_reference.to_string(), entitlement_reference.to_string()));
        Ok(())
    }
}

/// What happened to one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemediationAction {
    /// Live revoke call succeeded; review finalized
    Executed,
    /// Inert mode; intent logged, review finalized without a live call
    DryRun,
    /// Gate denied the candidate; review finalized without a live call
    SkippedByGate { reason: String },
    /// Revoke call failed or timed out; review left eligible for retry
    Failed { reason: String },
}

/// Per-candidate result collected into the batch report
#[derive(Debug, Clone)]
pub struct RemediationOutcome {
    pub review_id: String,
    pub entitlement_name: String,
    pub action: RemediationAction,
}

/// Batch report for one remediation scan
#[derive(Debug, Clone, Default)]
pub struct RemediationReport {
    pub outcomes: Vec<RemediationOutcome>,
}

impl RemediationReport {
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn executed(&self) -> usize {
        self.count(|a| matches!(a, RemediationAction::Executed))
    }

    pub fn dry_run(&self) -> usize {
        self.count(|a| matches!(a, RemediationAction::DryRun))
    }

    pub fn skipped(&self) -> usize {
        self.count(|a| matches!(a, RemediationAction::SkippedByGate { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|a| matches!(a, RemediationAction::Failed { .. }))
    }

    /// Reviews whose bookkeeping was completed this scan
    pub fn finalized(&self) -> usize {
        self.processed() - self.failed()
    }

    fn count(&self, predicate: impl Fn(&RemediationAction) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.action)).count()
    }
}

/// The remediation gate and executor
pub struct RemediationEngine {
    policy: RemediationPolicy,
}

impl RemediationEngine {
    /// Build an engine around an explicit policy value
    pub fn new(policy: RemediationPolicy) -> Self {
        Self {
            policy: policy.normalized(),
        }
    }

    pub fn policy(&self) -> &RemediationPolicy {
        &self.policy
    }

    /// Run one remediation scan over all eligible REVOKED reviews.
    pub async fn run(
        &self,
        ctx: &GovernanceContext,
        revoker: &dyn EntitlementRevoker,
    ) -> GovernanceResult<RemediationReport> {
        ctx.audit()
            .record(
                AuditEvent::new(ACTION, "start", "Starting access remediation scan").with_details(
                    json!({
                        "dry_run": self.policy.dry_run,
                        "remediation_enabled": self.policy.remediation_enabled,
                        "revoker": revoker.name(),
                    }),
                ),
            )
            .await;

        let candidates = ReviewRepo::list_revocation_candidates(ctx.pool()).await?;

        if !self.policy.is_live() {
            let preview: Vec<_> = candidates
                .iter()
                .take(PLAN_PREVIEW_LIMIT)
                .map(|c| {
                    json!({
                        "review_id": c.review_id,
                        "principal": c.principal_name,
                        "entitlement": c.entitlement_name,
                    })
                })
                .collect();
            ctx.audit()
                .record(
                    AuditEvent::new(
                        ACTION,
                        "plan",
                        "Preflight only; no detachments will be executed.",
                    )
                    .with_details(json!({
                        "total_pending": candidates.len(),
                        "preview": preview,
                    })),
                )
                .await;
        }

        let mut report = RemediationReport::default();
        for candidate in &candidates {
            let action = self.process_candidate(ctx, revoker, candidate).await;
            report.outcomes.push(RemediationOutcome {
                review_id: candidate.review_id.clone(),
                entitlement_name: candidate.entitlement_name.clone(),
                action,
            });
        }

        ctx.audit()
            .record(
                AuditEvent::new(
                    ACTION,
                    "complete",
                    &format!(
                        "Remediation complete. Finalized {} of {} candidates.",
                        report.finalized(),
                        report.processed()
                    ),
                )
                .with_details(json!({
                    "processed": report.processed(),
                    "executed": report.executed(),
                    "dry_run": report.dry_run(),
                    "skipped": report.skipped(),
                    "failed": report.failed(),
                })),
            )
            .await;

        Ok(report)
    }

    /// Evaluate the gate and (maybe) the revoke boundary for one candidate.
    /// Always returns an outcome; errors become `Failed` so the batch driver
    /// keeps going.
    async fn process_candidate(
        &self,
        ctx: &GovernanceContext,
        revoker: &dyn EntitlementRevoker,
        candidate: &RevocationCandidateRow,
    ) -> RemediationAction {
        let gate = self.policy.should_act(&candidate.entitlement_name);

        match gate {
            GateDecision::Allowed if self.policy.is_live() => {
                let call = revoker.revoke(&candidate.principal_reference, &candidate.entitlement_id);
                match timeout(self.policy.revoke_timeout(), call).await {
                    Ok(Ok(())) => {
                        ctx.audit()
                            .record(
                                AuditEvent::new(
                                    ACTION,
                                    "success",
                                    &format!(
                                        "Detached {} from {}",
                                        candidate.entitlement_name, candidate.principal_name
                                    ),
                                )
                                .with_entity("access_review", &candidate.review_id),
                            )
                            .await;
                        match self.finalize(ctx, candidate).await {
                            Ok(()) => RemediationAction::Executed,
                            Err(reason) => RemediationAction::Failed { reason },
                        }
                    }
                    Ok(Err(err)) => {
                        self.audit_failure(ctx, candidate, &err.to_string()).await;
                        RemediationAction::Failed {
                            reason: err.to_string(),
                        }
                    }
                    Err(_) => {
                        let reason = format!(
                            "Revoke call timed out after {}ms",
                            self.policy.revoke_timeout_ms
                        );
                        self.audit_failure(ctx, candidate, &reason).await;
                        RemediationAction::Failed { reason }
                    }
                }
            }
            GateDecision::Allowed => {
                // Allowed by the gate but the engine is inert; log intent only
                ctx.audit()
                    .record(
                        AuditEvent::new(
                            ACTION,
                            "dry_run",
                            &format!(
                                "Would detach {} from {}",
                                candidate.entitlement_name, candidate.principal_name
                            ),
                        )
                        .with_entity("access_review", &candidate.review_id),
                    )
                    .await;
                match self.finalize(ctx, candidate).await {
                    Ok(()) => RemediationAction::DryRun,
                    Err(reason) => RemediationAction::Failed { reason },
                }
            }
            denied => {
                ctx.audit()
                    .record(
                        AuditEvent::new(ACTION, "skip", &denied.reason())
                            .with_entity("access_review", &candidate.review_id),
                    )
                    .await;
                match self.finalize(ctx, candidate).await {
                    Ok(()) => RemediationAction::SkippedByGate {
                        reason: denied.reason(),
                    },
                    Err(reason) => RemediationAction::Failed { reason },
                }
            }
        }
    }

    /// Set `remediated_at` for a processed candidate. The guarded UPDATE not
    /// matching means a concurrent scan finalized it first, which is fine; a
    /// database error leaves the review eligible for retry.
    async fn finalize(
        &self,
        ctx: &GovernanceContext,
        candidate: &RevocationCandidateRow,
    ) -> Result<(), String> {
        match ReviewRepo::mark_remediated(ctx.pool(), &candidate.review_id, Utc::now()).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::debug!(
                    review_id = %candidate.review_id,
                    "review already finalized by another scan"
                );
                Ok(())
            }
            Err(err) => {
                self.audit_failure(ctx, candidate, &err.to_string()).await;
                Err(err.to_string())
            }
        }
    }

    async fn audit_failure(
        &self,
        ctx: &GovernanceContext,
        candidate: &RevocationCandidateRow,
        reason: &str,
    ) {
        ctx.audit()
            .record(
                AuditEvent::new(
                    ACTION,
                    "error",
                    &format!(
                        "Remediation failed for {}: {}",
                        candidate.principal_name, reason
                    ),
                )
                .with_level(AuditLevel::Error)
                .with_entity("access_review", &candidate.review_id),
            )
            .await;
    }
}
