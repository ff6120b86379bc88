//! Risk evaluation pass
//!
//! Re-classifies every stored entitlement with the deterministic rules and
//! persists only the tiers that changed. Safe to run alongside campaign
//! generation: it touches entitlements only, never grants or reviews.

use serde_json::json;

use accessgov_core::{classify, AuditEvent, AuditLevel, RiskTier};
use accessgov_persistence::EntitlementRepo;

use crate::context::GovernanceContext;
use crate::error::GovernanceResult;

const ACTION: &str = "evaluate_risk";

/// Outcome of one risk evaluation pass
#[derive(Debug, Clone, Default)]
pub struct RiskEvaluationSummary {
    pub evaluated: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Re-evaluate the risk tier of every stored entitlement.
///
/// A failure on one entitlement is audited and skipped; the pass continues.
pub async fn run_risk_evaluation(
    ctx: &GovernanceContext,
) -> GovernanceResult<RiskEvaluationSummary> {
    ctx.audit()
        .record(AuditEvent::new(ACTION, "start", "Starting entitlement risk evaluation"))
        .await;

    let entitlements = EntitlementRepo::list_all(ctx.pool()).await?;
    let mut summary = RiskEvaluationSummary::default();

    for row in entitlements {
        summary.evaluated += 1;

        let current = match RiskTier::parse(&row.risk_tier) {
            Ok(tier) => tier,
            Err(err) => {
                summary.failed += 1;
                ctx.audit()
                    .record(
                        AuditEvent::new(
                            ACTION,
                            "error",
                            &format!("Unreadable stored tier for {}: {}", row.display_name, err),
                        )
                        .with_level(AuditLevel::Error)
                        .with_entity("entitlement", &row.entitlement_id),
                    )
                    .await;
                continue;
            }
        };

        let new_tier = classify(&row.display_name);
        if new_tier == current {
            continue;
        }

        match EntitlementRepo::update_risk_tier(ctx.pool(), &row.entitlement_id, new_tier).await {
            Ok(()) => {
                summary.updated += 1;
                ctx.audit()
                    .record(
                        AuditEvent::new(
                            ACTION,
                            "reclassified",
                            &format!("{} classified as {}", row.display_name, new_tier),
                        )
                        .with_entity("entitlement", &row.entitlement_id)
                        .with_details(json!({
                            "old_tier": current.as_str(),
                            "new_tier": new_tier.as_str(),
                        })),
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
                            &format!("Error evaluating {}: {}", row.display_name, err),
                        )
                        .with_level(AuditLevel::Error)
                        .with_entity("entitlement", &row.entitlement_id),
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
                &format!(
                    "Risk evaluation complete. Updated {} entitlements.",
                    summary.updated
                ),
            )
            .with_details(json!({
                "evaluated": summary.evaluated,
                "updated": summary.updated,
                "failed": summary.failed,
            })),
        )
        .await;

    Ok(summary)
}
