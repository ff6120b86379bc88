//! Campaign generation pass
//!
//! Snapshots the current grant set into a new review campaign: one PENDING
//! review per grant that has no open review yet. The campaign row and its
//! reviews are written in a single transaction; the partial unique index on
//! open reviews makes repeated (or concurrent) generation passes unable to
//! create duplicate open reviews for the same grant.

use chrono::Utc;
use serde_json::json;

use accessgov_core::{AuditEvent, AuditLevel, Campaign, Review};
use accessgov_persistence::{CampaignRepo, GrantRepo, PersistenceError, ReviewRepo};

use crate::context::GovernanceContext;
use crate::error::GovernanceResult;

const ACTION: &str = "generate_campaign";

/// Outcome of one generation pass
#[derive(Debug, Clone)]
pub struct CampaignSummary {
    pub campaign_id: String,
    pub reviews_created: usize,
    /// Grants skipped because they already have an open review
    pub skipped_existing: usize,
    pub failed: usize,
}

/// Generate a new certification campaign over the current grant set.
///
/// A failure on one grant is collected and audited after commit; it never
/// aborts the campaign.
pub async fn generate_campaign(ctx: &GovernanceContext) -> GovernanceResult<CampaignSummary> {
    ctx.audit()
        .record(AuditEvent::new(
            ACTION,
            "start",
            "Starting access certification campaign generation",
        ))
        .await;

    let grants = GrantRepo::list_with_risk(ctx.pool()).await?;
    let campaign = Campaign::new_at(Utc::now());

    let mut created = 0usize;
    let mut skipped = 0usize;
    // (principal, entitlement, error) for post-commit auditing; the audit
    // recorder shares the pool, so it cannot run while the transaction holds
    // a connection
    let mut failures: Vec<(String, String, String)> = Vec::new();

    let mut tx = ctx.pool().begin().await.map_err(PersistenceError::from)?;
    CampaignRepo::insert(&mut *tx, &campaign).await?;

    for grant in &grants {
        let review = Review::pending(
            &campaign.campaign_id,
            &grant.principal_id,
            &grant.entitlement_id,
        );
        match ReviewRepo::insert_pending(&mut *tx, &review).await {
            Ok(true) => created += 1,
            Ok(false) => skipped += 1,
            Err(err) => {
                failures.push((
                    grant.principal_id.clone(),
                    grant.entitlement_id.clone(),
                    err.to_string(),
                ));
            }
        }
    }

    tx.commit().await.map_err(PersistenceError::from)?;

    for (principal_id, entitlement_id, error) in &failures {
        ctx.audit()
            .record(
                AuditEvent::new(
                    ACTION,
                    "error",
                    &format!(
                        "Error creating review for {} -> {}: {}",
                        principal_id, entitlement_id, error
                    ),
                )
                .with_level(AuditLevel::Error)
                .with_entity("campaign", &campaign.campaign_id),
            )
            .await;
    }

    ctx.audit()
        .record(
            AuditEvent::new(
                ACTION,
                "success",
                &format!("Campaign created with {} review tasks.", created),
            )
            .with_entity("campaign", &campaign.campaign_id)
            .with_details(json!({
                "campaign_id": campaign.campaign_id,
                "reviews_created": created,
                "skipped_existing": skipped,
                "failed": failures.len(),
            })),
        )
        .await;

    Ok(CampaignSummary {
        campaign_id: campaign.campaign_id,
        reviews_created: created,
        skipped_existing: skipped,
        failed: failures.len(),
    })
}
