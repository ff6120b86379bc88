//! Classification, campaign generation, decision, and explanation commands

use anyhow::Result;
use std::path::Path;

use accessgov_governance::{
    decide_review, generate_campaign, run_explanation_pass, run_risk_evaluation,
    GovernanceContext, TemplateExplainer,
};

use crate::db;
use crate::DecisionArg;

/// Re-classify all entitlement risk tiers
pub async fn classify(db_path: &Path) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = GovernanceContext::new(&database);

    let summary = run_risk_evaluation(&ctx).await?;
    println!(
        "✅ Risk evaluation complete: {} evaluated, {} updated, {} failed",
        summary.evaluated, summary.updated, summary.failed
    );
    Ok(())
}

/// Generate a new review campaign
pub async fn generate(db_path: &Path) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = GovernanceContext::new(&database);

    let summary = generate_campaign(&ctx).await?;
    println!(
        "✅ Campaign {} created: {} reviews, {} grants already under review",
        summary.campaign_id, summary.reviews_created, summary.skipped_existing
    );
    Ok(())
}

/// Decide one pending review
pub async fn decide(
    db_path: &Path,
    review_id: &str,
    decision: DecisionArg,
    comment: Option<&str>,
) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = GovernanceContext::new(&database);

    let review = decide_review(&ctx, review_id, decision.to_core_decision(), comment).await?;
    println!("✅ Review {} is now {}", review.review_id, review.status);
    Ok(())
}

/// Fill risk explanations for HIGH-tier reviews
pub async fn explain(db_path: &Path) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = GovernanceContext::new(&database);

    let summary = run_explanation_pass(&ctx, &TemplateExplainer).await?;
    println!(
        "✅ Explanations: {} generated, {} fallbacks, {} failed",
        summary.explained, summary.fallbacks, summary.failed
    );
    Ok(())
}
