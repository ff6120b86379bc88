//! Remediation scan command
//!
//! Loads the safety policy (file, then env overrides), picks the revoke
//! backend, and runs one scan. Requesting live mode without a configured
//! backend is a configuration failure: the pass degrades to dry-run and
//! says so, rather than guessing.

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;

use accessgov_core::{AuditEvent, AuditLevel};
use accessgov_governance::{
    GovernanceContext, MockRevoker, RemediationEngine, RemediationPolicy,
};

use crate::db;

pub async fn run(db_path: &Path, policy_path: Option<&Path>, mock_revoker: bool) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = GovernanceContext::new(&database);

    let mut policy = match policy_path {
        Some(path) => RemediationPolicy::from_file(path)
            .with_context(|| format!("Failed to load policy from {:?}", path))?,
        None => RemediationPolicy::default(),
    }
    .with_env_overrides();

    // Live mode needs a revoke backend. This build ships the recording mock;
    // without it, degrade to dry-run explicitly instead of guessing.
    if policy.is_live() && !mock_revoker {
        ctx.audit()
            .record(
                AuditEvent::new(
                    "remediate_access",
                    "disabled",
                    "Live remediation requested but no revoke backend is configured; \
                     forcing dry-run.",
                )
                .with_level(AuditLevel::Warn)
                .with_details(json!({ "requested_live": true })),
            )
            .await;
        println!("⚠️  No revoke backend configured; forcing dry-run");
        policy.dry_run = true;
    }

    let live = policy.is_live();
    let engine = RemediationEngine::new(policy);
    let revoker = MockRevoker::new();

    let report = engine.run(&ctx, &revoker).await?;

    println!(
        "✅ Remediation scan: {} processed, {} executed, {} dry-run, {} skipped, {} failed",
        report.processed(),
        report.executed(),
        report.dry_run(),
        report.skipped(),
        report.failed()
    );
    if !live {
        println!("   (inert mode: set dry_run=false and remediation_enabled=true to execute)");
    }
    Ok(())
}
