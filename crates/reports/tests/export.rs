//! Integration tests for the export integrity builder

use tempfile::TempDir;

use accessgov_core::ReviewDecision;
use accessgov_governance::{
    decide_review, generate_campaign, run_discovery, run_risk_evaluation, GovernanceContext,
    MockIdentitySource,
};
use accessgov_persistence::Database;
use accessgov_reports::{build_export, run_export, ExportError};

async fn seeded_ctx() -> (Database, GovernanceContext) {
    let db = Database::in_memory().await.unwrap();
    let ctx = GovernanceContext::from_pool(db.pool().clone());
    run_discovery(&ctx, &MockIdentitySource).await.unwrap();
    run_risk_evaluation(&ctx).await.unwrap();
    generate_campaign(&ctx).await.unwrap();
    (db, ctx)
}

#[tokio::test]
async fn test_empty_ledger_is_an_integrity_failure() {
    let db = Database::in_memory().await.unwrap();
    let ctx = GovernanceContext::from_pool(db.pool().clone());
    let out = TempDir::new().unwrap();

    let result = run_export(&ctx, out.path()).await;
    assert!(matches!(result, Err(ExportError::EmptyLedger)));

    // Nothing was written
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_export_covers_full_ledger_with_status_counts() {
    let (db, ctx) = seeded_ctx().await;

    // Decide one review so the counts have more than one bucket
    let pending: (String,) =
        sqlx::query_as("SELECT review_id FROM access_reviews WHERE status = 'PENDING' LIMIT 1")
            .fetch_one(db.pool())
            .await
            .unwrap();
    decide_review(&ctx, &pending.0, ReviewDecision::Revoke, Some("unused"))
        .await
        .unwrap();

    let artifact = build_export(db.pool()).await.unwrap();

    assert_eq!(artifact.records.len(), 3);
    assert_eq!(artifact.status_counts.get("PENDING"), Some(&2));
    assert_eq!(artifact.status_counts.get("REVOKED"), Some(&1));
    assert!(artifact.csv.contains("alice@example.com"));
    assert!(artifact.json.contains("AdministratorAccess"));
}

#[tokio::test]
async fn test_identical_ledgers_produce_identical_hashes() {
    let (db, _ctx) = seeded_ctx().await;

    let first = build_export(db.pool()).await.unwrap();
    let second = build_export(db.pool()).await.unwrap();

    assert_eq!(first.csv_sha256, second.csv_sha256);
    assert_eq!(first.json_sha256, second.json_sha256);
}

#[tokio::test]
async fn test_written_files_match_recorded_hashes() {
    use sha2::{Digest, Sha256};

    let (_db, ctx) = seeded_ctx().await;
    let out = TempDir::new().unwrap();

    let (artifact, paths) = run_export(&ctx, out.path()).await.unwrap();

    let csv_bytes = std::fs::read(&paths.csv_path).unwrap();
    let json_bytes = std::fs::read(&paths.json_path).unwrap();

    assert_eq!(hex::encode(Sha256::digest(&csv_bytes)), artifact.csv_sha256);
    assert_eq!(hex::encode(Sha256::digest(&json_bytes)), artifact.json_sha256);

    // Two files per run date, tabular + structured
    assert!(paths.csv_path.file_name().unwrap().to_str().unwrap().ends_with(".csv"));
    assert!(paths.json_path.file_name().unwrap().to_str().unwrap().ends_with(".json"));
}
