//! Export command

use anyhow::Result;
use std::path::Path;

use accessgov_governance::GovernanceContext;
use accessgov_reports::run_export;

use crate::db;

/// Build and write the checksummed certification artifacts
pub async fn export(db_path: &Path, output_dir: &Path) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = GovernanceContext::new(&database);

    let (artifact, paths) = run_export(&ctx, output_dir).await?;

    println!("✅ Export complete: {} records", artifact.records.len());
    for (status, count) in &artifact.status_counts {
        println!("   {:<10} {}", format!("{}:", status), count);
    }
    println!("   CSV:  {} (sha256 {})", paths.csv_path.display(), artifact.csv_sha256);
    println!("   JSON: {} (sha256 {})", paths.json_path.display(), artifact.json_sha256);
    Ok(())
}
