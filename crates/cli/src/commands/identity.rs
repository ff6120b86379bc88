//! Identity discovery command

use anyhow::Result;
use std::path::{Path, PathBuf};

use accessgov_governance::{
    run_discovery, FixtureIdentitySource, GovernanceContext, IdentitySource, MockIdentitySource,
};

use crate::db;

/// Run one discovery pass against the selected source
pub async fn discover(db_path: &Path, mock: bool, fixture: Option<PathBuf>) -> Result<()> {
    let database = db::connect(db_path).await?;
    let ctx = GovernanceContext::new(&database);

    let source: Box<dyn IdentitySource> = match (mock, fixture) {
        (_, Some(path)) => Box::new(FixtureIdentitySource::new(path)),
        (true, None) => Box::new(MockIdentitySource),
        (false, None) => {
            anyhow::bail!(
                "No identity source configured. Use --mock or --fixture <path>; \
                 a live identity-provider client is wired in at deployment."
            );
        }
    };

    let summary = run_discovery(&ctx, source.as_ref()).await?;
    println!(
        "✅ Discovery complete: {} principals, {} new grants, {} failed",
        summary.principals_processed, summary.grants_linked, summary.failed
    );
    Ok(())
}
