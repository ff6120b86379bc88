//! Database initialization and status

use anyhow::{Context, Result};
use std::path::Path;

use accessgov_core::{AuditEvent, ReviewStatus};
use accessgov_persistence::{
    verify_schema_version, AuditLogRepo, Database, EntitlementRepo, GrantRepo, PrincipalRepo,
    ReviewRepo,
};

fn db_url(db_path: &Path) -> String {
    format!("sqlite:{}", db_path.display())
}

/// Initialize the database with schema migrations
pub async fn init_database(db_path: &Path, force: bool) -> Result<()> {
    if force && db_path.exists() {
        std::fs::remove_file(db_path).context("Failed to remove existing database")?;
        println!("🗑️  Removed existing database");
    }

    let db = Database::init(&db_url(db_path))
        .await
        .context("Failed to initialize database")?;
    verify_schema_version(db.pool()).await?;
    Ok(())
}

/// Connect to an existing database, checking the schema marker first
pub async fn connect(db_path: &Path) -> Result<Database> {
    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {:?}. Run 'accessgov init' first.",
            db_path
        );
    }

    let db = Database::connect(&db_url(db_path))
        .await
        .context("Failed to connect to database")?;
    verify_schema_version(db.pool())
        .await
        .context("Schema check failed")?;
    Ok(db)
}

/// Show database status
pub async fn show_status(db_path: &Path) -> Result<()> {
    if !db_path.exists() {
        println!("❌ Database not found at {:?}", db_path);
        println!("   Run 'accessgov init' to create the database");
        return Ok(());
    }

    let db = connect(db_path).await?;
    let pool = db.pool();

    println!("📊 Database Status");
    println!("   Path: {:?}", db_path);
    println!();
    println!("   Principals:   {}", PrincipalRepo::count(pool).await?);
    println!("   Entitlements: {}", EntitlementRepo::count(pool).await?);
    println!("   Grants:       {}", GrantRepo::count(pool).await?);
    println!("   Reviews:      {}", ReviewRepo::count(pool).await?);
    for status in [ReviewStatus::Pending, ReviewStatus::Approved, ReviewStatus::Revoked] {
        println!(
            "     {:<10} {}",
            format!("{}:", status),
            ReviewRepo::count_by_status(pool, status).await?
        );
    }
    println!("   Audit logs:   {}", AuditLogRepo::count(pool).await?);

    let recent = AuditLogRepo::recent(pool, 5).await?;
    if !recent.is_empty() {
        println!();
        println!("   Recent activity:");
        for row in recent {
            let event = AuditEvent::try_from(row)?;
            println!(
                "     {} {:<18} {:<10} {}",
                event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                event.action,
                event.status,
                event.message
            );
        }
    }

    Ok(())
}
