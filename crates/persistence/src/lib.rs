//! # Accessgov Persistence
//!
//! SQLite persistence for the governance engine: schema migrations, typed
//! row structs, and repositories. The relational store is the only shared
//! mutable resource between the batch passes, so the invariants the passes
//! rely on (open-review uniqueness, exactly-once finalization) are enforced
//! here with constraints and guarded statements, not just application checks.

pub mod error;
pub mod repos;
pub mod schema;

pub use error::{PersistenceError, PersistenceResult};
pub use repos::{
    AuditLogRepo, CampaignRepo, EntitlementRepo, GrantRepo, PrincipalRepo, ReviewRepo,
};
pub use schema::{
    AuditLogRow, CampaignRow, EntitlementRow, ExportRow, GrantWithRiskRow, PrincipalRow,
    RevocationCandidateRow, ReviewContextRow, ReviewRow,
};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

/// Schema version this build expects; consulted at startup
pub const SCHEMA_VERSION: &str = "2026-03-phase1";

/// Connect to an existing database
pub async fn create_pool(database_url: &str) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?.foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    Ok(pool)
}

/// Apply pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> PersistenceResult<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Create the database file if missing and bring the schema up to date
pub async fn init_database(database_url: &str) -> PersistenceResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    run_migrations(&pool).await?;
    Ok(pool)
}

/// Check the single-row schema marker against this build's expectation
pub async fn verify_schema_version(pool: &SqlitePool) -> PersistenceResult<()> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT version FROM schema_version ORDER BY applied_at DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    match row {
        None => Err(PersistenceError::SchemaVersionMissing),
        Some((found,)) if found != SCHEMA_VERSION => {
            Err(PersistenceError::SchemaVersionMismatch {
                expected: SCHEMA_VERSION.to_string(),
                found,
            })
        }
        Some(_) => Ok(()),
    }
}

/// Database facade - owns the connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to an existing, migrated database
    pub async fn connect(database_url: &str) -> PersistenceResult<Self> {
        let pool = create_pool(database_url).await?;
        Ok(Self { pool })
    }

    /// Create/migrate and connect
    pub async fn init(database_url: &str) -> PersistenceResult<Self> {
        let pool = init_database(database_url).await?;
        Ok(Self { pool })
    }

    /// In-memory database for tests. The pool is pinned to one connection so
    /// every query sees the same memory database.
    pub async fn in_memory() -> PersistenceResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;
        run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
