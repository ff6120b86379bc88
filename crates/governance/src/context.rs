//! Shared context for the governance passes

use sqlx::SqlitePool;

use accessgov_persistence::Database;

use crate::audit::AuditRecorder;

/// Context for governance passes - database access plus the audit recorder
pub struct GovernanceContext {
    pool: SqlitePool,
    audit: AuditRecorder,
}

impl GovernanceContext {
    /// Create a new context from a connected database
    pub fn new(db: &Database) -> Self {
        Self::from_pool(db.pool().clone())
    }

    /// Create from a pool directly
    pub fn from_pool(pool: SqlitePool) -> Self {
        let audit = AuditRecorder::new(pool.clone());
        Self { pool, audit }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn audit(&self) -> &AuditRecorder {
        &self.audit
    }
}
