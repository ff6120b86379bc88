//! Audit recorder
//!
//! Appends one immutable `audit_logs` row per governance action. Recording is
//! best-effort from the caller's point of view: a failed write is reported on
//! the tracing fallback channel and never raised into governance logic.

use sqlx::SqlitePool;

use accessgov_core::{AuditEvent, AuditLevel};
use accessgov_persistence::AuditLogRepo;

/// Append-only recorder over the audit_logs table
pub struct AuditRecorder {
    pool: SqlitePool,
}

impl AuditRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one entry. Failures go to the tracing fallback channel.
    pub async fn record(&self, event: AuditEvent) {
        match event.level {
            AuditLevel::Error => tracing::error!(
                action = %event.action,
                status = %event.status,
                "{}",
                event.message
            ),
            AuditLevel::Warn => tracing::warn!(
                action = %event.action,
                status = %event.status,
                "{}",
                event.message
            ),
            _ => tracing::info!(
                action = %event.action,
                status = %event.status,
                "{}",
                event.message
            ),
        }

        if let Err(err) = AuditLogRepo::insert(&self.pool, &event).await {
            // Fallback channel only; the governance pass must not fail here
            tracing::error!(
                action = %event.action,
                log_id = %event.log_id,
                error = %err,
                "audit log write failed; entry preserved in process log only"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use accessgov_persistence::Database;

    #[tokio::test]
    async fn test_record_appends_row() {
        let db = Database::in_memory().await.unwrap();
        let recorder = AuditRecorder::new(db.pool().clone());

        recorder
            .record(AuditEvent::new("evaluate_risk", "start", "Starting risk evaluation"))
            .await;

        assert_eq!(AuditLogRepo::count(db.pool()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_record_survives_closed_pool() {
        let db = Database::in_memory().await.unwrap();
        let recorder = AuditRecorder::new(db.pool().clone());
        db.pool().close().await;

        // Must not panic or surface an error
        recorder
            .record(AuditEvent::new("evaluate_risk", "start", "Writing into the void"))
            .await;
    }
}
