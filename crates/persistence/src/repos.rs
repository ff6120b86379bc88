//! Repository implementations for SQLite
//!
//! Write methods are generic over the executor so passes that need atomicity
//! can run them inside one transaction; reads take the pool directly.
//! Inserts for ingestion-owned tables are idempotent (`ON CONFLICT DO
//! NOTHING`), and guarded UPDATEs report whether they changed a row so
//! callers can enforce exactly-once semantics.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool};

use accessgov_core::{AuditEvent, Campaign, Principal, Review, ReviewStatus, RiskTier};

use crate::error::{PersistenceError, PersistenceResult};
use crate::schema::*;

// ============================================================================
// Principal Repository
// ============================================================================

/// Repository for the principals table
pub struct PrincipalRepo;

impl PrincipalRepo {
    /// Idempotent insert; returns true if a new row was created
    pub async fn upsert<'e, E>(executor: E, principal: &Principal) -> PersistenceResult<bool>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO principals (principal_id, display_name, reference, discovered_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(principal_id) DO NOTHING",
        )
        .bind(&principal.principal_id)
        .bind(&principal.display_name)
        .bind(&principal.reference)
        .bind(principal.discovered_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> PersistenceResult<PrincipalRow> {
        sqlx::query_as::<_, PrincipalRow>("SELECT * FROM principals WHERE principal_id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Principal", id))
    }

    pub async fn count(pool: &SqlitePool) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM principals")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Entitlement Repository
// ============================================================================

/// Repository for the entitlements table
pub struct EntitlementRepo;

impl EntitlementRepo {
    /// Idempotent insert with the default LOW tier; returns true if created
    pub async fn upsert<'e, E>(
        executor: E,
        entitlement_id: &str,
        display_name: &str,
    ) -> PersistenceResult<bool>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO entitlements (entitlement_id, display_name, risk_tier)
             VALUES (?, ?, 'LOW')
             ON CONFLICT(entitlement_id) DO NOTHING",
        )
        .bind(entitlement_id)
        .bind(display_name)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> PersistenceResult<EntitlementRow> {
        sqlx::query_as::<_, EntitlementRow>(
            "SELECT * FROM entitlements WHERE entitlement_id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| PersistenceError::not_found("Entitlement", id))
    }

    pub async fn list_all(pool: &SqlitePool) -> PersistenceResult<Vec<EntitlementRow>> {
        let rows = sqlx::query_as::<_, EntitlementRow>(
            "SELECT * FROM entitlements ORDER BY entitlement_id",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Set the classified tier; the classification pass is the only caller
    pub async fn update_risk_tier(
        pool: &SqlitePool,
        id: &str,
        risk_tier: RiskTier,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE entitlements SET risk_tier = ? WHERE entitlement_id = ?",
        )
        .bind(risk_tier.as_str())
        .bind(id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Entitlement", id));
        }
        Ok(())
    }

    pub async fn count(pool: &SqlitePool) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM entitlements")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Grant Repository
// ============================================================================

/// Repository for the grants table
pub struct GrantRepo;

impl GrantRepo {
    /// Idempotent link; duplicate grants are no-ops
    pub async fn link<'e, E>(
        executor: E,
        principal_id: &str,
        entitlement_id: &str,
    ) -> PersistenceResult<bool>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT INTO grants (principal_id, entitlement_id)
             VALUES (?, ?)
             ON CONFLICT(principal_id, entitlement_id) DO NOTHING",
        )
        .bind(principal_id)
        .bind(entitlement_id)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All current grants joined with their entitlement's risk tier
    pub async fn list_with_risk(pool: &SqlitePool) -> PersistenceResult<Vec<GrantWithRiskRow>> {
        let rows = sqlx::query_as::<_, GrantWithRiskRow>(
            "SELECT g.principal_id, g.entitlement_id, e.risk_tier
             FROM grants g
             JOIN entitlements e ON g.entitlement_id = e.entitlement_id
             ORDER BY g.principal_id, g.entitlement_id",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn count(pool: &SqlitePool) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM grants")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Campaign Repository
// ============================================================================

/// Repository for the campaigns table
pub struct CampaignRepo;

impl CampaignRepo {
    pub async fn insert<'e, E>(executor: E, campaign: &Campaign) -> PersistenceResult<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO campaigns (campaign_id, name, created_at) VALUES (?, ?, ?)",
        )
        .bind(&campaign.campaign_id)
        .bind(&campaign.name)
        .bind(campaign.created_at)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> PersistenceResult<CampaignRow> {
        sqlx::query_as::<_, CampaignRow>("SELECT * FROM campaigns WHERE campaign_id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Campaign", id))
    }
}

// ============================================================================
// Review Repository
// ============================================================================

/// Repository for the access_reviews table
pub struct ReviewRepo;

impl ReviewRepo {
    /// Insert a new PENDING review. Returns true if the row was created;
    /// false if the partial unique index on open reviews swallowed it
    /// (another pass already holds a PENDING review for this grant).
    pub async fn insert_pending<'e, E>(executor: E, review: &Review) -> PersistenceResult<bool>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO access_reviews
             (review_id, campaign_id, principal_id, entitlement_id, status, created_at)
             VALUES (?, ?, ?, ?, 'PENDING', ?)",
        )
        .bind(&review.review_id)
        .bind(&review.campaign_id)
        .bind(&review.principal_id)
        .bind(&review.entitlement_id)
        .bind(review.created_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn get_by_id(pool: &SqlitePool, id: &str) -> PersistenceResult<ReviewRow> {
        sqlx::query_as::<_, ReviewRow>("SELECT * FROM access_reviews WHERE review_id = ?")
            .bind(id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| PersistenceError::not_found("Review", id))
    }

    /// Apply a decision, guarded so only a PENDING review can transition.
    /// Returns true if the row transitioned; false means the review was not
    /// PENDING (or does not exist) and the caller must surface the violation.
    pub async fn decide(
        pool: &SqlitePool,
        review_id: &str,
        status: ReviewStatus,
        decided_at: DateTime<Utc>,
        comment: Option<&str>,
    ) -> PersistenceResult<bool> {
        let result = sqlx::query(
            "UPDATE access_reviews
             SET status = ?, decided_at = ?, decision_comment = ?
             WHERE review_id = ? AND status = 'PENDING'",
        )
        .bind(status.as_str())
        .bind(decided_at)
        .bind(comment)
        .bind(review_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// REVOKED reviews not yet finalized, oldest first
    pub async fn list_revocation_candidates(
        pool: &SqlitePool,
    ) -> PersistenceResult<Vec<RevocationCandidateRow>> {
        let rows = sqlx::query_as::<_, RevocationCandidateRow>(
            "SELECT r.review_id,
                    p.display_name AS principal_name,
                    p.reference AS principal_reference,
                    e.entitlement_id,
                    e.display_name AS entitlement_name
             FROM access_reviews r
             JOIN principals p ON r.principal_id = p.principal_id
             JOIN entitlements e ON r.entitlement_id = e.entitlement_id
             WHERE r.status = 'REVOKED' AND r.remediated_at IS NULL
             ORDER BY r.created_at ASC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Finalize one review's remediation bookkeeping. Guarded so the
    /// timestamp is set at most once; returns true if this call set it.
    pub async fn mark_remediated(
        pool: &SqlitePool,
        review_id: &str,
        remediated_at: DateTime<Utc>,
    ) -> PersistenceResult<bool> {
        let result = sqlx::query(
            "UPDATE access_reviews
             SET remediated_at = ?
             WHERE review_id = ? AND status = 'REVOKED' AND remediated_at IS NULL",
        )
        .bind(remediated_at)
        .bind(review_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_risk_explanation(
        pool: &SqlitePool,
        review_id: &str,
        explanation: &str,
    ) -> PersistenceResult<()> {
        let result = sqlx::query(
            "UPDATE access_reviews SET risk_explanation = ? WHERE review_id = ?",
        )
        .bind(explanation)
        .bind(review_id)
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PersistenceError::not_found("Review", review_id));
        }
        Ok(())
    }

    /// HIGH-tier reviews still missing a risk explanation
    pub async fn list_high_risk_missing_explanation(
        pool: &SqlitePool,
    ) -> PersistenceResult<Vec<ReviewContextRow>> {
        let rows = sqlx::query_as::<_, ReviewContextRow>(
            "SELECT r.review_id, r.principal_id, r.entitlement_id,
                    p.display_name AS principal_name,
                    e.display_name AS entitlement_name,
                    e.risk_tier
             FROM access_reviews r
             JOIN principals p ON r.principal_id = p.principal_id
             JOIN entitlements e ON r.entitlement_id = e.entitlement_id
             WHERE e.risk_tier = 'HIGH'
               AND (r.risk_explanation IS NULL OR r.risk_explanation = '')
             ORDER BY r.created_at ASC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    /// Full ledger joined with display names, newest first. The review id is
    /// the tiebreaker so identical ledgers always serialize identically.
    pub async fn fetch_export_rows(pool: &SqlitePool) -> PersistenceResult<Vec<ExportRow>> {
        let rows = sqlx::query_as::<_, ExportRow>(
            "SELECT r.review_id, r.campaign_id,
                    p.display_name AS principal_name,
                    e.display_name AS entitlement_name,
                    e.risk_tier,
                    r.status, r.decision_comment, r.created_at, r.decided_at,
                    r.remediated_at, r.risk_explanation
             FROM access_reviews r
             JOIN principals p ON r.principal_id = p.principal_id
             JOIN entitlements e ON r.entitlement_id = e.entitlement_id
             ORDER BY r.created_at DESC, r.review_id DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_by_status(
        pool: &SqlitePool,
        status: ReviewStatus,
    ) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM access_reviews WHERE status = ?",
        )
        .bind(status.as_str())
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    pub async fn count(pool: &SqlitePool) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM access_reviews")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}

// ============================================================================
// Audit Log Repository
// ============================================================================

/// Repository for the append-only audit_logs table
pub struct AuditLogRepo;

impl AuditLogRepo {
    pub async fn insert<'e, E>(executor: E, event: &AuditEvent) -> PersistenceResult<()>
    where
        E: sqlx::Executor<'e, Database = Sqlite>,
    {
        let details = event
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        sqlx::query(
            "INSERT INTO audit_logs
             (log_id, timestamp, level, action, entity_type, entity_id, status, message, details)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&event.log_id)
        .bind(event.timestamp)
        .bind(event.level.as_str())
        .bind(&event.action)
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(&event.status)
        .bind(&event.message)
        .bind(details)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn recent(pool: &SqlitePool, limit: i64) -> PersistenceResult<Vec<AuditLogRow>> {
        let rows = sqlx::query_as::<_, AuditLogRow>(
            "SELECT * FROM audit_logs ORDER BY timestamp DESC, log_id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    pub async fn count(pool: &SqlitePool) -> PersistenceResult<i64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(pool)
            .await?;
        Ok(row.0)
    }
}
