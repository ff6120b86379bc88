//! Export integrity builder
//!
//! Reads the full review ledger (joined with principal/entitlement names,
//! newest first) and produces two equivalent serializations plus their
//! SHA-256 hashes. An empty ledger is an integrity failure, not a valid
//! export: nothing is written and the error propagates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

use accessgov_core::{AuditEvent, AuditLevel};
use accessgov_governance::GovernanceContext;
use accessgov_persistence::{ExportRow, PersistenceError, ReviewRepo};

const ACTION: &str = "export_audit";

const CSV_HEADERS: [&str; 11] = [
    "Review ID",
    "Campaign ID",
    "Principal",
    "Entitlement",
    "Risk Tier",
    "Status",
    "Decision Comment",
    "Created At",
    "Decided At",
    "Remediated At",
    "Risk Explanation",
];

/// Errors from the export builder
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No access review records to export (blocking empty artifact)")]
    EmptyLedger,

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Artifact IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Artifact serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One ledger row, rendered once so both serializations and their hashes are
/// reproducible for identical input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportRecord {
    pub review_id: String,
    pub campaign_id: String,
    pub principal: String,
    pub entitlement: String,
    pub risk_tier: String,
    pub status: String,
    pub decision_comment: Option<String>,
    pub created_at: String,
    pub decided_at: Option<String>,
    pub remediated_at: Option<String>,
    pub risk_explanation: Option<String>,
}

impl From<ExportRow> for ExportRecord {
    fn from(row: ExportRow) -> Self {
        Self {
            review_id: row.review_id,
            campaign_id: row.campaign_id,
            principal: row.principal_name,
            entitlement: row.entitlement_name,
            risk_tier: row.risk_tier,
            status: row.status,
            decision_comment: row.decision_comment,
            created_at: row.created_at.to_rfc3339(),
            decided_at: row.decided_at.map(|ts| ts.to_rfc3339()),
            remediated_at: row.remediated_at.map(|ts| ts.to_rfc3339()),
            risk_explanation: row.risk_explanation,
        }
    }
}

/// A built, hashed export ready to be written or shipped
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub generated_at: DateTime<Utc>,
    pub records: Vec<ExportRecord>,
    pub status_counts: BTreeMap<String, usize>,
    pub csv: String,
    pub json: String,
    pub csv_sha256: String,
    pub json_sha256: String,
}

/// Where one artifact pair landed on disk
#[derive(Debug, Clone)]
pub struct ExportPaths {
    pub csv_path: PathBuf,
    pub json_path: PathBuf,
}

/// Build the export artifact from the full review ledger.
pub async fn build_export(pool: &SqlitePool) -> Result<ExportArtifact, ExportError> {
    let rows = ReviewRepo::fetch_export_rows(pool).await?;
    if rows.is_empty() {
        return Err(ExportError::EmptyLedger);
    }

    let records: Vec<ExportRecord> = rows.into_iter().map(ExportRecord::from).collect();

    let mut status_counts: BTreeMap<String, usize> = BTreeMap::new();
    for record in &records {
        *status_counts.entry(record.status.clone()).or_insert(0) += 1;
    }

    let csv = to_csv(&records);
    let json = serde_json::to_string_pretty(&records)?;

    let csv_sha256 = sha256_hex(csv.as_bytes());
    let json_sha256 = sha256_hex(json.as_bytes());

    Ok(ExportArtifact {
        generated_at: Utc::now(),
        records,
        status_counts,
        csv,
        json,
        csv_sha256,
        json_sha256,
    })
}

impl ExportArtifact {
    /// Write both serializations under `dir`, named by run date.
    pub fn write_files(&self, dir: &Path) -> Result<ExportPaths, ExportError> {
        std::fs::create_dir_all(dir)?;
        let date_part = self.generated_at.format("%Y-%m-%d");

        let csv_path = dir.join(format!("access_certification_{}.csv", date_part));
        let json_path = dir.join(format!("access_certification_{}.json", date_part));

        std::fs::write(&csv_path, &self.csv)?;
        std::fs::write(&json_path, &self.json)?;

        Ok(ExportPaths { csv_path, json_path })
    }
}

/// Build the artifact, write both files, and record the audited hashes.
///
/// An empty ledger (or any write failure) is fatal for the run: the error is
/// audited and propagated, and no partial artifact is published.
pub async fn run_export(
    ctx: &GovernanceContext,
    output_dir: &Path,
) -> Result<(ExportArtifact, ExportPaths), ExportError> {
    ctx.audit()
        .record(AuditEvent::new(ACTION, "start", "Generating audit artifacts"))
        .await;

    let result = async {
        let artifact = build_export(ctx.pool()).await?;
        let paths = artifact.write_files(output_dir)?;
        Ok::<_, ExportError>((artifact, paths))
    }
    .await;

    match result {
        Ok((artifact, paths)) => {
            ctx.audit()
                .record(
                    AuditEvent::new(ACTION, "success", "Audit artifacts generated.").with_details(
                        json!({
                            "records": artifact.records.len(),
                            "status_counts": artifact.status_counts,
                            "csv_path": paths.csv_path.display().to_string(),
                            "json_path": paths.json_path.display().to_string(),
                            "csv_sha256": artifact.csv_sha256,
                            "json_sha256": artifact.json_sha256,
                        }),
                    ),
                )
                .await;
            Ok((artifact, paths))
        }
        Err(err) => {
            ctx.audit()
                .record(
                    AuditEvent::new(
                        ACTION,
                        "error",
                        &format!("Error generating audit report: {}", err),
                    )
                    .with_level(AuditLevel::Error),
                )
                .await;
            Err(err)
        }
    }
}

fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn to_csv(records: &[ExportRecord]) -> String {
    let mut output = String::new();
    output.push_str(&CSV_HEADERS.join(","));
    output.push('\n');

    for record in records {
        let fields = [
            record.review_id.as_str(),
            record.campaign_id.as_str(),
            record.principal.as_str(),
            record.entitlement.as_str(),
            record.risk_tier.as_str(),
            record.status.as_str(),
            record.decision_comment.as_deref().unwrap_or(""),
            record.created_at.as_str(),
            record.decided_at.as_deref().unwrap_or(""),
            record.remediated_at.as_deref().unwrap_or(""),
            record.risk_explanation.as_deref().unwrap_or(""),
        ];
        let escaped: Vec<String> = fields.iter().map(|field| escape_csv_field(field)).collect();
        output.push_str(&escaped.join(","));
        output.push('\n');
    }

    output
}

fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record(id: &str, status: &str) -> ExportRecord {
        ExportRecord {
            review_id: id.to_string(),
            campaign_id: "CAMP-1".to_string(),
            principal: "alice@example.com".to_string(),
            entitlement: "ReadOnlyAccess".to_string(),
            risk_tier: "LOW".to_string(),
            status: status.to_string(),
            decision_comment: None,
            created_at: "2026-03-01T10:00:00+00:00".to_string(),
            decided_at: None,
            remediated_at: None,
            risk_explanation: None,
        }
    }

    #[test]
    fn test_csv_has_header_and_rows() {
        let records = vec![sample_record("R1", "PENDING"), sample_record("R2", "APPROVED")];
        let csv = to_csv(&records);

        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADERS.join(","));
        assert!(csv.contains("R1"));
        assert!(csv.contains("R2"));
        assert_eq!(csv.lines().count(), 3);
    }

    #[test]
    fn test_csv_escapes_special_characters() {
        let mut record = sample_record("R1", "REVOKED");
        record.decision_comment = Some("contractor, left \"on bad terms\"".to_string());
        let csv = to_csv(&[record]);

        assert!(csv.contains("\"contractor, left \"\"on bad terms\"\"\""));
    }

    #[test]
    fn test_identical_records_hash_identically() {
        let records = vec![sample_record("R1", "PENDING")];
        let csv_a = to_csv(&records);
        let csv_b = to_csv(&records);
        assert_eq!(sha256_hex(csv_a.as_bytes()), sha256_hex(csv_b.as_bytes()));

        let json_a = serde_json::to_string_pretty(&records).unwrap();
        let json_b = serde_json::to_string_pretty(&records).unwrap();
        assert_eq!(sha256_hex(json_a.as_bytes()), sha256_hex(json_b.as_bytes()));
    }
}
