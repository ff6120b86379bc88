//! Identity discovery pass
//!
//! Pulls `(principal, entitlements)` tuples from an identity source and
//! records them idempotently: duplicate principals, entitlements, and grants
//! are no-ops. The engine does not care how the tuples are produced; the
//! source is a boundary trait with a mock and a JSON-fixture implementation
//! for offline use.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use accessgov_core::{AuditEvent, AuditLevel, Principal};
use accessgov_persistence::{EntitlementRepo, GrantRepo, PrincipalRepo};

use crate::context::GovernanceContext;
use crate::error::{GovernanceError, GovernanceResult};

const ACTION: &str = "discover_identities";

/// Bound on one source enumeration
const DISCOVERY_TIMEOUT_MS: u64 = 30_000;

/// Error from an identity source
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Identity source error: {0}")]
    Source(String),

    #[error("Fixture IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fixture parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One entitlement as observed on an identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredEntitlement {
    pub entitlement_id: String,
    pub display_name: String,
}

/// One identity with its currently attached entitlements
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredIdentity {
    pub principal_id: String,
    pub display_name: String,
    pub reference: String,
    pub discovered_at: DateTime<Utc>,
    pub entitlements: Vec<DiscoveredEntitlement>,
}

/// Ingestion boundary: anything that can enumerate identities
#[async_trait]
pub trait IdentitySource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &str;

    async fn identities(&self) -> Result<Vec<DiscoveredIdentity>, DiscoveryError>;
}

/// Static seed data for offline demos
pub struct MockIdentitySource;

#[async_trait]
impl IdentitySource for MockIdentitySource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn identities(&self) -> Result<Vec<DiscoveredIdentity>, DiscoveryError> {
        Ok(vec![
            DiscoveredIdentity {
                principal_id: "MOCK-USER-1".to_string(),
                display_name: "alice@example.com".to_string(),
                reference: "arn:aws:iam::123456789012:user/alice".to_string(),
                discovered_at: Utc::now(),
                entitlements: vec![
                    DiscoveredEntitlement {
                        entitlement_id: "arn:aws:iam::aws:policy/ReadOnlyAccess".to_string(),
                        display_name: "ReadOnlyAccess".to_string(),
                    },
                    DiscoveredEntitlement {
                        entitlement_id: "arn:aws:iam::aws:policy/PowerUserAccess".to_string(),
                        display_name: "PowerUserAccess".to_string(),
                    },
                ],
            },
            DiscoveredIdentity {
                principal_id: "MOCK-USER-2".to_string(),
                display_name: "bob@example.com".to_string(),
                reference: "arn:aws:iam::123456789012:user/bob".to_string(),
                discovered_at: Utc::now(),
                entitlements: vec![DiscoveredEntitlement {
                    entitlement_id: "arn:aws:iam::aws:policy/AdministratorAccess".to_string(),
                    display_name: "AdministratorAccess".to_string(),
                }],
            },
        ])
    }
}

/// Identity source backed by a JSON fixture file
pub struct FixtureIdentitySource {
    path: PathBuf,
}

impl FixtureIdentitySource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl IdentitySource for FixtureIdentitySource {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn identities(&self) -> Result<Vec<DiscoveredIdentity>, DiscoveryError> {
        let content = tokio::fs::read_to_string(&self.path).await?;
        let identities: Vec<DiscoveredIdentity> = serde_json::from_str(&content)?;
        Ok(identities)
    }
}

/// Outcome of one discovery pass
#[derive(Debug, Clone, Default)]
pub struct DiscoverySummary {
    pub principals_processed: usize,
    pub grants_linked: usize,
    pub failed: usize,
}

/// Run one discovery pass against the given source.
///
/// A failure on one identity is audited and skipped; a failure of the source
/// itself (or its timeout) aborts the pass with a typed error.
pub async fn run_discovery(
    ctx: &GovernanceContext,
    source: &dyn IdentitySource,
) -> GovernanceResult<DiscoverySummary> {
    ctx.audit()
        .record(
            AuditEvent::new(ACTION, "start", "Starting identity discovery")
                .with_details(json!({ "source": source.name() })),
        )
        .await;

    let identities = match timeout(
        Duration::from_millis(DISCOVERY_TIMEOUT_MS),
        source.identities(),
    )
    .await
    {
        Ok(Ok(identities)) => identities,
        Ok(Err(err)) => {
            ctx.audit()
                .record(
                    AuditEvent::new(ACTION, "error", &format!("Identity source failed: {}", err))
                        .with_level(AuditLevel::Error),
                )
                .await;
            return Err(GovernanceError::IdentitySource(err.to_string()));
        }
        Err(_) => {
            ctx.audit()
                .record(
                    AuditEvent::new(ACTION, "error", "Identity source timed out")
                        .with_level(AuditLevel::Error),
                )
                .await;
            return Err(GovernanceError::IdentitySourceTimeout(DISCOVERY_TIMEOUT_MS));
        }
    };

    let mut summary = DiscoverySummary::default();

    for identity in &identities {
        match record_identity(ctx, identity).await {
            Ok(linked) => {
                summary.principals_processed += 1;
                summary.grants_linked += linked;
            }
            Err(err) => {
                summary.failed += 1;
                ctx.audit()
                    .record(
                        AuditEvent::new(
                            ACTION,
                            "error",
                            &format!(
                                "Error processing identity {}: {}",
                                identity.display_name, err
                            ),
                        )
                        .with_level(AuditLevel::Error)
                        .with_entity("principal", &identity.principal_id),
                    )
                    .await;
            }
        }
    }

    ctx.audit()
        .record(
            AuditEvent::new(
                ACTION,
                "success",
                &format!("Discovery complete ({})", source.name()),
            )
            .with_details(json!({
                "principals_processed": summary.principals_processed,
                "grants_linked": summary.grants_linked,
                "failed": summary.failed,
            })),
        )
        .await;

    Ok(summary)
}

async fn record_identity(
    ctx: &GovernanceContext,
    identity: &DiscoveredIdentity,
) -> GovernanceResult<usize> {
    let principal = Principal::new(
        &identity.principal_id,
        &identity.display_name,
        &identity.reference,
    )
    .with_discovered_at(identity.discovered_at);

    PrincipalRepo::upsert(ctx.pool(), &principal).await?;

    let mut linked = 0usize;
    for entitlement in &identity.entitlements {
        EntitlementRepo::upsert(
            ctx.pool(),
            &entitlement.entitlement_id,
            &entitlement.display_name,
        )
        .await?;
        if GrantRepo::link(ctx.pool(), &identity.principal_id, &entitlement.entitlement_id).await? {
            linked += 1;
        }
    }
    Ok(linked)
}
