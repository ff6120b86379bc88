//! Accessgov CLI - governance batch passes from the command line
//!
//! Usage:
//! ```bash
//! accessgov init
//! accessgov discover --mock
//! accessgov classify
//! accessgov generate
//! accessgov decide <REVIEW_ID> revoke --comment "unused access"
//! accessgov remediate --mock-revoker
//! accessgov explain
//! accessgov export --output-dir reports
//! accessgov status
//! ```
//!
//! Each subcommand is one independently schedulable pass; passes share only
//! the SQLite store, so overlapping schedules are safe.

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use accessgov_core::ReviewDecision;

mod commands;
mod db;

use commands::{campaign, identity, remediate, report};

/// Accessgov - access certification and remediation for cloud identities
#[derive(Parser)]
#[command(name = "accessgov")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Database file path
    #[arg(long, default_value = "data/accessgov.db", global = true)]
    pub db: PathBuf,

    /// Remediation policy JSON file (env vars override its values)
    #[arg(long, global = true)]
    pub policy: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database schema
    Init {
        /// Force re-initialization (drops existing data)
        #[arg(long)]
        force: bool,
    },

    /// Show database status
    Status,

    /// Ingest identities and grants from an identity source
    Discover {
        /// Use the built-in static mock source
        #[arg(long)]
        mock: bool,
        /// Read identities from a JSON fixture file
        #[arg(long, conflicts_with = "mock")]
        fixture: Option<PathBuf>,
    },

    /// Re-classify entitlement risk tiers
    Classify,

    /// Generate a review campaign over the current grant set
    Generate,

    /// Decide a pending review
    Decide {
        /// Review ID
        review_id: String,
        /// Outcome
        decision: DecisionArg,
        /// Reviewer comment
        #[arg(long, short)]
        comment: Option<String>,
    },

    /// Scan REVOKED reviews and remediate through the safety gate
    Remediate {
        /// Route revoke calls to the recording mock backend
        #[arg(long)]
        mock_revoker: bool,
    },

    /// Fill risk explanations for HIGH-tier reviews
    Explain,

    /// Build and write the checksummed certification artifacts
    Export {
        /// Output directory
        #[arg(long, short, default_value = "reports")]
        output_dir: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum DecisionArg {
    Approve,
    Revoke,
}

impl DecisionArg {
    pub fn to_core_decision(self) -> ReviewDecision {
        match self {
            DecisionArg::Approve => ReviewDecision::Approve,
            DecisionArg::Revoke => ReviewDecision::Revoke,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    // Ensure the data directory exists
    if let Some(parent) = cli.db.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    match cli.command {
        Commands::Init { force } => {
            db::init_database(&cli.db, force).await?;
            println!("✅ Database initialized at {:?}", cli.db);
        }

        Commands::Status => {
            db::show_status(&cli.db).await?;
        }

        Commands::Discover { mock, fixture } => {
            identity::discover(&cli.db, mock, fixture).await?;
        }

        Commands::Classify => {
            campaign::classify(&cli.db).await?;
        }

        Commands::Generate => {
            campaign::generate(&cli.db).await?;
        }

        Commands::Decide {
            review_id,
            decision,
            comment,
        } => {
            campaign::decide(&cli.db, &review_id, decision, comment.as_deref()).await?;
        }

        Commands::Remediate { mock_revoker } => {
            remediate::run(&cli.db, cli.policy.as_deref(), mock_revoker).await?;
        }

        Commands::Explain => {
            campaign::explain(&cli.db).await?;
        }

        Commands::Export { output_dir } => {
            report::export(&cli.db, &output_dir).await?;
        }
    }

    Ok(())
}
