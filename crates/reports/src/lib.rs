//! # Accessgov Reports
//!
//! Materializes the review ledger into checksummed compliance artifacts:
//! one tabular (CSV) and one structured (JSON) serialization of the same
//! row set, each content-addressed with a SHA-256 hash so downstream
//! consumers can verify integrity independently of transport.

pub mod export;

pub use export::{
    build_export, run_export, ExportArtifact, ExportError, ExportPaths, ExportRecord,
};
