//! Staging-folder ingestion for the folio content engine.
//!
//! Authors drop HTML documents, script modules and media into staging folders.
//! The [`Ingester`] classifies each staged document as an update or a deletion,
//! rewrites media links and script imports to canonical public paths, extracts
//! script dependencies, and migrates everything into canonical storage.
//!
//! # Architecture
//!
//! - [`paths`]: case normalization and path helpers
//! - [`rewriter`]: substring-based link, import and body/style rewriting
//! - [`Layout`] / [`Limits`]: canonical folder names and size ceilings
//! - [`Ingested`] / [`CoreBundle`] / [`Ingestion`]: what a pass produced
//! - [`Ingester`] / [`MigrationPlan`]: classify everything, then commit
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use folio_ingest::{Ingester, Layout, Limits};
//! use folio_storage_fs::FsStorage;
//!
//! let ingester = Ingester::new(
//!     Arc::new(FsStorage::new()),
//!     Layout::new("content", "blog"),
//!     Limits::default(),
//! );
//! let ingestion = ingester.ingest()?;
//! println!("{} documents changed", ingestion.records.len());
//! ```

mod error;
mod ingested;
mod layout;
pub mod paths;
mod pipeline;
pub mod rewriter;

pub use error::{IngestError, RewriteError};
pub use ingested::{CoreBundle, Ingested, Ingestion};
pub use layout::{
    CORE_DIR, CORE_STAGING_DIR, CoreDoc, DOCS_DIR, DocumentFiles, GLOBALS_DIR, Layout, Limits,
    MEDIA_DIR, SCRIPTS_DIR, STAGING_DIR,
};
pub use pipeline::{Ingester, MigrationPlan};
