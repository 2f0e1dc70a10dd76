//! Error types for ingestion.

use std::path::PathBuf;

use folio_storage::StorageError;

/// Error that aborts an ingestion pass.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Listing, reading or writing failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    /// A listed file was not under the folder being scanned.
    #[error("File outside staging folder: {}", .0.display())]
    OutsideStaging(PathBuf),
}

/// A script's leading import block cannot be rewritten.
///
/// Scoped to one script: the caller skips it and carries on with the batch.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    /// Import statement without a quoted module path.
    #[error("Import on line {line} has no quoted module path")]
    MissingQuote { line: usize },
    /// Module path is neither `global/...` nor `./...`.
    #[error("Import on line {line} uses unsupported module path: {path}")]
    UnsupportedPath { line: usize, path: String },
}
