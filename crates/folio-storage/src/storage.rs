//! Storage trait and error types.
//!
//! Provides the core [`Storage`] trait for the filesystem primitives used by
//! ingestion and cache bootstrap, along with [`StorageError`] for unified error
//! handling across backends.
//!
//! # Path Convention
//!
//! All path parameters are absolute (or caller-rooted) filesystem paths. Content
//! rules such as "strip the staging prefix" or "lower-case the key" belong to the
//! callers, not to the backend.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A regular file discovered by [`Storage::list_files`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    /// Full path to the file.
    pub path: PathBuf,
    /// Size in bytes.
    pub len: u64,
    /// Last modification time.
    pub modified: SystemTime,
}

/// Semantic error categories.
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum StorageErrorKind {
    /// Resource does not exist.
    NotFound,
    /// Permission denied.
    PermissionDenied,
    /// File exists but its content is not valid UTF-8 text.
    InvalidData,
    /// Invalid path (e.g. a directory where a file was expected).
    InvalidPath,
    /// Other/unknown error category.
    Other,
}

/// Storage error with semantic kind and backend-specific source.
#[derive(Debug)]
pub struct StorageError {
    /// Semantic error category.
    pub kind: StorageErrorKind,
    /// Path context (if applicable).
    pub path: Option<PathBuf>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl StorageError {
    /// Create a new storage error.
    #[must_use]
    pub fn new(kind: StorageErrorKind) -> Self {
        Self {
            kind,
            path: None,
            source: None,
        }
    }

    /// Attach path context.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Create a storage error from an I/O error.
    #[must_use]
    pub fn io(err: std::io::Error, path: &Path) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::NotFound => StorageErrorKind::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageErrorKind::PermissionDenied,
            std::io::ErrorKind::InvalidData => StorageErrorKind::InvalidData,
            std::io::ErrorKind::NotADirectory | std::io::ErrorKind::IsADirectory => {
                StorageErrorKind::InvalidPath
            }
            _ => StorageErrorKind::Other,
        };
        Self::new(kind).with_path(path).with_source(err)
    }

    /// True if the error only signals that the resource is absent.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind == StorageErrorKind::NotFound
    }

    /// True if the file was read but is not valid UTF-8.
    #[must_use]
    pub fn is_invalid_data(&self) -> bool {
        self.kind == StorageErrorKind::InvalidData
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: "Kind: message (path: /foo/bar)"
        let kind_str = match self.kind {
            StorageErrorKind::NotFound => "Not found",
            StorageErrorKind::PermissionDenied => "Permission denied",
            StorageErrorKind::InvalidData => "Invalid data",
            StorageErrorKind::InvalidPath => "Invalid path",
            StorageErrorKind::Other => "Error",
        };

        write!(f, "{kind_str}")?;

        if let Some(source) = &self.source {
            write!(f, ": {source}")?;
        }

        if let Some(path) = &self.path {
            write!(f, " (path: {})", path.display())?;
        }

        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Filesystem primitives used by the content engine.
///
/// Every operation can fail; implementations report failures as [`StorageError`]
/// with a kind the caller can branch on. Write-like operations create missing
/// parent directories.
pub trait Storage: Send + Sync {
    /// Recursively list regular files under `dir`, skipping hidden entries.
    ///
    /// Entries are returned sorted by path.
    ///
    /// # Errors
    ///
    /// Returns a `NotFound` error if `dir` does not exist, and another kind if the
    /// directory cannot be enumerated.
    fn list_files(&self, dir: &Path) -> Result<Vec<FileEntry>, StorageError>;

    /// Read a whole file as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file doesn't exist or can't be read.
    fn read_to_string(&self, path: &Path) -> Result<String, StorageError>;

    /// Create or overwrite a file with `contents`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file or its parent directories can't be written.
    fn write(&self, path: &Path, contents: &str) -> Result<(), StorageError>;

    /// Copy `from` to `to`, overwriting any existing target.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the source can't be read or the target written.
    fn copy(&self, from: &Path, to: &Path) -> Result<(), StorageError>;

    /// Remove a file. Removing a file that doesn't exist succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if an existing file can't be removed.
    fn remove(&self, path: &Path) -> Result<(), StorageError>;

    /// Check whether a regular file exists at `path`.
    ///
    /// Returns `false` on errors (treats errors as "doesn't exist").
    fn exists(&self, path: &Path) -> bool;

    /// Set the modification time of an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the file doesn't exist or its times can't be changed.
    fn set_modified(&self, path: &Path, modified: SystemTime) -> Result<(), StorageError>;
}
