//! Filesystem primitive abstraction for the folio content engine.
//!
//! This crate provides a [`Storage`] trait covering the handful of file operations
//! the ingestion pipeline and document cache need (enumerate, read, write, copy,
//! remove). Keeping them behind a trait gives:
//!
//! - **Unit testing** of the pipeline against temporary directories
//! - **Backend flexibility** (local disk today, anything path-addressed tomorrow)
//! - **Clean separation** between content rules and raw I/O
//!
//! # Architecture
//!
//! The crate provides:
//! - [`Storage`] trait with `list_files()`, `read_to_string()`, `write()` and friends
//! - [`StorageError`] with a semantic [`StorageErrorKind`] so callers can tell a
//!   benign absence (`NotFound`) from a real failure
//!
//! The local-disk implementation lives in `folio-storage-fs`.

mod storage;

pub use storage::{FileEntry, Storage, StorageError, StorageErrorKind};
