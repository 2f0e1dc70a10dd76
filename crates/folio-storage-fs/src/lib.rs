//! Local filesystem storage for the folio content engine.
//!
//! This crate provides [`FsStorage`], the disk-backed implementation of the
//! [`Storage`](folio_storage::Storage) trait. It handles:
//!
//! - Recursive file enumeration (hidden entries skipped, results sorted)
//! - Overwriting writes and copies that create parent directories
//! - Idempotent removal
//! - Modification time preservation for migrated files
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use folio_storage::Storage;
//! use folio_storage_fs::FsStorage;
//!
//! let storage = FsStorage::new();
//! for entry in storage.list_files(Path::new("content/_d"))? {
//!     println!("{} ({} bytes)", entry.path.display(), entry.len);
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::SystemTime;

use folio_storage::{FileEntry, Storage, StorageError, StorageErrorKind};
use walkdir::{DirEntry, WalkDir};

/// True for dot-files and dot-directories below the walk root.
fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

/// Convert a walkdir error into a storage error, keeping the I/O kind when present.
fn walk_error(err: walkdir::Error, dir: &Path) -> StorageError {
    let path = err.path().unwrap_or(dir).to_path_buf();
    match err.into_io_error() {
        Some(io) => StorageError::io(io, &path),
        None => StorageError::new(StorageErrorKind::Other).with_path(path),
    }
}

/// Create the parent directory of `path` if it is missing.
fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(e, parent))
        }
        _ => Ok(()),
    }
}

/// Filesystem storage implementation.
///
/// Stateless: every call goes straight to the operating system, so a single
/// instance can be shared freely between threads.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsStorage;

impl FsStorage {
    /// Create a new filesystem storage.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Storage for FsStorage {
    fn list_files(&self, dir: &Path) -> Result<Vec<FileEntry>, StorageError> {
        let meta = fs::metadata(dir).map_err(|e| StorageError::io(e, dir))?;
        if !meta.is_dir() {
            return Err(StorageError::new(StorageErrorKind::InvalidPath).with_path(dir));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
        {
            let entry = entry.map_err(|e| walk_error(e, dir))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let meta = entry.metadata().map_err(|e| walk_error(e, dir))?;
            files.push(FileEntry {
                path: entry.into_path(),
                len: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        tracing::debug!(dir = %dir.display(), count = files.len(), "Listed files");
        Ok(files)
    }

    fn read_to_string(&self, path: &Path) -> Result<String, StorageError> {
        fs::read_to_string(path).map_err(|e| StorageError::io(e, path))
    }

    fn write(&self, path: &Path, contents: &str) -> Result<(), StorageError> {
        ensure_parent(path)?;
        fs::write(path, contents).map_err(|e| StorageError::io(e, path))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        ensure_parent(to)?;
        fs::copy(from, to)
            .map(|_| ())
            .map_err(|e| StorageError::io(e, from))
    }

    fn remove(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(e, path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn set_modified(&self, path: &Path, modified: SystemTime) -> Result<(), StorageError> {
        let file = fs::File::options()
            .write(true)
            .open(path)
            .map_err(|e| StorageError::io(e, path))?;
        file.set_modified(modified)
            .map_err(|e| StorageError::io(e, path))
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_fs_storage_is_send_sync() {
        assert_send_sync::<FsStorage>();
    }

    #[test]
    fn test_list_files_missing_dir_is_not_found() {
        let storage = FsStorage::new();
        let err = storage
            .list_files(Path::new("/nonexistent/folio"))
            .unwrap_err();

        assert!(err.is_not_found());
    }

    #[test]
    fn test_list_files_on_regular_file_is_invalid_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let err = FsStorage::new().list_files(&file).unwrap_err();

        assert_eq!(err.kind, StorageErrorKind::InvalidPath);
    }

    #[test]
    fn test_list_files_recursive_sorted_and_skips_hidden() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("topic/sub")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("b.html"), "b").unwrap();
        fs::write(root.join("a.html"), "aa").unwrap();
        fs::write(root.join("topic/sub/c.js"), "ccc").unwrap();
        fs::write(root.join(".hidden.html"), "h").unwrap();
        fs::write(root.join(".git/config"), "g").unwrap();

        let files = FsStorage::new().list_files(root).unwrap();
        let rel: Vec<PathBuf> = files
            .iter()
            .map(|f| f.path.strip_prefix(root).unwrap().to_path_buf())
            .collect();

        assert_eq!(
            rel,
            vec![
                PathBuf::from("a.html"),
                PathBuf::from("b.html"),
                PathBuf::from("topic/sub/c.js"),
            ]
        );
        assert_eq!(files[0].len, 2);
    }

    #[test]
    fn test_write_creates_parents_and_overwrites() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("_d/topic/page.html");
        let storage = FsStorage::new();

        storage.write(&target, "first").unwrap();
        storage.write(&target, "second").unwrap();

        assert_eq!(storage.read_to_string(&target).unwrap(), "second");
    }

    #[test]
    fn test_copy_overwrites_stale_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let source = temp_dir.path().join("img.png");
        let target = temp_dir.path().join("_m/img.png");
        fs::write(&source, "fresh").unwrap();
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::write(&target, "stale").unwrap();

        FsStorage::new().copy(&source, &target).unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "fresh");
        assert!(source.exists());
    }

    #[test]
    fn test_remove_is_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("gone.html");
        fs::write(&file, "x").unwrap();
        let storage = FsStorage::new();

        storage.remove(&file).unwrap();
        storage.remove(&file).unwrap();

        assert!(!storage.exists(&file));
    }

    #[test]
    fn test_exists_false_for_directories() {
        let temp_dir = tempfile::tempdir().unwrap();

        assert!(!FsStorage::new().exists(temp_dir.path()));
    }

    #[test]
    fn test_set_modified_roundtrips_through_list_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("page.html");
        let storage = FsStorage::new();
        storage.write(&file, "x").unwrap();
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);

        storage.set_modified(&file, when).unwrap();

        let files = storage.list_files(temp_dir.path()).unwrap();
        assert_eq!(files[0].modified, when);
    }
}
