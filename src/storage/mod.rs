//! Pack Storage Backends
//!
//! A pack reads and writes its files through a `PackStorage` backend. Paths
//! are always relative to the pack root and use `/` separators:
//! - `DirectoryStorage` → loose files in a directory (the usual case for mods)
//! - `MemoryStorage` → an in-memory file map (tests, scratch packs)
//! - `ArchiveStorage` → a single brotli-compressed archive (read-only)
//!
//! All operations complete immediately; the namespace is single-threaded.

pub mod archive;
pub mod local;
pub mod memory;

pub use archive::ArchiveStorage;
pub use local::DirectoryStorage;
pub use memory::MemoryStorage;

use std::io::{Read, Write};

/// Storage error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    /// File or directory not found
    #[error("not found: {0}")]
    NotFound(String),
    /// Permission denied
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),
    /// Path escapes the pack root or is otherwise unusable
    #[error("invalid path: {0}")]
    InvalidPath(String),
    /// Backend does not support writing
    #[error("storage is read-only: {0}")]
    ReadOnly(String),
    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serde(String),
    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(e.to_string()),
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(e.to_string()),
            _ => StorageError::Io(e.to_string()),
        }
    }
}

/// Byte and text I/O for one pack.
pub trait PackStorage {
    /// Human-readable name of the backing location, for log messages
    fn description(&self) -> String;

    /// Read a text file. Missing files read as `None`.
    fn read_text(&self, path: &str) -> Result<Option<String>, StorageError>;

    /// Create or overwrite a text file
    fn write_text(&mut self, path: &str, contents: &str) -> Result<(), StorageError>;

    fn open_binary_for_reading(&self, path: &str) -> Result<Box<dyn Read + '_>, StorageError>;

    /// The file is complete once the returned writer is dropped
    fn open_binary_for_writing(&mut self, path: &str) -> Result<Box<dyn Write + '_>, StorageError>;

    fn file_exists(&self, path: &str) -> bool;

    /// Relative paths of every document file with the given extension
    fn enumerate_documents(&self, extension: &str) -> Result<Vec<String>, StorageError>;

    /// PID of the process holding the pack lock, if any
    fn check_lock(&self) -> Result<Option<u32>, StorageError> {
        Ok(None)
    }

    fn acquire_lock(&mut self) -> Result<(), StorageError> {
        Ok(())
    }

    fn release_lock(&mut self) -> Result<(), StorageError> {
        Ok(())
    }
}

/// Normalize a pack-relative path: `\` becomes `/`, leading `./` and `/` are
/// dropped, and `..` components are rejected.
pub fn normalize_path(path: &str) -> Result<String, StorageError> {
    let unified = path.replace('\\', "/");
    let mut parts = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => return Err(StorageError::InvalidPath(path.to_string())),
            part => parts.push(part),
        }
    }
    if parts.is_empty() {
        return Err(StorageError::InvalidPath(path.to_string()));
    }
    Ok(parts.join("/"))
}

/// True if `path` ends with `.{extension}`
pub(crate) fn has_extension(path: &str, extension: &str) -> bool {
    path.rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case(extension))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("levels/level0.asset").unwrap(), "levels/level0.asset");
        assert_eq!(normalize_path("./levels\\level0.asset").unwrap(), "levels/level0.asset");
        assert_eq!(normalize_path("/a//b").unwrap(), "a/b");
        assert!(matches!(normalize_path("../x"), Err(StorageError::InvalidPath(_))));
        assert!(matches!(normalize_path("./"), Err(StorageError::InvalidPath(_))));
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("a/b.asset", "asset"));
        assert!(has_extension("B.ASSET", "asset"));
        assert!(!has_extension("b.ron", "asset"));
        assert!(!has_extension("asset", "asset"));
    }

    #[test]
    fn test_io_error_conversion() {
        let err: StorageError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, StorageError::NotFound(_)));
        let err: StorageError = std::io::Error::new(std::io::ErrorKind::Other, "bad").into();
        assert!(matches!(err, StorageError::Io(_)));
    }
}
