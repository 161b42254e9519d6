//! Archive storage backend
//!
//! A whole pack in one file: a RON map of path -> bytes, compressed with
//! brotli. Archives are how finished packs are distributed, so this backend
//! is read-only. Use `ArchiveStorage::pack_directory` to build one.

use super::{has_extension, normalize_path, PackStorage, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Archive {
    files: BTreeMap<String, Vec<u8>>,
}

/// Read-only pack backed by a compressed archive
#[derive(Debug, Clone)]
pub struct ArchiveStorage {
    name: String,
    archive: Archive,
}

impl ArchiveStorage {
    /// Load an archive from disk
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(path.display().to_string(), &data)
    }

    /// Load an archive from bytes (supports both compressed and uncompressed RON)
    pub fn from_bytes(name: impl Into<String>, data: &[u8]) -> Result<Self, StorageError> {
        // RON files start with '(' or whitespace before '('
        let is_ron = data
            .first()
            .map(|&b| b == b'(' || b == b' ' || b == b'\n' || b == b'\r')
            .unwrap_or(false);

        let ron_str = if is_ron {
            String::from_utf8_lossy(data).to_string()
        } else {
            let mut decompressed = Vec::new();
            brotli::BrotliDecompress(&mut Cursor::new(data), &mut decompressed)
                .map_err(|e| StorageError::Io(format!("decompression failed: {}", e)))?;
            String::from_utf8_lossy(&decompressed).to_string()
        };

        let archive: Archive =
            ron::from_str(&ron_str).map_err(|e| StorageError::Serde(e.to_string()))?;
        Ok(Self {
            name: name.into(),
            archive,
        })
    }

    /// Serialize to compressed RON
    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        let ron_data = ron::ser::to_string(&self.archive)
            .map_err(|e| StorageError::Serde(e.to_string()))?;

        let mut compressed = Vec::new();
        brotli::BrotliCompress(
            &mut Cursor::new(ron_data.as_bytes()),
            &mut compressed,
            &brotli::enc::BrotliEncoderParams {
                quality: 6,
                lgwin: 22,
                ..Default::default()
            },
        )
        .map_err(|e| StorageError::Io(format!("compression failed: {}", e)))?;
        Ok(compressed)
    }

    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Bundle every file of a pack directory, except its lock file
    pub fn pack_directory(dir: &Path, lock_file: &str) -> Result<Self, StorageError> {
        let mut archive = Archive::default();
        collect_files(dir, dir, lock_file, &mut archive.files)?;
        Ok(Self {
            name: dir.display().to_string(),
            archive,
        })
    }

    /// Number of files in the archive
    pub fn len(&self) -> usize {
        self.archive.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.files.is_empty()
    }

    fn get(&self, path: &str) -> Result<Option<&Vec<u8>>, StorageError> {
        Ok(self.archive.files.get(&normalize_path(path)?))
    }
}

fn collect_files(
    root: &Path,
    dir: &Path,
    lock_file: &str,
    dest: &mut BTreeMap<String, Vec<u8>>,
) -> Result<(), StorageError> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, lock_file, dest)?;
            continue;
        }
        let relative = match path.strip_prefix(root) {
            Ok(relative) => relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => continue,
        };
        if relative == lock_file {
            continue;
        }
        dest.insert(relative, std::fs::read(&path)?);
    }
    Ok(())
}

impl PackStorage for ArchiveStorage {
    fn description(&self) -> String {
        self.name.clone()
    }

    fn read_text(&self, path: &str) -> Result<Option<String>, StorageError> {
        match self.get(path)? {
            Some(bytes) => String::from_utf8(bytes.clone())
                .map(Some)
                .map_err(|e| StorageError::Io(format!("{}: {}", path, e))),
            None => Ok(None),
        }
    }

    fn write_text(&mut self, path: &str, _contents: &str) -> Result<(), StorageError> {
        Err(StorageError::ReadOnly(format!("{} in {}", path, self.name)))
    }

    fn open_binary_for_reading(&self, path: &str) -> Result<Box<dyn Read + '_>, StorageError> {
        match self.get(path)? {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.as_slice()))),
            None => Err(StorageError::NotFound(path.to_string())),
        }
    }

    fn open_binary_for_writing(&mut self, path: &str) -> Result<Box<dyn Write + '_>, StorageError> {
        Err(StorageError::ReadOnly(format!("{} in {}", path, self.name)))
    }

    fn file_exists(&self, path: &str) -> bool {
        matches!(self.get(path), Ok(Some(_)))
    }

    fn enumerate_documents(&self, extension: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .archive
            .files
            .keys()
            .filter(|path| has_extension(path, extension))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("levels")).unwrap();
        std::fs::write(dir.path().join("levels/level0.asset"), "Level 0 {\n}\n").unwrap();
        std::fs::write(dir.path().join("pack.ron"), "(name: \"x\")").unwrap();
        std::fs::write(dir.path().join("lock"), "123").unwrap();
        dir
    }

    #[test]
    fn test_pack_directory_skips_lock() {
        let dir = sample_dir();
        let archive = ArchiveStorage::pack_directory(dir.path(), "lock").unwrap();
        assert_eq!(archive.len(), 2);
        assert!(!archive.file_exists("lock"));
        assert_eq!(
            archive.enumerate_documents("asset").unwrap(),
            vec!["levels/level0.asset"]
        );
    }

    #[test]
    fn test_save_and_open() {
        let dir = sample_dir();
        let out = TempDir::new().unwrap();
        let path = out.path().join("pack.bin");

        ArchiveStorage::pack_directory(dir.path(), "lock")
            .unwrap()
            .save(&path)
            .unwrap();
        let archive = ArchiveStorage::open(&path).unwrap();
        assert_eq!(
            archive.read_text("levels/level0.asset").unwrap().as_deref(),
            Some("Level 0 {\n}\n")
        );
    }

    #[test]
    fn test_uncompressed_ron_accepted() {
        let archive =
            ArchiveStorage::from_bytes("plain", b"(files: {\"a.asset\": [120]})").unwrap();
        assert_eq!(archive.read_text("a.asset").unwrap().as_deref(), Some("x"));
    }

    #[test]
    fn test_read_only() {
        let mut archive = ArchiveStorage::from_bytes("plain", b"(files: {})").unwrap();
        assert!(matches!(
            archive.write_text("a.asset", "x"),
            Err(StorageError::ReadOnly(_))
        ));
        assert!(archive.open_binary_for_writing("a.bin").is_err());
    }
}
