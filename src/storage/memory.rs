//! In-memory storage backend
//!
//! Files live in a shared map, so a clone of a `MemoryStorage` sees every
//! write made through another clone. Handy for tests and scratch packs.

use super::{has_extension, normalize_path, PackStorage, StorageError};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use std::rc::Rc;

type FileMap = Rc<RefCell<BTreeMap<String, Vec<u8>>>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    files: FileMap,
    /// Simulated lock holder
    lock: Rc<RefCell<Option<u32>>>,
    holds_lock: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a text file
    pub fn with_text(self, path: &str, contents: &str) -> Self {
        if let Ok(path) = normalize_path(path) {
            self.files.borrow_mut().insert(path, contents.as_bytes().to_vec());
        }
        self
    }

    /// Builder: pretend another process holds the pack lock
    pub fn with_lock_held_by(self, pid: u32) -> Self {
        *self.lock.borrow_mut() = Some(pid);
        self
    }

    /// Raw contents of a file, if present
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        let path = normalize_path(path).ok()?;
        self.files.borrow().get(&path).cloned()
    }

    /// Every stored path, sorted
    pub fn paths(&self) -> Vec<String> {
        self.files.borrow().keys().cloned().collect()
    }
}

/// Buffers writes and commits them to the file map when dropped
struct MemoryWriter {
    files: FileMap,
    path: String,
    buffer: Vec<u8>,
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.files
            .borrow_mut()
            .insert(self.path.clone(), self.buffer.clone());
        Ok(())
    }
}

impl Drop for MemoryWriter {
    fn drop(&mut self) {
        let buffer = std::mem::take(&mut self.buffer);
        self.files.borrow_mut().insert(self.path.clone(), buffer);
    }
}

impl PackStorage for MemoryStorage {
    fn description(&self) -> String {
        "<memory>".to_string()
    }

    fn read_text(&self, path: &str) -> Result<Option<String>, StorageError> {
        let path = normalize_path(path)?;
        match self.files.borrow().get(&path) {
            Some(bytes) => String::from_utf8(bytes.clone())
                .map(Some)
                .map_err(|e| StorageError::Io(format!("{}: {}", path, e))),
            None => Ok(None),
        }
    }

    fn write_text(&mut self, path: &str, contents: &str) -> Result<(), StorageError> {
        let path = normalize_path(path)?;
        self.files.borrow_mut().insert(path, contents.as_bytes().to_vec());
        Ok(())
    }

    fn open_binary_for_reading(&self, path: &str) -> Result<Box<dyn Read + '_>, StorageError> {
        let path = normalize_path(path)?;
        match self.files.borrow().get(&path) {
            Some(bytes) => Ok(Box::new(Cursor::new(bytes.clone()))),
            None => Err(StorageError::NotFound(path)),
        }
    }

    fn open_binary_for_writing(&mut self, path: &str) -> Result<Box<dyn Write + '_>, StorageError> {
        Ok(Box::new(MemoryWriter {
            files: Rc::clone(&self.files),
            path: normalize_path(path)?,
            buffer: Vec::new(),
        }))
    }

    fn file_exists(&self, path: &str) -> bool {
        normalize_path(path)
            .map(|p| self.files.borrow().contains_key(&p))
            .unwrap_or(false)
    }

    fn enumerate_documents(&self, extension: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .files
            .borrow()
            .keys()
            .filter(|path| has_extension(path, extension))
            .cloned()
            .collect())
    }

    fn check_lock(&self) -> Result<Option<u32>, StorageError> {
        Ok(*self.lock.borrow())
    }

    fn acquire_lock(&mut self) -> Result<(), StorageError> {
        *self.lock.borrow_mut() = Some(std::process::id());
        self.holds_lock = true;
        Ok(())
    }

    fn release_lock(&mut self) -> Result<(), StorageError> {
        if self.holds_lock {
            *self.lock.borrow_mut() = None;
            self.holds_lock = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_files() {
        let storage = MemoryStorage::new();
        let mut handle = storage.clone();
        handle.write_text("a.asset", "x: 1").unwrap();
        assert_eq!(storage.read_text("a.asset").unwrap().as_deref(), Some("x: 1"));
    }

    #[test]
    fn test_writer_commits_on_drop() {
        let mut storage = MemoryStorage::new();
        {
            let mut writer = storage.open_binary_for_writing("blob.bin").unwrap();
            writer.write_all(b"abc").unwrap();
        }
        assert_eq!(storage.file("blob.bin"), Some(b"abc".to_vec()));
    }

    #[test]
    fn test_enumerate_sorted() {
        let storage = MemoryStorage::new()
            .with_text("z.asset", "")
            .with_text("a/b.asset", "")
            .with_text("pack.ron", "()");
        assert_eq!(
            storage.enumerate_documents("asset").unwrap(),
            vec!["a/b.asset", "z.asset"]
        );
    }

    #[test]
    fn test_foreign_lock_survives_release() {
        let mut storage = MemoryStorage::new().with_lock_held_by(7);
        assert_eq!(storage.check_lock().unwrap(), Some(7));
        storage.release_lock().unwrap();
        assert_eq!(storage.check_lock().unwrap(), Some(7));
    }

    #[test]
    fn test_missing_binary() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.open_binary_for_reading("nope.bin"),
            Err(StorageError::NotFound(_))
        ));
    }
}
