//! Local filesystem storage backend
//!
//! A pack stored as loose files under one directory. Writable packs are
//! guarded by a lock file holding the PID of the owning process.

use super::{has_extension, normalize_path, PackStorage, StorageError};
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Default name of the lock file in the pack root
pub const LOCK_FILE: &str = "lock";

/// Loose-file pack backend
#[derive(Debug, Clone)]
pub struct DirectoryStorage {
    /// Pack root directory
    base_dir: PathBuf,
    lock_file: String,
    /// We created the lock file and must remove it
    holds_lock: bool,
}

impl DirectoryStorage {
    /// Open a pack directory. The directory does not have to exist yet; it
    /// is created on the first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            lock_file: LOCK_FILE.to_string(),
            holds_lock: false,
        }
    }

    /// Use a different lock file name
    pub fn with_lock_file(mut self, lock_file: impl Into<String>) -> Self {
        self.lock_file = lock_file.into();
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Resolve a path relative to the base directory
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        Ok(self.base_dir.join(normalize_path(path)?))
    }

    fn collect_documents(
        &self,
        dir: &Path,
        extension: &str,
        dest: &mut Vec<String>,
    ) -> Result<(), StorageError> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.is_dir() {
                self.collect_documents(&path, extension, dest)?;
                continue;
            }
            let relative = match path.strip_prefix(&self.base_dir) {
                Ok(relative) => relative,
                Err(_) => continue,
            };
            let relative = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if has_extension(&relative, extension) {
                dest.push(relative);
            }
        }
        Ok(())
    }
}

impl PackStorage for DirectoryStorage {
    fn description(&self) -> String {
        self.base_dir.display().to_string()
    }

    fn read_text(&self, path: &str) -> Result<Option<String>, StorageError> {
        let full_path = self.resolve(path)?;
        match fs::read_to_string(&full_path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::from(e)),
        }
    }

    fn write_text(&mut self, path: &str, contents: &str) -> Result<(), StorageError> {
        let full_path = self.resolve(path)?;

        // Ensure parent directory exists
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&full_path, contents)?;
        Ok(())
    }

    fn open_binary_for_reading(&self, path: &str) -> Result<Box<dyn Read + '_>, StorageError> {
        let file = fs::File::open(self.resolve(path)?)?;
        Ok(Box::new(std::io::BufReader::new(file)))
    }

    fn open_binary_for_writing(&mut self, path: &str) -> Result<Box<dyn Write + '_>, StorageError> {
        let full_path = self.resolve(path)?;
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::File::create(full_path)?;
        Ok(Box::new(std::io::BufWriter::new(file)))
    }

    fn file_exists(&self, path: &str) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }

    fn enumerate_documents(&self, extension: &str) -> Result<Vec<String>, StorageError> {
        let mut documents = Vec::new();
        if self.base_dir.exists() {
            self.collect_documents(&self.base_dir, extension, &mut documents)?;
        }
        documents.sort();
        Ok(documents)
    }

    fn check_lock(&self) -> Result<Option<u32>, StorageError> {
        match self.read_text(&self.lock_file)? {
            // An unreadable lock file still means someone holds the pack
            Some(pid) => Ok(Some(pid.trim().parse().unwrap_or(0))),
            None => Ok(None),
        }
    }

    fn acquire_lock(&mut self) -> Result<(), StorageError> {
        let pid = std::process::id().to_string();
        let lock_file = self.lock_file.clone();
        self.write_text(&lock_file, &pid)?;
        self.holds_lock = true;
        Ok(())
    }

    fn release_lock(&mut self) -> Result<(), StorageError> {
        if !self.holds_lock {
            return Ok(());
        }
        let full_path = self.resolve(&self.lock_file)?;
        match fs::remove_file(&full_path) {
            Ok(()) => {}
            // Not found is OK, someone cleaned up for us
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(StorageError::from(e)),
        }
        self.holds_lock = false;
        Ok(())
    }
}
