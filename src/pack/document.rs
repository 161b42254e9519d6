//! Documents
//!
//! One `.asset` file of a pack. A document owns exactly one root node; the
//! rest of its tree hangs off that root in the namespace arena.

use crate::asset::NodeId;
use crate::storage::{normalize_path, StorageError};

use super::PackId;

/// Position of a document: its pack and its index among that pack's documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId {
    pack: PackId,
    index: usize,
}

impl DocumentId {
    pub fn new(pack: PackId, index: usize) -> Self {
        Self { pack, index }
    }

    pub fn pack(&self) -> PackId {
        self.pack
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    /// Pack-relative path, always ending in the document extension
    path: String,
    root: NodeId,
    /// Changed since it was read or last written
    pub(crate) dirty: bool,
}

impl Document {
    pub(crate) fn new(path: String, root: NodeId) -> Self {
        Self {
            path,
            root,
            dirty: false,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Directory of the document inside the pack ("" at the pack root)
    pub fn directory(&self) -> &str {
        self.path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
    }

    /// Resolve a path relative to this document's directory
    pub fn sibling_path(&self, relative: &str) -> Result<String, StorageError> {
        let directory = self.directory();
        if directory.is_empty() {
            normalize_path(relative)
        } else {
            normalize_path(&format!("{}/{}", directory, relative))
        }
    }
}

/// Normalize a document path and force the document extension onto it.
pub fn document_path(path: &str, extension: &str) -> Result<String, StorageError> {
    let path = normalize_path(path)?;
    let (directory, file_name) = match path.rsplit_once('/') {
        Some((directory, file_name)) => (Some(directory), file_name),
        None => (None, path.as_str()),
    };
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    };
    Ok(match directory {
        Some(directory) => format!("{}/{}.{}", directory, stem, extension),
        None => format!("{}.{}", stem, extension),
    })
}

/// A binary file stored beside a document, addressed relative to the
/// document's directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileReference {
    pub document: DocumentId,
    pub path: String,
}

impl FileReference {
    pub fn new(document: DocumentId, path: impl Into<String>) -> Self {
        Self {
            document,
            path: path.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_path_extension() {
        assert_eq!(document_path("levels/level0", "asset").unwrap(), "levels/level0.asset");
        assert_eq!(document_path("levels/level0.txt", "asset").unwrap(), "levels/level0.asset");
        assert_eq!(document_path("./build.asset", "asset").unwrap(), "build.asset");
        assert_eq!(document_path(".hidden", "asset").unwrap(), ".hidden.asset");
        assert!(document_path("../x", "asset").is_err());
    }

    #[test]
    fn test_sibling_path() {
        let root = NodeId::new(0, 0);
        let nested = Document::new("levels/level0.asset".to_string(), root);
        assert_eq!(nested.directory(), "levels");
        assert_eq!(nested.sibling_path("textures/t.bin").unwrap(), "levels/textures/t.bin");

        let top = Document::new("build.asset".to_string(), root);
        assert_eq!(top.directory(), "");
        assert_eq!(top.sibling_path("t.bin").unwrap(), "t.bin");
    }
}
