//! Packs
//!
//! A pack is one override layer: every document read from a single storage
//! backend, plus the pack's metadata. Packs are mounted into a `Namespace`
//! in ascending precedence order and only the most recently mounted one can
//! be removed again, so a `PackId` is simply the mount position.

mod document;
mod metadata;

pub use document::{document_path, Document, DocumentId, FileReference};
pub use metadata::{PackKind, PackMetadata, FORMAT_VERSION};

use crate::storage::PackStorage;

/// Mount position of a pack (0 = lowest precedence)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackId(pub(crate) usize);

impl PackId {
    pub fn index(&self) -> usize {
        self.0
    }
}

pub struct Pack {
    id: PackId,
    pub(crate) documents: Vec<Document>,
    writable: bool,
    pub(crate) metadata: PackMetadata,
    pub(crate) storage: Box<dyn PackStorage>,
    /// We acquired the storage lock and must release it
    pub(crate) lock_held: bool,
}

impl Pack {
    pub(crate) fn new(id: PackId, storage: Box<dyn PackStorage>, writable: bool) -> Self {
        Self {
            id,
            documents: Vec::new(),
            writable,
            metadata: PackMetadata::default(),
            storage,
            lock_held: false,
        }
    }

    pub fn id(&self) -> PackId {
        self.id
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn metadata(&self) -> &PackMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut PackMetadata {
        &mut self.metadata
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn document(&self, index: usize) -> Option<&Document> {
        self.documents.get(index)
    }

    /// Index of the document with this (already normalized) path
    pub fn document_index(&self, path: &str) -> Option<usize> {
        self.documents.iter().position(|d| d.path() == path)
    }

    pub fn storage(&self) -> &dyn PackStorage {
        self.storage.as_ref()
    }

    pub fn description(&self) -> String {
        self.storage.description()
    }

    pub(crate) fn release_lock(&mut self) {
        if !self.lock_held {
            return;
        }
        match self.storage.release_lock() {
            Ok(()) => tracing::debug!(pack = %self.storage.description(), "released pack lock"),
            Err(e) => tracing::warn!(pack = %self.storage.description(), error = %e, "failed to release pack lock"),
        }
        self.lock_held = false;
    }
}

impl std::fmt::Debug for Pack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pack")
            .field("id", &self.id)
            .field("storage", &self.storage.description())
            .field("writable", &self.writable)
            .field("documents", &self.documents.len())
            .finish()
    }
}
