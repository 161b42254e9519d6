//! Asset Namespace
//!
//! The namespace merges every mounted pack into one logical tree:
//!
//! ```text
//! pack 0 (base)        pack 1 (mod)          logical view
//! root ─────────────── root                  root
//! └── level0 ───────── └── level0            └── level0 (Level, height 10)
//!     ├── moby9            └── entity5 (x)       └── moby9
//!     └── entity5
//! ```
//!
//! Nodes with the same path in different documents are linked into a
//! precedence chain (`chain.rs`). Queries walk those chains to find the
//! effective type, attributes and children of a path (`logical.rs`). Edits
//! always land in one physical document (`mutate.rs`), which is later written
//! back as text (`serialize.rs`).

mod chain;
mod error;
mod logical;
mod mutate;
mod serialize;

pub use chain::Chain;
pub use error::{LookupError, LookupErrorKind, PackError, RenameError};
pub use mutate::{STRONGLY_DELETED_KEY, WEAKLY_DELETED_KEY};

use tracing::{info, warn};

use crate::asset::{AssetNode, AssetType, NodeArena, NodeId, TypeRegistry};
use crate::config::NamespaceConfig;
use crate::pack::{document_path, Document, DocumentId, Pack, PackId};
use crate::storage::PackStorage;

/// The merged view of all mounted packs.
pub struct Namespace {
    config: NamespaceConfig,
    registry: TypeRegistry,
    pub(crate) nodes: NodeArena,
    /// Mounted packs, lowest precedence first
    pub(crate) packs: Vec<Pack>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    pub fn new() -> Self {
        Self::with_config(NamespaceConfig::default())
    }

    pub fn with_config(config: NamespaceConfig) -> Self {
        let registry = config.type_registry();
        Self {
            config,
            registry,
            nodes: NodeArena::new(),
            packs: Vec::new(),
        }
    }

    pub fn config(&self) -> &NamespaceConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Allow documents read after this call to use another asset type
    pub fn register_type(&mut self, name: impl Into<String>) {
        self.registry.register(name);
    }

    // ─── Packs ──────────────────────────────────────────────────────────────

    /// Mounted packs, lowest precedence first
    pub fn packs(&self) -> &[Pack] {
        &self.packs
    }

    pub fn pack(&self, id: PackId) -> Option<&Pack> {
        self.packs.get(id.0)
    }

    pub fn pack_mut(&mut self, id: PackId) -> Option<&mut Pack> {
        self.packs.get_mut(id.0)
    }

    /// Mount a pack on top of everything already mounted.
    ///
    /// Writable packs take the storage lock first and refuse to mount if
    /// another process holds it. If any document fails to load, the pack is
    /// unmounted again and the error returned.
    pub fn mount(
        &mut self,
        storage: impl PackStorage + 'static,
        writable: bool,
    ) -> Result<PackId, PackError> {
        self.mount_boxed(Box::new(storage), writable)
    }

    pub fn mount_boxed(
        &mut self,
        storage: Box<dyn PackStorage>,
        writable: bool,
    ) -> Result<PackId, PackError> {
        let id = PackId(self.packs.len());
        let mut pack = Pack::new(id, storage, writable);
        let description = pack.description();

        if writable {
            let holder = pack.storage.check_lock().map_err(|source| PackError::Storage {
                pack: description.clone(),
                source,
            })?;
            if let Some(holder) = holder {
                return Err(PackError::Locked {
                    pack: description,
                    holder,
                });
            }
            pack.storage.acquire_lock().map_err(|source| PackError::Storage {
                pack: description.clone(),
                source,
            })?;
            pack.lock_held = true;
        }

        self.packs.push(pack);
        if let Err(e) = self.read_pack(id) {
            warn!(pack = %description, error = %e, "failed to read pack, unmounting");
            self.unmount_last();
            return Err(e);
        }

        info!(
            pack = %description,
            documents = self.packs[id.0].documents.len(),
            writable,
            "mounted pack"
        );
        Ok(id)
    }

    /// Remove the most recently mounted pack, freeing its nodes and
    /// releasing its lock.
    ///
    /// # Panics
    /// Panics if nothing is mounted.
    pub fn unmount_last(&mut self) {
        let roots: Vec<NodeId> = match self.packs.last() {
            Some(pack) => pack.documents.iter().map(|d| d.root()).collect(),
            None => panic!("unmount_last called on an empty namespace"),
        };
        for root in roots.into_iter().rev() {
            self.free_subtree(root);
        }
        if let Some(mut pack) = self.packs.pop() {
            pack.release_lock();
            info!(pack = %pack.description(), "unmounted pack");
        }
    }

    /// Pack owning a node
    pub fn pack_of(&self, node: NodeId) -> PackId {
        self.nodes[node].document.pack()
    }

    // ─── Documents ──────────────────────────────────────────────────────────

    /// Get the document at `path` in a pack, creating it (and reading it from
    /// storage, if the file exists) when the pack doesn't have it yet.
    pub fn document(&mut self, pack: PackId, path: &str) -> Result<DocumentId, PackError> {
        let description = self.pack_ref(pack).description();
        let path = document_path(path, &self.config.document_extension).map_err(|source| {
            PackError::Storage {
                pack: description,
                source,
            }
        })?;

        if let Some(index) = self.pack_ref(pack).document_index(&path) {
            return Ok(DocumentId::new(pack, index));
        }

        let exists = self.pack_ref(pack).storage.file_exists(&path);
        let id = self.create_document(pack, path);
        if exists {
            if let Err(e) = self.read_document(id) {
                self.discard_last_document(pack);
                return Err(e);
            }
        }
        Ok(id)
    }

    /// Find an already loaded document without creating it
    pub fn find_document(&self, pack: PackId, path: &str) -> Option<DocumentId> {
        let path = document_path(path, &self.config.document_extension).ok()?;
        self.pack(pack)?
            .document_index(&path)
            .map(|index| DocumentId::new(pack, index))
    }

    /// # Panics
    /// Panics if the document's pack has been unmounted.
    pub fn document_info(&self, id: DocumentId) -> &Document {
        &self.pack_ref(id.pack()).documents[id.index()]
    }

    /// Document owning a node
    pub fn document_of(&self, node: NodeId) -> &Document {
        self.document_info(self.nodes[node].document)
    }

    pub(crate) fn create_document(&mut self, pack: PackId, path: String) -> DocumentId {
        let index = self.pack_ref(pack).documents.len();
        let id = DocumentId::new(pack, index);
        let root = self.nodes.insert(AssetNode::new(id, None, AssetType::Root, ""));
        self.packs[pack.0].documents.push(Document::new(path, root));
        self.connect(root);
        id
    }

    /// Drop a pack's newest document along with every node read into it.
    fn discard_last_document(&mut self, pack: PackId) {
        if let Some(document) = self.packs[pack.0].documents.pop() {
            warn!(path = %document.path(), "discarding partially read document");
            self.free_subtree(document.root());
        }
    }

    pub(crate) fn mark_dirty(&mut self, document: DocumentId) {
        if let Some(pack) = self.packs.get_mut(document.pack().0) {
            if let Some(doc) = pack.documents.get_mut(document.index()) {
                doc.dirty = true;
            }
        }
    }

    fn pack_ref(&self, id: PackId) -> &Pack {
        match self.packs.get(id.0) {
            Some(pack) => pack,
            None => panic!("pack {:?} is not mounted", id),
        }
    }

    // ─── Nodes ──────────────────────────────────────────────────────────────

    /// # Panics
    /// Panics if the handle is stale.
    pub fn node(&self, id: NodeId) -> &AssetNode {
        &self.nodes[id]
    }

    pub fn try_node(&self, id: NodeId) -> Option<&AssetNode> {
        self.nodes.get(id)
    }

    /// Number of live physical nodes across all packs
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The highest-precedence document root, if any document is loaded
    pub fn any_root(&self) -> Option<NodeId> {
        self.packs
            .iter()
            .rev()
            .find_map(|pack| pack.documents.last())
            .map(|doc| self.highest_precedence(doc.root()))
    }

    /// Root of the last document of a pack
    pub fn root_of(&self, pack: PackId) -> Option<NodeId> {
        self.pack(pack)?.documents.last().map(|doc| doc.root())
    }

    /// Disconnect and free a node and everything below it
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id].children);
        for child in children {
            self.free_subtree(child);
        }
        self.disconnect(id);
        self.nodes.remove(id);
    }
}

impl Drop for Namespace {
    fn drop(&mut self) {
        for pack in self.packs.iter_mut().rev() {
            pack.release_lock();
        }
    }
}

impl std::fmt::Debug for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Namespace")
            .field("packs", &self.packs)
            .field("nodes", &self.nodes.len())
            .finish()
    }
}
