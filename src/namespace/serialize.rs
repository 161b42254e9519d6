//! Reading and writing documents
//!
//! Reading turns a parsed text tree into physical nodes, connecting each
//! node to its chain as soon as it exists. Writing goes the other way and
//! collapses placeholder nodes that only carry a single child into a dotted
//! tag, so an override of `level0.moby9.class` stays a one-liner.

use std::io::{Read, Write};

use tracing::{debug, info, warn};

use crate::asset::{AssetType, AttributeValue, NodeId};
use crate::pack::{DocumentId, FileReference, PackId, PackMetadata};
use crate::storage::StorageError;
use crate::text::{self, TextNode, TextWriter};

use super::mutate::{STRONGLY_DELETED_KEY, WEAKLY_DELETED_KEY};
use super::{Namespace, PackError};

impl Namespace {
    // ─── Reading ────────────────────────────────────────────────────────────

    /// Read metadata and every document of a freshly mounted pack.
    pub(crate) fn read_pack(&mut self, pack: PackId) -> Result<(), PackError> {
        let description = self.pack_ref(pack).description();
        let storage_error = |source: StorageError| PackError::Storage {
            pack: description.clone(),
            source,
        };

        let metadata_file = self.config().metadata_file.clone();
        let metadata_text = self
            .pack_ref(pack)
            .storage
            .read_text(&metadata_file)
            .map_err(storage_error)?;
        match metadata_text {
            Some(text) => match PackMetadata::from_ron_str(&text) {
                Ok(metadata) => self.packs[pack.0].metadata = metadata,
                Err(e) => warn!(pack = %description, error = %e, "ignoring unreadable pack metadata"),
            },
            None => debug!(pack = %description, "pack has no metadata file"),
        }

        let mut paths = self
            .pack_ref(pack)
            .storage
            .enumerate_documents(&self.config().document_extension)
            .map_err(storage_error)?;
        paths.sort();

        for path in paths {
            if self.pack_ref(pack).document_index(&path).is_some() {
                continue;
            }
            let document = self.create_document(pack, path);
            self.read_document(document)?;
        }
        Ok(())
    }

    /// Parse a document's file and build its nodes under the document root.
    pub(crate) fn read_document(&mut self, document: DocumentId) -> Result<(), PackError> {
        let (path, root) = {
            let doc = self.document_info(document);
            (doc.path().to_string(), doc.root())
        };
        let pack = self.pack_ref(document.pack());
        let text = pack
            .storage
            .read_text(&path)
            .map_err(|source| PackError::Storage {
                pack: pack.description(),
                source,
            })?;
        let Some(text) = text else {
            return Ok(());
        };

        let tree = text::parse(&text).map_err(|e| PackError::Parse {
            path: path.clone(),
            line: e.line,
            message: e.message,
        })?;

        let before = self.nodes.len();
        self.read_node(root, &tree, &path)?;
        debug!(path = %path, nodes = self.nodes.len() - before, "read document");
        Ok(())
    }

    fn read_node(&mut self, node: NodeId, source: &TextNode, path: &str) -> Result<(), PackError> {
        for (key, value) in &source.attributes {
            match (key.as_str(), value) {
                (STRONGLY_DELETED_KEY, AttributeValue::Boolean(deleted)) => {
                    self.nodes[node].strongly_deleted = Some(*deleted);
                }
                (WEAKLY_DELETED_KEY, AttributeValue::Boolean(deleted)) => {
                    self.nodes[node].weakly_deleted |= *deleted;
                }
                _ => {
                    self.nodes[node].attributes.set(key.clone(), value.clone());
                }
            }
        }

        for child in &source.children {
            let physical_type = match &child.type_name {
                None if child.collapsed => AssetType::Placeholder,
                None => AssetType::Collection,
                Some(name) => self.registry().resolve(name).ok_or_else(|| PackError::UnknownType {
                    path: path.to_string(),
                    line: child.line,
                    name: name.clone(),
                })?,
            };

            // The same tag may appear more than once in a file
            let existing = self.physical_child_by_tag(node, &child.tag);
            let id = match existing {
                Some(id) => {
                    if self.nodes[id].physical_type.is_placeholder() && !physical_type.is_placeholder() {
                        self.nodes[id].physical_type = physical_type;
                    }
                    id
                }
                None => self.add_child(node, physical_type, &child.tag),
            };
            self.read_node(id, child, path)?;
        }
        Ok(())
    }

    // ─── Writing ────────────────────────────────────────────────────────────

    /// Render a document as text.
    pub fn serialize_document(&self, document: DocumentId) -> String {
        let mut writer = TextWriter::new();
        self.write_body(&mut writer, self.document_info(document).root());
        writer.finish()
    }

    fn write_node(&self, writer: &mut TextWriter, id: NodeId, prefix: &str) {
        let node = &self.nodes[id];
        if node.physical_type.is_placeholder() && node.has_no_payload() && node.children.len() == 1 {
            let prefix = format!("{}{}.", prefix, node.tag);
            self.write_node(writer, node.children[0], &prefix);
            return;
        }

        // Placeholders that can't collapse are written as the type they stand in for
        let ty = if node.physical_type.is_placeholder() {
            self.logical_type(id)
        } else {
            &node.physical_type
        };
        let type_name = match ty {
            AssetType::Collection => None,
            ty => Some(ty.as_str()),
        };
        writer.begin_node(type_name, &format!("{}{}", prefix, node.tag));
        self.write_body(writer, id);
        writer.end_node();
    }

    fn write_body(&self, writer: &mut TextWriter, id: NodeId) {
        let node = &self.nodes[id];
        if let Some(deleted) = node.strongly_deleted {
            writer.write_attribute(STRONGLY_DELETED_KEY, &AttributeValue::Boolean(deleted));
        }
        if node.weakly_deleted {
            writer.write_attribute(WEAKLY_DELETED_KEY, &AttributeValue::Boolean(true));
        }
        for (key, value) in node.attributes.iter() {
            writer.write_attribute(key, value);
        }
        for &child in &node.children {
            self.write_node(writer, child, "");
        }
    }

    /// Write the metadata and every modified document of a pack. Returns the
    /// number of documents written.
    ///
    /// # Panics
    /// Panics if the pack is read-only.
    pub fn write_pack(&mut self, pack: PackId) -> Result<usize, PackError> {
        let description = self.pack_ref(pack).description();
        if !self.pack_ref(pack).is_writable() {
            panic!("pack {} is not writable", description);
        }

        let metadata = self
            .pack_ref(pack)
            .metadata
            .to_ron_string()
            .map_err(|e| PackError::Metadata {
                pack: description.clone(),
                message: e.to_string(),
            })?;
        let metadata_file = self.config().metadata_file.clone();

        let dirty: Vec<(usize, String)> = self.pack_ref(pack)
            .documents
            .iter()
            .enumerate()
            .filter(|(_, doc)| doc.is_dirty())
            .map(|(index, _)| (index, self.serialize_document(DocumentId::new(pack, index))))
            .collect();

        let target = &mut self.packs[pack.0];
        let storage_error = |source: StorageError| PackError::Storage {
            pack: description.clone(),
            source,
        };
        target.storage.write_text(&metadata_file, &metadata).map_err(storage_error)?;
        for (index, text) in &dirty {
            let path = target.documents[*index].path().to_string();
            target.storage.write_text(&path, text).map_err(storage_error)?;
            target.documents[*index].dirty = false;
        }

        info!(pack = %description, documents = dirty.len(), "wrote pack");
        Ok(dirty.len())
    }

    // ─── Binary files ───────────────────────────────────────────────────────

    /// Store a binary file beside a document.
    ///
    /// # Panics
    /// Panics if the document's pack is read-only.
    pub fn write_binary(
        &mut self,
        document: DocumentId,
        path: &str,
        bytes: &[u8],
    ) -> Result<FileReference, PackError> {
        let description = self.pack_ref(document.pack()).description();
        if !self.pack_ref(document.pack()).is_writable() {
            panic!("pack {} is not writable", description);
        }
        let storage_error = |source: StorageError| PackError::Storage {
            pack: description.clone(),
            source,
        };

        let full_path = self.document_info(document).sibling_path(path).map_err(storage_error)?;
        let storage = &mut self.packs[document.pack().0].storage;
        let mut writer = storage.open_binary_for_writing(&full_path).map_err(storage_error)?;
        writer
            .write_all(bytes)
            .and_then(|_| writer.flush())
            .map_err(|e| storage_error(e.into()))?;
        Ok(FileReference::new(document, path))
    }

    pub fn read_binary(&self, reference: &FileReference) -> Result<Vec<u8>, PackError> {
        let pack = self.pack_ref(reference.document.pack());
        let storage_error = |source: StorageError| PackError::Storage {
            pack: pack.description(),
            source,
        };

        let full_path = self
            .document_info(reference.document)
            .sibling_path(&reference.path)
            .map_err(storage_error)?;
        let mut bytes = Vec::new();
        pack.storage
            .open_binary_for_reading(&full_path)
            .map_err(storage_error)?
            .read_to_end(&mut bytes)
            .map_err(|e| storage_error(e.into()))?;
        Ok(bytes)
    }
}
