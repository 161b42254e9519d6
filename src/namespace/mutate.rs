//! Editing
//!
//! Edits always change one physical node in one document. To change what a
//! lower pack defines, first create an override node in a writable pack
//! (`override_node`) and edit that; the override joins the chain on creation.

use tracing::debug;

use crate::asset::{AssetNode, AssetType, AttributeValue, NodeId};
use crate::link::AssetLink;
use crate::pack::{DocumentId, PackId};
use crate::text::is_valid_name;

use super::{Namespace, PackError, RenameError};

/// Attribute keys stored as deletion flags rather than attributes
pub const STRONGLY_DELETED_KEY: &str = "strongly_deleted";
pub const WEAKLY_DELETED_KEY: &str = "weakly_deleted";

impl Namespace {
    fn assert_writable(&self, document: DocumentId) {
        let pack = match self.pack(document.pack()) {
            Some(pack) => pack,
            None => panic!("pack {:?} is not mounted", document.pack()),
        };
        if !pack.is_writable() {
            panic!("pack {} is not writable", pack.description());
        }
    }

    /// Append a child and connect it. No writability check, used while reading.
    pub(crate) fn add_child(&mut self, parent: NodeId, physical_type: AssetType, tag: &str) -> NodeId {
        let document = self.nodes[parent].document;
        let child = self
            .nodes
            .insert(AssetNode::new(document, Some(parent), physical_type, tag));
        self.nodes[parent].children.push(child);
        self.connect(child);
        child
    }

    /// Get the physical child of `parent` tagged `tag`, creating it with the
    /// given type if it doesn't exist.
    ///
    /// # Panics
    /// Panics if the parent's pack is not writable, or if `tag` is not a
    /// plain name (ASCII letters, digits and `_`).
    pub fn physical_child(&mut self, parent: NodeId, physical_type: AssetType, tag: &str) -> NodeId {
        let document = self.nodes[parent].document;
        self.assert_writable(document);
        if !is_valid_name(tag) {
            panic!("invalid asset tag '{}'", tag);
        }
        if let Some(existing) = self.physical_child_by_tag(parent, tag) {
            return existing;
        }
        let child = self.add_child(parent, physical_type, tag);
        self.mark_dirty(document);
        child
    }

    /// Create the path named by a link in a document: placeholders for every
    /// tag but the last, then a node of `leaf_type`. The link's prefix, if
    /// any, is ignored.
    ///
    /// # Panics
    /// Panics under the same conditions as `physical_child`.
    pub fn node_from_link(&mut self, document: DocumentId, leaf_type: AssetType, link: &AssetLink) -> NodeId {
        let mut node = self.document_info(document).root();
        let count = link.tags().len();
        for (i, tag) in link.tags().iter().enumerate() {
            let ty = if i + 1 == count {
                leaf_type.clone()
            } else {
                AssetType::Placeholder
            };
            node = self.physical_child(node, ty, tag);
        }
        node
    }

    /// Create a child at the same tree position as `node`, but in another
    /// document of the same pack. `document_path` is relative to the
    /// directory of `node`'s document; a leading `/` makes it relative to
    /// the pack root.
    pub fn foreign_child(
        &mut self,
        node: NodeId,
        document_path: &str,
        physical_type: AssetType,
        tag: &str,
    ) -> Result<NodeId, PackError> {
        let pack = self.pack_of(node);
        let path = match document_path.strip_prefix('/') {
            Some(absolute) => absolute.to_string(),
            None => {
                let description = self.pack_ref(pack).description();
                self.document_of(node)
                    .sibling_path(document_path)
                    .map_err(|source| PackError::Storage {
                        pack: description,
                        source,
                    })?
            }
        };
        let document = self.document(pack, &path)?;
        let link = self.absolute_link(node);
        let parent = self.node_from_link(document, AssetType::Placeholder, &link);
        Ok(self.physical_child(parent, physical_type, tag))
    }

    /// Make (or find) a placeholder override of any logical node in a
    /// writable pack, ready to receive attributes and children.
    pub fn override_node(
        &mut self,
        pack: PackId,
        document_path: &str,
        node: NodeId,
    ) -> Result<NodeId, PackError> {
        let document = self.document(pack, document_path)?;
        let link = self.absolute_link(node);
        Ok(self.node_from_link(document, AssetType::Placeholder, &link))
    }

    /// Change a node's tag.
    ///
    /// Fails if the new tag is not a plain name, or if a live sibling path
    /// already uses it.
    ///
    /// # Panics
    /// Panics if the node is a root, has physical children, or lives in a
    /// read-only pack.
    pub fn rename(&mut self, node: NodeId, new_tag: &str) -> Result<(), RenameError> {
        let document = self.nodes[node].document;
        self.assert_writable(document);
        let Some(parent) = self.nodes[node].parent else {
            panic!("cannot rename a document root");
        };
        if !self.nodes[node].children.is_empty() {
            panic!(
                "cannot rename '{}' because it has physical children",
                self.absolute_link(node)
            );
        }
        if !is_valid_name(new_tag) {
            return Err(RenameError::InvalidTag(new_tag.to_string()));
        }
        if self.nodes[node].tag == new_tag {
            return Ok(());
        }

        let taken = self.physical_child_by_tag(parent, new_tag).is_some()
            || self
                .find_logical_child(parent, new_tag)
                .map(|other| !self.is_deleted(other))
                .unwrap_or(false);
        if taken {
            return Err(RenameError::TagTaken(new_tag.to_string()));
        }

        let old_tag = std::mem::replace(&mut self.nodes[node].tag, new_tag.to_string());
        // Disconnect from the chain of the old path, join the new one
        self.disconnect(node);
        self.connect(node);
        self.mark_dirty(document);
        debug!(from = %old_tag, to = %new_tag, "renamed asset");
        Ok(())
    }

    /// Set an attribute on one physical node, returning the old value.
    ///
    /// # Panics
    /// Panics for read-only packs, for keys that are not plain names and for
    /// the deletion flag keys, which have their own setters.
    pub fn set_attribute(
        &mut self,
        node: NodeId,
        key: &str,
        value: impl Into<AttributeValue>,
    ) -> Option<AttributeValue> {
        if key == STRONGLY_DELETED_KEY || key == WEAKLY_DELETED_KEY {
            panic!("'{}' is a deletion flag, use its setter", key);
        }
        if !is_valid_name(key) {
            panic!("invalid attribute key '{}'", key);
        }
        let document = self.nodes[node].document;
        self.assert_writable(document);
        let old = self.nodes[node].attributes.set(key, value.into());
        self.mark_dirty(document);
        old
    }

    pub fn remove_attribute(&mut self, node: NodeId, key: &str) -> Option<AttributeValue> {
        let document = self.nodes[node].document;
        self.assert_writable(document);
        let old = self.nodes[node].attributes.remove(key);
        if old.is_some() {
            self.mark_dirty(document);
        }
        old
    }

    /// `None` clears the flag so lower packs decide again
    pub fn set_strongly_deleted(&mut self, node: NodeId, deleted: Option<bool>) {
        let document = self.nodes[node].document;
        self.assert_writable(document);
        self.nodes[node].strongly_deleted = deleted;
        self.mark_dirty(document);
    }

    pub fn set_weakly_deleted(&mut self, node: NodeId, deleted: bool) {
        let document = self.nodes[node].document;
        self.assert_writable(document);
        self.nodes[node].weakly_deleted = deleted;
        self.mark_dirty(document);
    }

    /// Remove and free a physical child with its whole subtree. Lower
    /// precedence nodes at the same paths become visible again.
    pub fn remove_physical_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        let document = self.nodes[parent].document;
        self.assert_writable(document);
        let Some(position) = self.nodes[parent].children.iter().position(|&c| c == child) else {
            return false;
        };
        self.nodes[parent].children.remove(position);
        self.free_subtree(child);
        self.mark_dirty(document);
        true
    }
}

#[cfg(test)]
mod tests {
    use crate::asset::{AssetType, NodeId};
    use crate::link::AssetLink;
    use crate::namespace::{Namespace, RenameError};
    use crate::pack::PackId;
    use crate::storage::MemoryStorage;

    fn link(text: &str) -> AssetLink {
        text.parse().unwrap()
    }

    fn get(ns: &Namespace, path: &str) -> NodeId {
        ns.lookup(&link(path), None).unwrap()
    }

    /// Read-only base with one level, writable empty mod on top
    fn setup() -> (Namespace, PackId) {
        let mut ns = Namespace::new();
        ns.mount(
            MemoryStorage::new().with_text(
                "levels/level0.asset",
                "Level level0 {\n\theight: 10\n\n\tMoby moby9 {\n\t}\n\n\tMoby entity5 {\n\t}\n}\n",
            ),
            false,
        )
        .unwrap();
        let modpack = ns.mount(MemoryStorage::new(), true).unwrap();
        (ns, modpack)
    }

    #[test]
    fn test_override_node_joins_chain() {
        let (mut ns, modpack) = setup();
        let level = get(&ns, "level0");

        let over = ns.override_node(modpack, "levels/level0", level).unwrap();
        assert_eq!(ns.pack_of(over), modpack);
        assert_eq!(ns.node(over).physical_type(), &AssetType::Placeholder);
        assert_eq!(ns.highest_precedence(level), over);
        assert_eq!(ns.logical_type(over), &AssetType::named("Level"));

        ns.set_attribute(over, "height", 12);
        assert_eq!(ns.attribute(get(&ns, "level0"), "height").and_then(|v| v.as_integer()), Some(12));
        assert!(ns.document_of(over).is_dirty());

        // Asking again returns the same node
        assert_eq!(ns.override_node(modpack, "levels/level0", level).unwrap(), over);
    }

    #[test]
    fn test_delete_through_override() {
        let (mut ns, modpack) = setup();
        let entity = get(&ns, "level0.entity5");

        let over = ns.override_node(modpack, "levels/level0", entity).unwrap();
        ns.set_strongly_deleted(over, Some(true));
        let level = get(&ns, "level0");
        assert!(!ns.has_child(level, "entity5"));

        ns.set_strongly_deleted(over, None);
        assert!(ns.has_child(level, "entity5"));
    }

    #[test]
    fn test_node_from_link_creates_placeholders() {
        let (mut ns, modpack) = setup();
        let doc = ns.document(modpack, "extra").unwrap();

        let moby = ns.node_from_link(doc, AssetType::named("Moby"), &link("level0.things.moby10"));
        let things = ns.node(moby).parent().unwrap();
        assert_eq!(ns.node(things).physical_type(), &AssetType::Placeholder);
        assert_eq!(ns.node(moby).physical_type(), &AssetType::named("Moby"));
        assert_eq!(get(&ns, "level0.things.moby10"), moby);

        let root = ns.document_info(doc).root();
        assert_eq!(ns.node_from_link(doc, AssetType::Collection, &AssetLink::new()), root);
    }

    #[test]
    fn test_foreign_child_in_sibling_document() {
        let (mut ns, modpack) = setup();
        let level = get(&ns, "level0");
        let over = ns.override_node(modpack, "levels/level0", level).unwrap();

        let moby = ns
            .foreign_child(over, "mobies.asset", AssetType::named("Moby"), "moby11")
            .unwrap();
        assert_eq!(ns.document_of(moby).path(), "levels/mobies.asset");
        assert_eq!(get(&ns, "level0.moby11"), moby);

        let rooted = ns
            .foreign_child(over, "/shared", AssetType::named("Moby"), "moby12")
            .unwrap();
        assert_eq!(ns.document_of(rooted).path(), "shared.asset");
    }

    #[test]
    fn test_rename() {
        let (mut ns, modpack) = setup();
        let doc = ns.document(modpack, "levels/level0").unwrap();
        let moby = ns.node_from_link(doc, AssetType::named("Moby"), &link("level0.moby20"));

        assert_eq!(
            ns.rename(moby, "moby9"),
            Err(RenameError::TagTaken("moby9".to_string()))
        );
        ns.rename(moby, "moby21").unwrap();
        assert_eq!(ns.node(moby).tag(), "moby21");
        assert_eq!(get(&ns, "level0.moby21"), moby);
        assert!(ns.lookup(&link("level0.moby20"), None).is_err());
    }

    #[test]
    fn test_rename_leaves_old_chain() {
        let (mut ns, modpack) = setup();
        let moby = get(&ns, "level0.moby9");
        let over = ns.override_node(modpack, "levels/level0", moby).unwrap();
        assert_eq!(ns.node(moby).higher_precedence(), Some(over));

        ns.rename(over, "moby30").unwrap();
        assert_eq!(ns.node(moby).higher_precedence(), None);
        assert_eq!(ns.node(over).lower_precedence(), None);
        assert_eq!(get(&ns, "level0.moby30"), over);
        assert_eq!(ns.logical_type(over), &AssetType::Placeholder);
    }

    #[test]
    fn test_rename_rejects_unwritable_tags() {
        let (mut ns, modpack) = setup();
        let doc = ns.document(modpack, "levels/level0").unwrap();
        let moby = ns.node_from_link(doc, AssetType::named("Moby"), &link("level0.moby20"));

        for bad in ["a.b", "", "two words", "x-y"] {
            assert_eq!(ns.rename(moby, bad), Err(RenameError::InvalidTag(bad.to_string())));
        }
        assert_eq!(ns.node(moby).tag(), "moby20");
        assert_eq!(get(&ns, "level0.moby20"), moby);
    }

    #[test]
    fn test_renamed_node_survives_reload() {
        let storage = MemoryStorage::new();
        let mut ns = Namespace::new();
        let pack = ns
            .mount(storage.clone().with_text("a.asset", "Level level0 {\n\tMoby moby9 {\n\t}\n}\n"), true)
            .unwrap();
        let moby = get(&ns, "level0.moby9");
        ns.rename(moby, "moby_10").unwrap();
        ns.write_pack(pack).unwrap();
        drop(ns);

        let mut ns = Namespace::new();
        ns.mount(storage, false).unwrap();
        let moby = get(&ns, "level0.moby_10");
        assert_eq!(ns.logical_type(moby), &AssetType::named("Moby"));
        assert!(ns.lookup(&link("level0.moby9"), None).is_err());
    }

    #[test]
    #[should_panic(expected = "invalid asset tag")]
    fn test_physical_child_with_dotted_tag_panics() {
        let (mut ns, modpack) = setup();
        let over = ns.override_node(modpack, "levels/level0", get(&ns, "level0")).unwrap();
        ns.physical_child(over, AssetType::named("Moby"), "a.b");
    }

    #[test]
    #[should_panic(expected = "invalid attribute key")]
    fn test_set_attribute_with_bad_key_panics() {
        let (mut ns, modpack) = setup();
        let over = ns.override_node(modpack, "levels/level0", get(&ns, "level0")).unwrap();
        ns.set_attribute(over, "spawn point", 1);
    }

    #[test]
    #[should_panic(expected = "has physical children")]
    fn test_rename_with_children_panics() {
        let (mut ns, modpack) = setup();
        let level = get(&ns, "level0");
        let moby = get(&ns, "level0.moby9");
        ns.override_node(modpack, "levels/level0", moby).unwrap();
        let over = ns.highest_precedence(level);
        let _ = ns.rename(over, "level1");
    }

    #[test]
    #[should_panic(expected = "not writable")]
    fn test_edit_read_only_pack_panics() {
        let (mut ns, _) = setup();
        let level = ns.chain_upward(get(&ns, "level0")).next().unwrap();
        ns.set_attribute(level, "height", 1);
    }

    #[test]
    fn test_remove_physical_child_reexposes_lower() {
        let (mut ns, modpack) = setup();
        let moby = get(&ns, "level0.moby9");
        let over = ns.override_node(modpack, "levels/level0", moby).unwrap();
        ns.set_attribute(over, "class", 4);
        let child = ns.physical_child(over, AssetType::named("Moby"), "rider");

        let parent = ns.node(over).parent().unwrap();
        let count = ns.node_count();
        assert!(ns.remove_physical_child(parent, over));
        assert_eq!(ns.node_count(), count - 2);
        assert!(ns.try_node(child).is_none());
        assert_eq!(get(&ns, "level0.moby9"), moby);
        assert_eq!(ns.attribute(moby, "class"), None);
        assert!(!ns.remove_physical_child(parent, over));
    }

    #[test]
    fn test_remove_attribute() {
        let (mut ns, modpack) = setup();
        let level = get(&ns, "level0");
        let over = ns.override_node(modpack, "levels/level0", level).unwrap();
        ns.set_attribute(over, "height", 3);
        assert_eq!(ns.remove_attribute(over, "height").and_then(|v| v.as_integer()), Some(3));
        assert_eq!(ns.attribute(over, "height").and_then(|v| v.as_integer()), Some(10));
        assert_eq!(ns.remove_attribute(over, "height"), None);
    }
}
