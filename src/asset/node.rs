//! Asset Nodes and the Node Arena
//!
//! Every physical node of every mounted document lives in one arena owned by
//! the namespace. Nodes refer to each other (parent, children, precedence
//! neighbours) by `NodeId` handles instead of pointers. The generational
//! index pattern keeps stale handles from aliasing new nodes:
//! - Each slot has a generation counter
//! - When a node is freed, its slot can be reused
//! - The generation increments on reuse, invalidating old handles

use std::ops::{Index, IndexMut};

use super::attribute::{AttributeValue, AttributeVisitor, Attributes};
use super::types::AssetType;
use crate::pack::DocumentId;

/// Handle to a node in the namespace arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId {
    /// Index into the arena
    index: u32,
    /// Generation counter - increments when slot is reused
    generation: u32,
}

impl NodeId {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// One physical node of one document.
#[derive(Debug, Clone)]
pub struct AssetNode {
    pub(crate) tag: String,
    pub(crate) physical_type: AssetType,
    pub(crate) document: DocumentId,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) attributes: Attributes,
    /// `None` if the document never mentioned the flag
    pub(crate) strongly_deleted: Option<bool>,
    pub(crate) weakly_deleted: bool,
    /// Same path in the next lower precedence tree
    pub(crate) lower: Option<NodeId>,
    /// Same path in the next higher precedence tree
    pub(crate) higher: Option<NodeId>,
}

impl AssetNode {
    pub(crate) fn new(
        document: DocumentId,
        parent: Option<NodeId>,
        physical_type: AssetType,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            tag: tag.into(),
            physical_type,
            document,
            parent,
            children: Vec::new(),
            attributes: Attributes::new(),
            strongly_deleted: None,
            weakly_deleted: false,
            lower: None,
            higher: None,
        }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// The type this node was written with. May be `Placeholder`; see
    /// `Namespace::logical_type` for the type that counts.
    pub fn physical_type(&self) -> &AssetType {
        &self.physical_type
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Physical children in file order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Attributes set on this physical node only
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn for_each_attribute(&self, visitor: &mut dyn AttributeVisitor) {
        self.attributes.visit(visitor);
    }

    pub fn strongly_deleted(&self) -> Option<bool> {
        self.strongly_deleted
    }

    pub fn weakly_deleted(&self) -> bool {
        self.weakly_deleted
    }

    pub fn lower_precedence(&self) -> Option<NodeId> {
        self.lower
    }

    pub fn higher_precedence(&self) -> Option<NodeId> {
        self.higher
    }

    /// Nothing on this node beyond its tag and children
    pub(crate) fn has_no_payload(&self) -> bool {
        self.attributes.is_empty() && self.strongly_deleted.is_none() && !self.weakly_deleted
    }
}

struct Slot {
    generation: u32,
    node: Option<AssetNode>,
}

/// Generational storage for asset nodes.
#[derive(Default)]
pub struct NodeArena {
    slots: Vec<Slot>,
    /// Free slots available for reuse (LIFO)
    free_indices: Vec<u32>,
    alive_count: usize,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: AssetNode) -> NodeId {
        self.alive_count += 1;

        if let Some(index) = self.free_indices.pop() {
            // Generation was already incremented when the slot was freed
            let slot = &mut self.slots[index as usize];
            slot.node = Some(node);
            NodeId::new(index, slot.generation)
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                node: Some(node),
            });
            NodeId::new(index, 0)
        }
    }

    /// Free a node, making its slot available for reuse.
    pub fn remove(&mut self, id: NodeId) -> Option<AssetNode> {
        if !self.contains(id) {
            return None;
        }
        let slot = &mut self.slots[id.index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        self.free_indices.push(id.index);
        self.alive_count -= 1;
        slot.node.take()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&AssetNode> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut AssetNode> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    pub fn len(&self) -> usize {
        self.alive_count
    }

    pub fn is_empty(&self) -> bool {
        self.alive_count == 0
    }
}

impl Index<NodeId> for NodeArena {
    type Output = AssetNode;

    fn index(&self, id: NodeId) -> &AssetNode {
        match self.get(id) {
            Some(node) => node,
            None => panic!("stale asset node handle {:?}", id),
        }
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut AssetNode {
        match self.get_mut(id) {
            Some(node) => node,
            None => panic!("stale asset node handle {:?}", id),
        }
    }
}
