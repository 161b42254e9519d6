//! Precedence chains
//!
//! Every physical node is linked to the node with the same path in the next
//! lower and next higher precedence document. Document roots are all linked
//! together in mount order, then document order. A new node finds its place
//! by scanning its parent's chain for a sibling level that already has a
//! child with the same tag, so connecting costs at most one step per
//! mounted document.

use crate::asset::{NodeArena, NodeId};
use crate::pack::DocumentId;

use super::Namespace;

/// Iterator over the members of one precedence chain
pub struct Chain<'a> {
    nodes: &'a NodeArena,
    next: Option<NodeId>,
    upward: bool,
}

impl Iterator for Chain<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        let node = &self.nodes[current];
        self.next = if self.upward { node.higher } else { node.lower };
        Some(current)
    }
}

impl Namespace {
    pub fn highest_precedence(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(higher) = self.nodes[current].higher {
            current = higher;
        }
        current
    }

    pub fn lowest_precedence(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(lower) = self.nodes[current].lower {
            current = lower;
        }
        current
    }

    /// Every member of a node's chain, highest precedence first
    pub fn chain_downward(&self, id: NodeId) -> Chain<'_> {
        Chain {
            nodes: &self.nodes,
            next: Some(self.highest_precedence(id)),
            upward: false,
        }
    }

    /// Every member of a node's chain, lowest precedence first
    pub fn chain_upward(&self, id: NodeId) -> Chain<'_> {
        Chain {
            nodes: &self.nodes,
            next: Some(self.lowest_precedence(id)),
            upward: true,
        }
    }

    /// Physical child of one node, ignoring every other chain member
    pub fn physical_child_by_tag(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.nodes[parent]
            .children
            .iter()
            .copied()
            .find(|&child| self.nodes[child].tag == tag)
    }

    /// Splice a freshly created (or retagged) node into the chain for its path.
    pub(crate) fn connect(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        let Some(parent) = node.parent else {
            let (lower, higher) = self.adjacent_roots(node.document);
            self.link(lower, id, higher);
            return;
        };
        let tag = node.tag.clone();

        // Lower first, the common case while editing a mod
        let mut level = self.nodes[parent].lower;
        while let Some(lower_parent) = level {
            if let Some(lower) = self.physical_child_by_tag(lower_parent, &tag) {
                let higher = self.nodes[lower].higher;
                self.link(Some(lower), id, higher);
                return;
            }
            level = self.nodes[lower_parent].lower;
        }

        let mut level = self.nodes[parent].higher;
        while let Some(higher_parent) = level {
            if let Some(higher) = self.physical_child_by_tag(higher_parent, &tag) {
                let lower = self.nodes[higher].lower;
                self.link(lower, id, Some(higher));
                return;
            }
            level = self.nodes[higher_parent].higher;
        }
    }

    /// Remove a node from its chain, joining its neighbours.
    pub(crate) fn disconnect(&mut self, id: NodeId) {
        let (lower, higher) = {
            let node = &mut self.nodes[id];
            (node.lower.take(), node.higher.take())
        };
        if let Some(lower) = lower {
            self.nodes[lower].higher = higher;
        }
        if let Some(higher) = higher {
            self.nodes[higher].lower = lower;
        }
    }

    fn link(&mut self, lower: Option<NodeId>, id: NodeId, higher: Option<NodeId>) {
        debug_assert!(lower != Some(id) && higher != Some(id));
        {
            let node = &mut self.nodes[id];
            node.lower = lower;
            node.higher = higher;
        }
        if let Some(lower) = lower {
            self.nodes[lower].higher = Some(id);
        }
        if let Some(higher) = higher {
            self.nodes[higher].lower = Some(id);
        }
    }

    /// Roots of the documents directly below and above a document
    fn adjacent_roots(&self, document: DocumentId) -> (Option<NodeId>, Option<NodeId>) {
        let pack_index = document.pack().index();
        let documents = &self.packs[pack_index].documents;

        let lower = if document.index() > 0 {
            documents.get(document.index() - 1).map(|d| d.root())
        } else {
            self.packs[..pack_index]
                .iter()
                .rev()
                .find_map(|pack| pack.documents.last())
                .map(|d| d.root())
        };

        let higher = match documents.get(document.index() + 1) {
            Some(next) => Some(next.root()),
            None => self.packs[pack_index + 1..]
                .iter()
                .find_map(|pack| pack.documents.first())
                .map(|d| d.root()),
        };

        (lower, higher)
    }
}
