//! Logical resolution
//!
//! Everything here reads through precedence chains: a path's type is the
//! highest non-placeholder type in its chain, attributes fall back to lower
//! members, children are the union of every member's children minus the
//! deleted ones, and reference nodes are followed to their targets.

use tracing::warn;

use crate::asset::{AssetType, AttributeValue, NodeId, REFERENCE_ATTRIBUTE};
use crate::link::AssetLink;

use super::{LookupError, LookupErrorKind, Namespace};

impl Namespace {
    /// The type a path has once every pack is taken into account.
    pub fn logical_type(&self, id: NodeId) -> &AssetType {
        self.chain_downward(id)
            .map(|member| &self.nodes[member].physical_type)
            .find(|ty| !ty.is_placeholder())
            .unwrap_or(&self.nodes[id].physical_type)
    }

    /// The highest chain member of type `type_name`, if that is the path's
    /// logical type. Placeholders are skipped and any other type ends the
    /// search.
    pub fn maybe_as_type(&self, id: NodeId, type_name: &str) -> Option<NodeId> {
        self.chain_downward(id)
            .find(|&member| !self.nodes[member].physical_type.is_placeholder())
            .filter(|&member| self.nodes[member].physical_type.as_str() == type_name)
    }

    pub fn as_type(&self, id: NodeId, type_name: &str) -> Result<NodeId, LookupError> {
        self.maybe_as_type(id, type_name).ok_or_else(|| {
            LookupError::new(
                self.absolute_link(id),
                self.nodes[id].tag.clone(),
                LookupErrorKind::WrongType,
            )
        })
    }

    /// A weak deletion anywhere in the chain wins. Otherwise the highest
    /// explicit strong deletion flag decides.
    pub fn is_deleted(&self, id: NodeId) -> bool {
        if self.chain_downward(id).any(|member| self.nodes[member].weakly_deleted) {
            return true;
        }
        self.chain_downward(id)
            .find_map(|member| self.nodes[member].strongly_deleted)
            .unwrap_or(false)
    }

    /// Attribute value from the highest chain member that sets it
    pub fn attribute(&self, id: NodeId, key: &str) -> Option<&AttributeValue> {
        self.chain_downward(id)
            .find_map(|member| self.nodes[member].attributes.get(key))
    }

    /// Every attribute key visible on a path with its effective value, in
    /// the order the lowest member defines them.
    pub fn logical_attributes(&self, id: NodeId) -> Vec<(&str, &AttributeValue)> {
        let mut result: Vec<(&str, &AttributeValue)> = Vec::new();
        for member in self.chain_upward(id) {
            for (key, value) in self.nodes[member].attributes.iter() {
                match result.iter_mut().find(|(k, _)| *k == key) {
                    Some(entry) => entry.1 = value,
                    None => result.push((key, value)),
                }
            }
        }
        result
    }

    /// Highest weakly deleted member of a chain. Children of members below
    /// it are hidden.
    fn weak_cutoff(&self, id: NodeId) -> Option<NodeId> {
        self.chain_downward(id)
            .find(|&member| self.nodes[member].weakly_deleted)
    }

    /// Chain members whose children are visible, highest first
    fn visible_levels(&self, id: NodeId) -> Vec<NodeId> {
        let cutoff = self.weak_cutoff(id);
        let mut levels = Vec::new();
        for member in self.chain_downward(id) {
            levels.push(member);
            if Some(member) == cutoff {
                break;
            }
        }
        levels
    }

    /// Highest representative of the child chain for `tag`, deleted or not.
    pub fn find_logical_child(&self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.visible_levels(parent)
            .into_iter()
            .find_map(|level| self.physical_child_by_tag(level, tag))
            .map(|child| self.highest_precedence(child))
    }

    /// Resolve one child of a path, following references.
    pub fn get_child(&self, parent: NodeId, tag: &str) -> Result<NodeId, LookupError> {
        let link = self.absolute_link(parent).join(tag);
        let mut hops = 0;
        self.child_step(parent, tag, &link, &mut hops)
    }

    pub fn has_child(&self, parent: NodeId, tag: &str) -> bool {
        self.find_logical_child(parent, tag)
            .map(|child| !self.is_deleted(child))
            .unwrap_or(false)
    }

    /// Follow a node (and whatever it resolves to) while it is a reference.
    pub fn resolve_references(&self, id: NodeId) -> Result<NodeId, LookupError> {
        let mut hops = 0;
        self.resolve_counted(id, &mut hops)
    }

    /// Call `f` once per logical child of `parent`, lowest pack first. Deleted
    /// children are skipped and references are resolved.
    pub fn for_each_logical_child<F>(&self, parent: NodeId, mut f: F) -> Result<(), LookupError>
    where
        F: FnMut(NodeId),
    {
        for (_, resolved) in self.logical_children_with_targets(parent)? {
            f(resolved);
        }
        Ok(())
    }

    /// Like `for_each_logical_child`, but only children whose logical type
    /// is `type_name`, each passed as its highest member of that type.
    pub fn for_each_logical_child_of_type<F>(
        &self,
        parent: NodeId,
        type_name: &str,
        mut f: F,
    ) -> Result<(), LookupError>
    where
        F: FnMut(NodeId),
    {
        for (_, resolved) in self.logical_children_with_targets(parent)? {
            if let Some(typed) = self.maybe_as_type(resolved, type_name) {
                f(typed);
            }
        }
        Ok(())
    }

    pub fn logical_children(&self, parent: NodeId) -> Result<Vec<NodeId>, LookupError> {
        Ok(self
            .logical_children_with_targets(parent)?
            .into_iter()
            .map(|(_, resolved)| resolved)
            .collect())
    }

    /// Depth-first walk of every logical descendant. The targets of
    /// references are reported but not descended into.
    pub fn for_each_logical_descendant<F>(&self, node: NodeId, mut f: F) -> Result<(), LookupError>
    where
        F: FnMut(NodeId),
    {
        self.visit_descendants(node, &mut f)
    }

    fn visit_descendants(&self, node: NodeId, f: &mut dyn FnMut(NodeId)) -> Result<(), LookupError> {
        for (child, resolved) in self.logical_children_with_targets(node)? {
            f(resolved);
            if child == resolved {
                self.visit_descendants(resolved, f)?;
            }
        }
        Ok(())
    }

    /// Physical children of this one node, in document order
    pub fn for_each_physical_child<F>(&self, node: NodeId, mut f: F)
    where
        F: FnMut(NodeId),
    {
        for &child in &self.nodes[node].children {
            f(child);
        }
    }

    /// Highest member of every logical child chain, lowest pack first.
    /// Deleted children are skipped, references are left unresolved.
    pub fn logical_child_nodes(&self, parent: NodeId) -> Vec<NodeId> {
        let start = self
            .weak_cutoff(parent)
            .unwrap_or_else(|| self.lowest_precedence(parent));

        let mut result = Vec::new();
        let mut level = Some(start);
        while let Some(current) = level {
            for &child in &self.nodes[current].children {
                if self.nodes[child].higher.is_none() && !self.is_deleted(child) {
                    result.push(child);
                }
            }
            level = self.nodes[current].higher;
        }
        result
    }

    /// `(child, target)` for every logical child, where `child` is the
    /// highest member of the child's chain and `target` is what it resolves
    /// to. The two differ only for references. Stops at the first reference
    /// that fails to resolve.
    pub fn logical_children_with_targets(
        &self,
        parent: NodeId,
    ) -> Result<Vec<(NodeId, NodeId)>, LookupError> {
        self.logical_child_nodes(parent)
            .into_iter()
            .map(|child| self.resolve_references(child).map(|target| (child, target)))
            .collect()
    }

    /// Every reference below `node` that fails to resolve, depth first.
    /// Unlike the other walks this keeps going past a broken reference.
    pub fn broken_references(&self, node: NodeId) -> Vec<(NodeId, LookupError)> {
        let mut broken = Vec::new();
        self.collect_broken(node, &mut broken);
        broken
    }

    fn collect_broken(&self, node: NodeId, broken: &mut Vec<(NodeId, LookupError)>) {
        for child in self.logical_child_nodes(node) {
            match self.resolve_references(child) {
                Ok(target) if target == child => self.collect_broken(child, broken),
                Ok(_) => {}
                Err(e) => broken.push((child, e)),
            }
        }
    }

    /// Two handles name the same path if they share a chain
    pub fn weakly_equal(&self, a: NodeId, b: NodeId) -> bool {
        a == b || self.highest_precedence(a) == self.highest_precedence(b)
    }

    // ─── Links ──────────────────────────────────────────────────────────────

    /// Path of tags from the document root
    pub fn absolute_link(&self, id: NodeId) -> AssetLink {
        let mut tags = Vec::new();
        let mut current = id;
        while let Some(parent) = self.nodes[current].parent {
            tags.push(self.nodes[current].tag.clone());
            current = parent;
        }
        tags.reverse();
        AssetLink::from_tags(tags)
    }

    /// Link to `id` relative to the nearest of its ancestors that shares a
    /// chain with `base`, prefixed with that ancestor's logical type. Falls
    /// back to the absolute link if no ancestor matches.
    pub fn link_relative_to(&self, id: NodeId, base: NodeId) -> AssetLink {
        let node = &self.nodes[id];
        let Some(parent) = node.parent else {
            return AssetLink::new();
        };
        let mut link = if self.weakly_equal(parent, base) {
            let mut link = AssetLink::new();
            link.add_prefix(self.logical_type(parent).as_str());
            link
        } else {
            self.link_relative_to(parent, base)
        };
        link.add_tag(node.tag.clone());
        link
    }

    /// Resolve a link to a node.
    ///
    /// Prefixed links start at the nearest ancestor of `context` (inclusive)
    /// whose logical type matches the prefix. If none does, resolution falls
    /// back to the root and any error says so.
    pub fn lookup(&self, link: &AssetLink, context: Option<NodeId>) -> Result<NodeId, LookupError> {
        let mut hops = 0;
        self.lookup_counted(link, context, &mut hops)
    }

    fn lookup_counted(
        &self,
        link: &AssetLink,
        context: Option<NodeId>,
        hops: &mut usize,
    ) -> Result<NodeId, LookupError> {
        let root = self
            .any_root()
            .ok_or_else(|| LookupError::new(link.clone(), "", LookupErrorKind::EmptyNamespace))?;

        let mut start = None;
        let mut prefix_unmatched = false;
        if let Some(prefix) = link.prefix() {
            let context = context.ok_or_else(|| {
                LookupError::new(link.clone(), prefix, LookupErrorKind::MissingContext)
            })?;
            let mut cursor = Some(context);
            while let Some(current) = cursor {
                if self.logical_type(current).as_str() == prefix {
                    start = Some(current);
                    break;
                }
                cursor = self.nodes[current].parent;
            }
            if start.is_none() {
                warn!(link = %link, "no ancestor matched the link prefix, resolving from the root");
                prefix_unmatched = true;
            }
        }

        let mut current = start.unwrap_or(root);
        for tag in link.tags() {
            current = self.child_step(current, tag, link, hops).map_err(|mut e| {
                if e.link == *link {
                    e.prefix_unmatched = prefix_unmatched;
                }
                e
            })?;
        }
        Ok(current)
    }

    fn child_step(
        &self,
        parent: NodeId,
        tag: &str,
        link: &AssetLink,
        hops: &mut usize,
    ) -> Result<NodeId, LookupError> {
        let child = self
            .find_logical_child(parent, tag)
            .ok_or_else(|| LookupError::new(link.clone(), tag, LookupErrorKind::ChildNotFound))?;
        if self.is_deleted(child) {
            return Err(LookupError::new(link.clone(), tag, LookupErrorKind::Deleted));
        }
        self.resolve_counted(child, hops)
    }

    fn resolve_counted(&self, id: NodeId, hops: &mut usize) -> Result<NodeId, LookupError> {
        let mut current = self.highest_precedence(id);
        loop {
            if self.is_deleted(current) {
                let node = &self.nodes[current];
                return Err(LookupError::new(
                    self.absolute_link(current),
                    node.tag.clone(),
                    LookupErrorKind::Deleted,
                ));
            }
            if !self.logical_type(current).is_reference() {
                return Ok(current);
            }

            let link = self.reference_link(current)?;
            if *hops >= self.config().max_reference_hops {
                return Err(LookupError::new(
                    link,
                    self.nodes[current].tag.clone(),
                    LookupErrorKind::ReferenceCycle,
                ));
            }
            *hops += 1;

            let parent = self.nodes[current].parent;
            current = self.highest_precedence(self.lookup_counted(&link, parent, hops)?);
        }
    }

    /// The link stored in a reference node
    pub fn reference_link(&self, id: NodeId) -> Result<AssetLink, LookupError> {
        let invalid = || {
            LookupError::new(
                self.absolute_link(id),
                self.nodes[id].tag.clone(),
                LookupErrorKind::InvalidLink,
            )
        };
        self.attribute(id, REFERENCE_ATTRIBUTE)
            .and_then(|value| value.as_str())
            .ok_or_else(invalid)?
            .parse()
            .map_err(|_| invalid())
    }
}
