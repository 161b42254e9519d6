//! Asset types
//!
//! Four types are built into the namespace because the precedence machinery
//! depends on them. Everything else is a named type that must be registered
//! before documents using it can be read.

use std::collections::BTreeSet;
use std::fmt;

/// Type name written for placeholder nodes that can't be collapsed
pub const PLACEHOLDER_NAME: &str = "Placeholder";
/// Type name written for reference nodes
pub const REFERENCE_NAME: &str = "Reference";
/// Type name for collections (normally written with no type name at all)
pub const COLLECTION_NAME: &str = "Collection";
/// Type name reported for document roots (never written)
pub const ROOT_NAME: &str = "Root";

/// Attribute holding the link of a reference node
pub const REFERENCE_ATTRIBUTE: &str = "asset";

/// The physical type of an asset node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AssetType {
    /// Root of a document
    Root,
    /// Exists only to establish a path; the logical type comes from below
    Placeholder,
    /// Untyped grouping node
    Collection,
    /// Indirection to another node via the `asset` attribute
    Reference,
    /// A registered game asset type, e.g. `Level` or `Texture`
    Named(String),
}

impl AssetType {
    pub fn named(name: impl Into<String>) -> Self {
        AssetType::Named(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            AssetType::Root => ROOT_NAME,
            AssetType::Placeholder => PLACEHOLDER_NAME,
            AssetType::Collection => COLLECTION_NAME,
            AssetType::Reference => REFERENCE_NAME,
            AssetType::Named(name) => name,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, AssetType::Placeholder)
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, AssetType::Reference)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Set of type names documents are allowed to use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeRegistry {
    names: BTreeSet<String>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_types<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for name in names {
            registry.register(name);
        }
        registry
    }

    /// Register a named type. Built-in names are accepted and ignored.
    pub fn register(&mut self, name: impl Into<String>) {
        let name = name.into();
        if Self::builtin(&name).is_none() {
            self.names.insert(name);
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        Self::builtin(name).is_some() || self.names.contains(name)
    }

    /// Look up a type by the name written in a document header
    pub fn resolve(&self, name: &str) -> Option<AssetType> {
        if let Some(builtin) = Self::builtin(name) {
            return Some(builtin);
        }
        self.names.get(name).map(|n| AssetType::Named(n.clone()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|n| n.as_str())
    }

    fn builtin(name: &str) -> Option<AssetType> {
        match name {
            PLACEHOLDER_NAME => Some(AssetType::Placeholder),
            COLLECTION_NAME => Some(AssetType::Collection),
            REFERENCE_NAME => Some(AssetType::Reference),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let registry = TypeRegistry::with_types(["Level", "Moby"]);
        assert_eq!(registry.resolve("Level"), Some(AssetType::named("Level")));
        assert_eq!(registry.resolve("Reference"), Some(AssetType::Reference));
        assert_eq!(registry.resolve("Placeholder"), Some(AssetType::Placeholder));
        assert_eq!(registry.resolve("Texture"), None);
        // Roots are never written, so their name isn't a valid header
        assert_eq!(registry.resolve("Root"), None);
    }

    #[test]
    fn test_builtin_not_stored() {
        let mut registry = TypeRegistry::new();
        registry.register("Collection");
        assert_eq!(registry.names().count(), 0);
        assert!(registry.contains("Collection"));
    }
}
