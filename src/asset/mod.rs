//! Asset Nodes
//!
//! The building blocks of every document tree:
//!
//! ```text
//! AssetNode
//! ├── tag: String                 unique among physical siblings
//! ├── physical_type: AssetType    Placeholder / Collection / Reference / Named
//! ├── attributes: Attributes      ordered key -> AttributeValue
//! ├── strongly_deleted / weakly_deleted
//! ├── parent, children            (NodeId handles, same document)
//! └── lower, higher               (NodeId handles, same path in adjacent trees)
//! ```
//!
//! Nodes are stored in the namespace's `NodeArena`; the logic that walks
//! precedence chains lives in `crate::namespace`.

mod attribute;
mod node;
mod types;

pub use attribute::{AttributeValue, AttributeVisitor, Attributes};
pub use node::{AssetNode, NodeArena, NodeId};
pub use types::{
    AssetType, TypeRegistry, COLLECTION_NAME, PLACEHOLDER_NAME, REFERENCE_ATTRIBUTE,
    REFERENCE_NAME, ROOT_NAME,
};
