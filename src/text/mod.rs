//! Asset Text Format
//!
//! `.asset` documents are plain text trees of nodes and attributes:
//!
//! ```text
//! format_hint: 'example'
//!
//! Level level0 {
//!     height: 10
//!     spawn: [0 1.5 -2]
//!
//!     Moby moby9 {
//!         name: 'crate'
//!     }
//! }
//!
//! Moby level0.things.moby10 {}   // placeholders `level0` and `things`
//! ```
//!
//! A node header is `TypeName tag {` or just `tag {` for an untyped node. A
//! dotted tag is a collapsed path: every segment but the last becomes an
//! untyped, collapsed node. The reader and writer here know nothing about
//! asset types or precedence, they only move trees in and out of text.

mod reader;
mod writer;

pub use reader::{is_valid_name, parse, SyntaxError};
pub use writer::TextWriter;

use crate::asset::AttributeValue;

/// One node of a parsed text tree
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    /// Explicit type name, if the header had one
    pub type_name: Option<String>,
    /// Unqualified tag (collapsed prefixes are expanded into parent nodes)
    pub tag: String,
    /// True for nodes synthesized from a dotted tag prefix
    pub collapsed: bool,
    /// Line of the node header (1-based, 0 for the root)
    pub line: usize,
    pub attributes: Vec<(String, AttributeValue)>,
    pub children: Vec<TextNode>,
}

impl TextNode {
    /// An empty document root
    pub fn root() -> Self {
        Self {
            type_name: None,
            tag: String::new(),
            collapsed: false,
            line: 0,
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Look up an attribute by key (first occurrence)
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Find a direct child by tag
    pub fn child(&self, tag: &str) -> Option<&TextNode> {
        self.children.iter().find(|c| c.tag == tag)
    }
}
