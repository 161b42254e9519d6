//! Namespace error types

use std::fmt;

use crate::link::AssetLink;
use crate::storage::StorageError;

/// Why a lookup failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupErrorKind {
    /// No pack with any document is mounted
    EmptyNamespace,
    /// A prefixed link was looked up without a context node
    MissingContext,
    ChildNotFound,
    Deleted,
    /// Reference chain exceeded the configured hop limit
    ReferenceCycle,
    /// A reference node holds no usable link
    InvalidLink,
    /// The asset's logical type is not the one asked for
    WrongType,
}

impl fmt::Display for LookupErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            LookupErrorKind::EmptyNamespace => "the namespace is empty",
            LookupErrorKind::MissingContext => "relative link has no context",
            LookupErrorKind::ChildNotFound => "no such child",
            LookupErrorKind::Deleted => "asset is deleted",
            LookupErrorKind::ReferenceCycle => "reference cycle",
            LookupErrorKind::InvalidLink => "invalid reference link",
            LookupErrorKind::WrongType => "asset has the wrong type",
        };
        f.write_str(text)
    }
}

/// A failed lookup, with the link being resolved and the segment that failed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at '{segment}' while looking up '{link}'{}", unmatched_note(.prefix_unmatched))]
pub struct LookupError {
    pub link: AssetLink,
    pub segment: String,
    pub kind: LookupErrorKind,
    /// The link had a prefix but resolution fell back to the root
    pub prefix_unmatched: bool,
}

impl LookupError {
    pub(crate) fn new(link: AssetLink, segment: impl Into<String>, kind: LookupErrorKind) -> Self {
        Self {
            link,
            segment: segment.into(),
            kind,
            prefix_unmatched: false,
        }
    }
}

fn unmatched_note(prefix_unmatched: &bool) -> &'static str {
    if *prefix_unmatched {
        " (no ancestor matched the prefix)"
    } else {
        ""
    }
}

/// Errors from mounting, reading and writing packs
#[derive(Debug, thiserror::Error)]
pub enum PackError {
    #[error("pack {pack} is locked by process {holder}")]
    Locked { pack: String, holder: u32 },
    #[error("storage error in {pack}: {source}")]
    Storage {
        pack: String,
        #[source]
        source: StorageError,
    },
    #[error("syntax error in {path} line {line}: {message}")]
    Parse {
        path: String,
        line: usize,
        message: String,
    },
    #[error("invalid asset type '{name}' in {path} line {line}")]
    UnknownType {
        path: String,
        line: usize,
        name: String,
    },
    #[error("pack metadata error in {pack}: {message}")]
    Metadata { pack: String, message: String },
}

/// Why a rename was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenameError {
    #[error("an asset tagged '{0}' already exists")]
    TagTaken(String),
    /// Tags are limited to ASCII letters, digits and '_'
    #[error("'{0}' is not a valid asset tag")]
    InvalidTag(String),
}
