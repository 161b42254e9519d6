//! Asset Links
//!
//! A link names a node in the namespace by the tags on the path from a
//! document root. Links come in two flavours:
//!
//! ```text
//! level0.moby9          absolute: resolved from the root
//! Level:moby9           relative: resolved from the nearest ancestor of the
//!                       context node whose logical type is `Level`
//! ```
//!
//! The empty link names the root itself.

use std::fmt;
use std::str::FromStr;

/// Separator between the type prefix and the first tag
pub const PREFIX_SEPARATOR: char = ':';

/// Separator between tags
pub const TAG_SEPARATOR: char = '.';

/// Error produced when parsing a link from text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
    #[error("link '{0}' has more than one type prefix")]
    MultiplePrefixes(String),
    #[error("link '{0}' has a type prefix but no tags")]
    PrefixWithoutTags(String),
    #[error("link '{0}' contains an empty tag")]
    EmptyTag(String),
    #[error("link '{0}' has an invalid type prefix")]
    InvalidPrefix(String),
}

/// A path through the asset tree, optionally anchored to a typed ancestor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AssetLink {
    prefix: Option<String>,
    tags: Vec<String>,
}

impl AssetLink {
    /// Create an empty (root) link
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an absolute link from a list of tags
    pub fn from_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix: None,
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a link from its text form.
    pub fn parse(src: &str) -> Result<Self, LinkError> {
        if src.is_empty() {
            return Ok(Self::new());
        }

        let (prefix, body) = match src.split_once(PREFIX_SEPARATOR) {
            Some((prefix, body)) => {
                if body.contains(PREFIX_SEPARATOR) {
                    return Err(LinkError::MultiplePrefixes(src.to_string()));
                }
                if prefix.is_empty() || prefix.contains(TAG_SEPARATOR) {
                    return Err(LinkError::InvalidPrefix(src.to_string()));
                }
                if body.is_empty() {
                    return Err(LinkError::PrefixWithoutTags(src.to_string()));
                }
                (Some(prefix.to_string()), body)
            }
            None => (None, src),
        };

        let mut tags = Vec::new();
        for tag in body.split(TAG_SEPARATOR) {
            if tag.is_empty() {
                return Err(LinkError::EmptyTag(src.to_string()));
            }
            tags.push(tag.to_string());
        }

        Ok(Self { prefix, tags })
    }

    /// Anchor this link to an ancestor of the given type.
    ///
    /// # Panics
    /// Panics if the link already has a prefix or any tags, since the prefix
    /// must come first.
    pub fn add_prefix(&mut self, type_name: impl Into<String>) {
        assert!(
            self.prefix.is_none() && self.tags.is_empty(),
            "a link prefix must be added before any tags"
        );
        self.prefix = Some(type_name.into());
    }

    /// Append a tag to the end of the link
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        self.tags.push(tag.into());
    }

    /// Builder-style version of `add_tag`
    pub fn join(mut self, tag: impl Into<String>) -> Self {
        self.add_tag(tag);
        self
    }

    /// The type-name anchor, if this is a relative link
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// The tags in root-to-leaf order
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// True if the link is resolved relative to a context node
    pub fn is_relative(&self) -> bool {
        self.prefix.is_some()
    }

    /// True for the root link (no prefix and no tags)
    pub fn is_empty(&self) -> bool {
        self.prefix.is_none() && self.tags.is_empty()
    }

    /// The link to the parent of the named node, or `None` for the root
    pub fn parent(&self) -> Option<AssetLink> {
        if self.tags.is_empty() {
            return None;
        }
        Some(Self {
            prefix: self.prefix.clone(),
            tags: self.tags[..self.tags.len() - 1].to_vec(),
        })
    }
}

impl fmt::Display for AssetLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, "{}{}", prefix, PREFIX_SEPARATOR)?;
        }
        for (i, tag) in self.tags.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", TAG_SEPARATOR)?;
            }
            write!(f, "{}", tag)?;
        }
        Ok(())
    }
}

impl FromStr for AssetLink {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute() {
        let link = AssetLink::parse("level0.moby9").unwrap();
        assert!(!link.is_relative());
        assert_eq!(link.prefix(), None);
        assert_eq!(link.tags(), &["level0".to_string(), "moby9".to_string()]);
        assert_eq!(link.to_string(), "level0.moby9");
    }

    #[test]
    fn test_parse_relative() {
        let link: AssetLink = "Level:moby9".parse().unwrap();
        assert!(link.is_relative());
        assert_eq!(link.prefix(), Some("Level"));
        assert_eq!(link.tags(), &["moby9".to_string()]);
        assert_eq!(link.to_string(), "Level:moby9");
    }

    #[test]
    fn test_parse_empty_is_root() {
        let link = AssetLink::parse("").unwrap();
        assert!(link.is_empty());
        assert_eq!(link.to_string(), "");
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            AssetLink::parse("a:b:c"),
            Err(LinkError::MultiplePrefixes(_))
        ));
        assert!(matches!(
            AssetLink::parse("Level:"),
            Err(LinkError::PrefixWithoutTags(_))
        ));
        assert!(matches!(AssetLink::parse("a..b"), Err(LinkError::EmptyTag(_))));
        assert!(matches!(AssetLink::parse("a."), Err(LinkError::EmptyTag(_))));
        assert!(matches!(
            AssetLink::parse("a.b:c"),
            Err(LinkError::InvalidPrefix(_))
        ));
    }

    #[test]
    fn test_builders() {
        let mut link = AssetLink::new();
        link.add_prefix("Level");
        link.add_tag("spawn1");
        assert_eq!(link.to_string(), "Level:spawn1");

        let link = AssetLink::from_tags(["a", "b"]).join("c");
        assert_eq!(link.to_string(), "a.b.c");
        assert_eq!(link.parent().unwrap().to_string(), "a.b");
        assert_eq!(AssetLink::new().parent(), None);
    }

    #[test]
    #[should_panic(expected = "prefix must be added before any tags")]
    fn test_prefix_after_tags_panics() {
        let mut link = AssetLink::from_tags(["a"]);
        link.add_prefix("Level");
    }
}
