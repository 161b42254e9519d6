//! Attribute values carried by asset nodes
//!
//! Payload data (texture paths, heights, flags...) is stored as a small,
//! closed set of value kinds so the namespace can read, merge and write it
//! without knowing anything about the asset types involved.

use std::fmt;

/// A single attribute value
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    String(String),
    Array(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Short name of the value kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::Integer(_) => "integer",
            AttributeValue::Float(_) => "float",
            AttributeValue::Boolean(_) => "boolean",
            AttributeValue::String(_) => "string",
            AttributeValue::Array(_) => "array",
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttributeValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as a float (integers are widened)
    pub fn as_float(&self) -> Option<f64> {
        match self {
            AttributeValue::Float(f) => Some(*f),
            AttributeValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[AttributeValue]> {
        match self {
            AttributeValue::Array(elements) => Some(elements),
            _ => None,
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Integer(i) => write!(f, "{}", i),
            AttributeValue::Float(v) => write!(f, "{:?}", v),
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::String(s) => write!(f, "'{}'", s),
            AttributeValue::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Integer(i)
    }
}

impl From<i32> for AttributeValue {
    fn from(i: i32) -> Self {
        AttributeValue::Integer(i as i64)
    }
}

impl From<f64> for AttributeValue {
    fn from(f: f64) -> Self {
        AttributeValue::Float(f)
    }
}

impl From<bool> for AttributeValue {
    fn from(b: bool) -> Self {
        AttributeValue::Boolean(b)
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::String(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::String(s)
    }
}

/// Receives the attributes of a node one at a time.
///
/// Any `FnMut(&str, &AttributeValue)` closure is a visitor.
pub trait AttributeVisitor {
    fn visit(&mut self, key: &str, value: &AttributeValue);
}

impl<F> AttributeVisitor for F
where
    F: FnMut(&str, &AttributeValue),
{
    fn visit(&mut self, key: &str, value: &AttributeValue) {
        self(key, value)
    }
}

/// Ordered key/value list. Keys are unique; setting an existing key keeps its
/// position so files round-trip without reordering.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    entries: Vec<(String, AttributeValue)>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or replace a value, returning the previous one
    pub fn set(&mut self, key: impl Into<String>, value: AttributeValue) -> Option<AttributeValue> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => Some(std::mem::replace(existing, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<AttributeValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Feed every attribute to a visitor, in order
    pub fn visit(&self, visitor: &mut dyn AttributeVisitor) {
        for (key, value) in &self.entries {
            visitor.visit(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_keeps_position() {
        let mut attributes = Attributes::new();
        attributes.set("height", 10.into());
        attributes.set("name", "box".into());
        let old = attributes.set("height", 12.into());

        assert_eq!(old, Some(AttributeValue::Integer(10)));
        let keys: Vec<&str> = attributes.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["height", "name"]);
        assert_eq!(attributes.get("height").and_then(|v| v.as_integer()), Some(12));
    }

    #[test]
    fn test_remove() {
        let mut attributes = Attributes::new();
        attributes.set("a", true.into());
        assert_eq!(attributes.remove("a"), Some(AttributeValue::Boolean(true)));
        assert_eq!(attributes.remove("a"), None);
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_closure_visitor() {
        let mut attributes = Attributes::new();
        attributes.set("x", 1.5.into());
        attributes.set("tags", AttributeValue::Array(vec!["a".into(), "b".into()]));

        let mut seen = Vec::new();
        attributes.visit(&mut |key: &str, value: &AttributeValue| {
            seen.push(format!("{}={}", key, value));
        });
        assert_eq!(seen, vec!["x=1.5", "tags=['a' 'b']"]);
    }

    #[test]
    fn test_accessors() {
        assert_eq!(AttributeValue::Integer(3).as_float(), Some(3.0));
        assert_eq!(AttributeValue::Float(3.0).as_integer(), None);
        assert_eq!(AttributeValue::from("x").as_str(), Some("x"));
        assert_eq!(AttributeValue::from(false).kind(), "boolean");
    }
}
