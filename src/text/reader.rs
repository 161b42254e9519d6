//! Recursive descent reader for the asset text format

use super::TextNode;
use crate::asset::AttributeValue;

/// Syntax error with the line it was detected on
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct SyntaxError {
    pub line: usize,
    pub message: String,
}

/// Parse a whole document into a root node.
pub fn parse(text: &str) -> Result<TextNode, SyntaxError> {
    let mut reader = Reader {
        input: text.as_bytes(),
        pos: 0,
        line: 1,
    };
    let mut root = TextNode::root();
    reader.read_body(&mut root)?;
    if reader.peek().is_some() {
        return Err(reader.error("extra '}' at end of file"));
    }
    Ok(root)
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Reader<'a> {
    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line,
            message: message.into(),
        }
    }

    /// Read attributes and child nodes until '}' or end of input
    fn read_body(&mut self, node: &mut TextNode) -> Result<(), SyntaxError> {
        while let Some(next) = self.peek() {
            if next == b'}' {
                break;
            }

            let line = self.line;
            let name = self
                .word()
                .ok_or_else(|| self.error(format!("expected attribute or node, got '{}'", self.snippet())))?;

            match self.peek() {
                Some(b':') => {
                    if name.contains('.') {
                        return Err(self.error(format!("invalid attribute name '{}'", name)));
                    }
                    self.advance();
                    let value = self.value()?;
                    node.attributes.push((name, value));
                }
                Some(b'{') => {
                    self.advance();
                    self.read_node(node, None, &name, line)?;
                }
                _ => {
                    if name.contains('.') {
                        return Err(self.error(format!("invalid type name '{}'", name)));
                    }
                    let tag = self
                        .word()
                        .ok_or_else(|| self.error("expected tag"))?;
                    if self.peek() != Some(b'{') {
                        return Err(self.error("expected '{'"));
                    }
                    self.advance();
                    self.read_node(node, Some(name), &tag, line)?;
                }
            }
        }
        Ok(())
    }

    /// Read the body of a node whose header has been consumed, expanding a
    /// dotted tag into collapsed parents.
    fn read_node(
        &mut self,
        parent: &mut TextNode,
        type_name: Option<String>,
        qualified_tag: &str,
        line: usize,
    ) -> Result<(), SyntaxError> {
        let segments: Vec<&str> = qualified_tag.split('.').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(self.error(format!("invalid tag '{}'", qualified_tag)));
        }

        let (leaf_tag, prefixes) = match segments.split_last() {
            Some(split) => split,
            None => return Err(self.error("expected tag")),
        };

        let mut leaf = TextNode {
            type_name,
            tag: leaf_tag.to_string(),
            collapsed: false,
            line,
            attributes: Vec::new(),
            children: Vec::new(),
        };
        self.read_body(&mut leaf)?;
        if self.peek() != Some(b'}') {
            return Err(self.error("unexpected end of file"));
        }
        self.advance();

        // Wrap the leaf in its collapsed ancestors, innermost first.
        let mut node = leaf;
        for prefix in prefixes.iter().rev() {
            node = TextNode {
                type_name: None,
                tag: prefix.to_string(),
                collapsed: true,
                line,
                attributes: Vec::new(),
                children: vec![node],
            };
        }
        parent.children.push(node);
        Ok(())
    }

    fn value(&mut self) -> Result<AttributeValue, SyntaxError> {
        match self.peek() {
            Some(b'\'') => self.string().map(AttributeValue::String),
            Some(b'[') => {
                self.advance();
                let mut elements = Vec::new();
                loop {
                    match self.peek() {
                        Some(b']') => {
                            self.advance();
                            break;
                        }
                        Some(_) => elements.push(self.value()?),
                        None => return Err(self.error("unexpected end of file while parsing array")),
                    }
                }
                Ok(AttributeValue::Array(elements))
            }
            Some(_) => {
                let rest = &self.input[self.pos..];
                if rest.starts_with(b"true") && !is_word_byte(rest.get(4)) {
                    self.pos += 4;
                    Ok(AttributeValue::Boolean(true))
                } else if rest.starts_with(b"false") && !is_word_byte(rest.get(5)) {
                    self.pos += 5;
                    Ok(AttributeValue::Boolean(false))
                } else if let Some((len, value)) = non_finite(rest) {
                    self.pos += len;
                    Ok(AttributeValue::Float(value))
                } else {
                    self.number()
                }
            }
            None => Err(self.error("expected value")),
        }
    }

    fn number(&mut self) -> Result<AttributeValue, SyntaxError> {
        let start = self.pos;
        let mut is_float = false;
        while let Some(&c) = self.input.get(self.pos) {
            match c {
                b'0'..=b'9' => {}
                b'-' | b'+' => {
                    let prev = if self.pos > start { self.input[self.pos - 1] } else { b'e' };
                    if prev != b'e' && prev != b'E' {
                        break;
                    }
                }
                b'.' | b'e' | b'E' => is_float = true,
                _ => break,
            }
            self.pos += 1;
        }

        let text = String::from_utf8_lossy(&self.input[start..self.pos]).to_string();
        let parsed = if is_float {
            text.parse::<f64>().ok().map(AttributeValue::Float)
        } else {
            text.parse::<i64>().ok().map(AttributeValue::Integer)
        };
        parsed.ok_or_else(|| {
            self.pos = start;
            self.error(format!("failed to parse number '{}'", text))
        })
    }

    fn string(&mut self) -> Result<String, SyntaxError> {
        self.advance(); // opening quote
        let mut bytes = Vec::new();
        loop {
            let c = match self.input.get(self.pos) {
                Some(&c) => c,
                None => return Err(self.error("unexpected end of file while parsing string")),
            };
            self.pos += 1;
            match c {
                b'\'' => break,
                b'\\' => {
                    let escaped = self
                        .input
                        .get(self.pos)
                        .copied()
                        .ok_or_else(|| self.error("unexpected end of file while parsing string"))?;
                    self.pos += 1;
                    match escaped {
                        b'n' => bytes.push(b'\n'),
                        b't' => bytes.push(b'\t'),
                        b'\'' => bytes.push(b'\''),
                        b'\\' => bytes.push(b'\\'),
                        b'x' => {
                            let hex = self
                                .input
                                .get(self.pos..self.pos + 2)
                                .and_then(|h| std::str::from_utf8(h).ok())
                                .and_then(|h| u8::from_str_radix(h, 16).ok())
                                .ok_or_else(|| self.error("invalid \\x escape"))?;
                            self.pos += 2;
                            bytes.push(hex);
                        }
                        other => {
                            return Err(self.error(format!("invalid escape '\\{}'", other as char)))
                        }
                    }
                }
                b'\n' => {
                    self.line += 1;
                    bytes.push(c);
                }
                _ => bytes.push(c),
            }
        }
        String::from_utf8(bytes).map_err(|_| self.error("string is not valid UTF-8"))
    }

    /// Identifier, optionally containing '.' separators
    fn word(&mut self) -> Option<String> {
        self.skip_whitespace();
        let start = self.pos;
        while is_word_byte(self.input.get(self.pos)) || self.input.get(self.pos) == Some(&b'.') {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        Some(String::from_utf8_lossy(&self.input[start..self.pos]).to_string())
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) {
        self.skip_whitespace();
        self.pos += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(&c) = self.input.get(self.pos) {
            match c {
                b'\n' => {
                    self.line += 1;
                    self.pos += 1;
                }
                b' ' | b'\t' | b'\r' => self.pos += 1,
                b'/' if self.input.get(self.pos + 1) == Some(&b'/') => {
                    while let Some(&c) = self.input.get(self.pos) {
                        if c == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                b'/' if self.input.get(self.pos + 1) == Some(&b'*') => {
                    self.pos += 2;
                    while self.pos < self.input.len() && !self.input[self.pos..].starts_with(b"*/") {
                        if self.input[self.pos] == b'\n' {
                            self.line += 1;
                        }
                        self.pos += 1;
                    }
                    self.pos = (self.pos + 2).min(self.input.len());
                }
                _ => break,
            }
        }
    }

    fn snippet(&self) -> String {
        let end = (self.pos + 16).min(self.input.len());
        String::from_utf8_lossy(&self.input[self.pos..end]).to_string()
    }
}

fn is_word_byte(c: Option<&u8>) -> bool {
    matches!(c, Some(c) if c.is_ascii_alphanumeric() || *c == b'_')
}

/// `nan`, `inf` or `-inf` at the start of `rest`, with its length
fn non_finite(rest: &[u8]) -> Option<(usize, f64)> {
    [
        (&b"nan"[..], f64::NAN),
        (&b"inf"[..], f64::INFINITY),
        (&b"-inf"[..], f64::NEG_INFINITY),
    ]
    .into_iter()
    .find(|(token, _)| rest.starts_with(token) && !is_word_byte(rest.get(token.len())))
    .map(|(token, value)| (token.len(), value))
}

/// True if `name` can be written as a tag or attribute key and read back
/// unchanged.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|c| is_word_byte(Some(&c)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nodes_and_attributes() {
        let root = parse(
            "format: 1\n\
             Level level0 {\n\
                 height: 10\n\
                 scale: 0.5\n\
                 name: 'first level'\n\
                 visible: true\n\
                 spawn: [0 1.5 -2]\n\
                 Moby moby9 {}\n\
             }\n",
        )
        .unwrap();

        assert_eq!(root.attribute("format"), Some(&AttributeValue::Integer(1)));
        let level = root.child("level0").unwrap();
        assert_eq!(level.type_name.as_deref(), Some("Level"));
        assert_eq!(level.line, 2);
        assert_eq!(level.attribute("height"), Some(&AttributeValue::Integer(10)));
        assert_eq!(level.attribute("scale"), Some(&AttributeValue::Float(0.5)));
        assert_eq!(level.attribute("name"), Some(&AttributeValue::String("first level".into())));
        assert_eq!(level.attribute("visible"), Some(&AttributeValue::Boolean(true)));
        assert_eq!(
            level.attribute("spawn"),
            Some(&AttributeValue::Array(vec![
                AttributeValue::Integer(0),
                AttributeValue::Float(1.5),
                AttributeValue::Integer(-2),
            ]))
        );
        assert_eq!(level.children.len(), 1);
        assert_eq!(level.children[0].tag, "moby9");
    }

    #[test]
    fn test_parse_collapsed_tag() {
        let root = parse("Moby level0.things.moby10 { x: 1 }").unwrap();
        let level = root.child("level0").unwrap();
        assert!(level.collapsed);
        assert_eq!(level.type_name, None);
        let things = level.child("things").unwrap();
        assert!(things.collapsed);
        let moby = things.child("moby10").unwrap();
        assert!(!moby.collapsed);
        assert_eq!(moby.type_name.as_deref(), Some("Moby"));
        assert_eq!(moby.attribute("x"), Some(&AttributeValue::Integer(1)));
    }

    #[test]
    fn test_parse_untyped_node() {
        let root = parse("stuff { a: 1 }").unwrap();
        let stuff = root.child("stuff").unwrap();
        assert_eq!(stuff.type_name, None);
        assert!(!stuff.collapsed);
    }

    #[test]
    fn test_parse_comments_and_escapes() {
        let root = parse(
            "// leading comment\n\
             /* block\n comment */ name: 'it\\'s a \\x41\\n'\n",
        )
        .unwrap();
        assert_eq!(
            root.attribute("name"),
            Some(&AttributeValue::String("it's a A\n".into()))
        );
    }

    #[test]
    fn test_syntax_errors_report_line() {
        let err = parse("Level level0 {\n  height: 10\n").unwrap_err();
        assert!(err.message.contains("end of file"));

        let err = parse("a: 1\nb: 'unterminated").unwrap_err();
        assert_eq!(err.line, 2);

        let err = parse("a: 1\n}").unwrap_err();
        assert!(err.message.contains("extra"));

        let err = parse("\n\nLevel level0 height").unwrap_err();
        assert_eq!(err.line, 3);

        assert!(parse("a.b: 1").is_err());
        assert!(parse("Moby a..b {}").is_err());
        assert!(parse("x: truex").is_err());
        assert!(parse("x: infinity").is_err());
    }

    #[test]
    fn test_parse_non_finite_floats() {
        let root = parse("a: nan\nb: [inf -inf 1]\n").unwrap();
        assert!(matches!(root.attribute("a"), Some(AttributeValue::Float(f)) if f.is_nan()));
        assert_eq!(
            root.attribute("b"),
            Some(&AttributeValue::Array(vec![
                AttributeValue::Float(f64::INFINITY),
                AttributeValue::Float(f64::NEG_INFINITY),
                AttributeValue::Integer(1),
            ]))
        );
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name("moby9"));
        assert!(is_valid_name("_x"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("a.b"));
        assert!(!is_valid_name("a b"));
        assert!(!is_valid_name("caf\u{e9}"));
    }

    #[test]
    fn test_parse_empty() {
        let root = parse("  // nothing here\n").unwrap();
        assert!(root.children.is_empty());
        assert!(root.attributes.is_empty());
    }
}
