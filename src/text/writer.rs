//! Streaming writer for the asset text format
//!
//! Output mirrors the layout people write by hand: one tab per nesting level,
//! a blank line between a node and whatever came before it at the same
//! depth, arrays written inline.

use crate::asset::AttributeValue;

#[derive(Debug, Default)]
pub struct TextWriter {
    dest: String,
    indent: usize,
    /// Something has been written at the current depth
    add_blank_line: bool,
    array_depth: usize,
    /// No element has been written in the innermost open array yet
    array_empty: bool,
}

impl TextWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume the writer and return the text
    pub fn finish(self) -> String {
        self.dest
    }

    fn write_indent(&mut self) {
        for _ in 0..self.indent {
            self.dest.push('\t');
        }
    }

    pub fn begin_node(&mut self, type_name: Option<&str>, qualified_tag: &str) {
        if self.add_blank_line {
            self.dest.push('\n');
        }
        self.write_indent();
        match type_name {
            Some(type_name) => self.dest.push_str(&format!("{} {} {{\n", type_name, qualified_tag)),
            None => self.dest.push_str(&format!("{} {{\n", qualified_tag)),
        }
        self.indent += 1;
        self.add_blank_line = false;
    }

    pub fn end_node(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.write_indent();
        self.dest.push_str("}\n");
        self.add_blank_line = true;
    }

    pub fn begin_attribute(&mut self, key: &str) {
        self.write_indent();
        self.dest.push_str(key);
        self.dest.push_str(": ");
    }

    pub fn end_attribute(&mut self) {
        self.dest.push('\n');
        self.add_blank_line = true;
    }

    fn separate(&mut self) {
        if self.array_depth > 0 {
            if !self.array_empty {
                self.dest.push(' ');
            }
            self.array_empty = false;
        }
    }

    pub fn write_integer(&mut self, i: i64) {
        self.separate();
        self.dest.push_str(&i.to_string());
    }

    /// Floats always carry a '.' or exponent so they read back as floats.
    /// Non-finite values are written as `nan`, `inf` and `-inf`.
    pub fn write_float(&mut self, f: f64) {
        self.separate();
        if f.is_nan() {
            self.dest.push_str("nan");
        } else if f.is_infinite() {
            self.dest.push_str(if f > 0.0 { "inf" } else { "-inf" });
        } else {
            self.dest.push_str(&format!("{:?}", f));
        }
    }

    pub fn write_boolean(&mut self, b: bool) {
        self.separate();
        self.dest.push_str(if b { "true" } else { "false" });
    }

    pub fn write_string(&mut self, string: &str) {
        self.separate();
        self.dest.push('\'');
        for c in string.chars() {
            match c {
                '\'' => self.dest.push_str("\\'"),
                '\\' => self.dest.push_str("\\\\"),
                '\n' => self.dest.push_str("\\n"),
                '\t' => self.dest.push_str("\\t"),
                c if (c as u32) < 0x20 => self.dest.push_str(&format!("\\x{:02x}", c as u32)),
                c => self.dest.push(c),
            }
        }
        self.dest.push('\'');
    }

    pub fn begin_array(&mut self) {
        self.separate();
        self.dest.push('[');
        self.array_depth += 1;
        self.array_empty = true;
    }

    pub fn end_array(&mut self) {
        self.dest.push(']');
        self.array_depth = self.array_depth.saturating_sub(1);
        self.array_empty = false;
    }

    pub fn write_value(&mut self, value: &AttributeValue) {
        match value {
            AttributeValue::Integer(i) => self.write_integer(*i),
            AttributeValue::Float(f) => self.write_float(*f),
            AttributeValue::Boolean(b) => self.write_boolean(*b),
            AttributeValue::String(s) => self.write_string(s),
            AttributeValue::Array(elements) => {
                self.begin_array();
                for element in elements {
                    self.write_value(element);
                }
                self.end_array();
            }
        }
    }

    /// Convenience for `begin_attribute` + `write_value` + `end_attribute`
    pub fn write_attribute(&mut self, key: &str, value: &AttributeValue) {
        self.begin_attribute(key);
        self.write_value(value);
        self.end_attribute();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::parse;

    #[test]
    fn test_layout() {
        let mut w = TextWriter::new();
        w.write_attribute("format", &AttributeValue::Integer(1));
        w.begin_node(Some("Level"), "level0");
        w.write_attribute("height", &AttributeValue::Integer(10));
        w.begin_node(None, "things.box");
        w.end_node();
        w.end_node();

        assert_eq!(
            w.finish(),
            "format: 1\n\nLevel level0 {\n\theight: 10\n\n\tthings.box {\n\t}\n}\n"
        );
    }

    #[test]
    fn test_values_read_back() {
        let values = vec![
            AttributeValue::Integer(-7),
            AttributeValue::Float(10.0),
            AttributeValue::Float(1e-9),
            AttributeValue::Boolean(false),
            AttributeValue::String("tab\there 'quoted' \\ \u{1}".into()),
            AttributeValue::Array(vec![
                AttributeValue::Array(vec![]),
                AttributeValue::Integer(1),
                AttributeValue::String("x".into()),
            ]),
        ];

        let mut w = TextWriter::new();
        for (i, value) in values.iter().enumerate() {
            w.write_attribute(&format!("v{}", i), value);
        }
        let root = parse(&w.finish()).unwrap();

        for (i, value) in values.iter().enumerate() {
            assert_eq!(root.attribute(&format!("v{}", i)), Some(value));
        }
    }

    #[test]
    fn test_non_finite_floats_read_back() {
        let mut w = TextWriter::new();
        w.write_attribute("a", &AttributeValue::Float(f64::NAN));
        w.write_attribute("b", &AttributeValue::Float(f64::INFINITY));
        w.write_attribute(
            "c",
            &AttributeValue::Array(vec![
                AttributeValue::Float(f64::NEG_INFINITY),
                AttributeValue::Float(-0.5),
            ]),
        );
        let text = w.finish();
        assert_eq!(text, "a: nan\nb: inf\nc: [-inf -0.5]\n");

        let root = parse(&text).unwrap();
        assert!(matches!(root.attribute("a"), Some(AttributeValue::Float(f)) if f.is_nan()));
        assert_eq!(root.attribute("b"), Some(&AttributeValue::Float(f64::INFINITY)));
        assert_eq!(
            root.attribute("c"),
            Some(&AttributeValue::Array(vec![
                AttributeValue::Float(f64::NEG_INFINITY),
                AttributeValue::Float(-0.5),
            ]))
        );
    }
}
