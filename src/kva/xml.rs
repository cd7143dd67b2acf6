//! Lightweight XML node tree and lenient value parsing.
//!
//! KVA documents are small, so reading goes through an owned node tree built
//! in one pass. Typed decoding then walks the tree; unknown elements are
//! logged and skipped at every level instead of failing the load.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::color::Color;
use crate::geometry::Point;
use crate::kva::error::KvaError;

/// One parsed XML element with its attributes, text content and children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// Parse a document into its root element.
    pub fn parse(xml: &str) -> Result<XmlNode, KvaError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);

        let mut stack: Vec<XmlNode> = Vec::new();
        let mut root: Option<XmlNode> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let mut node = XmlNode {
                        name: String::from_utf8_lossy(e.name().as_ref()).to_string(),
                        ..Default::default()
                    };
                    for attr in e.attributes().flatten() {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                        let value = attr.unescape_value().unwrap_or_default().to_string();
                        node.attributes.insert(key, value);
                    }
                    stack.push(node);
                }
                Ok(Event::Empty(ref e)) => {
                    let mut node = XmlNode {
                        name: String::from_utf8_lossy(e.name().as_ref()).to_string(),
                        ..Default::default()
                    };
                    for attr in e.attributes().flatten() {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
                        let value = attr.unescape_value().unwrap_or_default().to_string();
                        node.attributes.insert(key, value);
                    }
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
                Ok(Event::Text(ref e)) => {
                    if let Some(node) = stack.last_mut() {
                        node.text.push_str(&e.unescape().unwrap_or_default());
                    }
                }
                Ok(Event::End(_)) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| KvaError::invalid_document("unbalanced end tag"))?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(KvaError::Xml(e)),
                _ => {}
            }
        }

        root.ok_or_else(|| KvaError::invalid_document("no root element"))
    }

    /// First child with the given name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text content of the first child with the given name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Recursive lookup, used for elements whose depth varies across format
    /// versions (e.g. `FormatVersion`).
    pub fn descendant(&self, name: &str) -> Option<&XmlNode> {
        if let Some(node) = self.child(name) {
            return Some(node);
        }
        self.children.iter().find_map(|c| c.descendant(name))
    }

    /// Log every child element not in the handled set. This is the lenient
    /// side of the protocol: unknown content never fails a load.
    pub fn warn_unparsed(&self, handled: &[&str]) {
        for child in &self.children {
            if !handled.contains(&child.name.as_str()) {
                log::debug!("Unparsed content in KVA XML: <{}>", child.name);
            }
        }
    }
}

/// Parse a `"{X};{Y}"` pair. Malformed input logs and yields the origin.
pub fn parse_point(s: &str) -> Point {
    let mut parts = s.split(';');
    let parsed = (|| {
        let x = parts.next()?.trim().parse().ok()?;
        let y = parts.next()?.trim().parse().ok()?;
        Some(Point::new(x, y))
    })();

    parsed.unwrap_or_else(|| {
        log::error!("Malformed point value in KVA XML: {:?}", s);
        Point::new(0, 0)
    })
}

/// Parse a color, falling back to black on malformed input.
pub fn parse_color(s: &str) -> Color {
    Color::parse(s).unwrap_or_else(|| {
        log::error!("Malformed color value in KVA XML: {:?}", s);
        Color::BLACK
    })
}

/// Booleans written by older producers use "True"/"False"; the XML spec only
/// allows "true"/"false"/"1"/"0". Accept both, treating anything that is not
/// an explicit false as true.
pub fn parse_bool(s: &str) -> bool {
    !matches!(s, "false" | "False" | "0")
}

/// Parse an integer with a fallback default.
pub fn parse_int_or(s: &str, default: i64) -> i64 {
    s.trim().parse().unwrap_or_else(|_| {
        log::error!("Malformed integer value in KVA XML: {:?}", s);
        default
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tree() {
        let root = XmlNode::parse(
            r#"<Root><Child Key="k"><Value>12</Value></Child><Child Key="other"/></Root>"#,
        )
        .unwrap();

        assert_eq!(root.name, "Root");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.child("Child").unwrap().attribute("Key"), Some("k"));
        assert_eq!(root.child("Child").unwrap().child_text("Value"), Some("12"));
        assert_eq!(root.children_named("Child").count(), 2);
    }

    #[test]
    fn test_descendant() {
        let root =
            XmlNode::parse("<A><B><C><FormatVersion>2.0</FormatVersion></C></B></A>").unwrap();
        assert_eq!(root.descendant("FormatVersion").unwrap().text, "2.0");
    }

    #[test]
    fn test_parse_point() {
        assert_eq!(parse_point("12;34"), Point::new(12, 34));
        assert_eq!(parse_point("garbage"), Point::new(0, 0));
    }

    #[test]
    fn test_parse_bool_legacy_spellings() {
        assert!(parse_bool("true"));
        assert!(parse_bool("True"));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("False"));
        assert!(!parse_bool("0"));
        assert!(parse_bool("1"));
    }
}
