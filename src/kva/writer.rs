//! Helper over `quick_xml::Writer` for the KVA dialect.
//!
//! Points are written as `"{X};{Y}"`, booleans as `true`/`false`, floats
//! with the invariant decimal point.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::color::Color;
use crate::geometry::Point;
use crate::kva::error::KvaError;

/// An XML writer targeting an in-memory buffer.
pub struct KvaWriter {
    writer: Writer<Vec<u8>>,
}

impl KvaWriter {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
        }
    }

    pub fn new_indented() -> Self {
        Self {
            writer: Writer::new_with_indent(Vec::new(), b' ', 2),
        }
    }

    pub fn declaration(&mut self) -> Result<(), KvaError> {
        self.writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))
            .map_err(into_kva)
    }

    pub fn start(&mut self, name: &str) -> Result<(), KvaError> {
        self.writer
            .write_event(Event::Start(BytesStart::new(name)))
            .map_err(into_kva)
    }

    pub fn start_with_attr(&mut self, name: &str, key: &str, value: &str) -> Result<(), KvaError> {
        let mut elem = BytesStart::new(name);
        elem.push_attribute((key, value));
        self.writer
            .write_event(Event::Start(elem))
            .map_err(into_kva)
    }

    pub fn end(&mut self, name: &str) -> Result<(), KvaError> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(into_kva)
    }

    /// `<name>value</name>`
    pub fn element(&mut self, name: &str, value: &str) -> Result<(), KvaError> {
        self.start(name)?;
        self.writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(into_kva)?;
        self.end(name)
    }

    pub fn point_element(&mut self, name: &str, p: Point) -> Result<(), KvaError> {
        self.element(name, &format!("{};{}", p.x, p.y))
    }

    pub fn color_element(&mut self, name: &str, c: Color) -> Result<(), KvaError> {
        self.element(name, &c.to_string())
    }

    pub fn bool_element(&mut self, name: &str, value: bool) -> Result<(), KvaError> {
        self.element(name, if value { "true" } else { "false" })
    }

    pub fn int_element(&mut self, name: &str, value: i64) -> Result<(), KvaError> {
        self.element(name, &value.to_string())
    }

    pub fn float_element(&mut self, name: &str, value: f64) -> Result<(), KvaError> {
        // Rust always formats with '.', which is what the format requires.
        self.element(name, &format!("{}", value))
    }

    pub fn text(&mut self, value: &str) -> Result<(), KvaError> {
        self.writer
            .write_event(Event::Text(BytesText::new(value)))
            .map_err(into_kva)
    }

    pub fn into_string(self) -> Result<String, KvaError> {
        String::from_utf8(self.writer.into_inner())
            .map_err(|_| KvaError::invalid_document("invalid UTF-8 produced by writer"))
    }
}

impl Default for KvaWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn into_kva(e: quick_xml::Error) -> KvaError {
    match e {
        // The Arc wrapper has no Error impl, so the io::Error is rebuilt.
        quick_xml::Error::Io(io) => KvaError::Io(std::io::Error::new(io.kind(), io.to_string())),
        other => KvaError::Xml(other),
    }
}
