//! Style elements and their container.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::color::Color;
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;
use crate::style::properties::{StyleProperties, StyleTarget};

/// Arrow decoration at the extremities of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LineEnding {
    #[default]
    None,
    StartArrow,
    EndArrow,
    DoubleArrow,
}

impl LineEnding {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "None" => Some(Self::None),
            "StartArrow" => Some(Self::StartArrow),
            "EndArrow" => Some(Self::EndArrow),
            "DoubleArrow" => Some(Self::DoubleArrow),
            _ => None,
        }
    }
}

impl fmt::Display for LineEnding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "None",
            Self::StartArrow => "StartArrow",
            Self::EndArrow => "EndArrow",
            Self::DoubleArrow => "DoubleArrow",
        };
        f.write_str(s)
    }
}

/// Rendering of a trajectory polyline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TrackShape {
    #[default]
    Solid,
    Dash,
    SolidSteps,
    DashSteps,
}

impl TrackShape {
    pub fn dashed(self) -> bool {
        matches!(self, Self::Dash | Self::DashSteps)
    }

    pub fn stepped(self) -> bool {
        matches!(self, Self::SolidSteps | Self::DashSteps)
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "Solid" => Some(Self::Solid),
            "Dash" => Some(Self::Dash),
            "SolidSteps" => Some(Self::SolidSteps),
            "DashSteps" => Some(Self::DashSteps),
            _ => None,
        }
    }
}

impl fmt::Display for TrackShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Solid => "Solid",
            Self::Dash => "Dash",
            Self::SolidSteps => "SolidSteps",
            Self::DashSteps => "DashSteps",
        };
        f.write_str(s)
    }
}

pub const FONT_SIZES: [i32; 13] = [8, 9, 10, 11, 12, 14, 16, 18, 20, 24, 28, 32, 36];
pub const PEN_SIZES: [i32; 12] = [2, 3, 4, 5, 7, 9, 11, 13, 16, 19, 22, 25];
pub const LINE_SIZES: [i32; 8] = [2, 3, 4, 5, 7, 9, 11, 13];

const DEFAULT_FONT_SIZE: i32 = 10;
const DEFAULT_PEN_SIZE: i32 = 2;
const DEFAULT_LINE_SIZE: i32 = 2;

/// One editable style value, closed over the kinds the tools use.
///
/// Each kind owns its persisted element name and its set of authorized
/// values. A value read from a document that falls outside the set is
/// replaced by the kind's default rather than rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum StyleElement {
    Color(Color),
    FontSize(i32),
    PenSize(i32),
    LineSize(i32),
    LineEnding(LineEnding),
    TrackShape(TrackShape),
}

impl StyleElement {
    /// Element name used in documents.
    pub fn xml_name(&self) -> &'static str {
        match self {
            Self::Color(_) => "Color",
            Self::FontSize(_) => "FontSize",
            Self::PenSize(_) => "PenSize",
            Self::LineSize(_) => "LineSize",
            Self::LineEnding(_) => "Arrows",
            Self::TrackShape(_) => "TrackShape",
        }
    }

    /// Builds an element of the kind persisted under `xml_name`, taking its
    /// value from the `Value` child of `node`. Out-of-range or unparsable
    /// values fall back to the kind's default.
    pub fn read_kva(xml_name: &str, node: &XmlNode) -> Option<Self> {
        let value = node.child_text("Value").unwrap_or_default();
        match xml_name {
            "Color" => Some(Self::Color(xml::parse_color(&value))),
            "FontSize" => Some(Self::FontSize(clamp_to_set(
                &value,
                &FONT_SIZES,
                DEFAULT_FONT_SIZE,
            ))),
            "PenSize" => Some(Self::PenSize(clamp_to_set(
                &value,
                &PEN_SIZES,
                DEFAULT_PEN_SIZE,
            ))),
            "LineSize" => Some(Self::LineSize(clamp_to_set(
                &value,
                &LINE_SIZES,
                DEFAULT_LINE_SIZE,
            ))),
            "Arrows" => Some(Self::LineEnding(
                LineEnding::parse(&value).unwrap_or_default(),
            )),
            "TrackShape" => Some(Self::TrackShape(
                TrackShape::parse(&value).unwrap_or_default(),
            )),
            _ => None,
        }
    }

    pub fn write_kva(&self, writer: &mut KvaWriter, key: &str) -> Result<(), KvaError> {
        writer.start_with_attr(self.xml_name(), "Key", key)?;
        let value = match self {
            Self::Color(c) => c.to_string(),
            Self::FontSize(v) | Self::PenSize(v) | Self::LineSize(v) => v.to_string(),
            Self::LineEnding(v) => v.to_string(),
            Self::TrackShape(v) => v.to_string(),
        };
        writer.element("Value", &value)?;
        writer.end(self.xml_name())
    }

    /// Pushes this element's value into the property designated by `target`.
    /// Mismatched element/target pairs are ignored.
    pub fn apply_to(&self, target: StyleTarget, properties: &mut StyleProperties) {
        match (self, target) {
            (Self::Color(c), StyleTarget::Color) => properties.color = *c,
            (Self::Color(c), StyleTarget::Bicolor) => properties.set_background(*c),
            (Self::PenSize(v), StyleTarget::LineSize)
            | (Self::LineSize(v), StyleTarget::LineSize) => properties.line_size = *v,
            (Self::FontSize(v), StyleTarget::Font) => properties.font_size = *v,
            (Self::LineEnding(v), StyleTarget::LineEnding) => properties.line_ending = *v,
            (Self::TrackShape(v), StyleTarget::TrackShape) => properties.track_shape = *v,
            _ => {}
        }
    }

    /// Pulls the current property value back into this element, keeping the
    /// editable value in sync when the property was changed directly.
    pub fn read_back(&mut self, target: StyleTarget, properties: &StyleProperties) {
        match (self, target) {
            (Self::Color(c), StyleTarget::Color) => *c = properties.color,
            (Self::Color(c), StyleTarget::Bicolor) => *c = properties.background(),
            (Self::PenSize(v), StyleTarget::LineSize)
            | (Self::LineSize(v), StyleTarget::LineSize) => *v = properties.line_size,
            (Self::FontSize(v), StyleTarget::Font) => *v = properties.font_size,
            (Self::LineEnding(v), StyleTarget::LineEnding) => *v = properties.line_ending,
            (Self::TrackShape(v), StyleTarget::TrackShape) => *v = properties.track_shape,
            _ => {}
        }
    }

    pub fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        match self {
            Self::Color(c) => (c.r, c.g, c.b, c.a).hash(&mut hasher),
            Self::FontSize(v) | Self::PenSize(v) | Self::LineSize(v) => v.hash(&mut hasher),
            Self::LineEnding(v) => v.hash(&mut hasher),
            Self::TrackShape(v) => v.hash(&mut hasher),
        }
        hasher.finish()
    }
}

fn clamp_to_set(value: &str, set: &[i32], default: i32) -> i32 {
    match value.trim().parse::<i32>() {
        Ok(v) if set.contains(&v) => v,
        _ => default,
    }
}

/// Ordered, named set of style elements with their property bindings.
#[derive(Debug, Clone, Default)]
pub struct DrawingStyle {
    elements: Vec<(String, StyleElement)>,
    bindings: Vec<(String, StyleTarget)>,
    memo: Vec<(String, StyleElement)>,
}

impl DrawingStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &str, element: StyleElement) {
        if let Some(existing) = self.elements.iter_mut().find(|(k, _)| k == key) {
            existing.1 = element;
        } else {
            self.elements.push((key.to_string(), element));
        }
    }

    pub fn element(&self, key: &str) -> Option<&StyleElement> {
        self.elements.iter().find(|(k, _)| k == key).map(|(_, e)| e)
    }

    pub fn element_mut(&mut self, key: &str) -> Option<&mut StyleElement> {
        self.elements
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, e)| e)
    }

    pub fn elements(&self) -> impl Iterator<Item = (&str, &StyleElement)> {
        self.elements.iter().map(|(k, e)| (k.as_str(), e))
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Wires the element stored under `source_key` to `target`. Unknown keys
    /// are logged and ignored so a mismatched preset cannot break rendering.
    pub fn bind(&mut self, source_key: &str, target: StyleTarget) {
        if self.element(source_key).is_none() {
            log::error!("Could not bind style: element not found: {}", source_key);
            return;
        }
        self.bindings.push((source_key.to_string(), target));
    }

    /// Pushes every bound element value into `properties`.
    pub fn apply(&self, properties: &mut StyleProperties) {
        for (key, target) in &self.bindings {
            if let Some(element) = self.element(key) {
                element.apply_to(*target, properties);
            }
        }
    }

    /// Pulls property values back into the bound elements.
    pub fn read_back(&mut self, properties: &StyleProperties) {
        let bindings = self.bindings.clone();
        for (key, target) in &bindings {
            if let Some(element) = self.element_mut(key) {
                element.read_back(*target, properties);
            }
        }
    }

    /// Snapshots the current values so a cancelled edit can be undone.
    pub fn memorize(&mut self) {
        self.memo = self.elements.clone();
    }

    /// Restores the values captured by the last [`Self::memorize`].
    pub fn revert(&mut self, properties: &mut StyleProperties) {
        if self.memo.is_empty() {
            return;
        }
        for (key, element) in self.memo.clone() {
            if let Some(existing) = self.element_mut(&key) {
                *existing = element;
            }
        }
        self.apply(properties);
    }

    pub fn content_hash(&self) -> u64 {
        let mut hash = 0u64;
        for (_, element) in &self.elements {
            hash ^= element.content_hash();
        }
        hash
    }

    /// Reads the style children of `node`, keeping the element order of the
    /// document. Unknown element names are logged and skipped.
    pub fn read_kva(node: &XmlNode) -> Self {
        let mut style = Self::new();
        for child in &node.children {
            let key = child
                .attribute("Key")
                .map(String::from)
                .unwrap_or_else(|| child.name.clone());
            match StyleElement::read_kva(&child.name, child) {
                Some(element) => style.insert(&key, element),
                None => log::debug!("Unknown style element: <{}>", child.name),
            }
        }
        style
    }

    pub fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        for (key, element) in &self.elements {
            element.write_kva(writer, key)?;
        }
        Ok(())
    }
}
