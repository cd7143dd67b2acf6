//! Factories for the keyframe-attached drawing elements.
//!
//! Maps each KVA element name to a constructor. New drawing variants are
//! added by registering a factory; parsing code never needs to change.

use std::collections::HashMap;

use crate::drawing::{
    AngleMeasure, Circle, CrossMark, Drawing, Line, Pencil, Plane, TextLabel,
};
use crate::kva::error::KvaError;
use crate::kva::xml::XmlNode;
use crate::style::DrawingStyle;

type Factory = Box<dyn Fn(&XmlNode, (f64, f64), DrawingStyle) -> Box<dyn Drawing>>;

pub struct DrawingRegistry {
    factories: HashMap<String, Factory>,
}

impl DrawingRegistry {
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry knowing every built-in keyframe drawing.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register("Angle", |node, scale, preset| {
            Box::new(AngleMeasure::read_kva(node, scale, preset))
        });
        registry.register("Circle", |node, scale, preset| {
            Box::new(Circle::read_kva(node, scale, preset))
        });
        registry.register("CrossMark", |node, scale, preset| {
            Box::new(CrossMark::read_kva(node, scale, preset))
        });
        registry.register("Line", |node, scale, preset| {
            Box::new(Line::read_kva(node, scale, preset))
        });
        registry.register("Pencil", |node, scale, preset| {
            Box::new(Pencil::read_kva(node, scale, preset))
        });
        registry.register("Plane", |node, scale, preset| {
            Box::new(Plane::read_kva(node, scale, preset))
        });
        registry.register("Label", |node, scale, preset| {
            Box::new(TextLabel::read_kva(node, scale, preset))
        });
        registry
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&XmlNode, (f64, f64), DrawingStyle) -> Box<dyn Drawing> + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn create(
        &self,
        node: &XmlNode,
        scale: (f64, f64),
        preset: DrawingStyle,
    ) -> Result<Box<dyn Drawing>, KvaError> {
        match self.factories.get(&node.name) {
            Some(factory) => Ok(factory(node, scale, preset)),
            None => Err(KvaError::UnknownDrawingType {
                name: node.name.clone(),
            }),
        }
    }
}

impl Default for DrawingRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_names() {
        let registry = DrawingRegistry::standard();
        for name in ["Angle", "Circle", "CrossMark", "Line", "Pencil", "Plane", "Label"] {
            assert!(registry.contains(name), "missing factory for {}", name);
        }
        assert!(!registry.contains("Chrono"));
    }

    #[test]
    fn test_create_from_element() {
        let registry = DrawingRegistry::standard();
        let node = XmlNode::parse(
            "<CrossMark><CenterPoint>100;200</CenterPoint></CrossMark>",
        )
        .unwrap();
        let drawing = registry
            .create(&node, (1.0, 1.0), DrawingStyle::new())
            .unwrap();
        assert_eq!(drawing.xml_type(), Some("CrossMark"));
    }

    #[test]
    fn test_unknown_element_is_an_error() {
        let registry = DrawingRegistry::standard();
        let node = XmlNode::parse("<Spotlight></Spotlight>").unwrap();
        assert!(matches!(
            registry.create(&node, (1.0, 1.0), DrawingStyle::new()),
            Err(KvaError::UnknownDrawingType { .. })
        ));
    }
}
