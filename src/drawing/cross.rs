//! Cross marker pinpointing a single position.

use std::hash::{Hash, Hasher};

use crate::canvas::{Canvas, ImageTransform};
use crate::color::Color;
use crate::drawing::label::AnchoredLabel;
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::{Point, RectF};
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;
use crate::style::{DrawingStyle, StyleProperties, StyleTarget};

const CROSS_RADIUS: i32 = 3;
const BACKGROUND_ALPHA: f64 = 64.0 / 255.0;

/// A small cross with a disc halo, optionally labelled with its coordinates.
pub struct CrossMark {
    center: Point,
    show_coordinates: bool,
    label: AnchoredLabel,
    style: DrawingStyle,
    properties: StyleProperties,
    fading: Fading,
}

impl CrossMark {
    pub fn new(center: Point, timestamp: i64, average_tpf: i64, preset: DrawingStyle) -> Self {
        let mut properties = StyleProperties::default();
        properties.color = Color::rgb(100, 149, 237);
        let mut style = preset;
        bind(&mut style);
        style.apply(&mut properties);

        Self {
            center,
            show_coordinates: false,
            label: AnchoredLabel::new(center, Color::BLACK),
            style,
            properties,
            fading: Fading::new(timestamp, average_tpf),
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn show_coordinates(&self) -> bool {
        self.show_coordinates
    }

    pub fn set_show_coordinates(&mut self, show: bool) {
        self.show_coordinates = show;
    }

    /// Text shown next to the mark, supplied by the calibration layer.
    pub fn set_coordinates_text(&mut self, text: &str) {
        self.label.set_text(text);
    }

    pub fn read_kva(node: &XmlNode, scale: (f64, f64), preset: DrawingStyle) -> Self {
        let mut drawing = Self::new(Point::ORIGIN, 0, 0, preset);
        let mut handled: Vec<&str> = Vec::new();

        if let Some(text) = node.child_text("CenterPoint") {
            let p = xml::parse_point(text);
            drawing.center = Point::new(
                (scale.0 * p.x as f64) as i32,
                (scale.1 * p.y as f64) as i32,
            );
            handled.push("CenterPoint");
        }
        if let Some(text) = node.child_text("CoordinatesVisible") {
            drawing.show_coordinates = xml::parse_bool(text);
            handled.push("CoordinatesVisible");
        }
        if let Some(style_node) = node.child("DrawingStyle") {
            drawing.style = DrawingStyle::read_kva(style_node);
            bind(&mut drawing.style);
            drawing.style.apply(&mut drawing.properties);
            handled.push("DrawingStyle");
        }
        if let Some(fading_node) = node.child("InfosFading") {
            drawing.fading.read_kva(fading_node);
            handled.push("InfosFading");
        }
        node.warn_unparsed(&handled);

        drawing.label.set_attach(drawing.center, true);
        drawing
    }
}

impl Drawing for CrossMark {
    fn xml_type(&self) -> Option<&'static str> {
        Some("CrossMark")
    }

    fn display_name(&self) -> String {
        String::from("Marker")
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            fading: true,
            opacity: false,
            style: true,
        }
    }

    fn fading(&self) -> &Fading {
        &self.fading
    }

    fn fading_mut(&mut self) -> &mut Fading {
        &mut self.fading
    }

    fn draw(
        &self,
        canvas: &mut dyn Canvas,
        transform: &ImageTransform,
        _selected: bool,
        timestamp: i64,
    ) {
        let opacity = self.fading.opacity_at(timestamp);
        if opacity <= 0.0 {
            return;
        }

        let c = transform.transform(self.center);
        let pen = self.properties.pen(opacity, 1.0);
        let r = CROSS_RADIUS as f32;

        canvas.line(
            &pen,
            crate::geometry::PointF::new(c.x - r, c.y),
            crate::geometry::PointF::new(c.x + r, c.y),
        );
        canvas.line(
            &pen,
            crate::geometry::PointF::new(c.x, c.y - r),
            crate::geometry::PointF::new(c.x, c.y + r),
        );
        let halo = self.properties.brush(opacity * BACKGROUND_ALPHA);
        canvas.fill_ellipse(
            halo,
            RectF::new(c.x - r - 1.0, c.y - r - 1.0, 2.0 * (r + 1.0), 2.0 * (r + 1.0)),
        );

        if self.show_coordinates {
            self.label.draw(canvas, transform, opacity);
        }
    }

    fn hit_test(&self, point: Point, timestamp: i64) -> Hit {
        if self.fading.opacity_at(timestamp) <= 0.0 {
            return Hit::Miss;
        }

        if self.show_coordinates && self.label.hit_test(point) {
            Hit::Handle(1)
        } else if self.center.box_around(CROSS_RADIUS + 10).contains(point) {
            Hit::Body
        } else {
            Hit::Miss
        }
    }

    fn move_handle(&mut self, point: Point, handle: u8, _modifiers: Modifiers) {
        if handle == 1 {
            self.label.set_label(point);
        }
    }

    fn move_drawing(&mut self, dx: f64, dy: f64, _modifiers: Modifiers) {
        self.center = self.center.translate(dx as i32, dy as i32);
        self.label.set_attach(self.center, true);
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        (self.center.x, self.center.y).hash(&mut hasher);
        self.show_coordinates.hash(&mut hasher);
        hasher.finish() ^ self.style.content_hash()
    }

    fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        writer.point_element("CenterPoint", self.center)?;
        writer.bool_element("CoordinatesVisible", self.show_coordinates)?;

        writer.start("DrawingStyle")?;
        self.style.write_kva(writer)?;
        writer.end("DrawingStyle")?;

        self.fading.write_kva(writer)
    }

    fn style(&self) -> Option<&DrawingStyle> {
        Some(&self.style)
    }

    fn style_mut(&mut self) -> Option<&mut DrawingStyle> {
        Some(&mut self.style)
    }
}

fn bind(style: &mut DrawingStyle) {
    style.bind("back color", StyleTarget::Color);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleElement;

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("back color", StyleElement::Color(Color::rgb(255, 0, 0)));
        style
    }

    #[test]
    fn test_hit_zones() {
        let mark = CrossMark::new(Point::new(100, 100), 0, 10, preset());
        assert_eq!(mark.hit_test(Point::new(100, 100), 0), Hit::Body);
        assert_eq!(mark.hit_test(Point::new(112, 100), 0), Hit::Body);
        assert_eq!(mark.hit_test(Point::new(150, 100), 0), Hit::Miss);
    }

    #[test]
    fn test_faded_out_never_hits() {
        let mut mark = CrossMark::new(Point::new(100, 100), 0, 10, preset());
        mark.fading_mut().use_default = false;
        mark.fading_mut().fading_frames = 1;
        assert_eq!(mark.hit_test(Point::new(100, 100), 1_000_000), Hit::Miss);
    }

    #[test]
    fn test_move_drawing_carries_label() {
        let mut mark = CrossMark::new(Point::new(100, 100), 0, 10, preset());
        mark.move_drawing(5.0, -3.0, Modifiers::NONE);
        assert_eq!(mark.center(), Point::new(105, 97));
    }

    #[test]
    fn test_kva_round_trip() {
        let mut mark = CrossMark::new(Point::new(42, 24), 0, 10, preset());
        mark.set_show_coordinates(true);

        let mut writer = KvaWriter::new();
        writer.start("CrossMark").unwrap();
        mark.write_kva(&mut writer).unwrap();
        writer.end("CrossMark").unwrap();

        let node = XmlNode::parse(&writer.into_string().unwrap()).unwrap();
        let read = CrossMark::read_kva(&node, (1.0, 1.0), preset());
        assert_eq!(read.center(), Point::new(42, 24));
        assert!(read.show_coordinates());
        assert_eq!(read.properties.color, Color::rgb(255, 0, 0));
    }
}
