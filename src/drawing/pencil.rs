//! Freehand pencil stroke.

use std::hash::{Hash, Hasher};

use crate::canvas::{Canvas, ImageTransform};
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::{distance_to_segment, Point, PointF};
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;
use crate::style::{DrawingStyle, StyleProperties, StyleTarget};

/// Selection margin added to the pen width around the stroke.
const SELECTION_MARGIN: f64 = 7.0;

pub struct Pencil {
    points: Vec<Point>,
    style: DrawingStyle,
    properties: StyleProperties,
    fading: Fading,
}

impl Pencil {
    pub fn new(
        origin: Point,
        second: Point,
        timestamp: i64,
        average_tpf: i64,
        preset: DrawingStyle,
    ) -> Self {
        let mut properties = StyleProperties::default();
        properties.line_size = 1;
        let mut style = preset;
        bind(&mut style);
        style.apply(&mut properties);

        Self {
            points: vec![origin, second],
            style,
            properties,
            fading: Fading::new(timestamp, average_tpf),
        }
    }

    /// Appends a point while the user is still tracing the stroke.
    pub fn add_point(&mut self, point: Point) {
        self.points.push(point);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    fn on_stroke(&self, point: Point) -> bool {
        let band = (self.properties.line_size as f64 + SELECTION_MARGIN) / 2.0;
        self.points.windows(2).any(|w| {
            distance_to_segment(point.to_f(), w[0].to_f(), w[1].to_f()) <= band
        })
    }

    pub fn read_kva(node: &XmlNode, scale: (f64, f64), preset: DrawingStyle) -> Self {
        let mut pencil = Self::new(Point::ORIGIN, Point::ORIGIN, 0, 0, preset);
        let mut handled: Vec<&str> = Vec::new();

        if let Some(list) = node.child("PointList") {
            pencil.points.clear();
            for child in &list.children {
                if child.name == "Point" {
                    let p = xml::parse_point(child.text.trim());
                    pencil.points.push(Point::new(
                        (scale.0 * p.x as f64) as i32,
                        (scale.1 * p.y as f64) as i32,
                    ));
                } else {
                    log::debug!("Unparsed content in KVA XML: <{}>", child.name);
                }
            }
            handled.push("PointList");
        }
        if let Some(style_node) = node.child("DrawingStyle") {
            pencil.style = DrawingStyle::read_kva(style_node);
            bind(&mut pencil.style);
            pencil.style.apply(&mut pencil.properties);
            handled.push("DrawingStyle");
        }
        if let Some(fading_node) = node.child("InfosFading") {
            pencil.fading.read_kva(fading_node);
            handled.push("InfosFading");
        }
        node.warn_unparsed(&handled);
        pencil
    }
}

impl Drawing for Pencil {
    fn xml_type(&self) -> Option<&'static str> {
        Some("Pencil")
    }

    fn display_name(&self) -> String {
        String::from("Pencil")
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

        let points: Vec<PointF> = self.points.iter().map(|p| transform.transform(*p)).collect();
        let pen = self.properties.pen(opacity, transform.scale);
        canvas.polyline(&pen, &points);
    }

    fn hit_test(&self, point: Point, timestamp: i64) -> Hit {
        if self.fading.opacity_at(timestamp) <= 0.0 {
            return Hit::Miss;
        }
        if self.on_stroke(point) {
            Hit::Body
        } else {
            Hit::Miss
        }
    }

    fn move_handle(&mut self, _point: Point, _handle: u8, _modifiers: Modifiers) {}

    fn move_drawing(&mut self, dx: f64, dy: f64, _modifiers: Modifiers) {
        for p in &mut self.points {
            *p = p.translate(dx as i32, dy as i32);
        }
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for p in &self.points {
            (p.x, p.y).hash(&mut hasher);
        }
        hasher.finish() ^ self.style.content_hash()
    }

    fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        writer.start_with_attr("PointList", "Count", &self.points.len().to_string())?;
        for p in &self.points {
            writer.point_element("Point", *p)?;
        }
        writer.end("PointList")?;

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
    style.bind("color", StyleTarget::Color);
    style.bind("pen size", StyleTarget::LineSize);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::style::StyleElement;

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("color", StyleElement::Color(Color::BLACK));
        style.insert("pen size", StyleElement::PenSize(3));
        style
    }

    fn stroke() -> Pencil {
        let mut p = Pencil::new(Point::new(0, 0), Point::new(20, 0), 0, 10, preset());
        p.add_point(Point::new(40, 10));
        p.add_point(Point::new(60, 30));
        p
    }

    #[test]
    fn test_hit_along_stroke() {
        let p = stroke();
        assert_eq!(p.hit_test(Point::new(10, 2), 0), Hit::Body);
        assert_eq!(p.hit_test(Point::new(50, 20), 0), Hit::Body);
        assert_eq!(p.hit_test(Point::new(10, 30), 0), Hit::Miss);
    }

    #[test]
    fn test_move_translates_all_points() {
        let mut p = stroke();
        p.move_drawing(5.0, -5.0, Modifiers::NONE);
        assert_eq!(p.points()[0], Point::new(5, -5));
        assert_eq!(p.points()[3], Point::new(65, 25));
    }

    #[test]
    fn test_kva_round_trip() {
        let p = stroke();
        let mut writer = KvaWriter::new();
        writer.start("Pencil").unwrap();
        p.write_kva(&mut writer).unwrap();
        writer.end("Pencil").unwrap();

        let xml_text = writer.into_string().unwrap();
        assert!(xml_text.contains("<PointList Count=\"4\">"));

        let node = XmlNode::parse(&xml_text).unwrap();
        let read = Pencil::read_kva(&node, (1.0, 1.0), preset());
        assert_eq!(read.points(), p.points());
    }
}
