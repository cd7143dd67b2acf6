//! Circle drawing, resized by dragging its outline.

use std::hash::{Hash, Hasher};

use crate::canvas::{Canvas, ImageTransform};
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::Point;
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;
use crate::style::{DrawingStyle, StyleProperties, StyleTarget};

const MIN_RADIUS: i32 = 10;

/// Arc of the outline acting as the resize handle while selected, degrees
/// clockwise from the positive x axis.
const HANDLE_START_ANGLE: f64 = 25.0;
const HANDLE_SWEEP_ANGLE: f64 = 40.0;

pub struct Circle {
    center: Point,
    radius: i32,
    selected: bool,
    style: DrawingStyle,
    properties: StyleProperties,
    fading: Fading,
}

impl Circle {
    pub fn new(
        center: Point,
        radius: i32,
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
            center,
            radius: radius.min(MIN_RADIUS),
            selected: false,
            style,
            properties,
            fading: Fading::new(timestamp, average_tpf),
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radius(&self) -> i32 {
        self.radius
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    fn on_handler(&self, point: Point) -> bool {
        if self.radius <= 0 {
            return false;
        }
        let handler_radius = (self.radius + 5) as f64;
        let band = (self.properties.line_size as f64 + 10.0) / 2.0;
        let distance = self.center.distance_to(point);
        if (distance - handler_radius).abs() > band {
            return false;
        }

        let dx = (point.x - self.center.x) as f64;
        let dy = (point.y - self.center.y) as f64;
        let mut angle = dy.atan2(dx).to_degrees();
        if angle < 0.0 {
            angle += 360.0;
        }
        (HANDLE_START_ANGLE..=HANDLE_START_ANGLE + HANDLE_SWEEP_ANGLE).contains(&angle)
    }

    pub fn read_kva(node: &XmlNode, scale: (f64, f64), preset: DrawingStyle) -> Self {
        let mut circle = Self::new(Point::ORIGIN, 0, 0, 0, preset);
        let mut handled: Vec<&str> = Vec::new();

        if let Some(text) = node.child_text("Origin") {
            let p = xml::parse_point(text);
            circle.center = Point::new(
                (scale.0 * p.x as f64) as i32,
                (scale.1 * p.y as f64) as i32,
            );
            handled.push("Origin");
        }
        if let Some(text) = node.child_text("Radius") {
            let radius = xml::parse_int_or(text, 0);
            circle.radius = (radius as f64 * scale.0) as i32;
            handled.push("Radius");
        }
        if let Some(style_node) = node.child("DrawingStyle") {
            circle.style = DrawingStyle::read_kva(style_node);
            bind(&mut circle.style);
            circle.style.apply(&mut circle.properties);
            handled.push("DrawingStyle");
        }
        if let Some(fading_node) = node.child("InfosFading") {
            circle.fading.read_kva(fading_node);
            handled.push("InfosFading");
        }
        node.warn_unparsed(&handled);
        circle
    }
}

impl Drawing for Circle {
    fn xml_type(&self) -> Option<&'static str> {
        Some("Circle")
    }

    fn display_name(&self) -> String {
        String::from("Circle")
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
        selected: bool,
        timestamp: i64,
    ) {
        let opacity = self.fading.opacity_at(timestamp);
        if opacity <= 0.0 {
            return;
        }

        let bounding = transform.transform_rect(self.center.box_around(self.radius));
        let pen = self.properties.pen(opacity, transform.scale);
        canvas.ellipse(&pen, bounding);

        if selected {
            let mut handle_pen = pen;
            handle_pen.color = pen.color.invert();
            canvas.arc(
                &handle_pen,
                bounding,
                HANDLE_START_ANGLE as f32,
                HANDLE_SWEEP_ANGLE as f32,
            );
        }
    }

    fn hit_test(&self, point: Point, timestamp: i64) -> Hit {
        if self.fading.opacity_at(timestamp) <= 0.0 {
            return Hit::Miss;
        }

        if self.selected && self.on_handler(point) {
            Hit::Handle(1)
        } else if self.center.distance_to(point) <= (self.radius + 10) as f64 {
            Hit::Body
        } else {
            Hit::Miss
        }
    }

    fn move_handle(&mut self, point: Point, _handle: u8, _modifiers: Modifiers) {
        self.radius = (self.center.distance_to(point) as i32).max(MIN_RADIUS);
    }

    fn move_drawing(&mut self, dx: f64, dy: f64, _modifiers: Modifiers) {
        self.center = self.center.translate(dx as i32, dy as i32);
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        (self.center.x, self.center.y).hash(&mut hasher);
        self.radius.hash(&mut hasher);
        hasher.finish() ^ self.style.content_hash()
    }

    fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        writer.point_element("Origin", self.center)?;
        writer.int_element("Radius", self.radius as i64)?;

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
        style.insert("color", StyleElement::Color(Color::rgb(0, 128, 0)));
        style.insert("pen size", StyleElement::PenSize(3));
        style
    }

    #[test]
    fn test_resize_floors_radius() {
        let mut c = Circle::new(Point::new(100, 100), 10, 0, 10, preset());
        c.move_handle(Point::new(103, 104), 1, Modifiers::NONE);
        assert_eq!(c.radius(), 10);

        c.move_handle(Point::new(100, 160), 1, Modifiers::NONE);
        assert_eq!(c.radius(), 60);
    }

    #[test]
    fn test_body_hit_with_margin() {
        let c = Circle::new(Point::new(100, 100), 10, 0, 10, preset());
        assert_eq!(c.hit_test(Point::new(100, 100), 0), Hit::Body);
        assert_eq!(c.hit_test(Point::new(100, 119), 0), Hit::Body);
        assert_eq!(c.hit_test(Point::new(100, 130), 0), Hit::Miss);
    }

    #[test]
    fn test_handler_only_when_selected() {
        let mut c = Circle::new(Point::new(100, 100), 10, 0, 10, preset());
        c.move_handle(Point::new(100, 160), 1, Modifiers::NONE);

        // 45 degrees, on the outline arc.
        let on_arc = Point::new(100 + 46, 100 + 46);
        assert_eq!(c.hit_test(on_arc, 0), Hit::Body);
        c.set_selected(true);
        assert_eq!(c.hit_test(on_arc, 0), Hit::Handle(1));
    }

    #[test]
    fn test_kva_round_trip() {
        let mut c = Circle::new(Point::new(50, 60), 10, 0, 10, preset());
        c.move_handle(Point::new(50, 100), 1, Modifiers::NONE);

        let mut writer = KvaWriter::new();
        writer.start("Circle").unwrap();
        c.write_kva(&mut writer).unwrap();
        writer.end("Circle").unwrap();

        let node = XmlNode::parse(&writer.into_string().unwrap()).unwrap();
        let read = Circle::read_kva(&node, (1.0, 1.0), preset());
        assert_eq!(read.center(), Point::new(50, 60));
        assert_eq!(read.radius(), 40);
    }
}
