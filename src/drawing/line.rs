//! Straight line segment, optionally carrying a length measure label.

use std::hash::{Hash, Hasher};

use crate::canvas::{Canvas, ImageTransform};
use crate::color::Color;
use crate::drawing::label::AnchoredLabel;
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::{distance_to_segment, Point, RectF};
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;
use crate::style::{DrawingStyle, LineEnding, StyleProperties, StyleTarget};

/// Half the widened selection band around the segment.
const SELECTION_MARGIN: f64 = 3.5;

pub struct Line {
    start: Point,
    end: Point,
    show_measure: bool,
    label: AnchoredLabel,
    style: DrawingStyle,
    properties: StyleProperties,
    fading: Fading,
}

impl Line {
    pub fn new(
        start: Point,
        end: Point,
        timestamp: i64,
        average_tpf: i64,
        preset: DrawingStyle,
    ) -> Self {
        let mut properties = StyleProperties::default();
        let mut style = preset;
        bind(&mut style);
        style.apply(&mut properties);

        let mut line = Self {
            start,
            end,
            show_measure: false,
            label: AnchoredLabel::new(start, Color::BLACK),
            style,
            properties,
            fading: Fading::new(timestamp, average_tpf),
        };
        line.label.set_attach(line.middle(), true);
        line
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn show_measure(&self) -> bool {
        self.show_measure
    }

    pub fn set_show_measure(&mut self, show: bool) {
        self.show_measure = show;
    }

    /// Measured length text, supplied by the calibration layer.
    pub fn set_measure_text(&mut self, text: &str) {
        self.label.set_text(text);
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(self.end)
    }

    fn middle(&self) -> Point {
        Point::new((self.start.x + self.end.x) / 2, (self.start.y + self.end.y) / 2)
    }

    fn on_segment(&self, point: Point) -> bool {
        if self.start == self.end {
            return self.start.box_around(2).contains(point);
        }
        distance_to_segment(point.to_f(), self.start.to_f(), self.end.to_f()) <= SELECTION_MARGIN
    }

    pub fn read_kva(node: &XmlNode, scale: (f64, f64), preset: DrawingStyle) -> Self {
        let mut line = Self::new(Point::ORIGIN, Point::ORIGIN, 0, 0, preset);
        let mut handled: Vec<&str> = Vec::new();

        if let Some(text) = node.child_text("Start") {
            let p = xml::parse_point(text);
            line.start = Point::new(
                (scale.0 * p.x as f64) as i32,
                (scale.1 * p.y as f64) as i32,
            );
            handled.push("Start");
        }
        if let Some(text) = node.child_text("End") {
            let p = xml::parse_point(text);
            line.end = Point::new(
                (scale.0 * p.x as f64) as i32,
                (scale.1 * p.y as f64) as i32,
            );
            handled.push("End");
        }
        if let Some(text) = node.child_text("MeasureVisible") {
            line.show_measure = xml::parse_bool(text);
            handled.push("MeasureVisible");
        }
        if let Some(style_node) = node.child("DrawingStyle") {
            line.style = DrawingStyle::read_kva(style_node);
            bind(&mut line.style);
            line.style.apply(&mut line.properties);
            handled.push("DrawingStyle");
        }
        if let Some(fading_node) = node.child("InfosFading") {
            line.fading.read_kva(fading_node);
            handled.push("InfosFading");
        }
        node.warn_unparsed(&handled);

        line.label.set_attach(line.middle(), true);
        line
    }
}

impl Drawing for Line {
    fn xml_type(&self) -> Option<&'static str> {
        Some("Line")
    }

    fn display_name(&self) -> String {
        String::from("Line")
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

        let start = transform.transform(self.start);
        let end = transform.transform(self.end);

        let pen = self.properties.pen(opacity, transform.scale);
        canvas.line(&pen, start, end);

        // Endpoint knobs, except under an arrow head.
        let mut knob_pen = pen;
        knob_pen.width = if selected { 2.0 } else { 1.0 };
        knob_pen.ending = LineEnding::None;
        let ending = self.properties.line_ending;
        if !matches!(ending, LineEnding::StartArrow | LineEnding::DoubleArrow) {
            canvas.ellipse(&knob_pen, RectF::new(start.x - 3.0, start.y - 3.0, 6.0, 6.0));
        }
        if !matches!(ending, LineEnding::EndArrow | LineEnding::DoubleArrow) {
            canvas.ellipse(&knob_pen, RectF::new(end.x - 3.0, end.y - 3.0, 6.0, 6.0));
        }

        if self.show_measure {
            self.label.draw(canvas, transform, opacity);
        }
    }

    fn hit_test(&self, point: Point, timestamp: i64) -> Hit {
        if self.fading.opacity_at(timestamp) <= 0.0 {
            return Hit::Miss;
        }

        if self.show_measure && self.label.hit_test(point) {
            Hit::Handle(3)
        } else if self.start.box_around(6).contains(point) {
            Hit::Handle(1)
        } else if self.end.box_around(6).contains(point) {
            Hit::Handle(2)
        } else if self.on_segment(point) {
            Hit::Body
        } else {
            Hit::Miss
        }
    }

    fn move_handle(&mut self, point: Point, handle: u8, _modifiers: Modifiers) {
        match handle {
            1 => {
                self.start = point;
                let middle = self.middle();
                self.label.set_attach(middle, true);
            }
            2 => {
                self.end = point;
                let middle = self.middle();
                self.label.set_attach(middle, true);
            }
            3 => self.label.set_label(point),
            _ => {}
        }
    }

    fn move_drawing(&mut self, dx: f64, dy: f64, _modifiers: Modifiers) {
        self.start = self.start.translate(dx as i32, dy as i32);
        self.end = self.end.translate(dx as i32, dy as i32);
        let middle = self.middle();
        self.label.set_attach(middle, true);
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        (self.start.x, self.start.y).hash(&mut hasher);
        (self.end.x, self.end.y).hash(&mut hasher);
        self.show_measure.hash(&mut hasher);
        hasher.finish() ^ self.style.content_hash()
    }

    fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        writer.point_element("Start", self.start)?;
        writer.point_element("End", self.end)?;
        writer.bool_element("MeasureVisible", self.show_measure)?;

        writer.start("DrawingStyle")?;
        self.style.write_kva(writer)?;
        writer.end("DrawingStyle")?;

        self.fading.write_kva(writer)?;

        if self.show_measure {
            // Spreadsheet export support.
            writer.float_element("Measure", self.length())?;
        }
        Ok(())
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
    style.bind("line size", StyleTarget::LineSize);
    style.bind("arrows", StyleTarget::LineEnding);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleElement;

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("color", StyleElement::Color(Color::rgb(0, 0, 255)));
        style.insert("line size", StyleElement::LineSize(3));
        style.insert("arrows", StyleElement::LineEnding(LineEnding::EndArrow));
        style
    }

    fn line() -> Line {
        Line::new(Point::new(0, 0), Point::new(100, 0), 0, 10, preset())
    }

    #[test]
    fn test_hit_handles_before_body() {
        let l = line();
        assert_eq!(l.hit_test(Point::new(2, 2), 0), Hit::Handle(1));
        assert_eq!(l.hit_test(Point::new(99, -2), 0), Hit::Handle(2));
        assert_eq!(l.hit_test(Point::new(50, 3), 0), Hit::Body);
        assert_eq!(l.hit_test(Point::new(50, 8), 0), Hit::Miss);
    }

    #[test]
    fn test_degenerate_line_still_selectable() {
        let l = Line::new(Point::new(10, 10), Point::new(10, 10), 0, 10, preset());
        assert_eq!(l.hit_test(Point::new(10, 10), 0), Hit::Handle(1));
        assert_eq!(l.hit_test(Point::new(100, 100), 0), Hit::Miss);
    }

    #[test]
    fn test_move_handle_updates_endpoint() {
        let mut l = line();
        l.move_handle(Point::new(200, 50), 2, Modifiers::NONE);
        assert_eq!(l.end(), Point::new(200, 50));
        l.move_drawing(-10.0, 5.0, Modifiers::NONE);
        assert_eq!(l.start(), Point::new(-10, 5));
        assert_eq!(l.end(), Point::new(190, 55));
    }

    #[test]
    fn test_kva_round_trip() {
        let mut l = line();
        l.set_show_measure(true);

        let mut writer = KvaWriter::new();
        writer.start("Line").unwrap();
        l.write_kva(&mut writer).unwrap();
        writer.end("Line").unwrap();

        let node = XmlNode::parse(&writer.into_string().unwrap()).unwrap();
        let read = Line::read_kva(&node, (1.0, 1.0), preset());
        assert_eq!(read.start(), Point::new(0, 0));
        assert_eq!(read.end(), Point::new(100, 0));
        assert!(read.show_measure());
        assert_eq!(read.properties.line_ending, LineEnding::EndArrow);
    }

    #[test]
    fn test_read_rescales_points() {
        let node = XmlNode::parse(
            "<Line><Start>10;20</Start><End>30;40</End></Line>",
        )
        .unwrap();
        let read = Line::read_kva(&node, (2.0, 0.5), preset());
        assert_eq!(read.start(), Point::new(20, 10));
        assert_eq!(read.end(), Point::new(60, 20));
    }
}
