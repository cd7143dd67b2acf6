//! Small text label attached to a point of another drawing.
//!
//! Used for line measures, cross coordinates, chronometer names and track
//! labels. The label floats on a rounded background connected to its attach
//! point by a thin line; the text is reset by the owner just before drawing.

use std::hash::{Hash, Hasher};

use crate::canvas::{estimate_text_size, Canvas, ImageTransform, Stroke};
use crate::color::Color;
use crate::geometry::{Point, Rect, RoundedRectangle};
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;

const LABEL_FONT_SIZE: f32 = 8.0;

/// A floating label anchored to a point in image space.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchoredLabel {
    text: String,
    background: RoundedRectangle,
    attach: Point,
    back_color: Color,
    /// Timestamp of the tracked point this label refers to, for labels that
    /// follow a trajectory.
    pub timestamp: i64,
    pub attach_index: usize,
}

impl AnchoredLabel {
    pub fn new(attach: Point, color: Color) -> Self {
        Self {
            text: String::from("Label"),
            background: RoundedRectangle::new(Rect::new(attach.x - 20, attach.y - 50, 0, 0)),
            attach,
            back_color: color.with_alpha(160),
            timestamp: 0,
            attach_index: 0,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_back_color(&mut self, color: Color) {
        self.back_color = color.with_alpha(160);
    }

    /// Updates the text and resizes the background to the measured extent.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        let size = estimate_text_size(&self.text, LABEL_FONT_SIZE);
        let rect = self.background.rectangle();
        self.background.set_rectangle(Rect::new(
            rect.x,
            rect.y,
            size.width as i32,
            size.height as i32,
        ));
    }

    pub fn hit_test(&self, point: Point) -> bool {
        self.background.hit_test(point, false) > -1
    }

    /// Moves the attach point; the label background follows when
    /// `move_label` is set.
    pub fn set_attach(&mut self, point: Point, move_label: bool) {
        let dx = point.x - self.attach.x;
        let dy = point.y - self.attach.y;
        self.attach = point;
        if move_label {
            self.background.move_by(dx, dy);
        }
    }

    pub fn set_label(&mut self, point: Point) {
        self.background.center_on(point);
    }

    pub fn move_label(&mut self, dx: i32, dy: i32) {
        self.background.move_by(dx, dy);
    }

    pub fn draw(&self, canvas: &mut dyn Canvas, transform: &ImageTransform, opacity: f64) {
        let fill = self.back_color.faded(opacity);
        let foreground = self.back_color.contrast().faded(opacity);

        let attach = transform.transform(self.attach);
        let center = transform.transform(self.background.center());

        // Dot on the attach point and connector to the label.
        canvas.fill_ellipse(
            fill,
            crate::geometry::RectF::new(attach.x - 2.0, attach.y - 2.0, 4.0, 4.0),
        );
        canvas.line(
            &Stroke::solid(self.back_color.faded(opacity * 0.25), 1.0),
            attach,
            center,
        );

        let font_size = (LABEL_FONT_SIZE as f64 * transform.scale) as f32;
        let size = estimate_text_size(&self.text, font_size);
        let location = transform.transform(Point::new(
            self.background.rectangle().x,
            self.background.rectangle().y,
        ));
        let rect = crate::geometry::RectF::new(location.x, location.y, size.width, size.height);
        canvas.rounded_rect(fill, rect, font_size / 4.0, false);
        canvas.text(&self.text, location, font_size, foreground);
    }

    pub fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.background.rectangle().x.hash(&mut hasher);
        self.background.rectangle().y.hash(&mut hasher);
        (
            self.back_color.r,
            self.back_color.g,
            self.back_color.b,
            self.back_color.a,
        )
            .hash(&mut hasher);
        hasher.finish()
    }

    pub fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        let rect = self.background.rectangle();
        writer.point_element("SpacePosition", Point::new(rect.x, rect.y))?;
        writer.int_element("TimePosition", self.timestamp)
    }

    pub fn read_kva(&mut self, node: &XmlNode, scale: (f64, f64)) {
        let mut handled: Vec<&str> = Vec::new();
        if let Some(text) = node.child_text("SpacePosition") {
            let p = xml::parse_point(text);
            let location = Point::new(
                (scale.0 * p.x as f64) as i32,
                (scale.1 * p.y as f64) as i32,
            );
            self.background
                .set_rectangle(Rect::new(location.x, location.y, 0, 0));
            handled.push("SpacePosition");
        }
        if let Some(text) = node.child_text("TimePosition") {
            self.timestamp = xml::parse_int_or(text, 0);
            handled.push("TimePosition");
        }
        node.warn_unparsed(&handled);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_moves_label_when_asked() {
        let mut label = AnchoredLabel::new(Point::new(100, 100), Color::rgb(0, 0, 255));
        let before = label.background.rectangle();

        label.set_attach(Point::new(110, 105), false);
        assert_eq!(label.background.rectangle(), before);

        label.set_attach(Point::new(120, 115), true);
        assert_eq!(
            label.background.rectangle(),
            before.translate(10, 10)
        );
    }

    #[test]
    fn test_hit_after_set_text() {
        let mut label = AnchoredLabel::new(Point::new(0, 0), Color::BLACK);
        label.set_label(Point::new(200, 200));
        label.set_text("elapsed 00:01:20");
        assert!(label.hit_test(Point::new(200, 200)));
        assert!(!label.hit_test(Point::new(500, 500)));
    }

    #[test]
    fn test_kva_round_trip_positions() {
        let mut label = AnchoredLabel::new(Point::new(50, 60), Color::BLACK);
        label.set_label(Point::new(80, 40));
        label.timestamp = 12345;

        let mut writer = KvaWriter::new();
        writer.start("Label").unwrap();
        label.write_kva(&mut writer).unwrap();
        writer.end("Label").unwrap();

        let node = XmlNode::parse(&writer.into_string().unwrap()).unwrap();
        let mut read = AnchoredLabel::new(Point::new(0, 0), Color::BLACK);
        read.read_kva(&node, (1.0, 1.0));

        let rect = label.background.rectangle();
        assert_eq!(read.background.rectangle().x, rect.x);
        assert_eq!(read.background.rectangle().y, rect.y);
        assert_eq!(read.timestamp, 12345);
    }
}
