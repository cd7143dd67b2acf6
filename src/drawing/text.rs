//! Free text label with an auto-sized rounded background.

use std::hash::{Hash, Hasher};

use crate::canvas::{estimate_text_size, Canvas, ImageTransform};
use crate::color::Color;
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::{Point, Rect, RoundedRectangle};
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;
use crate::style::{DrawingStyle, StyleProperties, StyleTarget};

const DEFAULT_FONT_SIZE: i32 = 16;
const BACKGROUND_ALPHA: f64 = 128.0 / 255.0;

pub struct TextLabel {
    text: String,
    background: RoundedRectangle,
    edit_mode: bool,
    style: DrawingStyle,
    properties: StyleProperties,
    fading: Fading,
}

impl TextLabel {
    pub fn new(position: Point, timestamp: i64, average_tpf: i64, preset: DrawingStyle) -> Self {
        let mut properties = StyleProperties::default();
        properties.font_size = DEFAULT_FONT_SIZE;
        properties.set_background(Color::BLACK);
        let mut style = preset;
        bind(&mut style);
        style.apply(&mut properties);

        let mut label = Self {
            text: String::from(" "),
            background: RoundedRectangle::new(Rect::new(position.x, position.y, 0, 0)),
            edit_mode: false,
            style,
            properties,
            fading: Fading::new(timestamp, average_tpf),
        };
        label.update_background();
        label
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
        self.update_background();
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// While editing, the host shows a text box instead of the drawing.
    pub fn set_edit_mode(&mut self, editing: bool) {
        self.edit_mode = editing;
    }

    pub fn position(&self) -> Point {
        let rect = self.background.rectangle();
        Point::new(rect.x, rect.y)
    }

    pub fn font_size(&self) -> i32 {
        self.properties.font_size
    }

    fn update_background(&mut self) {
        let size = estimate_text_size(&self.text, self.properties.font_size as f32);
        let rect = self.background.rectangle();
        self.background.set_rectangle(Rect::new(
            rect.x,
            rect.y,
            size.width as i32,
            size.height as i32,
        ));
    }

    pub fn read_kva(node: &XmlNode, scale: (f64, f64), preset: DrawingStyle) -> Self {
        let mut label = Self::new(Point::ORIGIN, 0, 0, preset);
        let mut handled: Vec<&str> = Vec::new();

        if let Some(text) = node.child_text("Text") {
            label.text = text.to_string();
            handled.push("Text");
        }
        if let Some(text) = node.child_text("Position") {
            let p = xml::parse_point(text);
            let location = Point::new(
                (scale.0 * p.x as f64) as i32,
                (scale.1 * p.y as f64) as i32,
            );
            label
                .background
                .set_rectangle(Rect::new(location.x, location.y, 0, 0));
            handled.push("Position");
        }
        if let Some(style_node) = node.child("DrawingStyle") {
            label.style = DrawingStyle::read_kva(style_node);
            bind(&mut label.style);
            label.style.apply(&mut label.properties);
            handled.push("DrawingStyle");
        }
        if let Some(fading_node) = node.child("InfosFading") {
            label.fading.read_kva(fading_node);
            handled.push("InfosFading");
        }
        node.warn_unparsed(&handled);

        label.update_background();
        label
    }
}

impl Drawing for TextLabel {
    fn xml_type(&self) -> Option<&'static str> {
        Some("Label")
    }

    fn display_name(&self) -> String {
        String::from("Label")
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
        if opacity <= 0.0 || self.edit_mode {
            return;
        }

        let rect = transform.transform_rect(self.background.rectangle());
        let font_size = self.properties.font_size_scaled(transform.scale);
        let fill = self.properties.background_brush(opacity * BACKGROUND_ALPHA);
        canvas.rounded_rect(fill, rect, font_size / 4.0, false);
        canvas.text(
            &self.text,
            crate::geometry::PointF::new(rect.x, rect.y),
            font_size,
            self.properties.foreground_brush(opacity),
        );
    }

    fn hit_test(&self, point: Point, timestamp: i64) -> Hit {
        if self.fading.opacity_at(timestamp) <= 0.0 {
            return Hit::Miss;
        }
        Hit::from_index(self.background.hit_test(point, true))
    }

    fn move_handle(&mut self, point: Point, _handle: u8, _modifiers: Modifiers) {
        // Bottom-right handle resizes by searching the closest font size.
        let wanted_height = (point.y - self.background.rectangle().y) as f64;
        self.properties.force_font_size(wanted_height, &self.text);
        self.style.read_back(&self.properties);
        self.update_background();
    }

    fn move_drawing(&mut self, dx: f64, dy: f64, _modifiers: Modifiers) {
        self.background.move_by(dx as i32, dy as i32);
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.text.hash(&mut hasher);
        let rect = self.background.rectangle();
        (rect.x, rect.y).hash(&mut hasher);
        hasher.finish() ^ self.style.content_hash()
    }

    fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        writer.element("Text", &self.text)?;
        writer.point_element("Position", self.position())?;

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
    style.bind("back color", StyleTarget::Bicolor);
    style.bind("font size", StyleTarget::Font);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::StyleElement;

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("back color", StyleElement::Color(Color::rgb(0, 0, 128)));
        style.insert("font size", StyleElement::FontSize(16));
        style
    }

    #[test]
    fn test_background_follows_text() {
        let mut label = TextLabel::new(Point::new(10, 10), 0, 10, preset());
        label.set_text("Back swing");
        assert!(label.hit_test(Point::new(15, 15), 0).is_hit());

        let before = label.background.rectangle().width;
        label.set_text("A much longer caption for this frame");
        assert!(label.background.rectangle().width > before);
    }

    #[test]
    fn test_resize_handle_changes_font_size() {
        let mut label = TextLabel::new(Point::new(0, 0), 0, 10, preset());
        label.set_text("Label");
        label.move_handle(Point::new(0, 60), 1, Modifiers::NONE);
        assert!(label.font_size() > 16);

        label.move_handle(Point::new(0, 5), 1, Modifiers::NONE);
        assert_eq!(label.font_size(), 8);
        // The bound style element follows the forced value.
        assert_eq!(
            label.style.element("font size"),
            Some(&StyleElement::FontSize(8))
        );
    }

    #[test]
    fn test_edit_mode_suppresses_rendering() {
        use crate::canvas::RecordingCanvas;

        let mut label = TextLabel::new(Point::new(0, 0), 0, 10, preset());
        label.set_text("Label");
        label.set_edit_mode(true);

        let mut canvas = RecordingCanvas::new();
        label.draw(&mut canvas, &ImageTransform::identity(), false, 0);
        assert!(canvas.is_empty());
    }

    #[test]
    fn test_kva_round_trip() {
        let mut label = TextLabel::new(Point::new(30, 40), 0, 10, preset());
        label.set_text("Contact point");

        let mut writer = KvaWriter::new();
        writer.start("Label").unwrap();
        label.write_kva(&mut writer).unwrap();
        writer.end("Label").unwrap();

        let node = XmlNode::parse(&writer.into_string().unwrap()).unwrap();
        let read = TextLabel::read_kva(&node, (1.0, 1.0), preset());
        assert_eq!(read.text(), "Contact point");
        assert_eq!(read.position(), Point::new(30, 40));
    }
}
