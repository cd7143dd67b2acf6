//! Angle measurement between two rays.

use std::hash::{Hash, Hasher};

use crate::canvas::{estimate_text_size, Canvas, ImageTransform, Stroke};
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::{Point, PointF, Rect, RectF};
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;
use crate::style::{DrawingStyle, StyleProperties, StyleTarget};

const BACKGROUND_ALPHA: f64 = 92.0 / 255.0;
const LABEL_DISTANCE: f64 = 40.0;

/// Angle at vertex O between rays OA and OB.
///
/// The sweep runs from OA to OB going counterclockwise on screen, so the
/// stored sweep is always in (-360, 0]; the value shown to the user is its
/// negation.
pub struct AngleMeasure {
    o: Point,
    a: Point,
    b: Point,
    bounding_box: Rect,
    start_angle: f32,
    sweep_angle: f32,
    text_shift: Point,
    style: DrawingStyle,
    properties: StyleProperties,
    fading: Fading,
}

impl AngleMeasure {
    pub fn new(
        o: Point,
        a: Point,
        b: Point,
        timestamp: i64,
        average_tpf: i64,
        preset: DrawingStyle,
    ) -> Self {
        let mut properties = StyleProperties::default();
        properties.font_size = 12;
        let mut style = preset;
        bind(&mut style);
        style.apply(&mut properties);

        let mut angle = Self {
            o,
            a,
            b,
            bounding_box: Rect::default(),
            start_angle: 0.0,
            sweep_angle: 0.0,
            text_shift: Point::ORIGIN,
            style,
            properties,
            fading: Fading::new(timestamp, average_tpf),
        };
        angle.compute_values();
        angle
    }

    pub fn vertex(&self) -> Point {
        self.o
    }

    pub fn ray_a(&self) -> Point {
        self.a
    }

    pub fn ray_b(&self) -> Point {
        self.b
    }

    /// Angle value shown to the user, in whole degrees.
    pub fn user_angle(&self) -> i32 {
        (-self.sweep_angle as f64).floor() as i32
    }

    /// Swaps the two rays, measuring the conjugate angle.
    pub fn invert(&mut self) {
        std::mem::swap(&mut self.a, &mut self.b);
        self.compute_values();
    }

    fn compute_values(&mut self) {
        self.fix_degenerate_rays();
        self.compute_angles();
        self.compute_bounding_box();
        self.compute_text_position();
    }

    fn fix_degenerate_rays(&mut self) {
        if self.a == self.o {
            self.a = Point::new(self.o.x + 50, self.o.y);
        }
        if self.b == self.o {
            self.b = Point::new(self.o.x, self.o.y - 50);
        }
    }

    fn compute_angles(&mut self) {
        let mut oa_degrees = ((self.a.y - self.o.y) as f64 / (self.a.x - self.o.x) as f64)
            .atan()
            .to_degrees();
        if self.a.x < self.o.x {
            oa_degrees -= 180.0;
        }

        let mut ob_degrees = ((self.b.y - self.o.y) as f64 / (self.b.x - self.o.x) as f64)
            .atan()
            .to_degrees();
        if self.b.x < self.o.x {
            ob_degrees -= 180.0;
        }

        self.start_angle = oa_degrees as f32;
        let mut sweep = ob_degrees - oa_degrees;
        if ob_degrees > oa_degrees {
            sweep -= 360.0;
        }
        self.sweep_angle = sweep as f32;
    }

    fn compute_bounding_box(&mut self) {
        let oa = self.o.distance_to(self.a);
        let ob = self.o.distance_to(self.b);
        let mut radius = oa.min(ob) as i32;
        if radius > 20 {
            radius -= 10;
        }
        self.bounding_box = Rect::new(self.o.x - radius, self.o.y - radius, radius * 2, radius * 2);
    }

    fn compute_text_position(&mut self) {
        let mut bisector = (self.start_angle + self.sweep_angle / 2.0) as f64;
        if bisector < 0.0 {
            bisector += 360.0;
        }
        let radians = bisector.to_radians();
        self.text_shift = Point::new(
            (radians.cos() * LABEL_DISTANCE) as i32,
            (radians.sin() * LABEL_DISTANCE) as i32,
        );
    }

    fn in_sector(&self, point: Point) -> bool {
        if self.bounding_box == Rect::default() {
            return false;
        }
        let radius = self.bounding_box.width as f64 / 2.0;
        if self.o.distance_to(point) > radius {
            return false;
        }

        let dx = (point.x - self.o.x) as f64;
        let dy = (point.y - self.o.y) as f64;
        let theta = dy.atan2(dx).to_degrees();

        // Relative position inside the (-360, 0] sweep.
        let mut relative = (theta - self.start_angle as f64) % 360.0;
        if relative > 0.0 {
            relative -= 360.0;
        }
        relative >= self.sweep_angle as f64
    }

    pub fn read_kva(node: &XmlNode, scale: (f64, f64), preset: DrawingStyle) -> Self {
        let mut angle = Self::new(Point::ORIGIN, Point::ORIGIN, Point::ORIGIN, 0, 0, preset);
        let mut handled: Vec<&str> = Vec::new();

        let read_point = |name: &'static str, handled: &mut Vec<&str>| -> Option<Point> {
            node.child_text(name).map(|text| {
                handled.push(name);
                let p = xml::parse_point(text);
                Point::new(
                    (scale.0 * p.x as f64) as i32,
                    (scale.1 * p.y as f64) as i32,
                )
            })
        };

        if let Some(p) = read_point("PointO", &mut handled) {
            angle.o = p;
        }
        if let Some(p) = read_point("PointA", &mut handled) {
            angle.a = p;
        }
        if let Some(p) = read_point("PointB", &mut handled) {
            angle.b = p;
        }
        if let Some(style_node) = node.child("DrawingStyle") {
            angle.style = DrawingStyle::read_kva(style_node);
            bind(&mut angle.style);
            angle.style.apply(&mut angle.properties);
            handled.push("DrawingStyle");
        }
        if let Some(fading_node) = node.child("InfosFading") {
            angle.fading.read_kva(fading_node);
            handled.push("InfosFading");
        }
        handled.push("Measure");
        node.warn_unparsed(&handled);

        angle.compute_values();
        angle
    }
}

impl Drawing for AngleMeasure {
    fn xml_type(&self) -> Option<&'static str> {
        Some("Angle")
    }

    fn display_name(&self) -> String {
        String::from("Angle")
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

        let o = transform.transform(self.o);
        let a = transform.transform(self.a);
        let b = transform.transform(self.b);
        let bounding = transform.transform_rect(self.bounding_box);

        let edge_color = self.properties.background_brush(opacity);
        let fill = self.properties.background_brush(opacity * BACKGROUND_ALPHA);
        let pen = Stroke::solid(edge_color, 1.0);

        canvas.fill_pie(fill, bounding, self.start_angle, self.sweep_angle);
        canvas.pie(&pen, bounding, self.start_angle, self.sweep_angle);

        canvas.line(&pen, o, a);
        canvas.line(&pen, o, b);

        canvas.ellipse(&pen, RectF::new(o.x - 3.0, o.y - 3.0, 6.0, 6.0));
        canvas.fill_ellipse(edge_color, RectF::new(a.x - 3.0, a.y - 3.0, 6.0, 6.0));
        canvas.fill_ellipse(edge_color, RectF::new(b.x - 3.0, b.y - 3.0, 6.0, 6.0));

        // Measure label at the bisector.
        let label = format!("{}°", self.user_angle());
        let font_size = self.properties.font_size_scaled(transform.scale);
        let label_size = estimate_text_size(&label, font_size);
        let shift_x = (transform.scale * self.text_shift.x as f64) as f32;
        let shift_y = (transform.scale * self.text_shift.y as f64) as f32;
        let origin = PointF::new(
            shift_x + o.x - label_size.width / 2.0,
            shift_y + o.y - label_size.height / 2.0,
        );
        let back = RectF::new(origin.x, origin.y, label_size.width, label_size.height);
        canvas.rounded_rect(fill, back, font_size / 4.0, false);
        canvas.text(&label, origin, font_size, self.properties.foreground_brush(opacity));
    }

    fn hit_test(&self, point: Point, timestamp: i64) -> Hit {
        if self.fading.opacity_at(timestamp) <= 0.0 {
            return Hit::Miss;
        }

        if self.o.box_around(10).contains(point) {
            Hit::Handle(1)
        } else if self.a.box_around(10).contains(point) {
            Hit::Handle(2)
        } else if self.b.box_around(10).contains(point) {
            Hit::Handle(3)
        } else if self.in_sector(point) {
            Hit::Body
        } else {
            Hit::Miss
        }
    }

    fn move_handle(&mut self, point: Point, handle: u8, _modifiers: Modifiers) {
        match handle {
            1 => self.o = point,
            2 => self.a = point,
            3 => self.b = point,
            _ => return,
        }
        self.compute_values();
    }

    fn move_drawing(&mut self, dx: f64, dy: f64, _modifiers: Modifiers) {
        let (dx, dy) = (dx as i32, dy as i32);
        self.o = self.o.translate(dx, dy);
        self.a = self.a.translate(dx, dy);
        self.b = self.b.translate(dx, dy);
        self.compute_values();
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        (self.o.x, self.o.y).hash(&mut hasher);
        (self.a.x, self.a.y).hash(&mut hasher);
        (self.b.x, self.b.y).hash(&mut hasher);
        hasher.finish() ^ self.style.content_hash()
    }

    fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        writer.point_element("PointO", self.o)?;
        writer.point_element("PointA", self.a)?;
        writer.point_element("PointB", self.b)?;

        writer.start("DrawingStyle")?;
        self.style.write_kva(writer)?;
        writer.end("DrawingStyle")?;

        self.fading.write_kva(writer)?;

        // Spreadsheet export support.
        writer.start_with_attr("Measure", "UserAngle", &self.user_angle().to_string())?;
        writer.end("Measure")
    }

    fn style(&self) -> Option<&DrawingStyle> {
        Some(&self.style)
    }

    fn style_mut(&mut self) -> Option<&mut DrawingStyle> {
        Some(&mut self.style)
    }
}

fn bind(style: &mut DrawingStyle) {
    style.bind("line color", StyleTarget::Bicolor);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::style::StyleElement;

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("line color", StyleElement::Color(Color::rgb(255, 128, 0)));
        style
    }

    fn right_angle() -> AngleMeasure {
        // A to the right, B straight up (screen coordinates, y down).
        AngleMeasure::new(
            Point::new(100, 100),
            Point::new(200, 100),
            Point::new(100, 0),
            0,
            10,
            preset(),
        )
    }

    #[test]
    fn test_right_angle_measures_ninety() {
        let angle = right_angle();
        assert_eq!(angle.user_angle(), 90);
    }

    #[test]
    fn test_invert_measures_conjugate() {
        let mut angle = right_angle();
        angle.invert();
        assert_eq!(angle.user_angle(), 270);
    }

    #[test]
    fn test_degenerate_rays_snap() {
        let angle = AngleMeasure::new(
            Point::new(50, 50),
            Point::new(50, 50),
            Point::new(50, 50),
            0,
            10,
            preset(),
        );
        assert_eq!(angle.ray_a(), Point::new(100, 50));
        assert_eq!(angle.ray_b(), Point::new(50, 0));
        assert_eq!(angle.user_angle(), 90);
    }

    #[test]
    fn test_hit_vertices_then_sector() {
        let angle = right_angle();
        assert_eq!(angle.hit_test(Point::new(100, 100), 0), Hit::Handle(1));
        assert_eq!(angle.hit_test(Point::new(200, 105), 0), Hit::Handle(2));
        assert_eq!(angle.hit_test(Point::new(95, 5), 0), Hit::Handle(3));
        // Inside the sector, between the rays.
        assert_eq!(angle.hit_test(Point::new(130, 70), 0), Hit::Body);
        // Opposite quadrant.
        assert_eq!(angle.hit_test(Point::new(70, 130), 0), Hit::Miss);
    }

    #[test]
    fn test_bounding_radius_shrinks_past_twenty() {
        let angle = right_angle();
        // min(|OA|, |OB|) = 100, shrunk by 10.
        assert_eq!(angle.bounding_box.width, 180);

        let small = AngleMeasure::new(
            Point::new(0, 0),
            Point::new(15, 0),
            Point::new(0, -15),
            0,
            10,
            preset(),
        );
        assert_eq!(small.bounding_box.width, 30);
    }

    #[test]
    fn test_kva_round_trip() {
        let angle = right_angle();
        let mut writer = KvaWriter::new();
        writer.start("Angle").unwrap();
        angle.write_kva(&mut writer).unwrap();
        writer.end("Angle").unwrap();

        let xml_text = writer.into_string().unwrap();
        assert!(xml_text.contains("UserAngle=\"90\""));

        let node = XmlNode::parse(&xml_text).unwrap();
        let read = AngleMeasure::read_kva(&node, (1.0, 1.0), preset());
        assert_eq!(read.vertex(), Point::new(100, 100));
        assert_eq!(read.user_angle(), 90);
    }
}
