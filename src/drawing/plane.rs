//! Perspective grid or flat grid overlaid on the image.

use std::hash::{Hash, Hasher};

use crate::canvas::{Canvas, ImageTransform};
use crate::drawing::{Capabilities, Drawing, Hit, Modifiers};
use crate::fading::Fading;
use crate::geometry::{Homography, Point, PointF, Quadrilateral, RectF, Size};
use crate::kva::writer::KvaWriter;
use crate::kva::xml::{self, XmlNode};
use crate::kva::KvaError;
use crate::style::{DrawingStyle, StyleProperties, StyleTarget};

const MIN_DIVISIONS: i32 = 2;
const DEFAULT_DIVISIONS: i32 = 8;
const MAX_DIVISIONS: i32 = 20;

/// Grid drawing. In perspective mode the corners move freely and the grid
/// lines follow the projective mapping of the unit square onto the
/// quadrilateral; in flat mode the corners stay a rectangle.
pub struct Plane {
    corners: Quadrilateral,
    /// Mapping reference captured at the last explicit reshape, so that
    /// expansion drags stay relative to the original mapping.
    reference: Quadrilateral,
    perspective: bool,
    valid_plane: bool,
    initialized: bool,
    shift: f64,
    divisions: i32,
    style: DrawingStyle,
    properties: StyleProperties,
    fading: Fading,
}

impl Plane {
    pub fn new(
        divisions: i32,
        perspective: bool,
        timestamp: i64,
        average_tpf: i64,
        preset: DrawingStyle,
    ) -> Self {
        let mut properties = StyleProperties::default();
        let mut style = preset;
        bind(&mut style);
        style.apply(&mut properties);

        let mut fading = Fading::new(timestamp, average_tpf);
        fading.use_default = false;
        fading.always_visible = true;

        let corners = Quadrilateral::unit_square();
        Self {
            corners,
            reference: corners,
            perspective,
            valid_plane: true,
            initialized: false,
            shift: 0.0,
            divisions: if divisions == 0 {
                DEFAULT_DIVISIONS
            } else {
                divisions
            },
            style,
            properties,
            fading,
        }
    }

    pub fn corners(&self) -> &Quadrilateral {
        &self.corners
    }

    pub fn divisions(&self) -> i32 {
        self.divisions
    }

    pub fn perspective(&self) -> bool {
        self.perspective
    }

    pub fn is_valid_plane(&self) -> bool {
        self.valid_plane
    }

    /// Places the default corners relative to the image, once.
    pub fn set_locations(&mut self, image_size: Size) {
        if self.initialized {
            return;
        }
        self.initialized = true;

        let horz = image_size.width / 10;
        let vert = image_size.height / 10;
        if self.perspective {
            self.corners = Quadrilateral::new(
                Point::new(3 * horz, 4 * vert),
                Point::new(7 * horz, 4 * vert),
                Point::new(9 * horz, 8 * vert),
                Point::new(1 * horz, 8 * vert),
            );
        } else {
            self.corners = Quadrilateral::new(
                Point::new(2 * horz, 2 * vert),
                Point::new(8 * horz, 2 * vert),
                Point::new(8 * horz, 8 * vert),
                Point::new(2 * horz, 8 * vert),
            );
        }
        self.capture_reference();
        self.shift = 0.0;
    }

    pub fn reset(&mut self) {
        self.divisions = DEFAULT_DIVISIONS;
        self.shift = 0.0;
        self.valid_plane = true;
        self.initialized = false;
        self.corners = Quadrilateral::unit_square();
    }

    fn capture_reference(&mut self) {
        self.reference = self.corners;
    }

    fn expand_perspective(&mut self, dx: f64, dy: f64) {
        if !self.valid_plane {
            return;
        }
        let homography = Homography::from_quad(self.reference.corners_f());
        let shift = self.shift + (dx - dy) / 200.0;
        let s = shift as f32;
        let shifted = [
            homography.map(PointF::new(-s, -s)),
            homography.map(PointF::new(1.0 + s, -s)),
            homography.map(PointF::new(1.0 + s, 1.0 + s)),
            homography.map(PointF::new(-s, 1.0 + s)),
        ];
        if shifted.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            log::debug!("Overflow during grid expansion");
            return;
        }

        self.shift = shift;
        self.corners = Quadrilateral::new(
            Point::new(shifted[0].x as i32, shifted[0].y as i32),
            Point::new(shifted[1].x as i32, shifted[1].y as i32),
            Point::new(shifted[2].x as i32, shifted[2].y as i32),
            Point::new(shifted[3].x as i32, shifted[3].y as i32),
        );
    }

    fn expand_flat(&mut self, offset: f64) {
        // Offset [-10, +10] maps to a growth of [0.9, 1.1].
        let grow = 1.0 + offset / 100.0;
        let width = (self.corners.b().x - self.corners.a().x) as f64;
        let height = (self.corners.d().y - self.corners.a().y) as f64;
        let shift_x = ((grow * width - width) / 2.0) as i32;
        let shift_y = ((grow * height - height) / 2.0) as i32;
        self.corners.expand(shift_x, shift_y);
    }

    pub fn read_kva(node: &XmlNode, scale: (f64, f64), preset: DrawingStyle) -> Self {
        let mut plane = Self::new(DEFAULT_DIVISIONS, false, 0, 0, preset);
        plane.reset();
        let mut handled: Vec<&str> = Vec::new();

        let corner_names = [
            ("PointUpperLeft", 0usize),
            ("PointUpperRight", 1),
            ("PointLowerRight", 2),
            ("PointLowerLeft", 3),
        ];
        for (name, index) in corner_names {
            if let Some(text) = node.child_text(name) {
                let p = xml::parse_point(text);
                plane.corners.set_corner(
                    index,
                    Point::new(
                        (scale.0 * p.x as f64) as i32,
                        (scale.1 * p.y as f64) as i32,
                    ),
                );
                handled.push(name);
            }
        }
        if let Some(text) = node.child_text("Divisions") {
            plane.divisions = (xml::parse_int_or(text, DEFAULT_DIVISIONS as i64) as i32)
                .clamp(MIN_DIVISIONS, MAX_DIVISIONS);
            handled.push("Divisions");
        }
        if let Some(text) = node.child_text("Perspective") {
            plane.perspective = xml::parse_bool(text);
            handled.push("Perspective");
        }
        if let Some(style_node) = node.child("DrawingStyle") {
            plane.style = DrawingStyle::read_kva(style_node);
            bind(&mut plane.style);
            plane.style.apply(&mut plane.properties);
            handled.push("DrawingStyle");
        }
        if let Some(fading_node) = node.child("InfosFading") {
            plane.fading.read_kva(fading_node);
            handled.push("InfosFading");
        }
        node.warn_unparsed(&handled);

        // A flat grid that is no longer rectangular can only be represented
        // in perspective mode.
        if !plane.perspective && !plane.corners.is_rectangle() {
            plane.perspective = true;
        }
        plane.initialized = true;
        plane.capture_reference();
        plane
    }
}

impl Drawing for Plane {
    fn xml_type(&self) -> Option<&'static str> {
        Some("Plane")
    }

    fn display_name(&self) -> String {
        if self.perspective {
            String::from("Perspective grid")
        } else {
            String::from("Grid")
        }
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

        let quad: Vec<PointF> = self
            .corners
            .corners()
            .iter()
            .map(|p| transform.transform(*p))
            .collect();
        let pen = self.properties.pen(opacity, 1.0);
        let brush = self.properties.brush(opacity);

        for p in &quad {
            canvas.fill_ellipse(brush, RectF::new(p.x - 4.0, p.y - 4.0, 8.0, 8.0));
        }

        if self.valid_plane {
            let homography = Homography::from_quad([quad[0], quad[1], quad[2], quad[3]]);
            for row in 0..=self.divisions {
                let v = row as f32 / self.divisions as f32;
                let h1 = homography.map(PointF::new(0.0, v));
                let h2 = homography.map(PointF::new(1.0, v));
                canvas.line(&pen, h1, h2);
            }
            for col in 0..=self.divisions {
                let h = col as f32 / self.divisions as f32;
                let h1 = homography.map(PointF::new(h, 0.0));
                let h2 = homography.map(PointF::new(h, 1.0));
                canvas.line(&pen, h1, h2);
            }
        } else {
            canvas.line(&pen, quad[0], quad[1]);
            canvas.line(&pen, quad[1], quad[2]);
            canvas.line(&pen, quad[2], quad[3]);
            canvas.line(&pen, quad[3], quad[0]);
        }
    }

    fn hit_test(&self, point: Point, timestamp: i64) -> Hit {
        if self.fading.opacity_at(timestamp) <= 0.0 {
            return Hit::Miss;
        }

        for i in 0..4 {
            if self.corners.corner(i).box_around(6).contains(point) {
                return Hit::Handle(i as u8 + 1);
            }
        }
        if self.corners.contains(point) {
            Hit::Body
        } else {
            Hit::Miss
        }
    }

    fn move_handle(&mut self, point: Point, handle: u8, _modifiers: Modifiers) {
        let index = (handle - 1) as usize;
        self.corners.set_corner(index, point);
        if self.perspective {
            self.valid_plane = self.corners.is_convex();
        } else {
            self.corners.make_rectangle(index);
        }
        self.capture_reference();
        self.shift = 0.0;
    }

    fn move_drawing(&mut self, dx: f64, dy: f64, modifiers: Modifiers) {
        if modifiers.alt {
            // Adjust the number of divisions.
            self.divisions += ((dx - dy) / 4.0) as i32;
            self.divisions = self.divisions.clamp(MIN_DIVISIONS, MAX_DIVISIONS);
        } else if modifiers.ctrl {
            if self.perspective {
                self.expand_perspective(dx, dy);
            } else {
                self.expand_flat(dx);
            }
        } else {
            self.corners.translate(dx as i32, dy as i32);
            self.capture_reference();
            self.shift = 0.0;
        }
    }

    fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        for p in self.corners.corners() {
            (p.x, p.y).hash(&mut hasher);
        }
        self.divisions.hash(&mut hasher);
        self.perspective.hash(&mut hasher);
        hasher.finish() ^ self.style.content_hash()
    }

    fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError> {
        writer.point_element("PointUpperLeft", self.corners.a())?;
        writer.point_element("PointUpperRight", self.corners.b())?;
        writer.point_element("PointLowerRight", self.corners.c())?;
        writer.point_element("PointLowerLeft", self.corners.d())?;
        writer.int_element("Divisions", self.divisions as i64)?;
        writer.bool_element("Perspective", self.perspective)?;

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
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::style::StyleElement;

    fn preset() -> DrawingStyle {
        let mut style = DrawingStyle::new();
        style.insert("color", StyleElement::Color(Color::rgb(128, 0, 128)));
        style
    }

    fn flat_plane() -> Plane {
        let mut plane = Plane::new(8, false, 0, 10, preset());
        plane.set_locations(Size::new(1000, 1000));
        plane
    }

    #[test]
    fn test_set_locations_once() {
        let mut plane = flat_plane();
        assert_eq!(plane.corners().a(), Point::new(200, 200));
        assert_eq!(plane.corners().c(), Point::new(800, 800));

        plane.set_locations(Size::new(10, 10));
        assert_eq!(plane.corners().a(), Point::new(200, 200));
    }

    #[test]
    fn test_alt_drag_clamps_divisions() {
        let mut plane = flat_plane();
        let alt = Modifiers {
            alt: true,
            ..Modifiers::NONE
        };
        plane.move_drawing(400.0, 0.0, alt);
        assert_eq!(plane.divisions(), MAX_DIVISIONS);

        plane.move_drawing(-400.0, 0.0, alt);
        assert_eq!(plane.divisions(), MIN_DIVISIONS);
    }

    #[test]
    fn test_flat_plane_stays_rectangular() {
        let mut plane = flat_plane();
        plane.move_handle(Point::new(850, 820), 3, Modifiers::NONE);
        assert!(plane.corners().is_rectangle());
        assert_eq!(plane.corners().c(), Point::new(850, 820));
    }

    #[test]
    fn test_flat_expand_grows_around_center() {
        let mut plane = flat_plane();
        let ctrl = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        plane.move_drawing(10.0, 0.0, ctrl);
        assert_eq!(plane.corners().a(), Point::new(170, 170));
        assert_eq!(plane.corners().c(), Point::new(830, 830));
    }

    #[test]
    fn test_concave_perspective_invalidates_plane() {
        let mut plane = Plane::new(8, true, 0, 10, preset());
        plane.set_locations(Size::new(1000, 1000));
        assert!(plane.is_valid_plane());

        // Drag the lower-right corner inside the triangle of the others.
        plane.move_handle(Point::new(450, 500), 3, Modifiers::NONE);
        assert!(!plane.is_valid_plane());
    }

    #[test]
    fn test_kva_round_trip() {
        let plane = flat_plane();
        let mut writer = KvaWriter::new();
        writer.start("Plane").unwrap();
        plane.write_kva(&mut writer).unwrap();
        writer.end("Plane").unwrap();

        let node = XmlNode::parse(&writer.into_string().unwrap()).unwrap();
        let read = Plane::read_kva(&node, (1.0, 1.0), preset());
        assert_eq!(read.corners(), plane.corners());
        assert_eq!(read.divisions(), 8);
        assert!(!read.perspective());
    }

    #[test]
    fn test_kva_read_clamps_divisions() {
        for (value, expected) in [("0", MIN_DIVISIONS), ("99", MAX_DIVISIONS)] {
            let node = XmlNode::parse(&format!(
                "<Plane>\
                   <PointUpperLeft>0;0</PointUpperLeft>\
                   <PointUpperRight>100;0</PointUpperRight>\
                   <PointLowerRight>100;100</PointLowerRight>\
                   <PointLowerLeft>0;100</PointLowerLeft>\
                   <Divisions>{}</Divisions>\
                 </Plane>",
                value
            ))
            .unwrap();
            let read = Plane::read_kva(&node, (1.0, 1.0), preset());
            assert_eq!(read.divisions(), expected);
        }
    }

    #[test]
    fn test_skewed_flat_plane_promotes_to_perspective() {
        let node = XmlNode::parse(
            "<Plane>\
               <PointUpperLeft>0;0</PointUpperLeft>\
               <PointUpperRight>100;20</PointUpperRight>\
               <PointLowerRight>100;120</PointLowerRight>\
               <PointLowerLeft>0;100</PointLowerLeft>\
               <Divisions>4</Divisions>\
               <Perspective>false</Perspective>\
             </Plane>",
        )
        .unwrap();
        let read = Plane::read_kva(&node, (1.0, 1.0), preset());
        assert!(read.perspective());
    }
}
