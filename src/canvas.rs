//! Rendering seam between drawings and the host application.
//!
//! Drawings emit primitive operations against the [`Canvas`] trait; the UI
//! shell supplies the real rasterizing implementation. [`RecordingCanvas`]
//! captures the operations for inspection in tests.

use std::path::{Path, PathBuf};

use crate::color::Color;
use crate::geometry::{Point, PointF, Rect, RectF, SizeF};
use crate::style::LineEnding;

/// Stroke parameters for outline primitives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stroke {
    pub color: Color,
    pub width: f32,
    pub ending: LineEnding,
    pub dashed: bool,
}

impl Stroke {
    pub fn solid(color: Color, width: f32) -> Self {
        Self {
            color,
            width,
            ending: LineEnding::None,
            dashed: false,
        }
    }
}

/// Primitive drawing surface.
///
/// Angles are in degrees, clockwise from the positive x axis, matching the
/// pie-sector convention of the angle drawing.
pub trait Canvas {
    fn line(&mut self, stroke: &Stroke, from: PointF, to: PointF);
    fn polyline(&mut self, stroke: &Stroke, points: &[PointF]);
    fn ellipse(&mut self, stroke: &Stroke, rect: RectF);
    fn fill_ellipse(&mut self, color: Color, rect: RectF);
    /// Portion of the ellipse outline inscribed in `rect`.
    fn arc(&mut self, stroke: &Stroke, rect: RectF, start_angle: f32, sweep_angle: f32);
    fn pie(&mut self, stroke: &Stroke, rect: RectF, start_angle: f32, sweep_angle: f32);
    fn fill_pie(&mut self, color: Color, rect: RectF, start_angle: f32, sweep_angle: f32);
    fn fill_polygon(&mut self, color: Color, points: &[PointF]);
    /// Rounded rectangle fill; `drop_shape` squares the top-left and
    /// bottom-right corners (chronometer look).
    fn rounded_rect(&mut self, color: Color, rect: RectF, radius: f32, drop_shape: bool);
    fn text(&mut self, text: &str, origin: PointF, font_size: f32, color: Color);
    /// Blit an external image (bitmap or rendered SVG) into `dest`.
    fn image(&mut self, source: &Path, dest: RectF, opacity: f64);
}

/// One recorded canvas operation.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Line {
        stroke: Stroke,
        from: PointF,
        to: PointF,
    },
    Polyline {
        stroke: Stroke,
        points: Vec<PointF>,
    },
    Ellipse {
        stroke: Stroke,
        rect: RectF,
    },
    FillEllipse {
        color: Color,
        rect: RectF,
    },
    Arc {
        stroke: Stroke,
        rect: RectF,
        start_angle: f32,
        sweep_angle: f32,
    },
    Pie {
        stroke: Stroke,
        rect: RectF,
        start_angle: f32,
        sweep_angle: f32,
    },
    FillPie {
        color: Color,
        rect: RectF,
        start_angle: f32,
        sweep_angle: f32,
    },
    FillPolygon {
        color: Color,
        points: Vec<PointF>,
    },
    RoundedRect {
        color: Color,
        rect: RectF,
        radius: f32,
        drop_shape: bool,
    },
    Text {
        text: String,
        origin: PointF,
        font_size: f32,
        color: Color,
    },
    Image {
        source: PathBuf,
        dest: RectF,
        opacity: f64,
    },
}

/// Canvas implementation recording every operation, for tests.
#[derive(Debug, Default)]
pub struct RecordingCanvas {
    pub ops: Vec<DrawOp>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Canvas for RecordingCanvas {
    fn line(&mut self, stroke: &Stroke, from: PointF, to: PointF) {
        self.ops.push(DrawOp::Line {
            stroke: *stroke,
            from,
            to,
        });
    }

    fn polyline(&mut self, stroke: &Stroke, points: &[PointF]) {
        self.ops.push(DrawOp::Polyline {
            stroke: *stroke,
            points: points.to_vec(),
        });
    }

    fn ellipse(&mut self, stroke: &Stroke, rect: RectF) {
        self.ops.push(DrawOp::Ellipse {
            stroke: *stroke,
            rect,
        });
    }

    fn fill_ellipse(&mut self, color: Color, rect: RectF) {
        self.ops.push(DrawOp::FillEllipse { color, rect });
    }

    fn arc(&mut self, stroke: &Stroke, rect: RectF, start_angle: f32, sweep_angle: f32) {
        self.ops.push(DrawOp::Arc {
            stroke: *stroke,
            rect,
            start_angle,
            sweep_angle,
        });
    }

    fn pie(&mut self, stroke: &Stroke, rect: RectF, start_angle: f32, sweep_angle: f32) {
        self.ops.push(DrawOp::Pie {
            stroke: *stroke,
            rect,
            start_angle,
            sweep_angle,
        });
    }

    fn fill_pie(&mut self, color: Color, rect: RectF, start_angle: f32, sweep_angle: f32) {
        self.ops.push(DrawOp::FillPie {
            color,
            rect,
            start_angle,
            sweep_angle,
        });
    }

    fn fill_polygon(&mut self, color: Color, points: &[PointF]) {
        self.ops.push(DrawOp::FillPolygon {
            color,
            points: points.to_vec(),
        });
    }

    fn rounded_rect(&mut self, color: Color, rect: RectF, radius: f32, drop_shape: bool) {
        self.ops.push(DrawOp::RoundedRect {
            color,
            rect,
            radius,
            drop_shape,
        });
    }

    fn text(&mut self, text: &str, origin: PointF, font_size: f32, color: Color) {
        self.ops.push(DrawOp::Text {
            text: text.to_string(),
            origin,
            font_size,
            color,
        });
    }

    fn image(&mut self, source: &Path, dest: RectF, opacity: f64) {
        self.ops.push(DrawOp::Image {
            source: source.to_path_buf(),
            dest,
            opacity,
        });
    }
}

/// Transform from image-space coordinates (where drawings live) to display
/// coordinates (stretched/zoomed rendering surface).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageTransform {
    pub scale: f64,
    pub offset: PointF,
}

impl ImageTransform {
    pub fn identity() -> Self {
        Self {
            scale: 1.0,
            offset: PointF::new(0.0, 0.0),
        }
    }

    pub fn new(scale: f64, offset: PointF) -> Self {
        Self { scale, offset }
    }

    pub fn transform(&self, p: Point) -> PointF {
        PointF::new(
            (p.x as f64 * self.scale) as f32 + self.offset.x,
            (p.y as f64 * self.scale) as f32 + self.offset.y,
        )
    }

    pub fn transform_f(&self, p: PointF) -> PointF {
        PointF::new(
            (p.x as f64 * self.scale) as f32 + self.offset.x,
            (p.y as f64 * self.scale) as f32 + self.offset.y,
        )
    }

    pub fn transform_rect(&self, r: Rect) -> RectF {
        let loc = self.transform(r.location());
        RectF::new(
            loc.x,
            loc.y,
            (r.width as f64 * self.scale) as f32,
            (r.height as f64 * self.scale) as f32,
        )
    }

    /// Back from display coordinates to image coordinates.
    pub fn untransform(&self, p: PointF) -> Point {
        Point::new(
            (((p.x - self.offset.x) as f64) / self.scale).round() as i32,
            (((p.y - self.offset.y) as f64) / self.scale).round() as i32,
        )
    }
}

impl Default for ImageTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Deterministic text extent estimation.
///
/// No font rasterizer is in scope for the model layer; label layout and the
/// font-size search both use this metric so results stay consistent.
pub fn estimate_text_size(text: &str, font_size: f32) -> SizeF {
    let longest_line = text
        .lines()
        .map(|l| l.chars().count())
        .max()
        .unwrap_or(0)
        .max(1);
    let line_count = text.lines().count().max(1);

    SizeF::new(
        longest_line as f32 * font_size * 0.6 + font_size * 0.4,
        line_count as f32 * font_size * 1.4,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_round_trip() {
        let t = ImageTransform::new(1.5, PointF::new(10.0, -4.0));
        let p = Point::new(120, 66);
        assert_eq!(t.untransform(t.transform(p)), p);
    }

    #[test]
    fn test_text_size_monotonic_in_length() {
        let a = estimate_text_size("ab", 12.0);
        let b = estimate_text_size("abcd", 12.0);
        assert!(b.width > a.width);
        assert_eq!(a.height, b.height);
    }

    #[test]
    fn test_text_size_monotonic_in_font() {
        let a = estimate_text_size("chrono", 10.0);
        let b = estimate_text_size("chrono", 20.0);
        assert!(b.width > a.width && b.height > a.height);
    }
}
