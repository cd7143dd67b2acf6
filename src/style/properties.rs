//! Concrete render parameters derived from a drawing's style.

use std::hash::{Hash, Hasher};

use crate::canvas::{estimate_text_size, Stroke};
use crate::color::Color;
use crate::style::element::{LineEnding, TrackShape, FONT_SIZES};

/// Property kinds a style element can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleTarget {
    Color,
    LineSize,
    LineEnding,
    TrackShape,
    Font,
    /// Background color with an automatically contrasted foreground.
    Bicolor,
}

/// The resolved visual parameters a drawing renders with.
///
/// Bound style elements write into these fields through
/// [`crate::style::DrawingStyle::apply`]; drawings then derive pens and
/// brushes with the opacity of the moment.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleProperties {
    pub color: Color,
    pub line_size: i32,
    pub line_ending: LineEnding,
    pub track_shape: TrackShape,
    pub font_size: i32,
    background: Color,
    foreground: Color,
}

impl Default for StyleProperties {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            line_size: 2,
            line_ending: LineEnding::None,
            track_shape: TrackShape::Solid,
            font_size: 10,
            background: Color::BLACK,
            foreground: Color::WHITE,
        }
    }
}

impl StyleProperties {
    /// Sets the bicolor background; the foreground follows as its contrast.
    pub fn set_background(&mut self, color: Color) {
        self.background = color;
        self.foreground = color.contrast();
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    /// Outline pen at the given opacity, scaled to display space.
    /// Width never collapses below one pixel.
    pub fn pen(&self, opacity: f64, scale: f64) -> Stroke {
        Stroke {
            color: self.color.faded(opacity),
            width: pen_width(self.line_size, scale),
            ending: self.line_ending,
            dashed: false,
        }
    }

    /// Pen for trajectory polylines, dash pattern from the track shape.
    pub fn track_pen(&self, opacity: f64, scale: f64) -> Stroke {
        Stroke {
            color: self.color.faded(opacity),
            width: pen_width(self.line_size, scale),
            ending: LineEnding::None,
            dashed: self.track_shape.dashed(),
        }
    }

    /// Fill color at the given opacity.
    pub fn brush(&self, opacity: f64) -> Color {
        self.color.faded(opacity)
    }

    pub fn background_brush(&self, opacity: f64) -> Color {
        self.background.faded(opacity)
    }

    pub fn foreground_brush(&self, opacity: f64) -> Color {
        self.foreground.faded(opacity)
    }

    /// Font size in display space, never below the smallest authorized size.
    pub fn font_size_scaled(&self, scale: f64) -> f32 {
        let scaled = self.font_size as f64 * scale;
        scaled.max(FONT_SIZES[0] as f64) as f32
    }

    /// Picks the authorized font size whose measured height for `text` is
    /// closest to `target_height`. Used when resizing a label by its handle.
    pub fn force_font_size(&mut self, target_height: f64, text: &str) {
        let mut best = FONT_SIZES[0];
        let mut best_diff = f64::MAX;
        for &candidate in &FONT_SIZES {
            let measured = estimate_text_size(text, candidate as f32).height as f64;
            let diff = (target_height - measured).abs();
            if diff < best_diff {
                best_diff = diff;
                best = candidate;
            }
        }
        self.font_size = best;
    }

    pub fn content_hash(&self) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        (self.color.r, self.color.g, self.color.b, self.color.a).hash(&mut hasher);
        self.line_size.hash(&mut hasher);
        self.line_ending.hash(&mut hasher);
        self.track_shape.hash(&mut hasher);
        self.font_size.hash(&mut hasher);
        let bg = self.background;
        (bg.r, bg.g, bg.b, bg.a).hash(&mut hasher);
        hasher.finish()
    }
}

fn pen_width(line_size: i32, scale: f64) -> f32 {
    ((line_size as f64 * scale).round() as f32).max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pen_width_floor() {
        let properties = StyleProperties {
            line_size: 2,
            ..Default::default()
        };
        let pen = properties.pen(1.0, 0.1);
        assert_eq!(pen.width, 1.0);
    }

    #[test]
    fn test_pen_fades_color() {
        let properties = StyleProperties {
            color: Color::rgb(200, 100, 0),
            ..Default::default()
        };
        let pen = properties.pen(0.5, 1.0);
        assert_eq!(pen.color.a, 127);
        assert_eq!((pen.color.r, pen.color.g, pen.color.b), (200, 100, 0));
    }

    #[test]
    fn test_bicolor_foreground_contrast() {
        let mut properties = StyleProperties::default();
        properties.set_background(Color::rgb(250, 250, 250));
        assert_eq!(properties.foreground(), Color::BLACK);

        properties.set_background(Color::rgb(10, 10, 30));
        assert_eq!(properties.foreground(), Color::WHITE);
    }

    #[test]
    fn test_force_font_size_picks_closest() {
        let mut properties = StyleProperties::default();
        let wanted = estimate_text_size("Label", 20.0).height as f64;
        properties.force_font_size(wanted, "Label");
        assert_eq!(properties.font_size, 20);

        properties.force_font_size(1.0, "Label");
        assert_eq!(properties.font_size, 8);

        properties.force_font_size(10_000.0, "Label");
        assert_eq!(properties.font_size, 36);
    }

    #[test]
    fn test_font_size_scaled_floor() {
        let properties = StyleProperties {
            font_size: 10,
            ..Default::default()
        };
        assert_eq!(properties.font_size_scaled(0.2), 8.0);
        assert_eq!(properties.font_size_scaled(2.0), 20.0);
    }
}
