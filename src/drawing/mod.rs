//! The drawing variants and their shared trait.
//!
//! A drawing is an overlay object attached to a keyframe (or, for
//! chronometers and trajectories, to the whole video). All variants share
//! the same lifecycle: hit-testing in image space, dragging by handle or
//! whole body, fading relative to their reference timestamp, and KVA
//! serialization for the variants that have a persisted form.

pub mod angle;
pub mod bitmap;
pub mod chrono;
pub mod circle;
pub mod cross;
pub mod label;
pub mod line;
pub mod pencil;
pub mod plane;
pub mod svg;
pub mod text;
pub mod track;

pub use angle::AngleMeasure;
pub use bitmap::ImageOverlay;
pub use chrono::ChronoMark;
pub use circle::Circle;
pub use cross::CrossMark;
pub use label::AnchoredLabel;
pub use line::Line;
pub use pencil::Pencil;
pub use plane::Plane;
pub use svg::SvgOverlay;
pub use text::TextLabel;
pub use track::Track;

use crate::canvas::{Canvas, ImageTransform};
use crate::fading::Fading;
use crate::geometry::Point;
use crate::kva::writer::KvaWriter;
use crate::kva::KvaError;
use crate::style::DrawingStyle;

/// Result of probing a drawing at an image-space point.
///
/// The legacy convention is an integer: -1 for a miss, 0 for the body and
/// n > 0 for the n-th manipulation handle. [`Hit::index`] preserves that
/// mapping for code that routes on the raw number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Miss,
    Body,
    Handle(u8),
}

impl Hit {
    pub fn index(self) -> i32 {
        match self {
            Hit::Miss => -1,
            Hit::Body => 0,
            Hit::Handle(n) => n as i32,
        }
    }

    pub fn from_index(index: i32) -> Hit {
        match index {
            i if i < 0 => Hit::Miss,
            0 => Hit::Body,
            n => Hit::Handle(n as u8),
        }
    }

    pub fn is_hit(self) -> bool {
        self != Hit::Miss
    }
}

/// Keyboard modifiers active during a drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
    };
}

/// What a drawing variant supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    /// Opacity follows the fading envelope around the reference timestamp.
    pub fading: bool,
    /// A fixed opacity factor can be configured instead of fading.
    pub opacity: bool,
    /// The drawing exposes an editable style.
    pub style: bool,
}

/// Common behavior of every overlay drawing.
pub trait Drawing {
    /// Element name in KVA documents, `None` for render-only variants.
    fn xml_type(&self) -> Option<&'static str>;

    fn display_name(&self) -> String;

    fn capabilities(&self) -> Capabilities;

    fn fading(&self) -> &Fading;

    fn fading_mut(&mut self) -> &mut Fading;

    /// Renders the drawing at `timestamp`. Implementations return without
    /// emitting anything when the fading opacity is zero.
    fn draw(
        &self,
        canvas: &mut dyn Canvas,
        transform: &ImageTransform,
        selected: bool,
        timestamp: i64,
    );

    /// Probes `point` (image space) at `timestamp`. Always a miss while the
    /// drawing is fully faded out.
    fn hit_test(&self, point: Point, timestamp: i64) -> Hit;

    fn move_handle(&mut self, point: Point, handle: u8, modifiers: Modifiers);

    fn move_drawing(&mut self, dx: f64, dy: f64, modifiers: Modifiers);

    /// Hash over the persisted state, used for dirty tracking.
    fn content_hash(&self) -> u64;

    /// Writes the inner elements of the drawing (the caller wraps them in
    /// the variant element carrying the `id` attribute).
    fn write_kva(&self, writer: &mut KvaWriter) -> Result<(), KvaError>;

    fn style(&self) -> Option<&DrawingStyle> {
        None
    }

    fn style_mut(&mut self) -> Option<&mut DrawingStyle> {
        None
    }
}
