//! vannot - Video annotation overlay model
//!
//! A library modelling the annotation layer of a video-analysis application:
//! drawing objects (angles, lines, circles, labels, chronometers, grids,
//! pencil strokes, image overlays) that render over video frames, hit-test
//! for mouse interaction, share an editable style system, fade around their
//! anchor frame, and persist to the KVA XML project format.

pub mod canvas;
pub mod color;
pub mod drawing;
pub mod fading;
pub mod geometry;
pub mod keyframe;
pub mod kva;
pub mod metadata;
pub mod prefs;
pub mod style;
pub mod tools;

pub use canvas::{Canvas, ImageTransform, RecordingCanvas};
pub use color::Color;
pub use drawing::{Capabilities, Drawing, Hit, Modifiers};
pub use fading::Fading;
pub use geometry::{BoundingBox, Point, PointF, Quadrilateral, Rect, RectF, Size};
pub use keyframe::Keyframe;
pub use kva::{KvaError, SaveResult};
pub use metadata::{Calibration, ExtraDrawing, Metadata};
pub use prefs::{Preferences, PrefsError};
pub use style::{DrawingStyle, StyleElement, StyleProperties, StyleTarget};
pub use tools::{DrawingTool, PointerTool, ToolKit};
