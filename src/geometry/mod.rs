//! Geometric primitives and helpers for drawings and hit-testing.

mod bounding_box;
mod homography;
mod point;
mod quadrilateral;
mod rounded_rect;

pub use bounding_box::BoundingBox;
pub use homography::Homography;
pub use point::{distance_to_segment, Point, PointF, Rect, RectF, Size, SizeF};
pub use quadrilateral::Quadrilateral;
pub use rounded_rect::RoundedRectangle;
