//! Resizable bounding box shared by the image overlays.

use super::{Point, Rect, Size};

/// Hit radius of the corner handles.
const HANDLE_RADIUS: i32 = 6;

/// Smallest allowed width when resizing.
const MIN_WIDTH: i32 = 50;

/// A rectangle with four corner resize handles.
///
/// Hit convention: -1 miss, 0 body, 1..=4 corners clockwise from top-left.
/// Resizing preserves the aspect ratio of the given original size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BoundingBox {
    rectangle: Rect,
}

impl BoundingBox {
    pub fn new(rectangle: Rect) -> Self {
        Self { rectangle }
    }

    pub fn rectangle(&self) -> Rect {
        self.rectangle
    }

    pub fn set_rectangle(&mut self, rectangle: Rect) {
        self.rectangle = rectangle;
    }

    pub fn hit_test(&self, point: Point) -> i32 {
        let r = self.rectangle;
        let corners = [
            Point::new(r.x, r.y),
            Point::new(r.right(), r.y),
            Point::new(r.right(), r.bottom()),
            Point::new(r.x, r.bottom()),
        ];
        for (i, corner) in corners.iter().enumerate() {
            if corner.box_around(HANDLE_RADIUS).contains(point) {
                return i as i32 + 1;
            }
        }
        if r.contains(point) {
            0
        } else {
            -1
        }
    }

    pub fn move_handle(&mut self, point: Point, handle: u8, original_size: Size) {
        let r = self.rectangle;
        let new_width = match handle {
            1 | 4 => r.width - (point.x - r.x),
            2 | 3 => r.width - (r.right() - point.x),
            _ => return,
        };
        if new_width <= MIN_WIDTH || original_size.width <= 0 {
            return;
        }

        let ratio = new_width as f64 / original_size.width as f64;
        let new_height = (original_size.height as f64 * ratio) as i32;

        self.rectangle = match handle {
            1 => Rect::new(point.x, r.bottom() - new_height, new_width, new_height),
            2 => Rect::new(
                point.x - new_width,
                r.bottom() - new_height,
                new_width,
                new_height,
            ),
            3 => Rect::new(point.x - new_width, r.y, new_width, new_height),
            _ => Rect::new(point.x, r.y, new_width, new_height),
        };
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.rectangle = self.rectangle.translate(dx, dy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_corners_clockwise() {
        let b = BoundingBox::new(Rect::new(100, 100, 200, 100));
        assert_eq!(b.hit_test(Point::new(100, 100)), 1);
        assert_eq!(b.hit_test(Point::new(300, 100)), 2);
        assert_eq!(b.hit_test(Point::new(300, 200)), 3);
        assert_eq!(b.hit_test(Point::new(100, 200)), 4);
        assert_eq!(b.hit_test(Point::new(200, 150)), 0);
        assert_eq!(b.hit_test(Point::new(0, 0)), -1);
    }

    #[test]
    fn test_resize_preserves_aspect() {
        let mut b = BoundingBox::new(Rect::new(100, 100, 200, 100));
        // Drag the bottom-right corner 100px to the right.
        b.move_handle(Point::new(400, 200), 3, Size::new(200, 100));
        let r = b.rectangle();
        assert_eq!(r, Rect::new(100, 100, 300, 150));
    }

    #[test]
    fn test_resize_ignores_tiny_width() {
        let mut b = BoundingBox::new(Rect::new(100, 100, 200, 100));
        // Dragging the corner inside the 50px minimum leaves the box alone.
        b.move_handle(Point::new(140, 200), 3, Size::new(200, 100));
        assert_eq!(b.rectangle(), Rect::new(100, 100, 200, 100));
    }
}
