//! Rounded rectangle used as background for text labels and chronometers.

use super::{Point, Rect};

/// Handle id returned when the hidden bottom-right resize handle is hit.
const RESIZE_HANDLE: u8 = 1;

/// Hit radius of the hidden resize handle.
const HANDLE_RADIUS: i32 = 10;

/// A label background rectangle with a hidden resize handle at bottom-right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoundedRectangle {
    rectangle: Rect,
}

impl RoundedRectangle {
    pub fn new(rectangle: Rect) -> Self {
        Self { rectangle }
    }

    pub fn rectangle(&self) -> Rect {
        self.rectangle
    }

    pub fn set_rectangle(&mut self, rectangle: Rect) {
        self.rectangle = rectangle;
    }

    pub fn center(&self) -> Point {
        self.rectangle.center()
    }

    /// Hit convention: -1 miss, 0 body, 1 resize handle (when enabled).
    pub fn hit_test(&self, point: Point, hidden_handle: bool) -> i32 {
        if hidden_handle {
            let bottom_right = Point::new(self.rectangle.right(), self.rectangle.bottom());
            if bottom_right.box_around(HANDLE_RADIUS).contains(point) {
                return RESIZE_HANDLE as i32;
            }
        }

        if self.rectangle.contains(point) {
            0
        } else {
            -1
        }
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.rectangle = self.rectangle.translate(dx, dy);
    }

    pub fn center_on(&mut self, point: Point) {
        self.rectangle = Rect::new(
            point.x - self.rectangle.width / 2,
            point.y - self.rectangle.height / 2,
            self.rectangle.width,
            self.rectangle.height,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_convention() {
        let r = RoundedRectangle::new(Rect::new(100, 100, 80, 30));

        assert_eq!(r.hit_test(Point::new(0, 0), true), -1);
        assert_eq!(r.hit_test(Point::new(120, 110), true), 0);
        // Bottom-right corner is the hidden handle.
        assert_eq!(r.hit_test(Point::new(180, 130), true), 1);
        // Handle disabled: corner point is outside the body.
        assert_eq!(r.hit_test(Point::new(185, 135), false), -1);
    }

    #[test]
    fn test_center_on() {
        let mut r = RoundedRectangle::new(Rect::new(0, 0, 40, 20));
        r.center_on(Point::new(100, 100));
        assert_eq!(r.rectangle(), Rect::new(80, 90, 40, 20));
        assert_eq!(r.center(), Point::new(100, 100));
    }
}
