//! A quadrilateral with convexity and rectangle helpers.

use super::{Point, PointF};

/// Four corner points, defined clockwise with `a` at top-left.
///
/// Corners can be accessed by the `a`..`d` accessors or by index (a=0, b=1,
/// c=2, d=3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quadrilateral {
    corners: [Point; 4],
}

impl Quadrilateral {
    pub fn new(a: Point, b: Point, c: Point, d: Point) -> Self {
        Self {
            corners: [a, b, c, d],
        }
    }

    /// The unit square (0,0)-(1,1).
    pub fn unit_square() -> Self {
        Self::new(
            Point::new(0, 0),
            Point::new(1, 0),
            Point::new(1, 1),
            Point::new(0, 1),
        )
    }

    pub fn a(&self) -> Point {
        self.corners[0]
    }

    pub fn b(&self) -> Point {
        self.corners[1]
    }

    pub fn c(&self) -> Point {
        self.corners[2]
    }

    pub fn d(&self) -> Point {
        self.corners[3]
    }

    pub fn corner(&self, index: usize) -> Point {
        self.corners[index]
    }

    pub fn set_corner(&mut self, index: usize, p: Point) {
        self.corners[index] = p;
    }

    pub fn corners(&self) -> [Point; 4] {
        self.corners
    }

    pub fn corners_f(&self) -> [PointF; 4] {
        [
            self.corners[0].to_f(),
            self.corners[1].to_f(),
            self.corners[2].to_f(),
            self.corners[3].to_f(),
        ]
    }

    pub fn translate(&mut self, dx: i32, dy: i32) {
        for p in &mut self.corners {
            *p = p.translate(dx, dy);
        }
    }

    /// Grow the quad symmetrically around its center.
    pub fn expand(&mut self, width: i32, height: i32) {
        self.corners[0] = self.corners[0].translate(-width, -height);
        self.corners[1] = self.corners[1].translate(width, -height);
        self.corners[2] = self.corners[2].translate(width, height);
        self.corners[3] = self.corners[3].translate(-width, height);
    }

    /// Force the neighbours of the anchor corner back into axis alignment.
    /// Assumes the opposite corner is already aligned with the other two.
    pub fn make_rectangle(&mut self, anchor: usize) {
        let [a, b, c, d] = self.corners;
        match anchor {
            0 => {
                self.corners[1] = Point::new(b.x, a.y);
                self.corners[3] = Point::new(a.x, d.y);
            }
            1 => {
                self.corners[0] = Point::new(a.x, b.y);
                self.corners[2] = Point::new(b.x, c.y);
            }
            2 => {
                self.corners[3] = Point::new(d.x, c.y);
                self.corners[1] = Point::new(c.x, b.y);
            }
            3 => {
                self.corners[2] = Point::new(c.x, d.y);
                self.corners[0] = Point::new(d.x, a.y);
            }
            _ => {}
        }
    }

    /// Axis-aligned rectangle test.
    pub fn is_rectangle(&self) -> bool {
        let [a, b, c, d] = self.corners;
        a.y == b.y && b.x == c.x && c.y == d.y && d.x == a.x
    }

    /// All four interior turn angles must have the same sign.
    pub fn is_convex(&self) -> bool {
        let [a, b, c, d] = self.corners;
        let angles = [
            turn_angle(a, b, c),
            turn_angle(b, c, d),
            turn_angle(c, d, a),
            turn_angle(d, a, b),
        ];

        angles.iter().all(|&v| v > 0.0) || angles.iter().all(|&v| v < 0.0)
    }

    /// Containment test: convexity gate first, then ray casting.
    pub fn contains(&self, point: Point) -> bool {
        if !self.is_convex() {
            return false;
        }

        let (px, py) = (point.x as f64, point.y as f64);
        let mut inside = false;
        let mut j = 3;
        for i in 0..4 {
            let (xi, yi) = (self.corners[i].x as f64, self.corners[i].y as f64);
            let (xj, yj) = (self.corners[j].x as f64, self.corners[j].y as f64);
            if ((yi > py) != (yj > py)) && (px < (xj - xi) * (py - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Signed angle ABC in degrees, negative for a clockwise turn.
fn turn_angle(a: Point, b: Point, c: Point) -> f64 {
    let bax = (a.x - b.x) as f64;
    let bay = (a.y - b.y) as f64;
    let bcx = (c.x - b.x) as f64;
    let bcy = (c.y - b.y) as f64;

    let scal = bax * bcx + bay * bcy;
    let norm = (bax * bax + bay * bay).sqrt() * (bcx * bcx + bcy * bcy).sqrt();
    if norm == 0.0 {
        return 0.0;
    }

    let mut angle = (scal / norm).clamp(-1.0, 1.0).acos();
    if bax * bcy - bay * bcx < 0.0 {
        angle = -angle;
    }
    angle.to_degrees()
}
