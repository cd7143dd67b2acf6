//! Closed-form projective mapping between the unit square and a quadrilateral.
//!
//! Used by the perspective grid: grid lines are scanlines of the unit square
//! at fractional offsets, projected onto the quad through the forward map.

use super::PointF;

/// Forward and inverse projective transforms, row-major 3x3 matrices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    forward: [f64; 9],
    inverse: [f64; 9],
}

impl Homography {
    /// Build the transform taking the unit square corners (0,0),(1,0),(1,1),(0,1)
    /// onto the given quad corners, in that order.
    pub fn from_quad(corners: [PointF; 4]) -> Self {
        let x0 = corners[0].x as f64;
        let y0 = corners[0].y as f64;
        let x1 = corners[1].x as f64;
        let y1 = corners[1].y as f64;
        let x2 = corners[2].x as f64;
        let y2 = corners[2].y as f64;
        let x3 = corners[3].x as f64;
        let y3 = corners[3].y as f64;

        let sx = (x0 - x1) + (x2 - x3);
        let sy = (y0 - y1) + (y2 - y3);
        let dx1 = x1 - x2;
        let dx2 = x3 - x2;
        let dy1 = y1 - y2;
        let dy2 = y3 - y2;

        let z = dx1 * dy2 - dy1 * dx2;
        let g = (sx * dy2 - sy * dx2) / z;
        let h = (sy * dx1 - sx * dy1) / z;

        let a = x1 - x0 + g * x1;
        let b = x3 - x0 + h * x3;
        let c = x0;
        let d = y1 - y0 + g * y1;
        let e = y3 - y0 + h * y3;
        let f = y0;

        let forward = [a, b, c, d, e, f, g, h, 1.0];

        // Adjugate of the forward matrix. Projective points are scale
        // invariant so the determinant division can be skipped.
        let inverse = [
            e - f * h,
            c * h - b,
            b * f - c * e,
            f * g - d,
            a - c * g,
            c * d - a * f,
            d * h - e * g,
            b * g - a * h,
            a * e - b * d,
        ];

        Self { forward, inverse }
    }

    /// Map a unit-square point onto the quadrilateral.
    pub fn map(&self, p: PointF) -> PointF {
        apply(&self.forward, p)
    }

    /// Map a quadrilateral point back onto the unit square.
    pub fn unmap(&self, p: PointF) -> PointF {
        apply(&self.inverse, p)
    }
}

fn apply(m: &[f64; 9], p: PointF) -> PointF {
    let x = p.x as f64;
    let y = p.y as f64;
    let w = m[6] * x + m[7] * y + m[8];
    PointF::new(
        ((m[0] * x + m[1] * y + m[2]) / w) as f32,
        ((m[3] * x + m[4] * y + m[5]) / w) as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT_CORNERS: [PointF; 4] = [
        PointF::new(0.0, 0.0),
        PointF::new(1.0, 0.0),
        PointF::new(1.0, 1.0),
        PointF::new(0.0, 1.0),
    ];

    fn assert_near(a: PointF, b: PointF) {
        assert!(
            (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3,
            "{:?} != {:?}",
            a,
            b
        );
    }

    #[test]
    fn test_forward_maps_unit_corners_onto_quad() {
        let quad = [
            PointF::new(120.0, 80.0),
            PointF::new(400.0, 95.0),
            PointF::new(480.0, 350.0),
            PointF::new(60.0, 320.0),
        ];
        let h = Homography::from_quad(quad);

        for (unit, expected) in UNIT_CORNERS.iter().zip(quad.iter()) {
            assert_near(h.map(*unit), *expected);
        }
    }

    #[test]
    fn test_inverse_round_trip() {
        let quad = [
            PointF::new(30.0, 40.0),
            PointF::new(700.0, 10.0),
            PointF::new(640.0, 470.0),
            PointF::new(90.0, 420.0),
        ];
        let h = Homography::from_quad(quad);

        for unit in UNIT_CORNERS {
            assert_near(h.unmap(h.map(unit)), unit);
        }

        // Interior points round-trip too.
        let mid = PointF::new(0.5, 0.25);
        assert_near(h.unmap(h.map(mid)), mid);
    }

    #[test]
    fn test_identity_on_axis_aligned_rectangle() {
        let quad = [
            PointF::new(0.0, 0.0),
            PointF::new(200.0, 0.0),
            PointF::new(200.0, 100.0),
            PointF::new(0.0, 100.0),
        ];
        let h = Homography::from_quad(quad);
        assert_near(h.map(PointF::new(0.5, 0.5)), PointF::new(100.0, 50.0));
    }
}
