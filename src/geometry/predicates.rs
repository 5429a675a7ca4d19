//! Geometric predicates (C1): orientation, in-circle, segment crossing,
//! point-in-triangle, all on `(x, y)` with a shared epsilon tolerance.
//!
//! Every topological decision in the kernel consults these four
//! predicates; they are written to stay consistent under the reordering
//! of their arguments the kernel relies on (e.g. re-querying `turn` after
//! a triangle's vertices have been cyclically rotated must not flip the
//! answer).

use num_traits::Float;

/// A 2-D point, generic over the coordinate type so predicates can be
/// exercised at reduced precision in property tests; the kernel itself
/// instantiates everything at `f64`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point2<T = f64> {
    /// Horizontal coordinate.
    pub x: T,
    /// Vertical coordinate.
    pub y: T,
}

impl<T> Point2<T> {
    /// Builds a point from its coordinates.
    pub const fn new(x: T, y: T) -> Self {
        Self { x, y }
    }
}

impl<T: Float> Point2<T> {
    /// Squared Euclidean distance to `other`.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> T {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

/// Result of [`turn`]: the sign of the oriented area of `(a, b, c)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Orientation {
    /// Counter-clockwise turn (positive oriented area).
    Left,
    /// Clockwise turn (negative oriented area).
    Right,
    /// Collinear within tolerance.
    Aligned,
}

/// Result of [`in_circle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InCircle {
    /// Strictly inside the circumcircle of `(a, b, c)`.
    Inside,
    /// On the circumcircle within tolerance.
    On,
    /// Strictly outside.
    Outside,
}

/// Result of [`segments_cross`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Crossing {
    /// A proper interior crossing.
    Strict,
    /// The segments meet at (or overlap through) an endpoint.
    Endpoint,
    /// The segments do not intersect.
    None,
}

/// Result of [`point_in_triangle`]. Edge/vertex indices follow the
/// opposite-vertex convention: edge `i` is opposite vertex `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointInTriangle {
    /// Strictly interior.
    Inside,
    /// On edge `i` (strictly between its two endpoints).
    OnEdge(u8),
    /// Coincides with vertex `i`.
    OnVertex(u8),
    /// Outside the triangle.
    Outside,
}

/// Oriented-area sign of `(a, b, c)`, zero-tolerant at `eps` (compared
/// against the raw determinant, so callers pass an already length-scaled
/// tolerance; see [`crate::context::Context::scaled_epsilon`]).
#[must_use]
pub fn turn<T: Float>(a: Point2<T>, b: Point2<T>, c: Point2<T>, eps: T) -> Orientation {
    let det = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if det > eps {
        Orientation::Left
    } else if det < -eps {
        Orientation::Right
    } else {
        Orientation::Aligned
    }
}

/// True iff `a`, `b`, `c` are collinear within `eps`.
#[must_use]
pub fn aligned<T: Float>(a: Point2<T>, b: Point2<T>, c: Point2<T>, eps: T) -> bool {
    turn(a, b, c, eps) == Orientation::Aligned
}

/// In-circle test: `a`, `b`, `c` must be given in CCW order. Classifies
/// `d` relative to their circumcircle via the standard 3×3 determinant
/// obtained by translating the 4×4 determinant to `d`'s frame.
#[must_use]
pub fn in_circle<T: Float>(a: Point2<T>, b: Point2<T>, c: Point2<T>, d: Point2<T>, eps: T) -> InCircle {
    let ax = a.x - d.x;
    let ay = a.y - d.y;
    let bx = b.x - d.x;
    let by = b.y - d.y;
    let cx = c.x - d.x;
    let cy = c.y - d.y;

    let a2 = ax * ax + ay * ay;
    let b2 = bx * bx + by * by;
    let c2 = cx * cx + cy * cy;

    let det = ax * (by * c2 - b2 * cy) - ay * (bx * c2 - b2 * cx) + a2 * (bx * cy - by * cx);

    if det > eps {
        InCircle::Inside
    } else if det < -eps {
        InCircle::Outside
    } else {
        InCircle::On
    }
}

/// Classifies the intersection of segment `p`–`q` with segment `r`–`s`.
/// Collinear overlap is reported as [`Crossing::Endpoint`] rather than
/// [`Crossing::Strict`], per the spec's "collinear-overlap reported as
/// ENDPOINT" rule.
#[must_use]
pub fn segments_cross<T: Float>(
    p: Point2<T>,
    q: Point2<T>,
    r: Point2<T>,
    s: Point2<T>,
    eps: T,
) -> Crossing {
    let d1 = turn(r, s, p, eps);
    let d2 = turn(r, s, q, eps);
    let d3 = turn(p, q, r, eps);
    let d4 = turn(p, q, s, eps);

    let properly_straddle =
        |x: Orientation, y: Orientation| matches!((x, y), (Orientation::Left, Orientation::Right) | (Orientation::Right, Orientation::Left));

    if properly_straddle(d1, d2) && properly_straddle(d3, d4) {
        return Crossing::Strict;
    }

    let on_segment = |a: Point2<T>, b: Point2<T>, point: Point2<T>| {
        aligned(a, b, point, eps)
            && point.x >= a.x.min(b.x) - eps
            && point.x <= a.x.max(b.x) + eps
            && point.y >= a.y.min(b.y) - eps
            && point.y <= a.y.max(b.y) + eps
    };

    if d1 == Orientation::Aligned && on_segment(r, s, p) {
        return Crossing::Endpoint;
    }
    if d2 == Orientation::Aligned && on_segment(r, s, q) {
        return Crossing::Endpoint;
    }
    if d3 == Orientation::Aligned && on_segment(p, q, r) {
        return Crossing::Endpoint;
    }
    if d4 == Orientation::Aligned && on_segment(p, q, s) {
        return Crossing::Endpoint;
    }

    Crossing::None
}

/// Classifies `p` relative to CCW triangle `(a, b, c)`. Edge `0` is `b`–`c`
/// (opposite `a`), edge `1` is `c`–`a` (opposite `b`), edge `2` is `a`–`b`
/// (opposite `c`), matching the mesh's opposite-vertex neighbour indexing.
#[must_use]
pub fn point_in_triangle<T: Float>(
    p: Point2<T>,
    a: Point2<T>,
    b: Point2<T>,
    c: Point2<T>,
    eps: T,
) -> PointInTriangle {
    let t0 = turn(b, c, p, eps); // edge 0, opposite a
    let t1 = turn(c, a, p, eps); // edge 1, opposite b
    let t2 = turn(a, b, p, eps); // edge 2, opposite c

    let aligned_count = [t0, t1, t2]
        .iter()
        .filter(|t| **t == Orientation::Aligned)
        .count();

    if [t0, t1, t2].iter().any(|t| *t == Orientation::Right) {
        return PointInTriangle::Outside;
    }

    match aligned_count {
        0 => PointInTriangle::Inside,
        1 => {
            if t0 == Orientation::Aligned {
                PointInTriangle::OnEdge(0)
            } else if t1 == Orientation::Aligned {
                PointInTriangle::OnEdge(1)
            } else {
                PointInTriangle::OnEdge(2)
            }
        }
        _ => {
            // Two aligned edges meet at their shared vertex: edges 0&1 share c, 0&2 share b, 1&2 share a.
            if t0 == Orientation::Aligned && t1 == Orientation::Aligned {
                PointInTriangle::OnVertex(2)
            } else if t0 == Orientation::Aligned && t2 == Orientation::Aligned {
                PointInTriangle::OnVertex(1)
            } else {
                PointInTriangle::OnVertex(0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }

    #[test]
    fn turn_detects_ccw_and_cw() {
        assert_eq!(turn(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0), 1e-9), Orientation::Left);
        assert_eq!(turn(p(0.0, 0.0), p(0.0, 1.0), p(1.0, 0.0), 1e-9), Orientation::Right);
        assert_eq!(turn(p(0.0, 0.0), p(1.0, 0.0), p(2.0, 0.0), 1e-9), Orientation::Aligned);
    }

    #[test]
    fn in_circle_classifies_interior_and_exterior_points() {
        let (a, b, c) = (p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0));
        assert_eq!(in_circle(a, b, c, p(0.1, 0.1), 1e-9), InCircle::Inside);
        assert_eq!(in_circle(a, b, c, p(10.0, 10.0), 1e-9), InCircle::Outside);
    }

    #[test]
    fn in_circle_cocircular_point_is_on() {
        // Unit circle centered at (0.5, 0.5) through (0,0),(1,0),(0,1),(1,1).
        let (a, b, c) = (p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0));
        let result = in_circle(a, b, c, p(0.0, 1.0), 1e-9);
        assert_eq!(result, InCircle::On);
    }

    #[test]
    fn segments_cross_detects_strict_crossing() {
        let result = segments_cross(p(0.0, 0.0), p(1.0, 1.0), p(0.0, 1.0), p(1.0, 0.0), 1e-9);
        assert_eq!(result, Crossing::Strict);
    }

    #[test]
    fn segments_cross_parallel_non_overlapping_is_none() {
        let result = segments_cross(p(0.0, 0.0), p(1.0, 0.0), p(0.0, 1.0), p(1.0, 1.0), 1e-9);
        assert_eq!(result, Crossing::None);
    }

    #[test]
    fn point_in_triangle_classifies_interior_edge_and_vertex() {
        let (a, b, c) = (p(0.0, 0.0), p(4.0, 0.0), p(0.0, 4.0));
        assert_eq!(point_in_triangle(p(1.0, 1.0), a, b, c, 1e-9), PointInTriangle::Inside);
        assert_eq!(point_in_triangle(p(2.0, 0.0), a, b, c, 1e-9), PointInTriangle::OnEdge(2));
        assert_eq!(point_in_triangle(a, a, b, c, 1e-9), PointInTriangle::OnVertex(0));
        assert_eq!(point_in_triangle(p(5.0, 5.0), a, b, c, 1e-9), PointInTriangle::Outside);
    }

    #[test]
    fn distance_squared_is_symmetric() {
        let d1 = p(0.0, 0.0).distance_squared(p(3.0, 4.0));
        let d2 = p(3.0, 4.0).distance_squared(p(0.0, 0.0));
        assert_relative_eq!(d1, 25.0);
        assert_relative_eq!(d2, 25.0);
    }
}

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn turn_is_antisymmetric_under_swap(
            ax in -100.0..100.0, ay in -100.0..100.0,
            bx in -100.0..100.0, by in -100.0..100.0,
            cx in -100.0..100.0, cy in -100.0..100.0,
        ) {
            let (a, b, c) = (p(ax, ay), p(bx, by), p(cx, cy));
            let forward = turn(a, b, c, 1e-9);
            let swapped = turn(a, c, b, 1e-9);
            match forward {
                Orientation::Left => prop_assert_eq!(swapped, Orientation::Right),
                Orientation::Right => prop_assert_eq!(swapped, Orientation::Left),
                Orientation::Aligned => prop_assert_eq!(swapped, Orientation::Aligned),
            }
        }
    }

    fn p(x: f64, y: f64) -> Point2<f64> {
        Point2::new(x, y)
    }
}
