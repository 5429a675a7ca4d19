//! Error bookkeeping (C8): per-triangle vertical-distance error and the
//! candidate-point priority structure driving error-based refinement.

use std::collections::BTreeSet;

use float_ord::FloatOrd;

use crate::geometry::mesh::{FaceId, Mesh, PointId};
use crate::geometry::predicates::Point2;
use crate::history::sink::Norm;

/// A point awaiting promotion to a vertex, owned by the driver and
/// referenced non-owningly from mesh buckets via [`PointId`].
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PendingPoint {
    /// Planar position.
    pub point: Point2,
    /// Scalar field value.
    pub z: f64,
}

/// Barycentric interpolation of the scalar field at `p` within CCW
/// triangle `(a, b, c)` carrying values `za, zb, zc`.
#[must_use]
pub fn interpolate_z(p: Point2, a: Point2, za: f64, b: Point2, zb: f64, c: Point2, zc: f64) -> f64 {
    let denom = (b.y - c.y) * (a.x - c.x) + (c.x - b.x) * (a.y - c.y);
    if denom.abs() < f64::EPSILON {
        return (za + zb + zc) / 3.0;
    }
    let w_a = ((b.y - c.y) * (p.x - c.x) + (c.x - b.x) * (p.y - c.y)) / denom;
    let w_b = ((c.y - a.y) * (p.x - c.x) + (a.x - c.x) * (p.y - c.y)) / denom;
    let w_c = 1.0 - w_a - w_b;
    w_a * za + w_b * zb + w_c * zc
}

/// Vertical approximation error of `point` against the triangle spanned
/// by `(a, b, c)`, each paired with its scalar value.
#[must_use]
pub fn point_error(
    point: PendingPoint,
    a: (Point2, f64),
    b: (Point2, f64),
    c: (Point2, f64),
) -> f64 {
    let interp = interpolate_z(point.point, a.0, a.1, b.0, b.1, c.0, c.1);
    (point.z - interp).abs()
}

/// Finds the highest-error pending point bucketed in `tri`, without
/// removing it. Returns `None` if the triangle is stale or its bucket
/// empty.
#[must_use]
pub fn bucket_head(mesh: &Mesh, tri: FaceId, points: &[PendingPoint]) -> Option<(PointId, f64)> {
    let triangle = mesh.triangle(tri)?;
    let positions: Vec<(Point2, f64)> = triangle
        .vertices
        .iter()
        .map(|&v| mesh.vertex(v).map(|vertex| (vertex.point, vertex.z)))
        .collect::<Option<_>>()?;

    triangle
        .bucket
        .iter()
        .map(|&pid| {
            let error = point_error(points[pid], positions[0], positions[1], positions[2]);
            (pid, error)
        })
        .max_by(|(_, e1), (_, e2)| e1.partial_cmp(e2).unwrap_or(std::cmp::Ordering::Equal))
}

/// Evaluates a global norm (§4.8) over a set of per-triangle head errors.
#[must_use]
pub fn global_norm(norm: Norm, head_errors: &[f64]) -> f64 {
    if head_errors.is_empty() {
        return 0.0;
    }
    match norm {
        Norm::Max => head_errors.iter().copied().fold(0.0_f64, f64::max),
        Norm::Med => head_errors.iter().sum::<f64>() / head_errors.len() as f64,
        Norm::Sqm => {
            let sum_sq: f64 = head_errors.iter().map(|e| e * e).sum();
            (sum_sq / head_errors.len() as f64).sqrt()
        }
    }
}

/// Balanced-tree-backed priority structure over pending points keyed by
/// error, supporting O(log n) `insert` / `remove` / `remove_max`
/// (`PtsErrTree` in the original driver).
#[derive(Debug, Default)]
pub struct ErrorTree {
    entries: BTreeSet<(FloatOrd<f64>, PointId)>,
}

impl ErrorTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `point` at `error`.
    pub fn insert(&mut self, point: PointId, error: f64) {
        self.entries.insert((FloatOrd(error), point));
    }

    /// Removes `point` previously inserted at `error`. The caller must
    /// supply the same error value used on insertion, since the tree is
    /// keyed on `(error, point)`.
    pub fn remove(&mut self, point: PointId, error: f64) {
        self.entries.remove(&(FloatOrd(error), point));
    }

    /// Removes and returns the point with the largest error, if any.
    pub fn remove_max(&mut self) -> Option<PointId> {
        let entry = *self.entries.iter().next_back()?;
        self.entries.remove(&entry);
        Some(entry.1)
    }

    /// True if the tree holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries in the tree.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
