//! Decimation driver (C10): repeatedly remove the next candidate vertex
//! from a pre-built triangulation until a termination policy fires.

use std::collections::HashSet;

use crate::context::Context;
use crate::error_metrics::{PendingPoint, point_error};
use crate::geometry::mesh::{Mesh, VertexId};
use crate::history::sink::{Direction, HistorySink, TerminateCondition, TriangleSnapshot, UpdateOp};

use super::termination::TerminationPolicy;
use crate::kernel::removal::{RemovalOptions, remove_vertex};

/// Which candidate-selection strategy drives decimation (§4.10).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecimationStrategy {
    /// Random permutation of remaining interior vertices.
    Random,
    /// Greedily remove whichever vertex costs least, recomputed exactly
    /// against a provisional retriangulation (`RECALC_EXACT`).
    ErrorExact,
    /// Greedily remove whichever vertex costs least, estimated from the
    /// star's geometry alone without retriangulating (`RECALC_APPROX`).
    ErrorApprox,
}

/// Summary of one decimation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecimationReport {
    /// Vertices successfully removed.
    pub removed: u64,
    /// Vertices whose removal was refused by feature protection or a
    /// failed retriangulation.
    pub skipped: u64,
}

/// Runs the decimation driver over an already-built `mesh`.
pub fn run(
    mesh: &mut Mesh,
    points: &[PendingPoint],
    sink: &mut dyn HistorySink,
    ctx: &mut Context,
    strategy: DecimationStrategy,
    options: &RemovalOptions,
    policy: &TerminationPolicy,
) -> DecimationReport {
    sink.start_history(Direction::Coarsening);

    let hull = hull_vertices(mesh);
    let mut remaining: Vec<VertexId> = mesh
        .vertices()
        .map(|(id, _)| id)
        .filter(|id| !hull.contains(id))
        .collect();
    if strategy == DecimationStrategy::Random {
        use rand::seq::SliceRandom;
        remaining.shuffle(&mut ctx.rng);
    }

    let mut report = DecimationReport::default();
    loop {
        let head_errors = live_head_errors(mesh, points);
        if remaining.is_empty() || policy.should_stop(report.removed, &head_errors) {
            break;
        }

        let next = match strategy {
            DecimationStrategy::Random => remaining.remove(0),
            DecimationStrategy::ErrorApprox | DecimationStrategy::ErrorExact => {
                let Some(best) = pick_cheapest(mesh, points, &remaining, strategy, ctx.epsilon, options) else {
                    break;
                };
                let pos = remaining.iter().position(|&v| v == best).expect("best came from remaining");
                remaining.remove(pos)
            }
        };

        match remove_vertex(mesh, points, sink, ctx.epsilon, next, options) {
            Ok(()) => report.removed += 1,
            Err(_) => report.skipped += 1,
        }
    }

    sink.end_history();
    report
}

fn hull_vertices(mesh: &Mesh) -> HashSet<VertexId> {
    let mut out = HashSet::new();
    for (_, edge) in mesh.edges() {
        if edge.triangles[0].is_none() || edge.triangles[1].is_none() {
            out.insert(edge.v0);
            out.insert(edge.v1);
        }
    }
    out
}

fn live_head_errors(mesh: &Mesh, points: &[PendingPoint]) -> Vec<f64> {
    mesh.triangles()
        .filter_map(|(face, _)| crate::error_metrics::bucket_head(mesh, face, points).map(|(_, e)| e))
        .collect()
}

fn pick_cheapest(
    mesh: &Mesh,
    points: &[PendingPoint],
    candidates: &[VertexId],
    strategy: DecimationStrategy,
    eps: f64,
    options: &RemovalOptions,
) -> Option<VertexId> {
    candidates
        .iter()
        .copied()
        .map(|v| (v, estimate_removal_cost(mesh, points, v, strategy, eps, options)))
        .filter_map(|(v, cost)| cost.map(|c| (v, c)))
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(v, _)| v)
}

/// Estimated increase in global error from removing `r`: the sum of
/// squared vertical residuals of its star's former bucket points against
/// whichever surface stands in for the retriangulated polygon.
fn estimate_removal_cost(
    mesh: &Mesh,
    points: &[PendingPoint],
    r: VertexId,
    strategy: DecimationStrategy,
    eps: f64,
    options: &RemovalOptions,
) -> Option<f64> {
    match strategy {
        DecimationStrategy::Random => None,
        DecimationStrategy::ErrorApprox => Some(estimate_cost_approx(mesh, points, r)),
        DecimationStrategy::ErrorExact => estimate_cost_exact(mesh, points, r, eps, options),
    }
}

/// `RECALC_APPROX`: fits a least-squares plane through the star's boundary
/// ring and scores the star's bucketed points against it, without
/// touching the mesh.
fn estimate_cost_approx(mesh: &Mesh, points: &[PendingPoint], r: VertexId) -> f64 {
    let star = mesh.star(r);
    let mut ring = Vec::with_capacity(star.len());
    for &t in &star {
        let Some(tri) = mesh.triangle(t) else { continue };
        let Some(idx) = tri.index_of(r) else { continue };
        let far = tri.vertices[(idx + 1) % 3];
        if let Some(v) = mesh.vertex(far) {
            ring.push((v.point.x, v.point.y, v.z));
        }
    }

    let Some(plane) = fit_plane(&ring) else { return 0.0 };
    let mut cost = 0.0;
    for &t in &star {
        let Some(tri) = mesh.triangle(t) else { continue };
        for &pid in &tri.bucket {
            let p = points[pid];
            let predicted = plane.0 + plane.1 * p.point.x + plane.2 * p.point.y;
            let residual = p.z - predicted;
            cost += residual * residual;
        }
    }
    cost
}

/// `RECALC_EXACT`: provisionally retriangulates a scratch clone of the
/// mesh and measures the actual post-removal error of the star's former
/// bucket points, under the same epsilon and removal options the run
/// itself would use.
fn estimate_cost_exact(mesh: &Mesh, points: &[PendingPoint], r: VertexId, eps: f64, options: &RemovalOptions) -> Option<f64> {
    let star = mesh.star(r);
    let mut formerly_bucketed = Vec::new();
    for &t in &star {
        if let Some(tri) = mesh.triangle(t) {
            formerly_bucketed.extend(tri.bucket.iter().copied());
        }
    }
    if formerly_bucketed.is_empty() {
        return Some(0.0);
    }

    let mut trial = mesh.clone();
    let mut null_sink = NullSink;
    remove_vertex(&mut trial, points, &mut null_sink, eps, r, options).ok()?;

    let mut cost = 0.0;
    for pid in formerly_bucketed {
        let Some((face, _)) = trial.triangles().find(|(_, t)| t.bucket.contains(&pid)) else {
            continue;
        };
        let tri = trial.triangle(face)?;
        let verts: Vec<(crate::geometry::predicates::Point2, f64)> = tri
            .vertices
            .iter()
            .filter_map(|&v| trial.vertex(v).map(|vx| (vx.point, vx.z)))
            .collect();
        if verts.len() != 3 {
            continue;
        }
        let e = point_error(points[pid], verts[0], verts[1], verts[2]);
        cost += e * e;
    }
    Some(cost)
}

/// Least-squares fit of `z = a + b*x + c*y` through `samples`, returning
/// `(a, b, c)`. `None` if fewer than three samples are given.
fn fit_plane(samples: &[(f64, f64, f64)]) -> Option<(f64, f64, f64)> {
    if samples.len() < 3 {
        return None;
    }
    let n = samples.len() as f64;
    let (mut sx, mut sy, mut sz, mut sxx, mut syy, mut sxy, mut sxz, mut syz) =
        (0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
    for &(x, y, z) in samples {
        sx += x;
        sy += y;
        sz += z;
        sxx += x * x;
        syy += y * y;
        sxy += x * y;
        sxz += x * z;
        syz += y * z;
    }
    // Normal equations for [a, b, c] solving the 3x3 system below.
    let m = [[n, sx, sy], [sx, sxx, sxy], [sy, sxy, syy]];
    let rhs = [sz, sxz, syz];
    solve_3x3(m, rhs)
}

fn solve_3x3(m: [[f64; 3]; 3], rhs: [f64; 3]) -> Option<(f64, f64, f64)> {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    if det.abs() < 1e-12 {
        return None;
    }
    let replace_col = |col: usize| {
        let mut mat = m;
        for row in 0..3 {
            mat[row][col] = rhs[row];
        }
        mat[0][0] * (mat[1][1] * mat[2][2] - mat[1][2] * mat[2][1])
            - mat[0][1] * (mat[1][0] * mat[2][2] - mat[1][2] * mat[2][0])
            + mat[0][2] * (mat[1][0] * mat[2][1] - mat[1][1] * mat[2][0])
    };
    Some((replace_col(0) / det, replace_col(1) / det, replace_col(2) / det))
}

/// No-op sink for the exact-cost trial retriangulation: its events must
/// never reach the real history (§5, the sink must not observe partial or
/// speculative work).
struct NullSink;

impl HistorySink for NullSink {
    fn start_history(&mut self, _direction: Direction) {}
    fn make_triangle(&mut self, _triangle: TriangleSnapshot) {}
    fn kill_triangle(&mut self, _triangle: TriangleSnapshot) {}
    fn mesh_ok(&mut self) {}
    fn end_history(&mut self) {}
    fn set_terminate_condition(&mut self, _condition: TerminateCondition) {}
    fn terminate_condition(&self) -> bool {
        false
    }
    fn update_error(&mut self, _op: UpdateOp, _triangle_error: f64) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::predicates::Point2;
    use crate::history::recording::RecordingSink;
    use crate::kernel::hull::bootstrap;

    fn default_options() -> RemovalOptions {
        RemovalOptions {
            kdegree: 0,
            allow_features_del: true,
            allow_chain_break: true,
            ext_active: false,
        }
    }

    fn grid_points() -> Vec<PendingPoint> {
        let mut points = vec![
            PendingPoint { point: Point2::new(0.0, 0.0), z: 0.0 },
            PendingPoint { point: Point2::new(10.0, 0.0), z: 0.0 },
            PendingPoint { point: Point2::new(10.0, 10.0), z: 0.0 },
            PendingPoint { point: Point2::new(0.0, 10.0), z: 0.0 },
        ];
        for i in 1..5 {
            for j in 1..5 {
                points.push(PendingPoint {
                    point: Point2::new(f64::from(i) * 2.0, f64::from(j) * 2.0),
                    z: 0.1 * f64::from(i + j),
                });
            }
        }
        points
    }

    fn built_mesh() -> Mesh {
        let points = grid_points();
        let mut mesh = Mesh::new();
        let mut sink = RecordingSink::new();
        bootstrap(&mut mesh, &mut sink, 1e-9, &points).unwrap();
        for (i, _) in points.iter().enumerate().skip(4) {
            let _ = crate::kernel::delaunay::insert_vertex(
                &mut mesh,
                &points,
                &mut sink,
                1e-9,
                points[i].point,
                points[i].z,
            );
        }
        mesh
    }

    #[test]
    fn random_decimation_only_removes_interior_vertices() {
        let points = grid_points();
        let mut mesh = built_mesh();
        let before = mesh.vertex_count();
        let mut sink = RecordingSink::new();
        let mut ctx = Context::with_seed(5);

        let report = run(
            &mut mesh,
            &points,
            &mut sink,
            &mut ctx,
            DecimationStrategy::Random,
            &default_options(),
            &TerminationPolicy::NoTerm,
        );

        assert!(report.removed > 0);
        assert_eq!(mesh.vertex_count(), before - report.removed as usize);
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn error_exact_decimation_stops_at_update_count() {
        let points = grid_points();
        let mut mesh = built_mesh();
        let mut sink = RecordingSink::new();
        let mut ctx = Context::with_seed(6);

        let report = run(
            &mut mesh,
            &points,
            &mut sink,
            &mut ctx,
            DecimationStrategy::ErrorExact,
            &default_options(),
            &TerminationPolicy::UpdateCount { limit: 2 },
        );

        assert_eq!(report.removed, 2);
    }
}
