//! Convex-hull bootstrap (C5): angular sort + Graham scan, building the
//! seed triangulation that the refinement driver (C9) and CDT layer (C6)
//! grow from.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::error_metrics::PendingPoint;
use crate::errors::MeshError;
use crate::geometry::mesh::Mesh;
use crate::geometry::predicates::{Orientation, Point2, turn};
use crate::history::sink::{Direction, HistorySink, UpdateOp};

use super::delaunay::insert_vertex;
use super::support::{rebucket_point, triangle_snapshot};

/// Builds the initial triangulation over `points` (hull vertices plus
/// interior points bucketed into it) and returns the indices promoted to
/// vertices, i.e. the hull. The refinement driver excludes these from its
/// candidate pool — they are already part of the mesh.
///
/// # Errors
/// Returns [`MeshError::AllPointsCollinear`] if fewer than three points
/// are given, or every point is collinear.
pub fn bootstrap(
    mesh: &mut Mesh,
    sink: &mut dyn HistorySink,
    eps: f64,
    points: &[PendingPoint],
) -> Result<HashSet<usize>, MeshError> {
    if points.len() < 3 {
        return Err(MeshError::AllPointsCollinear);
    }
    let (p0, p1, p2) =
        find_non_collinear_triple(points, eps).ok_or(MeshError::AllPointsCollinear)?;
    let pivot = centroid(points[p0].point, points[p1].point, points[p2].point);

    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| pseudo_angle_cmp(pivot, points[a].point, points[b].point, eps));

    let start_pos = order
        .iter()
        .enumerate()
        .max_by(|(_, &a), (_, &b)| {
            let (pa, pb) = (points[a].point, points[b].point);
            pa.x.partial_cmp(&pb.x)
                .unwrap_or(Ordering::Equal)
                .then(pa.y.partial_cmp(&pb.y).unwrap_or(Ordering::Equal))
        })
        .map(|(i, _)| i)
        .expect("non-empty order");
    order.rotate_left(start_pos);

    let mut stack: Vec<usize> = Vec::new();
    for &idx in &order {
        while stack.len() >= 2 {
            let o = turn(
                points[stack[stack.len() - 2]].point,
                points[stack[stack.len() - 1]].point,
                points[idx].point,
                eps,
            );
            if o == Orientation::Left {
                break;
            }
            stack.pop();
        }
        stack.push(idx);
    }

    if stack.len() < 3 {
        return Err(MeshError::AllPointsCollinear);
    }

    let hull: HashSet<usize> = stack.iter().copied().collect();

    sink.start_history(Direction::Refining);

    let (i0, i1, i2) = seed_order(points, stack[0], stack[1], stack[2], eps);
    let a = mesh.add_vertex(points[i0].point, points[i0].z);
    let b = mesh.add_vertex(points[i1].point, points[i1].z);
    let c = mesh.add_vertex(points[i2].point, points[i2].z);
    let e_bc = mesh.add_edge(b, c);
    let e_ca = mesh.add_edge(c, a);
    let e_ab = mesh.add_edge(a, b);
    let seed = mesh.add_triangle([a, b, c], [e_bc, e_ca, e_ab]);
    let snapshot = triangle_snapshot(mesh, &[], seed);
    sink.make_triangle(snapshot);
    sink.update_error(UpdateOp::AddTriangle, snapshot.error);
    sink.mesh_ok();

    for &idx in &stack[3..] {
        if let Err(reason) = insert_vertex(mesh, &[], sink, eps, points[idx].point, points[idx].z).map(|(v, _)| v) {
            log::warn!("hull bootstrap: point {idx} skipped during seeding: {reason}");
        }
    }

    let start = mesh.first_triangle().expect("seed triangle was just created");
    for idx in 0..points.len() {
        if hull.contains(&idx) {
            continue;
        }
        rebucket_point(mesh, points, idx, start, eps);
    }

    Ok(hull)
}

/// Orders the first three hull indices CCW for the seed triangle.
fn seed_order(
    points: &[PendingPoint],
    i0: usize,
    i1: usize,
    i2: usize,
    eps: f64,
) -> (usize, usize, usize) {
    if turn(points[i0].point, points[i1].point, points[i2].point, eps) == Orientation::Right {
        (i0, i2, i1)
    } else {
        (i0, i1, i2)
    }
}

fn centroid(a: Point2, b: Point2, c: Point2) -> Point2 {
    Point2::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
}

/// Finds the first triple of indices spanning a non-degenerate triangle.
fn find_non_collinear_triple(points: &[PendingPoint], eps: f64) -> Option<(usize, usize, usize)> {
    let p0 = 0;
    for p1 in 1..points.len() {
        if points[p1].point == points[p0].point {
            continue;
        }
        for p2 in (p1 + 1)..points.len() {
            if turn(points[p0].point, points[p1].point, points[p2].point, eps)
                != Orientation::Aligned
            {
                return Some((p0, p1, p2));
            }
        }
    }
    None
}

/// Quadrant of `v` relative to `pivot`, per the spec's convention that the
/// positive axes belong to the lower-numbered quadrant they bound
/// (+x ⊂ I, +y ⊂ II, −x ⊂ III, −y ⊂ IV).
fn quadrant(v: Point2, pivot: Point2) -> u8 {
    let dx = v.x - pivot.x;
    let dy = v.y - pivot.y;
    if dx > 0.0 && dy >= 0.0 {
        0
    } else if dx <= 0.0 && dy > 0.0 {
        1
    } else if dx < 0.0 && dy <= 0.0 {
        2
    } else {
        3
    }
}

fn pseudo_angle_cmp(pivot: Point2, a: Point2, b: Point2, eps: f64) -> Ordering {
    let (qa, qb) = (quadrant(a, pivot), quadrant(b, pivot));
    if qa != qb {
        return qa.cmp(&qb);
    }
    match turn(pivot, a, b, eps) {
        Orientation::Left => Ordering::Less,
        Orientation::Right => Ordering::Greater,
        Orientation::Aligned => Ordering::Equal,
    }
}
