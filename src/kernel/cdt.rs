//! CDT layer (C6): constraint-segment insertion by propagating diagonal
//! swaps across the edges the segment crosses.

use std::collections::VecDeque;

use crate::error_metrics::PendingPoint;
use crate::errors::MeshError;
use crate::geometry::mesh::{EdgeId, FaceId, Flags, Mesh, VertexId};
use crate::geometry::predicates::{Crossing, segments_cross};
use crate::history::sink::{HistorySink, UpdateOp};

use super::delaunay::flip;
use super::support::{classify, shared_edge, triangle_snapshot};

/// Inserts a constraint segment between `u` and `v`, marking the final
/// edge `CONSTRAINT` so it is exempt from future flipping and cavity
/// growth.
///
/// # Errors
/// Returns [`MeshError::ConstraintInsertionImpossible`] if `u == v`, if
/// no triangle fan leads from `u` towards `v` (degenerate/collinear
/// input), or if the crossing worklist cannot resolve to a straight edge
/// between the two endpoints (a non-convex quad stalls forever).
pub fn insert_constraint(
    mesh: &mut Mesh,
    points: &[PendingPoint],
    sink: &mut dyn HistorySink,
    eps: f64,
    u: VertexId,
    v: VertexId,
) -> Result<(), MeshError> {
    let fail = || MeshError::ConstraintInsertionImpossible { u: stable_id(mesh, u), v: stable_id(mesh, v) };

    if u == v {
        return Err(fail());
    }
    if let Some(e) = existing_edge(mesh, u, v) {
        if let Some(edge) = mesh.edge_mut(e) {
            edge.flags.insert(Flags::CONSTRAINT);
        }
        return Ok(());
    }

    let mut crossings: VecDeque<EdgeId> = find_crossing_edges(mesh, u, v, eps)
        .ok_or_else(fail)?
        .into_iter()
        .collect();

    // Each successful swap strictly shrinks the crossing set, so total
    // progress is bounded by (len choose 2) retries of non-convex stalls
    // plus the swaps themselves; beyond that the configuration cannot
    // resolve (degenerate input) and we report it rather than loop forever.
    let mut stall_budget = crossings.len().saturating_mul(crossings.len().max(1)) + 64;

    while let Some(edge_id) = crossings.pop_front() {
        let Some(edge) = mesh.edge(edge_id) else { continue };
        let [Some(t1), Some(t2)] = edge.triangles else {
            return Err(fail());
        };

        if !quad_is_convex(mesh, t1, t2, edge_id, eps) {
            crossings.push_back(edge_id);
            stall_budget -= 1;
            if stall_budget == 0 {
                return Err(fail());
            }
            continue;
        }

        for &t in &[t1, t2] {
            let snapshot = triangle_snapshot(mesh, points, t);
            sink.kill_triangle(snapshot);
            sink.update_error(UpdateOp::DelTriangle, snapshot.error);
        }
        let Some((faces, _reusable, _rebucketed)) = flip(mesh, points, t1, t2, edge_id, eps) else {
            continue;
        };
        for &face in &faces {
            let snapshot = triangle_snapshot(mesh, points, face);
            sink.make_triangle(snapshot);
            sink.update_error(UpdateOp::AddTriangle, snapshot.error);
        }
        sink.mesh_ok();

        let new_diagonal =
            shared_edge(mesh, faces[0], faces[1]).expect("flip always shares its new diagonal");
        if crosses(mesh, new_diagonal, u, v, eps) {
            crossings.push_back(new_diagonal);
        }
    }

    let final_edge = existing_edge(mesh, u, v).ok_or_else(fail)?;
    if let Some(edge) = mesh.edge_mut(final_edge) {
        edge.flags.insert(Flags::CONSTRAINT);
    }
    Ok(())
}

fn stable_id(mesh: &Mesh, v: VertexId) -> usize {
    mesh.vertex(v).map_or(0, |vertex| vertex.id as usize)
}

fn existing_edge(mesh: &Mesh, u: VertexId, v: VertexId) -> Option<EdgeId> {
    mesh.edges()
        .find(|(_, e)| (e.v0 == u && e.v1 == v) || (e.v0 == v && e.v1 == u))
        .map(|(id, _)| id)
}

fn crosses(mesh: &Mesh, edge_id: EdgeId, u: VertexId, v: VertexId, eps: f64) -> bool {
    let Some(edge) = mesh.edge(edge_id) else { return false };
    let (Some(pu), Some(pv), Some(p0), Some(p1)) = (
        mesh.position(u),
        mesh.position(v),
        mesh.position(edge.v0),
        mesh.position(edge.v1),
    ) else {
        return false;
    };
    segments_cross(pu, pv, p0, p1, eps) == Crossing::Strict
}

/// A quad `a-w1-b-w2` (the two triangles sharing `edge_id`) is strictly
/// convex exactly when its two diagonals, `a-b` and `w1-w2`, properly
/// cross each other.
fn quad_is_convex(mesh: &Mesh, t1: FaceId, t2: FaceId, edge_id: EdgeId, eps: f64) -> bool {
    let Some(edge) = mesh.edge(edge_id) else { return false };
    let Some(tri1) = mesh.triangle(t1) else { return false };
    let Some(tri2) = mesh.triangle(t2) else { return false };
    let Some(idx1) = tri1.edges.iter().position(|&e| e == edge_id) else { return false };
    let Some(idx2) = tri2.edges.iter().position(|&e| e == edge_id) else { return false };
    let w1 = tri1.opposite_vertex(idx1);
    let w2 = tri2.opposite_vertex(idx2);
    let (Some(pa), Some(pb), Some(pw1), Some(pw2)) = (
        mesh.position(edge.v0),
        mesh.position(edge.v1),
        mesh.position(w1),
        mesh.position(w2),
    ) else {
        return false;
    };
    segments_cross(pa, pb, pw1, pw2, eps) == Crossing::Strict
}

/// Finds the entry triangle at `u` whose angular wedge contains the ray
/// towards `v`, by checking `v` falls between the two edges of `u`'s fan.
fn find_starting_triangle(mesh: &Mesh, u: VertexId, v: VertexId, eps: f64) -> Option<FaceId> {
    use crate::geometry::predicates::{Orientation, turn};

    for face in mesh.star(u) {
        let triangle = mesh.triangle(face)?;
        let idx = triangle.index_of(u)?;
        let p = triangle.vertices[(idx + 1) % 3];
        let q = triangle.vertices[(idx + 2) % 3];
        let (pu, pp, pq, pv) = (mesh.position(u)?, mesh.position(p)?, mesh.position(q)?, mesh.position(v)?);
        let t1 = turn(pu, pp, pv, eps);
        let t2 = turn(pu, pv, pq, eps);
        if t1 != Orientation::Right && t2 != Orientation::Right {
            return Some(face);
        }
    }
    None
}

/// Walks from `u` towards `v`, collecting every edge the straight segment
/// crosses, in order, stopping once the far triangle's opposite vertex is
/// `v` itself.
fn find_crossing_edges(mesh: &Mesh, u: VertexId, v: VertexId, eps: f64) -> Option<Vec<EdgeId>> {
    let entry = find_starting_triangle(mesh, u, v, eps)?;
    let triangle = mesh.triangle(entry)?;
    let idx = triangle.index_of(u)?;
    let mut edge = triangle.edges[idx];
    let mut current_face = entry;
    let mut crossings = Vec::new();

    loop {
        crossings.push(edge);
        let e = mesh.edge(edge)?;
        let (ea, eb) = (e.v0, e.v1);
        let far = e.triangles.into_iter().flatten().find(|&f| f != current_face)?;
        let far_tri = mesh.triangle(far)?;
        let far_idx = far_tri.edges.iter().position(|&ed| ed == edge)?;
        let w = far_tri.opposite_vertex(far_idx);
        if w == v {
            return Some(crossings);
        }

        let (edge_wa, edge_wb) = classify(mesh, far_tri, far_idx, ea, eb);
        let (pu, pv) = (mesh.position(u)?, mesh.position(v)?);
        let candidate = mesh.edge(edge_wa)?;
        let (pc0, pc1) = (mesh.position(candidate.v0)?, mesh.position(candidate.v1)?);
        edge = if segments_cross(pu, pv, pc0, pc1, eps) != Crossing::None {
            edge_wa
        } else {
            edge_wb
        };
        current_face = far;
    }
}
