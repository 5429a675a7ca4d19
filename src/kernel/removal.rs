//! Vertex removal (C7): feature-protected ear-clipping retriangulation of
//! a vertex's star, used by the decimation driver (C10).
//!
//! Scope note: this assumes `r` is an interior vertex with a closed
//! triangle fan. Removing a convex-hull vertex would need a fan with an
//! open boundary and is not exercised by the decimation driver (§4.10
//! only removes interior vertices), so it is left unhandled here — such
//! a call fails closed with [`SkipReason::NoLegalRetriangulation`].

use std::collections::HashMap;

use crate::error_metrics::PendingPoint;
use crate::errors::SkipReason;
use crate::geometry::mesh::{EdgeId, FaceId, Flags, Mesh, VertexId};
use crate::geometry::predicates::{Crossing, InCircle, Orientation, Point2, in_circle, segments_cross, turn};
use crate::history::sink::{HistorySink, UpdateOp};

use super::support::{ccw_order, edges_for_order, rebucket_point, triangle_snapshot, wire_fan_neighbours};

/// Feature-protection knobs governing whether a vertex may be removed at
/// all, mirroring the driver CLI's `opts`/`ext` flags (§6).
#[derive(Clone, Copy, Debug)]
pub struct RemovalOptions {
    /// Maximum allowed star size (triangle count); `0` disables the cap.
    pub kdegree: usize,
    /// Allow removing a vertex that is a single-constraint feature.
    pub allow_features_del: bool,
    /// Allow removing a vertex that closes a protected constraint chain.
    pub allow_chain_break: bool,
    /// Extend the local-Delaunay ear check to every remaining polygon
    /// vertex rather than just the two immediate outer neighbours.
    pub ext_active: bool,
}

/// Removes `r`, retriangulating its star as a planar polygon. Plans the
/// full ear-clipping before mutating anything, so a refused removal
/// leaves the mesh untouched.
///
/// # Errors
/// See [`SkipReason`] for the non-fatal conditions that refuse removal.
pub fn remove_vertex(
    mesh: &mut Mesh,
    points: &[PendingPoint],
    sink: &mut dyn HistorySink,
    eps: f64,
    r: VertexId,
    options: &RemovalOptions,
) -> Result<(), SkipReason> {
    let star = mesh.star(r);
    if star.len() < 3 {
        return Err(SkipReason::NoLegalRetriangulation);
    }
    if options.kdegree > 0 && star.len() > options.kdegree {
        return Err(SkipReason::DegreeCapExceeded);
    }

    let incident = constraint_edges_at(mesh, r);
    match incident.len() {
        1 if !options.allow_features_del => return Err(SkipReason::ProtectedFeature),
        n if n >= 2 && chain_is_closed(mesh, r, &incident) && !options.allow_chain_break => {
            return Err(SkipReason::ProtectedChain);
        }
        _ => {}
    }

    let (polygon, boundary_edge_ids) = match star_boundary_ring(mesh, r, &star) {
        Some(ring) => ring,
        None => return Err(SkipReason::NoLegalRetriangulation),
    };

    let clipped = plan_ear_clipping(mesh, &polygon, options.ext_active, eps)?;

    // --- commit ---

    for &t in &star {
        if let Some(triangle) = mesh.triangle_mut(t) {
            triangle.flags.insert(Flags::TO_DELETE);
        }
    }
    for &t in &star {
        let snapshot = triangle_snapshot(mesh, points, t);
        sink.kill_triangle(snapshot);
        sink.update_error(UpdateOp::DelTriangle, snapshot.error);
    }

    let mut detached_points = Vec::new();
    for &t in &star {
        if let Some(triangle) = mesh.triangle(t) {
            detached_points.extend(triangle.bucket.iter().copied());
        }
    }
    let spoke_edges = spoke_edges(mesh, r, &star);
    for &e in &spoke_edges {
        if let Some(edge) = mesh.edge(e) {
            detached_points.extend(edge.bucket.iter().copied());
        }
    }

    for &t in &star {
        mesh.detach_triangle(t);
    }
    for &e in &spoke_edges {
        mesh.detach_edge(e);
    }
    mesh.detach_vertex(r);

    let n = polygon.len();
    let mut edge_lookup: HashMap<(usize, usize), EdgeId> = HashMap::new();
    for k in 0..n {
        let kn = (k + 1) % n;
        edge_lookup.insert((k, kn), boundary_edge_ids[k]);
        edge_lookup.insert((kn, k), boundary_edge_ids[k]);
    }

    let mut new_faces = Vec::with_capacity(clipped.len());
    for &(prev, i, next) in &clipped {
        let e_pi = *edge_lookup
            .get(&(prev, i))
            .expect("ring edge between prev and i must already be known");
        let e_in = *edge_lookup
            .get(&(i, next))
            .expect("ring edge between i and next must already be known");
        let diagonal = mesh.add_edge(polygon[prev], polygon[next]);
        edge_lookup.insert((prev, next), diagonal);
        edge_lookup.insert((next, prev), diagonal);

        let order = ccw_order(mesh, [polygon[prev], polygon[i], polygon[next]], eps);
        let mut vid_lookup = HashMap::new();
        vid_lookup.insert((polygon[prev], polygon[i]), e_pi);
        vid_lookup.insert((polygon[i], polygon[next]), e_in);
        vid_lookup.insert((polygon[prev], polygon[next]), diagonal);
        let face = mesh.add_triangle(order, edges_for_order(order, &vid_lookup));
        new_faces.push(face);
    }
    wire_fan_neighbours(mesh, &new_faces);

    let seed = new_faces.first().copied();
    if let Some(seed) = seed {
        for pid in detached_points {
            rebucket_point(mesh, points, pid, seed, eps);
        }
    }

    for &face in &new_faces {
        let snapshot = triangle_snapshot(mesh, points, face);
        sink.make_triangle(snapshot);
        sink.update_error(UpdateOp::AddTriangle, snapshot.error);
    }
    sink.mesh_ok();

    Ok(())
}

fn constraint_edges_at(mesh: &Mesh, v: VertexId) -> Vec<EdgeId> {
    mesh.edges()
        .filter(|(_, e)| (e.v0 == v || e.v1 == v) && e.flags.contains(Flags::CONSTRAINT))
        .map(|(id, _)| id)
        .collect()
}

/// Traces the constraint polyline through `r`'s two incident constraints
/// (only meaningful when there are exactly two); a chain is closed if the
/// trace returns to `r`, open if it runs into a branch or dead end first.
fn chain_is_closed(mesh: &Mesh, r: VertexId, incident: &[EdgeId]) -> bool {
    if incident.len() != 2 {
        return false;
    }
    let mut via_edge = incident[0];
    let mut current = mesh
        .edge(via_edge)
        .and_then(|e| e.other(r))
        .expect("incident constraint edge must touch r");

    let guard = mesh.vertex_count() + 4;
    for _ in 0..guard {
        if current == r {
            return true;
        }
        let next: Vec<EdgeId> = constraint_edges_at(mesh, current)
            .into_iter()
            .filter(|&e| e != via_edge)
            .collect();
        if next.len() != 1 {
            return false;
        }
        via_edge = next[0];
        current = mesh
            .edge(via_edge)
            .and_then(|e| e.other(current))
            .expect("constraint edge must touch current");
    }
    false
}

fn spoke_edges(mesh: &Mesh, r: VertexId, star: &[FaceId]) -> Vec<EdgeId> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for &t in star {
        let Some(triangle) = mesh.triangle(t) else { continue };
        let Some(idx) = triangle.index_of(r) else { continue };
        for offset in [1, 2] {
            let e = triangle.edges[(idx + offset) % 3];
            if seen.insert(e) {
                out.push(e);
            }
        }
    }
    out
}

/// Builds the CCW polygon ring around `r`'s star: its vertex sequence and
/// the original (surviving) edge between each consecutive pair.
fn star_boundary_ring(mesh: &Mesh, r: VertexId, star: &[FaceId]) -> Option<(Vec<VertexId>, Vec<EdgeId>)> {
    let mut next_map: HashMap<VertexId, (VertexId, EdgeId)> = HashMap::new();
    for &t in star {
        let triangle = mesh.triangle(t)?;
        let idx = triangle.index_of(r)?;
        let a = triangle.vertices[(idx + 1) % 3];
        let b = triangle.vertices[(idx + 2) % 3];
        next_map.insert(a, (b, triangle.edges[idx]));
    }
    if next_map.len() != star.len() {
        return None; // star isn't a simple closed fan (e.g. r on the hull)
    }

    let start = *next_map.keys().next()?;
    let mut polygon = vec![start];
    let mut edges = Vec::new();
    let mut current = start;
    for _ in 1..star.len() {
        let &(next, edge) = next_map.get(&current)?;
        edges.push(edge);
        polygon.push(next);
        current = next;
    }
    let &(closing_next, closing_edge) = next_map.get(&current)?;
    if closing_next != start {
        return None;
    }
    edges.push(closing_edge);

    Some((polygon, edges))
}

/// Plans the ear-clipping triangulation of `polygon` (a pure computation
/// over indices, touching no mesh state) so a failed plan can be reported
/// without having mutated anything. Returns the clip sequence as
/// `(prev, i, next)` polygon-index triples.
fn plan_ear_clipping(
    mesh: &Mesh,
    polygon: &[VertexId],
    ext_active: bool,
    eps: f64,
) -> Result<Vec<(usize, usize, usize)>, SkipReason> {
    let n = polygon.len();
    if n == 3 {
        return Ok(vec![(0, 1, 2)]);
    }

    let positions: Vec<Point2> = polygon
        .iter()
        .map(|&v| mesh.position(v).expect("polygon vertex vanished"))
        .collect();
    let boundary_segments: Vec<(Point2, Point2)> = (0..n)
        .map(|k| (positions[k], positions[(k + 1) % n]))
        .collect();

    let mut next_idx: Vec<usize> = (0..n).map(|i| (i + 1) % n).collect();
    let mut prev_idx: Vec<usize> = (0..n).map(|i| (i + n - 1) % n).collect();
    let mut active = vec![true; n];
    let mut remaining = n;
    let mut clipped = Vec::with_capacity(n - 2);

    while remaining > 3 {
        let candidates: Vec<usize> = (0..n).filter(|&k| active[k]).collect();
        let mut progressed = false;
        for i in candidates {
            if !active[i] {
                continue;
            }
            let prev = prev_idx[i];
            let next = next_idx[i];
            if is_legal_ear(
                &positions,
                &boundary_segments,
                &active,
                &next_idx,
                &prev_idx,
                prev,
                i,
                next,
                ext_active,
                eps,
            ) {
                clipped.push((prev, i, next));
                active[i] = false;
                next_idx[prev] = next;
                prev_idx[next] = prev;
                remaining -= 1;
                progressed = true;
            }
        }
        if !progressed {
            return Err(SkipReason::NoLegalRetriangulation);
        }
    }

    let last: Vec<usize> = (0..n).filter(|&k| active[k]).collect();
    clipped.push((last[0], last[1], last[2]));
    Ok(clipped)
}

#[allow(clippy::too_many_arguments)]
fn is_legal_ear(
    positions: &[Point2],
    boundary_segments: &[(Point2, Point2)],
    active: &[bool],
    next_idx: &[usize],
    prev_idx: &[usize],
    prev: usize,
    i: usize,
    next: usize,
    ext_active: bool,
    eps: f64,
) -> bool {
    let (pa, pb, pc) = (positions[prev], positions[i], positions[next]);
    if turn(pa, pb, pc, eps) != Orientation::Left {
        return false;
    }

    for &(s0, s1) in boundary_segments {
        if segments_cross(pa, pc, s0, s1, eps) == Crossing::Strict {
            return false;
        }
    }

    let candidates: Vec<usize> = if ext_active {
        (0..positions.len())
            .filter(|&k| active[k] && k != prev && k != i && k != next)
            .collect()
    } else {
        let mut v = Vec::new();
        let outer_prev = prev_idx[prev];
        if outer_prev != i && outer_prev != next {
            v.push(outer_prev);
        }
        let outer_next = next_idx[next];
        if outer_next != prev && outer_next != i {
            v.push(outer_next);
        }
        v
    };
    for k in candidates {
        if in_circle(pa, pb, pc, positions[k], eps) == InCircle::Inside {
            return false;
        }
    }
    true
}
