//! Shared helpers used by the Delaunay kernel (C4), CDT layer (C6), and
//! vertex removal (C7): triangle snapshots for the history sink,
//! point re-bucketing, and small geometric plumbing around the mesh's
//! opposite-vertex-index convention.

use std::collections::HashMap;

use crate::error_metrics::{PendingPoint, bucket_head};
use crate::geometry::location::{Location, locate};
use crate::geometry::mesh::{EdgeId, FaceId, Mesh, VertexId};
use crate::geometry::predicates::{Orientation, Point2, turn};
use crate::history::sink::TriangleSnapshot;

/// Builds the history-sink snapshot for a live triangle: its stable
/// vertex identifiers and the current head-of-bucket error.
#[must_use]
pub(crate) fn triangle_snapshot(mesh: &Mesh, points: &[PendingPoint], face: FaceId) -> TriangleSnapshot {
    let triangle = mesh.triangle(face).expect("snapshot of a stale triangle");
    let vertices = triangle.vertices.map(|v| mesh.vertex(v).map_or(0, |vx| vx.id));
    let error = bucket_head(mesh, face, points).map_or(0.0, |(_, e)| e);
    TriangleSnapshot {
        face,
        vertices,
        error,
    }
}

/// Locates `pid`'s position starting from `start` and adds it to whatever
/// bucket it falls into. External/on-vertex results are dropped silently
/// — the caller is relocating a point that was already accepted into the
/// mesh's convex hull at an earlier step.
pub(crate) fn rebucket_point(mesh: &mut Mesh, points: &[PendingPoint], pid: usize, start: FaceId, eps: f64) {
    match locate(mesh, start, points[pid].point, eps) {
        Location::Interior(t) => mesh.bucket_add_triangle(t, pid),
        Location::OnEdge(e) => mesh.bucket_add_edge(e, pid),
        Location::OnVertex(_) | Location::External => {}
    }
}

/// Orders three vertices CCW, swapping the last two if they were CW.
pub(crate) fn ccw_order(mesh: &Mesh, verts: [VertexId; 3], eps: f64) -> [VertexId; 3] {
    let p: [Point2; 3] = std::array::from_fn(|i| mesh.position(verts[i]).expect("vertex vanished"));
    if turn(p[0], p[1], p[2], eps) == Orientation::Right {
        [verts[0], verts[2], verts[1]]
    } else {
        verts
    }
}

/// Builds the `edges[i] opposite vertices[i]` array for a CCW vertex
/// order, given a lookup from an unordered vertex pair to its `EdgeId`.
pub(crate) fn edges_for_order(
    order: [VertexId; 3],
    lookup: &HashMap<(VertexId, VertexId), EdgeId>,
) -> [EdgeId; 3] {
    let find = |a: VertexId, b: VertexId| {
        lookup
            .get(&(a, b))
            .or_else(|| lookup.get(&(b, a)))
            .copied()
            .unwrap_or_else(|| panic!("no edge registered for a reconstructed triangle side"))
    };
    [
        find(order[1], order[2]),
        find(order[2], order[0]),
        find(order[0], order[1]),
    ]
}

/// Splits a triangle's two non-shared edges into the one touching `a`
/// and the one touching `b`, given the local index of the shared edge.
pub(crate) fn classify(
    mesh: &Mesh,
    triangle: &crate::geometry::mesh::Triangle,
    shared_idx: usize,
    a: VertexId,
    b: VertexId,
) -> (EdgeId, EdgeId) {
    let mut edge_a = None;
    let mut edge_b = None;
    for j in 0..3 {
        if j == shared_idx {
            continue;
        }
        let e = triangle.edges[j];
        let edge = mesh.edge(e).expect("triangle edge vanished");
        if edge.v0 == a || edge.v1 == a {
            edge_a = Some(e);
        } else if edge.v0 == b || edge.v1 == b {
            edge_b = Some(e);
        }
    }
    (
        edge_a.expect("triangle missing its edge to a"),
        edge_b.expect("triangle missing its edge to b"),
    )
}

/// The edge shared by two triangles, if any.
pub(crate) fn shared_edge(mesh: &Mesh, f1: FaceId, f2: FaceId) -> Option<EdgeId> {
    let t1 = mesh.triangle(f1)?;
    let t2 = mesh.triangle(f2)?;
    t1.edges.iter().copied().find(|e| t2.edges.contains(e))
}

/// Re-derives every `new_faces` member's neighbour links from its edges'
/// triangle-slot bookkeeping: for each bounding edge, the neighbour is
/// whichever of the edge's (at most two) incident triangles isn't `self`.
/// Works uniformly for edges shared between two new triangles and edges
/// shared with an untouched outer triangle — in the latter case the
/// outer triangle's own back-link (left `None` by the cavity triangle's
/// detachment) is restored to point at the new face.
pub(crate) fn wire_fan_neighbours(mesh: &mut Mesh, faces: &[FaceId]) {
    for &face in faces {
        let triangle = mesh.triangle(face).expect("new triangle vanished").clone();
        for i in 0..3 {
            let edge = mesh.edge(triangle.edges[i]).expect("new triangle edge vanished");
            let other = edge.triangles.into_iter().flatten().find(|&f| f != face);
            mesh.set_neighbour(face, i, other);
            if let Some(outer) = other {
                if faces.contains(&outer) {
                    continue;
                }
                if let Some(outer_tri) = mesh.triangle(outer) {
                    if let Some(slot) = outer_tri.edges.iter().position(|&e| e == triangle.edges[i]) {
                        mesh.set_neighbour(outer, slot, Some(face));
                    }
                }
            }
        }
    }
}
