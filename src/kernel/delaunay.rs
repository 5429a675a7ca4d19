//! Delaunay kernel (C4): Bowyer-Watson vertex insertion and legal-flip
//! optimization, the primitive every higher-level driver builds on.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error_metrics::PendingPoint;
use crate::errors::SkipReason;
use crate::geometry::location::{Location, locate};
use crate::geometry::mesh::{EdgeId, FaceId, Flags, Mesh, VertexId};
use crate::geometry::predicates::{InCircle, Point2, in_circle};
use crate::history::sink::{HistorySink, UpdateOp};

use super::support::{
    ccw_order, classify, edges_for_order, rebucket_point, shared_edge, triangle_snapshot, wire_fan_neighbours,
};

/// Inserts a new vertex at `position` with scalar value `z` into a
/// non-empty mesh by growing its Bowyer-Watson cavity from the triangle
/// (or edge) `position` locates into, retriangulating the cavity as a
/// fan around the new vertex, and reporting the atomic update to `sink`.
///
/// Returns the new vertex's handle together with the pending points whose
/// bucket triangle or edge changed during the insertion (both the initial
/// cavity retriangulation and any further relocations made by `optimize`'s
/// flips) — callers that maintain a priority order over pending points use
/// this to re-key the ones insertion just moved. Returns the
/// [`SkipReason`] that prevented insertion (the point lies outside the
/// hull, or duplicates a vertex already present) on failure.
///
/// # Panics
/// Panics if `mesh` has no triangle at all yet; hull bootstrap (C5) must
/// seed the first triangle before this is called.
pub fn insert_vertex(
    mesh: &mut Mesh,
    points: &[PendingPoint],
    sink: &mut dyn HistorySink,
    eps: f64,
    position: Point2,
    z: f64,
) -> Result<(VertexId, Vec<usize>), SkipReason> {
    let start = mesh
        .first_triangle()
        .expect("insert_vertex called on an empty mesh; bootstrap the hull first");

    let seeds: Vec<FaceId> = match locate(mesh, start, position, eps) {
        Location::External => return Err(SkipReason::OutsideHull),
        Location::OnVertex(_) => return Err(SkipReason::DuplicatePoint),
        Location::Interior(t) => vec![t],
        Location::OnEdge(e) => mesh
            .edge(e)
            .expect("location returned a stale edge")
            .triangles
            .into_iter()
            .flatten()
            .collect(),
    };

    let cavity = grow_cavity(mesh, &seeds, position, eps);

    for &t in &cavity {
        if let Some(triangle) = mesh.triangle_mut(t) {
            triangle.flags.insert(Flags::TO_DELETE);
        }
    }
    for &t in &cavity {
        let snapshot = triangle_snapshot(mesh, points, t);
        sink.kill_triangle(snapshot);
        sink.update_error(UpdateOp::DelTriangle, snapshot.error);
    }

    let in_cavity: HashSet<FaceId> = cavity.iter().copied().collect();
    let mut boundary: Vec<(VertexId, VertexId, EdgeId)> = Vec::new();
    let mut internal_edges: HashSet<EdgeId> = HashSet::new();
    let mut detached_points: Vec<usize> = Vec::new();

    for &t in &cavity {
        let triangle = mesh.triangle(t).expect("cavity triangle vanished").clone();
        detached_points.extend(triangle.bucket.iter().copied());
        for i in 0..3 {
            let a = triangle.vertices[(i + 1) % 3];
            let b = triangle.vertices[(i + 2) % 3];
            match triangle.neighbours[i] {
                Some(n) if in_cavity.contains(&n) => {
                    internal_edges.insert(triangle.edges[i]);
                }
                _ => boundary.push((a, b, triangle.edges[i])),
            }
        }
    }
    for &e in &internal_edges {
        if let Some(edge) = mesh.edge(e) {
            detached_points.extend(edge.bucket.iter().copied());
        }
    }

    for &t in &cavity {
        mesh.detach_triangle(t);
    }
    for &e in &internal_edges {
        mesh.detach_edge(e);
    }

    let v = mesh.add_vertex(position, z);

    let mut edge_from_v: HashMap<VertexId, EdgeId> = HashMap::new();
    let mut new_faces = Vec::with_capacity(boundary.len());
    for (a, b, old_edge) in &boundary {
        let edge_va = *edge_from_v.entry(*a).or_insert_with(|| mesh.add_edge(v, *a));
        let edge_vb = *edge_from_v.entry(*b).or_insert_with(|| mesh.add_edge(v, *b));
        let face = mesh.add_triangle([v, *a, *b], [*old_edge, edge_vb, edge_va]);
        if let Some(triangle) = mesh.triangle_mut(face) {
            triangle.flags.insert(Flags::NEW_TRIANGLE);
        }
        new_faces.push(face);
    }

    wire_fan_neighbours(mesh, &new_faces);

    let mut touched: HashSet<usize> = detached_points.iter().copied().collect();
    for pid in detached_points {
        rebucket_point(mesh, points, pid, new_faces[0], eps);
    }

    for &face in &new_faces {
        let snapshot = triangle_snapshot(mesh, points, face);
        sink.make_triangle(snapshot);
        sink.update_error(UpdateOp::AddTriangle, snapshot.error);
    }
    sink.mesh_ok();

    touched.extend(optimize(mesh, points, sink, eps, fan_boundary_edges(mesh, &new_faces)));

    Ok((v, touched.into_iter().collect()))
}

/// Grows the Bowyer-Watson cavity from `seeds` (each already known to
/// contain or border `position`), crossing only non-`CONSTRAINT` edges
/// into neighbours whose circumcircle still contains `position`.
fn grow_cavity(mesh: &Mesh, seeds: &[FaceId], position: Point2, eps: f64) -> Vec<FaceId> {
    let mut in_cavity: HashSet<FaceId> = seeds.iter().copied().collect();
    let mut queue: VecDeque<FaceId> = seeds.iter().copied().collect();
    let mut cavity = Vec::new();

    while let Some(t) = queue.pop_front() {
        cavity.push(t);
        let triangle = mesh.triangle(t).expect("cavity triangle vanished").clone();
        for i in 0..3 {
            let edge = mesh.edge(triangle.edges[i]).expect("triangle edge vanished");
            if edge.flags.contains(Flags::CONSTRAINT) {
                continue;
            }
            let Some(n) = triangle.neighbours[i] else { continue };
            if in_cavity.contains(&n) {
                continue;
            }
            let neighbour = mesh.triangle(n).expect("neighbour vanished");
            let positions: [Point2; 3] =
                std::array::from_fn(|k| mesh.position(neighbour.vertices[k]).expect("vertex vanished"));
            if in_circle(positions[0], positions[1], positions[2], position, eps) == InCircle::Inside {
                in_cavity.insert(n);
                queue.push_back(n);
            }
        }
    }
    cavity
}

/// The non-`CONSTRAINT` edges bounding a freshly created fan, seeding the
/// flip worklist.
fn fan_boundary_edges(mesh: &Mesh, faces: &[FaceId]) -> Vec<EdgeId> {
    let mut edges = Vec::new();
    for &face in faces {
        let Some(triangle) = mesh.triangle(face) else { continue };
        for &e in &triangle.edges {
            if let Some(edge) = mesh.edge(e) {
                if !edge.flags.contains(Flags::CONSTRAINT) {
                    edges.push(e);
                }
            }
        }
    }
    edges
}

/// Drains a flip worklist: for each edge shared by two triangles whose
/// quad fails the local Delaunay test, flips the diagonal and pushes the
/// four newly-adjacent edges back onto the worklist. Terminates because
/// every flip strictly decreases the sum of circumradii (standard
/// Lawson-flip termination argument). A diagonal just created by a flip
/// is tracked in `just_swapped`, a set local to this call, so it is not
/// immediately re-tested within the same pass; unlike a persistent mesh
/// flag, this tracking is discarded when the pass ends, so the edge is
/// fully eligible for flipping again on a later `insert_vertex` call.
///
/// Returns every pending point re-bucketed by a flip during the pass.
fn optimize(
    mesh: &mut Mesh,
    points: &[PendingPoint],
    sink: &mut dyn HistorySink,
    eps: f64,
    initial: Vec<EdgeId>,
) -> HashSet<usize> {
    let mut queue: VecDeque<EdgeId> = initial.into_iter().collect();
    let mut queued: HashSet<EdgeId> = queue.iter().copied().collect();
    let mut just_swapped: HashSet<EdgeId> = HashSet::new();
    let mut touched: HashSet<usize> = HashSet::new();

    while let Some(edge_id) = queue.pop_front() {
        queued.remove(&edge_id);
        let Some(edge) = mesh.edge(edge_id) else { continue };
        if edge.flags.contains(Flags::CONSTRAINT) || just_swapped.contains(&edge_id) {
            continue;
        }
        let [Some(t1), Some(t2)] = edge.triangles else { continue };

        if !is_illegal(mesh, t1, t2, edge_id, eps) {
            continue;
        }

        for &t in &[t1, t2] {
            let snapshot = triangle_snapshot(mesh, points, t);
            sink.kill_triangle(snapshot);
            sink.update_error(UpdateOp::DelTriangle, snapshot.error);
        }

        let Some((faces, reusable, rebucketed)) = flip(mesh, points, t1, t2, edge_id, eps) else {
            continue;
        };
        touched.extend(rebucketed);

        for &face in &faces {
            let snapshot = triangle_snapshot(mesh, points, face);
            sink.make_triangle(snapshot);
            sink.update_error(UpdateOp::AddTriangle, snapshot.error);
        }
        sink.mesh_ok();

        if let Some(diagonal) = shared_edge(mesh, faces[0], faces[1]) {
            just_swapped.insert(diagonal);
        }

        for e in reusable {
            if queued.insert(e) {
                queue.push_back(e);
            }
        }
    }

    touched
}

/// True if the quad formed by `t1`/`t2` across `edge_id` violates the
/// local Delaunay condition: the vertex opposite `edge_id` in `t2` lies
/// inside `t1`'s circumcircle.
fn is_illegal(mesh: &Mesh, t1: FaceId, t2: FaceId, edge_id: EdgeId, eps: f64) -> bool {
    let Some(tri1) = mesh.triangle(t1) else { return false };
    let Some(tri2) = mesh.triangle(t2) else { return false };
    let Some(idx2) = tri2.edges.iter().position(|&e| e == edge_id) else { return false };
    let opposite = tri2.opposite_vertex(idx2);
    let Some(p) = mesh.position(opposite) else { return false };
    let positions: [Point2; 3] = std::array::from_fn(|k| {
        mesh.position(tri1.vertices[k]).expect("vertex vanished")
    });
    in_circle(positions[0], positions[1], positions[2], p, eps) == InCircle::Inside
}

/// Replaces the diagonal `edge_id` shared by `t1`/`t2` with the diagonal
/// connecting their two opposite vertices, rebuilding both triangles and
/// re-bucketing any points that were attached to the deleted entities.
/// Returns the new triangles, the four reusable (non-diagonal) edges to
/// push back onto the flip worklist, and the pending points re-bucketed by
/// the surgery. Shared with the CDT layer (C6), which performs the same
/// surgery while propagating constraint crossings.
pub(crate) fn flip(
    mesh: &mut Mesh,
    points: &[PendingPoint],
    t1: FaceId,
    t2: FaceId,
    edge_id: EdgeId,
    eps: f64,
) -> Option<([FaceId; 2], [EdgeId; 4], Vec<usize>)> {
    let edge = mesh.edge(edge_id)?.clone();
    let tri1 = mesh.triangle(t1)?.clone();
    let tri2 = mesh.triangle(t2)?.clone();
    let idx1 = tri1.edges.iter().position(|&e| e == edge_id)?;
    let idx2 = tri2.edges.iter().position(|&e| e == edge_id)?;
    let w1 = tri1.opposite_vertex(idx1);
    let w2 = tri2.opposite_vertex(idx2);
    let a = edge.v0;
    let b = edge.v1;

    let (edge_w1a, edge_w1b) = classify(mesh, &tri1, idx1, a, b);
    let (edge_w2a, edge_w2b) = classify(mesh, &tri2, idx2, a, b);

    let mut detached_points: Vec<usize> = Vec::new();
    detached_points.extend(tri1.bucket.iter().copied());
    detached_points.extend(tri2.bucket.iter().copied());
    detached_points.extend(edge.bucket.iter().copied());

    mesh.detach_triangle(t1);
    mesh.detach_triangle(t2);
    mesh.detach_edge(edge_id);

    let diagonal = mesh.add_edge(w1, w2);

    let mut lookup: HashMap<(VertexId, VertexId), EdgeId> = HashMap::new();
    lookup.insert((w1, w2), diagonal);
    lookup.insert((w2, a), edge_w2a);
    lookup.insert((a, w1), edge_w1a);
    lookup.insert((w2, b), edge_w2b);
    lookup.insert((b, w1), edge_w1b);

    let order_a = ccw_order(mesh, [w1, w2, a], eps);
    let order_b = ccw_order(mesh, [w1, w2, b], eps);
    let face_a = mesh.add_triangle(order_a, edges_for_order(order_a, &lookup));
    let face_b = mesh.add_triangle(order_b, edges_for_order(order_b, &lookup));

    let faces = [face_a, face_b];
    wire_fan_neighbours(mesh, &faces);

    for &pid in &detached_points {
        rebucket_point(mesh, points, pid, face_a, eps);
    }

    Some((faces, [edge_w1a, edge_w1b, edge_w2a, edge_w2b], detached_points))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::recording::RecordingSink;

    fn square_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(Point2::new(0.0, 0.0), 0.0);
        let b = mesh.add_vertex(Point2::new(4.0, 0.0), 0.0);
        let c = mesh.add_vertex(Point2::new(4.0, 4.0), 0.0);
        let d = mesh.add_vertex(Point2::new(0.0, 4.0), 0.0);

        let e_ac = mesh.add_edge(a, c);
        let e_ab = mesh.add_edge(a, b);
        let e_bc = mesh.add_edge(b, c);
        let e_cd = mesh.add_edge(c, d);
        let e_da = mesh.add_edge(d, a);

        let t1 = mesh.add_triangle([a, b, c], [e_bc, e_ac, e_ab]);
        let t2 = mesh.add_triangle([a, c, d], [e_cd, e_da, e_ac]);
        mesh.set_neighbour(t1, 1, Some(t2));
        mesh.set_neighbour(t2, 2, Some(t1));
        mesh
    }

    #[test]
    fn insert_vertex_splits_the_host_triangle_into_a_fan() {
        let mut mesh = square_mesh();
        let mut sink = RecordingSink::new();
        let points: Vec<PendingPoint> = Vec::new();
        let before = mesh.triangle_count();
        let (v, _) = insert_vertex(&mut mesh, &points, &mut sink, 1e-9, Point2::new(3.0, 1.0), 0.0)
            .expect("interior point must be accepted");
        assert!(mesh.triangle_count() >= before + 1);
        assert_eq!(mesh.vertex(v).unwrap().point, Point2::new(3.0, 1.0));
    }

    #[test]
    fn insert_vertex_rejects_duplicate_and_external_points() {
        let mut mesh = square_mesh();
        let mut sink = RecordingSink::new();
        let points: Vec<PendingPoint> = Vec::new();

        let dup = insert_vertex(&mut mesh, &points, &mut sink, 1e-9, Point2::new(0.0, 0.0), 0.0);
        assert_eq!(dup, Err(SkipReason::DuplicatePoint));

        let outside = insert_vertex(&mut mesh, &points, &mut sink, 1e-9, Point2::new(100.0, 100.0), 0.0);
        assert_eq!(outside, Err(SkipReason::OutsideHull));
    }

    #[test]
    fn insert_vertex_preserves_local_delaunay_property() {
        let mut mesh = square_mesh();
        let mut sink = RecordingSink::new();
        let points: Vec<PendingPoint> = Vec::new();
        insert_vertex(&mut mesh, &points, &mut sink, 1e-9, Point2::new(1.9, 1.9), 0.0).unwrap();

        for (edge_id, edge) in mesh.edges().collect::<Vec<_>>() {
            let [Some(t1), Some(t2)] = edge.triangles else { continue };
            assert!(!is_illegal(&mesh, t1, t2, edge_id, 1e-9), "edge {edge_id:?} left illegal after insertion");
        }
    }

    #[test]
    fn edges_swapped_in_an_earlier_pass_remain_flippable_in_a_later_one() {
        let mut mesh = square_mesh();
        let mut sink = RecordingSink::new();
        let points: Vec<PendingPoint> = Vec::new();

        let sites = [
            Point2::new(1.9, 1.9),
            Point2::new(2.1, 1.8),
            Point2::new(1.5, 2.5),
            Point2::new(3.0, 0.5),
            Point2::new(0.5, 3.0),
        ];
        for site in sites {
            insert_vertex(&mut mesh, &points, &mut sink, 1e-9, site, 0.0).unwrap();
            for (edge_id, edge) in mesh.edges().collect::<Vec<_>>() {
                let [Some(t1), Some(t2)] = edge.triangles else { continue };
                assert!(
                    !is_illegal(&mesh, t1, t2, edge_id, 1e-9),
                    "edge {edge_id:?} left illegal after inserting {site:?}"
                );
            }
        }
    }

    #[test]
    fn bucketed_point_relocates_after_cavity_retriangulation() {
        let mut mesh = square_mesh();
        let mut sink = RecordingSink::new();
        let t1 = mesh.first_triangle().unwrap();
        let points = vec![PendingPoint { point: Point2::new(3.5, 0.5), z: 0.0 }];
        mesh.bucket_add_triangle(t1, 0);

        insert_vertex(&mut mesh, &points, &mut sink, 1e-9, Point2::new(3.0, 1.0), 0.0).unwrap();

        let found = mesh.triangles().any(|(_, t)| t.bucket.contains(&0));
        assert!(found, "pending point must be re-bucketed into a surviving triangle");
    }
}
