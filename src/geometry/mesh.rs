//! Mesh store (C2): vertices, edges, triangles, their adjacency, and the
//! pending-point buckets attached to edges and triangles.

use super::arena::{Arena, Handle};
use super::predicates::Point2;

/// Index into the driver's pending-point pool. Not arena-managed: points
/// are never individually freed, only promoted to vertices or dropped
/// from a bucket when they move to another one.
pub type PointId = usize;

/// Handle to a live [`Vertex`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexId(Handle);

/// Handle to a live [`Edge`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EdgeId(Handle);

/// Handle to a live [`Triangle`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FaceId(Handle);

/// Flag bits shared by edges and triangles (§3 data model). Not every bit
/// applies to both entity kinds; each struct only ever sets the bits the
/// spec assigns it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Flags(u8);

impl Flags {
    /// Edge is a required constraint segment; never flipped or grown over.
    pub const CONSTRAINT: Self = Self(1 << 0);
    /// Edge was just created by a flip, exempting it from immediate re-enqueue.
    pub const SWAPPED: Self = Self(1 << 1);
    /// Entity is marked for removal within the current atomic update.
    pub const TO_DELETE: Self = Self(1 << 2);
    /// Generic traversal-visited marker used by BFS/walk algorithms.
    pub const VISITED: Self = Self(1 << 3);
    /// Triangle was created within the current atomic update.
    pub const NEW_TRIANGLE: Self = Self(1 << 4);
    /// Triangle has been reported to the history sink as killed.
    pub const MT_DELETED: Self = Self(1 << 5);

    /// True if all bits of `other` are set.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the bits of `other`.
    pub const fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    pub const fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl std::ops::BitOr for Flags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A mesh vertex: planar position, scalar field value, and a stable
/// creation-order identifier (invariant 6) distinct from its (reusable)
/// arena handle.
#[derive(Clone, Debug)]
pub struct Vertex {
    /// Planar `(x, y)` position.
    pub point: Point2,
    /// Scalar field value ("height").
    pub z: f64,
    /// Stable identifier assigned in creation order; never reused.
    pub id: u64,
    /// One incident edge, used as a traversal seed for the vertex's star.
    pub edge: Option<EdgeId>,
    /// Approximation error summed onto this vertex from its incident
    /// triangles' bucket accounting.
    pub error: f64,
}

/// A mesh edge: its two endpoints, up to two incident triangles, flags,
/// and the bucket of pending points projecting exactly onto it.
#[derive(Clone, Debug)]
pub struct Edge {
    /// First endpoint.
    pub v0: VertexId,
    /// Second endpoint.
    pub v1: VertexId,
    /// Incident triangles; `None` on a hull edge's outer side.
    pub triangles: [Option<FaceId>; 2],
    /// Flag bits (`CONSTRAINT`, `SWAPPED`, `TO_DELETE`, `VISITED`).
    pub flags: Flags,
    /// Pending points whose projection falls on this edge.
    pub bucket: Vec<PointId>,
}

impl Edge {
    /// True if at least one triangle slot is live (an edge has no
    /// existence once both its triangles are gone).
    #[must_use]
    pub const fn is_alive(&self) -> bool {
        self.triangles[0].is_some() || self.triangles[1].is_some()
    }

    /// The endpoint that is not `from`, or `None` if `from` isn't an
    /// endpoint of this edge.
    #[must_use]
    pub fn other(&self, from: VertexId) -> Option<VertexId> {
        if self.v0 == from {
            Some(self.v1)
        } else if self.v1 == from {
            Some(self.v0)
        } else {
            None
        }
    }
}

/// A mesh triangle: three CCW vertices, three bounding edges, three
/// neighbours indexed by opposite vertex, flags, and an interior bucket.
#[derive(Clone, Debug)]
pub struct Triangle {
    /// Vertices in CCW order.
    pub vertices: [VertexId; 3],
    /// Bounding edges; edge `i` is opposite `vertices[i]`.
    pub edges: [EdgeId; 3],
    /// Neighbour across edge `i`, i.e. opposite `vertices[i]`.
    pub neighbours: [Option<FaceId>; 3],
    /// Flag bits (`NEW_TRIANGLE`, `TO_DELETE`, `MT_DELETED`, `VISITED`).
    pub flags: Flags,
    /// Pending points strictly inside this triangle.
    pub bucket: Vec<PointId>,
}

impl Triangle {
    /// Local index (0..3) of `vertex` within this triangle, if present.
    #[must_use]
    pub fn index_of(&self, vertex: VertexId) -> Option<usize> {
        self.vertices.iter().position(|&v| v == vertex)
    }

    /// The vertex opposite edge `i`.
    #[must_use]
    pub const fn opposite_vertex(&self, edge_index: usize) -> VertexId {
        self.vertices[edge_index]
    }
}

/// Owns every vertex, edge, and triangle in the mesh and their mutual
/// adjacency. Buckets hold non-owning [`PointId`] references into the
/// driver's pending-point pool.
#[derive(Debug, Default, Clone)]
pub struct Mesh {
    vertices: Arena<Vertex>,
    edges: Arena<Edge>,
    triangles: Arena<Triangle>,
    first_triangle: Option<FaceId>,
    next_vertex_seq: u64,
}

impl Mesh {
    /// Creates an empty mesh.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a new vertex at `point` with scalar value `z`, assigning it
    /// the next creation-order identifier.
    pub fn add_vertex(&mut self, point: Point2, z: f64) -> VertexId {
        let id = self.next_vertex_seq;
        self.next_vertex_seq += 1;
        VertexId(self.vertices.insert(Vertex {
            point,
            z,
            id,
            edge: None,
            error: 0.0,
        }))
    }

    /// Creates an edge between `v0` and `v1` with no incident triangles yet.
    pub fn add_edge(&mut self, v0: VertexId, v1: VertexId) -> EdgeId {
        let id = EdgeId(self.edges.insert(Edge {
            v0,
            v1,
            triangles: [None, None],
            flags: Flags::default(),
            bucket: Vec::new(),
        }));
        if let Some(vertex) = self.vertices.get_mut(v0.0) {
            vertex.edge.get_or_insert(id);
        }
        id
    }

    /// Creates a triangle from three vertices and their three bounding
    /// edges (caller supplies edges in opposite-vertex order and wires
    /// neighbour links separately, since that requires knowing which
    /// triangle lies across each edge).
    pub fn add_triangle(&mut self, vertices: [VertexId; 3], edges: [EdgeId; 3]) -> FaceId {
        let id = FaceId(self.triangles.insert(Triangle {
            vertices,
            edges,
            neighbours: [None, None, None],
            flags: Flags::default(),
            bucket: Vec::new(),
        }));
        for &edge_id in &edges {
            if let Some(edge) = self.edges.get_mut(edge_id.0) {
                if edge.triangles[0].is_none() {
                    edge.triangles[0] = Some(id);
                } else {
                    edge.triangles[1] = Some(id);
                }
            }
        }
        self.first_triangle.get_or_insert(id);
        id
    }

    /// Sets the neighbour of `tri` across its edge `i` (opposite vertex
    /// `i`) to `neighbour`, without touching the reverse link.
    pub fn set_neighbour(&mut self, tri: FaceId, edge_index: usize, neighbour: Option<FaceId>) {
        if let Some(t) = self.triangles.get_mut(tri.0) {
            t.neighbours[edge_index] = neighbour;
        }
    }

    /// Detaches a triangle: clears its neighbours' back-links, advances
    /// the first-triangle handle if needed, and frees its arena slot.
    pub fn detach_triangle(&mut self, id: FaceId) -> Option<Triangle> {
        let triangle = self.triangles.get(id.0)?.clone();
        for neighbour in triangle.neighbours.into_iter().flatten() {
            if let Some(n) = self.triangles.get_mut(neighbour.0) {
                for slot in &mut n.neighbours {
                    if *slot == Some(id) {
                        *slot = None;
                    }
                }
            }
        }
        for &edge_id in &triangle.edges {
            if let Some(edge) = self.edges.get_mut(edge_id.0) {
                for slot in &mut edge.triangles {
                    if *slot == Some(id) {
                        *slot = None;
                    }
                }
            }
        }
        if self.first_triangle == Some(id) {
            self.first_triangle = self
                .triangles
                .iter()
                .map(|(h, _)| FaceId(h))
                .find(|&h| h != id);
        }
        self.triangles.remove(id.0);
        Some(triangle)
    }

    /// Detaches an edge. Only meaningful once both its triangle slots are
    /// already clear (i.e. after the owning triangles were detached).
    pub fn detach_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.get(id.0)?;
        debug_assert!(!edge.is_alive(), "detaching an edge still bordering a live triangle");
        self.edges.remove(id.0)
    }

    /// Detaches a vertex. Only meaningful once no live edge still
    /// references it (i.e. after vertex removal has detached its star).
    pub fn detach_vertex(&mut self, id: VertexId) -> Option<Vertex> {
        debug_assert!(
            self.edges.iter().all(|(_, e)| e.v0 != id && e.v1 != id),
            "detaching a vertex still referenced by a live edge"
        );
        self.vertices.remove(id.0)
    }

    /// Borrows a vertex.
    #[must_use]
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.vertices.get(id.0)
    }

    /// Mutably borrows a vertex.
    pub fn vertex_mut(&mut self, id: VertexId) -> Option<&mut Vertex> {
        self.vertices.get_mut(id.0)
    }

    /// Borrows an edge.
    #[must_use]
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.0)
    }

    /// Mutably borrows an edge.
    pub fn edge_mut(&mut self, id: EdgeId) -> Option<&mut Edge> {
        self.edges.get_mut(id.0)
    }

    /// Borrows a triangle.
    #[must_use]
    pub fn triangle(&self, id: FaceId) -> Option<&Triangle> {
        self.triangles.get(id.0)
    }

    /// Mutably borrows a triangle.
    pub fn triangle_mut(&mut self, id: FaceId) -> Option<&mut Triangle> {
        self.triangles.get_mut(id.0)
    }

    /// The traversal seed triangle, if the mesh is non-empty.
    #[must_use]
    pub const fn first_triangle(&self) -> Option<FaceId> {
        self.first_triangle
    }

    /// Iterates over every live triangle.
    pub fn triangles(&self) -> impl Iterator<Item = (FaceId, &Triangle)> {
        self.triangles.iter().map(|(h, t)| (FaceId(h), t))
    }

    /// Iterates over every live edge.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges.iter().map(|(h, e)| (EdgeId(h), e))
    }

    /// Iterates over every live vertex.
    pub fn vertices(&self) -> impl Iterator<Item = (VertexId, &Vertex)> {
        self.vertices.iter().map(|(h, v)| (VertexId(h), v))
    }

    /// Number of live triangles.
    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of live edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Number of live vertices.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Adds `point` to triangle `tri`'s bucket.
    pub fn bucket_add_triangle(&mut self, tri: FaceId, point: PointId) {
        if let Some(t) = self.triangles.get_mut(tri.0) {
            t.bucket.push(point);
        }
    }

    /// Removes `point` from triangle `tri`'s bucket, if present.
    pub fn bucket_remove_triangle(&mut self, tri: FaceId, point: PointId) {
        if let Some(t) = self.triangles.get_mut(tri.0) {
            t.bucket.retain(|&p| p != point);
        }
    }

    /// Adds `point` to edge `e`'s bucket.
    pub fn bucket_add_edge(&mut self, e: EdgeId, point: PointId) {
        if let Some(edge) = self.edges.get_mut(e.0) {
            edge.bucket.push(point);
        }
    }

    /// Removes `point` from edge `e`'s bucket, if present.
    pub fn bucket_remove_edge(&mut self, e: EdgeId, point: PointId) {
        if let Some(edge) = self.edges.get_mut(e.0) {
            edge.bucket.retain(|&p| p != point);
        }
    }

    /// Returns the planar position of `id`, or `None` if the handle is stale.
    #[must_use]
    pub fn position(&self, id: VertexId) -> Option<Point2> {
        self.vertex(id).map(|v| v.point)
    }

    /// Triangles incident to `vertex` (its star), found by walking the
    /// triangle fan around it starting from its cached incident edge.
    #[must_use]
    pub fn star(&self, vertex: VertexId) -> Vec<FaceId> {
        let Some(seed) = self
            .triangles
            .iter()
            .map(|(h, t)| (FaceId(h), t))
            .find(|(_, t)| t.vertices.contains(&vertex))
        else {
            return Vec::new();
        };
        let mut result = Vec::new();
        let mut queue = vec![seed.0];
        let mut seen = std::collections::HashSet::new();
        while let Some(face) = queue.pop() {
            if !seen.insert(face) {
                continue;
            }
            let Some(t) = self.triangle(face) else { continue };
            if !t.vertices.contains(&vertex) {
                continue;
            }
            result.push(face);
            for neighbour in t.neighbours.into_iter().flatten() {
                if !seen.contains(&neighbour) {
                    queue.push(neighbour);
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2 {
        Point2::new(x, y)
    }

    #[test]
    fn add_triangle_wires_edge_back_links() {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(p(0.0, 0.0), 0.0);
        let b = mesh.add_vertex(p(1.0, 0.0), 0.0);
        let c = mesh.add_vertex(p(0.0, 1.0), 0.0);
        let e0 = mesh.add_edge(b, c);
        let e1 = mesh.add_edge(c, a);
        let e2 = mesh.add_edge(a, b);
        let tri = mesh.add_triangle([a, b, c], [e0, e1, e2]);

        assert_eq!(mesh.edge(e0).unwrap().triangles[0], Some(tri));
        assert_eq!(mesh.first_triangle(), Some(tri));
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn detach_triangle_clears_neighbour_back_links() {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(p(0.0, 0.0), 0.0);
        let b = mesh.add_vertex(p(1.0, 0.0), 0.0);
        let c = mesh.add_vertex(p(0.0, 1.0), 0.0);
        let d = mesh.add_vertex(p(1.0, 1.0), 0.0);
        let e_bc = mesh.add_edge(b, c);
        let e_ca = mesh.add_edge(c, a);
        let e_ab = mesh.add_edge(a, b);
        let e_bd = mesh.add_edge(b, d);
        let e_dc = mesh.add_edge(d, c);

        let t1 = mesh.add_triangle([a, b, c], [e_bc, e_ca, e_ab]);
        let t2 = mesh.add_triangle([b, d, c], [e_dc, e_bc, e_bd]);
        mesh.set_neighbour(t1, 0, Some(t2));
        mesh.set_neighbour(t2, 1, Some(t1));

        mesh.detach_triangle(t2);
        assert_eq!(mesh.triangle(t1).unwrap().neighbours[0], None);
        assert_eq!(mesh.triangle_count(), 1);
    }

    #[test]
    fn vertex_ids_carry_stable_creation_order() {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(p(0.0, 0.0), 0.0);
        let b = mesh.add_vertex(p(1.0, 0.0), 0.0);
        assert_eq!(mesh.vertex(a).unwrap().id, 0);
        assert_eq!(mesh.vertex(b).unwrap().id, 1);
    }

    #[test]
    fn flags_round_trip() {
        let mut flags = Flags::default();
        assert!(!flags.contains(Flags::CONSTRAINT));
        flags.insert(Flags::CONSTRAINT);
        assert!(flags.contains(Flags::CONSTRAINT));
        flags.remove(Flags::CONSTRAINT);
        assert!(!flags.contains(Flags::CONSTRAINT));
    }

    #[test]
    fn bucket_add_remove_round_trip() {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(p(0.0, 0.0), 0.0);
        let b = mesh.add_vertex(p(1.0, 0.0), 0.0);
        let c = mesh.add_vertex(p(0.0, 1.0), 0.0);
        let e0 = mesh.add_edge(b, c);
        let e1 = mesh.add_edge(c, a);
        let e2 = mesh.add_edge(a, b);
        let tri = mesh.add_triangle([a, b, c], [e0, e1, e2]);

        mesh.bucket_add_triangle(tri, 7);
        assert_eq!(mesh.triangle(tri).unwrap().bucket, vec![7]);
        mesh.bucket_remove_triangle(tri, 7);
        assert!(mesh.triangle(tri).unwrap().bucket.is_empty());
    }
}
