//! Next-candidate selection strategies (§4.9, §4.10): which point to
//! insert next, or which vertex to try removing next.

use std::collections::HashMap;

use rand::RngCore;
use rand::seq::SliceRandom;

use crate::error_metrics::{ErrorTree, PendingPoint, bucket_head};
use crate::geometry::mesh::{Mesh, PointId};

/// Fisher-Yates shuffle via the `rand` crate, used by both drivers' random
/// variants.
pub(crate) fn shuffled(rng: &mut dyn RngCore, mut items: Vec<usize>) -> Vec<usize> {
    items.shuffle(rng);
    items
}

/// Source of the next point to insert during refinement (C9).
pub enum RefinementCandidates {
    /// A pre-shuffled permutation of non-hull point indices, drained front
    /// to back.
    Random(std::collections::VecDeque<PointId>),
    /// The error-priority tree, drained by largest head error first, plus
    /// each pending point's last-known error so a later re-key can find its
    /// existing entry (the tree is keyed on `(error, point)`).
    Error { tree: ErrorTree, current: HashMap<PointId, f64> },
}

impl RefinementCandidates {
    /// Builds the random variant from `non_hull`, shuffled with `rng`.
    #[must_use]
    pub fn random(non_hull: Vec<PointId>, rng: &mut dyn RngCore) -> Self {
        Self::Random(shuffled(rng, non_hull).into())
    }

    /// Builds the error variant, seeding each of `non_hull`'s current head
    /// error from `mesh`.
    #[must_use]
    pub fn error(mesh: &Mesh, points: &[PendingPoint], non_hull: &[PointId]) -> Self {
        let mut tree = ErrorTree::new();
        let mut current = HashMap::new();
        for &pid in non_hull {
            if let Some(head) = head_error_of(mesh, points, pid) {
                tree.insert(pid, head);
                current.insert(pid, head);
            }
        }
        Self::Error { tree, current }
    }

    /// Pops and returns the next candidate point, if any remain.
    pub fn next(&mut self) -> Option<PointId> {
        match self {
            Self::Random(queue) => queue.pop_front(),
            Self::Error { tree, .. } => tree.remove_max(),
        }
    }

    /// Re-keys `touched` points (those `insert_vertex` just re-bucketed)
    /// against their current head error. A no-op for the random variant,
    /// which carries no error priority to keep current.
    pub fn requeue(&mut self, mesh: &Mesh, points: &[PendingPoint], touched: &[PointId]) {
        let Self::Error { tree, current } = self else { return };
        for &pid in touched {
            if let Some(old) = current.remove(&pid) {
                tree.remove(pid, old);
            }
            if let Some(new_error) = head_error_of(mesh, points, pid) {
                tree.insert(pid, new_error);
                current.insert(pid, new_error);
            }
        }
    }

    /// Number of candidates still pending.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Random(queue) => queue.len(),
            Self::Error { tree, .. } => tree.len(),
        }
    }

    /// True if no candidates remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The current largest error among pending points bucketed alongside `pid`
/// in whichever live triangle holds it.
fn head_error_of(mesh: &Mesh, points: &[PendingPoint], pid: PointId) -> Option<f64> {
    mesh.triangles()
        .find(|(_, t)| t.bucket.contains(&pid))
        .and_then(|(face, _)| bucket_head(mesh, face, points))
        .map(|(_, e)| e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn random_variant_drains_every_index_exactly_once() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut candidates = RefinementCandidates::random(vec![0, 1, 2, 3, 4], &mut rng);
        let mut seen = Vec::new();
        while let Some(p) = candidates.next() {
            seen.push(p);
        }
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn error_variant_drains_in_descending_error_order() {
        let mut tree = ErrorTree::new();
        tree.insert(0, 1.0);
        tree.insert(1, 9.0);
        tree.insert(2, 4.0);
        let mut candidates = RefinementCandidates::Error { tree, current: HashMap::new() };
        assert_eq!(candidates.next(), Some(1));
        assert_eq!(candidates.next(), Some(2));
        assert_eq!(candidates.next(), Some(0));
        assert!(candidates.is_empty());
    }

    #[test]
    fn requeue_rekeys_a_touched_point_to_its_current_head_error() {
        use crate::geometry::predicates::Point2;

        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(Point2::new(0.0, 0.0), 0.0);
        let b = mesh.add_vertex(Point2::new(4.0, 0.0), 0.0);
        let c = mesh.add_vertex(Point2::new(0.0, 4.0), 0.0);
        let e_bc = mesh.add_edge(b, c);
        let e_ca = mesh.add_edge(c, a);
        let e_ab = mesh.add_edge(a, b);
        let t = mesh.add_triangle([a, b, c], [e_bc, e_ca, e_ab]);
        mesh.bucket_add_triangle(t, 0);

        let points = vec![PendingPoint { point: Point2::new(1.0, 1.0), z: 5.0 }];

        let mut tree = ErrorTree::new();
        tree.insert(0, 1.0);
        let mut current = HashMap::new();
        current.insert(0, 1.0);
        let mut candidates = RefinementCandidates::Error { tree, current };

        candidates.requeue(&mesh, &points, &[0]);

        let RefinementCandidates::Error { current, .. } = &candidates else { unreachable!() };
        assert!((current[&0] - 5.0).abs() < 1e-9, "stale error must be replaced by the current head error");
    }
}
