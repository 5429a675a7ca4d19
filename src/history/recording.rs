//! In-memory [`HistorySink`] implementation, used by tests, demos, and as
//! the default sink when no downstream MT consumer is wired up. Grounded
//! on the teacher's `MockBackend` (a HashMap-based stand-in kept
//! alongside the real backend for exactly this purpose).

use std::collections::HashMap;

use super::sink::{Direction, HistorySink, Norm, TerminateCondition, TriangleSnapshot, UpdateOp};
use crate::geometry::mesh::FaceId;

/// One logged event, in call order, for inspection by tests and demos.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// `start_history` was called.
    Start(Direction),
    /// A triangle was created.
    Made(TriangleSnapshot),
    /// A triangle was killed.
    Killed(TriangleSnapshot),
    /// A `mesh_ok` checkpoint fired.
    Checkpoint,
    /// `end_history` was called.
    End,
}

/// Records every call in order and maintains the running global-error
/// norms from live triangle errors.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Vec<Event>,
    live_errors: HashMap<FaceId, f64>,
    condition: TerminateCondition,
    update_count: u64,
}

impl RecordingSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The full event log, in call order.
    #[must_use]
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Number of `make_triangle` calls minus `kill_triangle` calls
    /// recorded so far (i.e. `ADDTRG` minus `DELTRG`).
    #[must_use]
    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    /// Evaluates the requested global norm over currently live triangle errors.
    #[must_use]
    pub fn norm(&self, norm: Norm) -> f64 {
        if self.live_errors.is_empty() {
            return 0.0;
        }
        match norm {
            Norm::Max => self.live_errors.values().copied().fold(0.0_f64, f64::max),
            Norm::Med => {
                self.live_errors.values().sum::<f64>() / self.live_errors.len() as f64
            }
            Norm::Sqm => {
                let sum_sq: f64 = self.live_errors.values().map(|e| e * e).sum();
                (sum_sq / self.live_errors.len() as f64).sqrt()
            }
        }
    }
}

impl HistorySink for RecordingSink {
    fn start_history(&mut self, direction: Direction) {
        self.events.push(Event::Start(direction));
    }

    fn make_triangle(&mut self, triangle: TriangleSnapshot) {
        self.live_errors.insert(triangle.face, triangle.error);
        self.events.push(Event::Made(triangle));
    }

    fn kill_triangle(&mut self, triangle: TriangleSnapshot) {
        self.live_errors.remove(&triangle.face);
        self.events.push(Event::Killed(triangle));
    }

    fn mesh_ok(&mut self) {
        self.events.push(Event::Checkpoint);
    }

    fn end_history(&mut self) {
        self.events.push(Event::End);
    }

    fn set_terminate_condition(&mut self, condition: TerminateCondition) {
        self.condition = condition;
    }

    fn terminate_condition(&self) -> bool {
        match self.condition {
            TerminateCondition::None => false,
            TerminateCondition::UpdateCount(n) => self.update_count >= n,
            TerminateCondition::ErrorLevel { norm, level } => self.norm(norm) <= level,
        }
    }

    fn update_error(&mut self, op: UpdateOp, _triangle_error: f64) {
        match op {
            UpdateOp::AddTriangle => self.update_count += 1,
            UpdateOp::DelTriangle => self.update_count = self.update_count.saturating_sub(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh::Mesh;
    use crate::geometry::predicates::Point2;

    fn sample_face() -> FaceId {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(Point2::new(0.0, 0.0), 0.0);
        let b = mesh.add_vertex(Point2::new(1.0, 0.0), 0.0);
        let c = mesh.add_vertex(Point2::new(0.0, 1.0), 0.0);
        let e0 = mesh.add_edge(b, c);
        let e1 = mesh.add_edge(c, a);
        let e2 = mesh.add_edge(a, b);
        mesh.add_triangle([a, b, c], [e0, e1, e2])
    }

    fn snapshot(face: FaceId, error: f64) -> TriangleSnapshot {
        TriangleSnapshot {
            face,
            vertices: [0, 1, 2],
            error,
        }
    }

    #[test]
    fn event_log_preserves_call_order() {
        let mut sink = RecordingSink::new();
        sink.start_history(Direction::Refining);
        sink.mesh_ok();
        sink.end_history();
        assert_eq!(sink.events().len(), 3);
        assert_eq!(sink.events()[0], Event::Start(Direction::Refining));
        assert_eq!(sink.events()[2], Event::End);
    }

    #[test]
    fn terminate_condition_honours_update_count() {
        let mut sink = RecordingSink::new();
        sink.set_terminate_condition(TerminateCondition::UpdateCount(2));
        assert!(!sink.terminate_condition());
        sink.update_error(UpdateOp::AddTriangle, 0.0);
        sink.update_error(UpdateOp::AddTriangle, 0.0);
        assert!(sink.terminate_condition());
    }

    #[test]
    fn norm_tracks_only_live_triangles() {
        let face = sample_face();
        let mut sink = RecordingSink::new();
        sink.make_triangle(snapshot(face, 2.0));
        assert_eq!(sink.norm(Norm::Max), 2.0);
        sink.kill_triangle(snapshot(face, 2.0));
        assert_eq!(sink.norm(Norm::Max), 0.0);
    }
}
