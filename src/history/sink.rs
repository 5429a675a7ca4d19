//! MT history interface (C11): the trait surface the kernel calls into to
//! report topology changes. The history library itself — and any real
//! file- or network-backed implementation — is an external collaborator
//! out of scope here (§1); this module specifies only the calling
//! contract, mirroring the split the teacher draws between its
//! `TriangulationQuery`/`TriangulationMut` trait surface and the concrete
//! backends that implement it.

use crate::geometry::mesh::FaceId;

/// Direction of the update sequence a [`HistorySink`] is about to receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Points are being inserted (refinement).
    Refining,
    /// Vertices are being removed (decimation).
    Coarsening,
}

/// Global error norm, selecting how per-triangle head errors are combined.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Norm {
    /// Maximum head error across all live triangles.
    Max,
    /// Mean head error.
    Med,
    /// Root-mean-square head error.
    Sqm,
}

/// The condition under which a driver should stop issuing updates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TerminateCondition {
    /// No externally imposed termination; the driver's own predicate governs.
    None,
    /// Stop once the update count reaches this value (`TERM_NUPD`).
    UpdateCount(u64),
    /// Stop once the named global norm crosses `level` (`TERM_ERR`).
    ErrorLevel {
        /// Which global norm to evaluate.
        norm: Norm,
        /// Threshold the norm must cross to trigger termination.
        level: f64,
    },
}

/// Which direction an `UpdateError` call is adjusting the running norm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateOp {
    /// A triangle was added (`ADDTRG`).
    AddTriangle,
    /// A triangle was killed (`DELTRG`).
    DelTriangle,
}

/// A triangle as reported to the sink: identified by its three stable
/// vertex identifiers (not the reusable mesh handle, which may already be
/// gone by the time the sink inspects it) plus its representative
/// (head-bucket) error.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriangleSnapshot {
    /// The mesh handle at the time of the call, informational only.
    pub face: FaceId,
    /// Stable vertex identifiers, in CCW order.
    pub vertices: [u64; 3],
    /// Head-of-bucket approximation error at the time of the call.
    pub error: f64,
}

/// The event interface the kernel invokes on an external multi-tessellation
/// history sink (C11).
///
/// Ordering contract: between consecutive [`HistorySink::mesh_ok`] calls,
/// the set of `kill_triangle` calls followed by `make_triangle` calls
/// describes one atomic local remeshing step; implementations must not
/// assume anything about mesh consistency until `mesh_ok` fires, and the
/// kernel must never re-enter the mesh from within a sink call.
pub trait HistorySink {
    /// Begins a new history in the given direction.
    fn start_history(&mut self, direction: Direction);

    /// Reports a newly created triangle.
    fn make_triangle(&mut self, triangle: TriangleSnapshot);

    /// Reports a triangle about to be destroyed.
    fn kill_triangle(&mut self, triangle: TriangleSnapshot);

    /// Checkpoint: the delta since the last checkpoint is now consistent.
    fn mesh_ok(&mut self);

    /// Ends the history.
    fn end_history(&mut self);

    /// Installs (or clears) an externally imposed termination condition.
    fn set_terminate_condition(&mut self, condition: TerminateCondition);

    /// True if the installed termination condition currently holds.
    fn terminate_condition(&self) -> bool;

    /// Adjusts the running global-norm accounting for one triangle.
    fn update_error(&mut self, op: UpdateOp, triangle_error: f64);
}
