//! Error types for the triangulation kernel and drivers.

use thiserror::Error;

/// Fatal error conditions for the triangulation kernel.
///
/// Recoverable situations (duplicate point, infeasible vertex removal, a
/// point landing outside the hull) are reported as [`SkipReason`] instead
/// and handled by the driver loop without aborting the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MeshError {
    /// The input point file or segment list violated the documented format.
    #[error("input format violation: {0}")]
    InputFormat(String),
    /// All input points are collinear; no hull can be bootstrapped.
    #[error("all input points are collinear; cannot bootstrap a hull")]
    AllPointsCollinear,
    /// A constraint segment could not be inserted (its endpoints are
    /// collinear with an intermediate existing vertex).
    #[error("cannot insert constraint segment ({u}, {v}): endpoints are collinear with an intermediate vertex")]
    ConstraintInsertionImpossible {
        /// Index of the segment's first endpoint.
        u: usize,
        /// Index of the segment's second endpoint.
        v: usize,
    },
    /// An internal invariant (§8 universal invariants) failed a
    /// `debug_assertions`-gated check after a mesh mutation.
    #[error("internal invariant violated: {0}")]
    InvariantViolation(String),
    /// The CLI option string did not match the grammar in §6.
    #[error("invalid option string: {0}")]
    InvalidOptions(String),
}

/// Result type for fallible kernel operations.
pub type MeshResult<T> = Result<T, MeshError>;

/// Why a single driver-level operation (point insertion, vertex removal)
/// was skipped rather than applied, per §7's non-fatal recoveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    /// The point's `(x, y)` coordinates duplicate an existing vertex.
    #[error("duplicate point")]
    DuplicatePoint,
    /// The point lies outside the convex hull.
    #[error("point outside convex hull")]
    OutsideHull,
    /// Vertex has more incident triangles than the configured degree cap.
    #[error("vertex degree exceeds kdegree")]
    DegreeCapExceeded,
    /// Vertex is a single-constraint feature and `ALLOWFeaturesDel` is off.
    #[error("vertex is a protected feature")]
    ProtectedFeature,
    /// Vertex closes a constraint chain and `ALLOWChainBrk` is off.
    #[error("removal would break a protected constraint chain")]
    ProtectedChain,
    /// Ear-clipping found no legal diagonal for the vertex's star polygon.
    #[error("no legal retriangulation of the vertex star")]
    NoLegalRetriangulation,
}
