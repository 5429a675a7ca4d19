#![allow(clippy::multiple_crate_versions)]
#![warn(missing_docs)]

//! Incremental planar Delaunay / constrained-Delaunay mesh kernel with a
//! multi-tessellation (MT) history sink.
//!
//! This library maintains a 2D Delaunay or constrained-Delaunay
//! triangulation under two kinds of update sequence:
//!
//! - refinement: incremental point insertion (§4.9), driven by a
//!   candidate-selection strategy and a termination policy
//! - decimation: feature-protected vertex removal via ear-clipping
//!   retriangulation (§4.10), likewise driven and terminated
//!
//! Every local remeshing step — triangles killed, triangles made, the
//! checkpoint that follows — is reported to a [`history::sink::HistorySink`]
//! so an external multi-tessellation history can be built without owning
//! any triangulation logic itself.
//!
//! # Example
//!
//! ```rust,no_run
//! use delaunay_mt::context::Context;
//! use delaunay_mt::error_metrics::PendingPoint;
//! use delaunay_mt::geometry::mesh::Mesh;
//! use delaunay_mt::history::recording::RecordingSink;
//! use delaunay_mt::drivers::{refinement, termination::TerminationPolicy};
//!
//! let points: Vec<PendingPoint> = vec![];
//! let mut mesh = Mesh::new();
//! let mut sink = RecordingSink::new();
//! let mut ctx = Context::with_seed(1);
//! let _ = refinement::run(
//!     &mut mesh,
//!     &points,
//!     &mut sink,
//!     &mut ctx,
//!     refinement::RefinementStrategy::Random,
//!     &TerminationPolicy::NoTerm,
//! );
//! ```

/// CLI configuration: the `refine`/`decimate` subcommand grammar (§6).
pub mod config;

/// Per-run context: geometric tolerance and the seeded RNG.
pub mod context;

/// Error types for the triangulation kernel and drivers.
pub mod errors;

/// Approximation-error bookkeeping: pending points, head errors, norms.
pub mod error_metrics;

/// Text I/O helpers sufficient to exercise the library from the CLI.
pub mod util;

/// Mesh representation and the geometric predicates it is built on.
pub mod geometry {
    /// Generation-checked index arena backing the mesh store.
    mod arena;
    /// Geolocation of a point within an existing triangulation.
    pub mod location;
    /// The mesh data structure: vertices, edges, triangles, buckets.
    pub mod mesh;
    /// Orientation, in-circle, and segment-intersection predicates.
    pub mod predicates;
}

/// The MT history interface (C11) and a simple in-memory recorder.
pub mod history {
    /// An in-memory [`HistorySink`](sink::HistorySink) that records events,
    /// used by tests and the CLI's default run mode.
    pub mod recording;
    /// The `HistorySink` trait and its supporting event types.
    pub mod sink;
}

/// The triangulation kernel: point location, insertion, hull bootstrap,
/// constrained edges, and feature-protected vertex removal.
pub mod kernel {
    /// Constrained-Delaunay specific operations (segment insertion,
    /// encroachment, feature-point classification).
    pub mod cdt;
    /// Incremental Delaunay point insertion (C4).
    pub mod delaunay;
    /// Convex-hull bootstrap triangulation (C5).
    pub mod hull;
    /// Feature-protected vertex removal via ear-clipping (C7).
    pub mod removal;
    /// Shared helpers used by more than one kernel module.
    mod support;
}

/// The refinement (C9) and decimation (C10) driver loops, and the
/// candidate-selection and termination policies they share.
pub mod drivers {
    /// Candidate-point selection strategies for refinement.
    pub mod candidate;
    /// The decimation driver loop.
    pub mod decimation;
    /// The refinement driver loop.
    pub mod refinement;
    /// Shared termination policy for both drivers.
    pub mod termination;
}

pub use config::{Cli, Command};
pub use context::Context;
pub use errors::{MeshError, MeshResult, SkipReason};
