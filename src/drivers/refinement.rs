//! Refinement driver (C9): bootstrap the hull, then repeatedly insert the
//! next candidate point until a termination policy fires.

use crate::context::Context;
use crate::error_metrics::{PendingPoint, bucket_head};
use crate::errors::MeshError;
use crate::geometry::mesh::Mesh;
use crate::history::sink::{Direction, HistorySink};

use super::candidate::RefinementCandidates;
use super::termination::TerminationPolicy;
use crate::kernel::delaunay::insert_vertex;
use crate::kernel::hull::bootstrap;

/// Which candidate-selection strategy drives refinement (§4.9).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefinementStrategy {
    /// Random permutation of non-hull points.
    Random,
    /// Largest-head-error point first.
    Error,
}

/// Summary of one refinement run, for callers that want counts without
/// re-walking the mesh.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefinementReport {
    /// Points successfully promoted to vertices.
    pub inserted: u64,
    /// Points skipped (duplicate or, in principle, outside the hull).
    pub skipped: u64,
}

/// Runs the refinement driver: bootstraps the hull from `points`, then
/// inserts candidates one at a time until `policy` fires.
///
/// # Errors
/// Returns [`MeshError::AllPointsCollinear`] if hull bootstrap fails.
pub fn run(
    mesh: &mut Mesh,
    points: &[PendingPoint],
    sink: &mut dyn HistorySink,
    ctx: &mut Context,
    strategy: RefinementStrategy,
    policy: &TerminationPolicy,
) -> Result<RefinementReport, MeshError> {
    sink.start_history(Direction::Refining);
    let hull = bootstrap(mesh, sink, ctx.epsilon, points)?;

    let non_hull: Vec<usize> = (0..points.len()).filter(|i| !hull.contains(i)).collect();
    let mut candidates = match strategy {
        RefinementStrategy::Random => RefinementCandidates::random(non_hull, &mut ctx.rng),
        RefinementStrategy::Error => RefinementCandidates::error(mesh, points, &non_hull),
    };

    let mut report = RefinementReport::default();
    loop {
        let head_errors = live_head_errors(mesh, points);
        if candidates.is_empty() || policy.should_stop(report.inserted, &head_errors) {
            break;
        }
        let Some(pid) = candidates.next() else { break };
        let p = points[pid];
        match insert_vertex(mesh, points, sink, ctx.epsilon, p.point, p.z) {
            Ok((_, touched)) => {
                report.inserted += 1;
                candidates.requeue(mesh, points, &touched);
            }
            Err(_) => report.skipped += 1,
        }
    }

    sink.end_history();
    Ok(report)
}

fn live_head_errors(mesh: &Mesh, points: &[PendingPoint]) -> Vec<f64> {
    mesh.triangles()
        .filter_map(|(face, _)| bucket_head(mesh, face, points).map(|(_, e)| e))
        .collect()
}
