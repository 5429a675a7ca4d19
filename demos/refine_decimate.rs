//! Demonstration program: builds a point grid, runs refinement with an
//! in-memory recording sink, then decimates part of it back down,
//! printing a one-line summary of each phase.

use delaunay_mt::context::Context;
use delaunay_mt::drivers::decimation::{self, DecimationStrategy};
use delaunay_mt::drivers::refinement::{self, RefinementStrategy};
use delaunay_mt::drivers::termination::TerminationPolicy;
use delaunay_mt::error_metrics::PendingPoint;
use delaunay_mt::geometry::mesh::Mesh;
use delaunay_mt::geometry::predicates::Point2;
use delaunay_mt::history::recording::RecordingSink;
use delaunay_mt::kernel::removal::RemovalOptions;

fn main() {
    let points = grid(8);
    let mut mesh = Mesh::new();
    let mut sink = RecordingSink::new();
    let mut ctx = Context::with_seed(7);

    let refine_report = refinement::run(
        &mut mesh,
        &points,
        &mut sink,
        &mut ctx,
        RefinementStrategy::Error,
        &TerminationPolicy::NoTerm,
    )
    .expect("grid points are not all collinear");

    println!(
        "refine: inserted {}, skipped {}, mesh now has {} vertices / {} triangles",
        refine_report.inserted,
        refine_report.skipped,
        mesh.vertex_count(),
        mesh.triangle_count()
    );

    let options = RemovalOptions {
        kdegree: 8,
        allow_features_del: false,
        allow_chain_break: false,
        ext_active: true,
    };
    let decimate_report = decimation::run(
        &mut mesh,
        &points,
        &mut sink,
        &mut ctx,
        DecimationStrategy::ErrorApprox,
        &options,
        &TerminationPolicy::UpdateCount { limit: 10 },
    );

    println!(
        "decimate: removed {}, skipped {}, mesh now has {} vertices / {} triangles",
        decimate_report.removed,
        decimate_report.skipped,
        mesh.vertex_count(),
        mesh.triangle_count()
    );
}

fn grid(n: i64) -> Vec<PendingPoint> {
    let mut points = Vec::new();
    for i in 0..n {
        for j in 0..n {
            let (x, y) = (i as f64, j as f64);
            let n = n as f64;
            let z = (x / n).sin() * (y / n).cos();
            points.push(PendingPoint { point: Point2::new(x, y), z });
        }
    }
    points
}
