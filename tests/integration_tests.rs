//! Library-level integration tests: full refine/decimate round trips,
//! universal invariants (§8), and boundary behaviours (§10.4).

use delaunay_mt::context::Context;
use delaunay_mt::drivers::decimation::{self, DecimationStrategy};
use delaunay_mt::drivers::refinement::{self, RefinementStrategy};
use delaunay_mt::drivers::termination::TerminationPolicy;
use delaunay_mt::error_metrics::PendingPoint;
use delaunay_mt::errors::SkipReason;
use delaunay_mt::geometry::mesh::{Flags, Mesh};
use delaunay_mt::geometry::predicates::Point2;
use delaunay_mt::history::recording::RecordingSink;
use delaunay_mt::kernel::cdt::insert_constraint;
use delaunay_mt::kernel::removal::{RemovalOptions, remove_vertex};
use delaunay_mt::util::vertex_lookup;

fn grid_points(n: i64) -> Vec<PendingPoint> {
    let mut points = Vec::new();
    for i in 0..n {
        for j in 0..n {
            points.push(PendingPoint {
                point: Point2::new(i as f64, j as f64),
                z: ((i * 7 + j * 13) % 5) as f64,
            });
        }
    }
    points
}

fn no_options() -> RemovalOptions {
    RemovalOptions {
        kdegree: 0,
        allow_features_del: false,
        allow_chain_break: false,
        ext_active: false,
    }
}

/// Universal invariants (§8): vertex/edge/face counts satisfy Euler's
/// formula for a single bounded triangulation, and no triangle degenerates
/// to a repeated vertex.
fn validate(mesh: &Mesh) {
    let v = mesh.vertex_count() as i64;
    let e = mesh.edges().count() as i64;
    let f = mesh.triangles().count() as i64;
    assert!(v - e + f == 1, "Euler's formula should hold for a single bounded triangulation, got V={v} E={e} F={f}");

    for (_, triangle) in mesh.triangles() {
        let [a, b, c] = triangle.vertices;
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }
}

#[test]
fn refine_then_decimate_round_trip_preserves_invariants() {
    let points = grid_points(6);
    let mut mesh = Mesh::new();
    let mut sink = RecordingSink::new();
    let mut ctx = Context::with_seed(11);

    let refine_report =
        refinement::run(&mut mesh, &points, &mut sink, &mut ctx, RefinementStrategy::Random, &TerminationPolicy::NoTerm)
            .unwrap();
    assert_eq!(refine_report.inserted + refine_report.skipped, (points.len() - 4) as u64);
    validate(&mesh);

    let before = mesh.vertex_count();
    let decimate_report = decimation::run(
        &mut mesh,
        &points,
        &mut sink,
        &mut ctx,
        DecimationStrategy::Random,
        &no_options(),
        &TerminationPolicy::UpdateCount { limit: 5 },
    );
    assert_eq!(decimate_report.removed, 5);
    assert_eq!(mesh.vertex_count(), before - 5);
    validate(&mesh);
}

#[test]
fn error_driven_refinement_inserts_every_non_hull_point() {
    let points = grid_points(6);
    let mut mesh = Mesh::new();
    let mut sink = RecordingSink::new();
    let mut ctx = Context::with_seed(5);

    refinement::run(
        &mut mesh,
        &points,
        &mut sink,
        &mut ctx,
        RefinementStrategy::Error,
        &TerminationPolicy::UpdateCount { limit: (points.len() - 4) as u64 },
    )
    .unwrap();

    validate(&mesh);
    assert_eq!(mesh.vertex_count(), points.len());
}

fn hull_vertices(mesh: &Mesh) -> std::collections::HashSet<delaunay_mt::geometry::mesh::VertexId> {
    mesh.edges()
        .filter(|(_, e)| e.triangles[0].is_none() || e.triangles[1].is_none())
        .flat_map(|(_, e)| [e.v0, e.v1])
        .collect()
}

#[test]
fn decimation_never_removes_the_original_hull_vertices() {
    let points = grid_points(5);
    let mut mesh = Mesh::new();
    let mut sink = RecordingSink::new();
    let mut ctx = Context::with_seed(9);

    refinement::run(&mut mesh, &points, &mut sink, &mut ctx, RefinementStrategy::Random, &TerminationPolicy::NoTerm)
        .unwrap();
    let hull_before = hull_vertices(&mesh);

    decimation::run(&mut mesh, &points, &mut sink, &mut ctx, DecimationStrategy::Random, &no_options(), &TerminationPolicy::NoTerm);

    for v in &hull_before {
        assert!(mesh.vertex(*v).is_some(), "hull vertex must survive decimation");
    }
    validate(&mesh);
}

#[test]
fn degree_capped_decimation_skips_high_valence_vertices() {
    let points = grid_points(6);
    let mut mesh = Mesh::new();
    let mut sink = RecordingSink::new();
    let mut ctx = Context::with_seed(21);

    refinement::run(&mut mesh, &points, &mut sink, &mut ctx, RefinementStrategy::Random, &TerminationPolicy::NoTerm)
        .unwrap();

    let capped = RemovalOptions { kdegree: 3, ..no_options() };
    let report =
        decimation::run(&mut mesh, &points, &mut sink, &mut ctx, DecimationStrategy::Random, &capped, &TerminationPolicy::NoTerm);

    assert!(report.removed + report.skipped > 0);
    validate(&mesh);
}

#[test]
fn error_exact_decimation_respects_an_update_count_limit() {
    let points = grid_points(6);
    let mut mesh = Mesh::new();
    let mut sink = RecordingSink::new();
    let mut ctx = Context::with_seed(33);

    refinement::run(&mut mesh, &points, &mut sink, &mut ctx, RefinementStrategy::Random, &TerminationPolicy::NoTerm)
        .unwrap();

    let report = decimation::run(
        &mut mesh,
        &points,
        &mut sink,
        &mut ctx,
        DecimationStrategy::ErrorExact,
        &no_options(),
        &TerminationPolicy::UpdateCount { limit: 2 },
    );
    assert_eq!(report.removed, 2);
    validate(&mesh);
}

#[test]
fn seeded_runs_are_reproducible() {
    let points = grid_points(5);

    let mut mesh_a = Mesh::new();
    let mut sink_a = RecordingSink::new();
    let mut ctx_a = Context::with_seed(99);
    refinement::run(&mut mesh_a, &points, &mut sink_a, &mut ctx_a, RefinementStrategy::Random, &TerminationPolicy::NoTerm)
        .unwrap();

    let mut mesh_b = Mesh::new();
    let mut sink_b = RecordingSink::new();
    let mut ctx_b = Context::with_seed(99);
    refinement::run(&mut mesh_b, &points, &mut sink_b, &mut ctx_b, RefinementStrategy::Random, &TerminationPolicy::NoTerm)
        .unwrap();

    assert_eq!(mesh_a.vertex_count(), mesh_b.vertex_count());
    assert_eq!(mesh_a.triangles().count(), mesh_b.triangles().count());
}

fn square_with_centre() -> Vec<PendingPoint> {
    vec![
        PendingPoint { point: Point2::new(0.0, 0.0), z: 0.0 },
        PendingPoint { point: Point2::new(10.0, 0.0), z: 0.0 },
        PendingPoint { point: Point2::new(10.0, 10.0), z: 0.0 },
        PendingPoint { point: Point2::new(0.0, 10.0), z: 0.0 },
        PendingPoint { point: Point2::new(5.0, 5.0), z: 0.0 },
    ]
}

/// A forced constraint segment must appear as a `CONSTRAINT`-flagged edge
/// even when the empty-circle criterion would prefer a different diagonal
/// across the quadrilateral it cuts.
#[test]
fn constraint_insertion_forces_its_diagonal_into_the_mesh() {
    let points = square_with_centre();
    let mut mesh = Mesh::new();
    let mut sink = RecordingSink::new();
    let mut ctx = Context::with_seed(3);

    refinement::run(&mut mesh, &points, &mut sink, &mut ctx, RefinementStrategy::Random, &TerminationPolicy::NoTerm)
        .unwrap();

    let lookup = vertex_lookup(&mesh, &points);
    let (corner, centre) = (lookup[&0], lookup[&4]);
    insert_constraint(&mut mesh, &points, &mut sink, ctx.epsilon, corner, centre).unwrap();

    let constrained = mesh
        .edges()
        .any(|(_, e)| (e.v0 == corner && e.v1 == centre || e.v0 == centre && e.v1 == corner) && e.flags.contains(Flags::CONSTRAINT));
    assert!(constrained, "forced segment must be present and flagged CONSTRAINT");
    validate(&mesh);
}

/// A vertex with exactly one incident constraint is a protected feature:
/// removal must refuse unless `allow_features_del` is set, in which case
/// it succeeds and the constraint disappears with it.
#[test]
fn feature_protection_gates_removal_of_a_single_constraint_vertex() {
    let points = square_with_centre();
    let mut mesh = Mesh::new();
    let mut sink = RecordingSink::new();
    let mut ctx = Context::with_seed(3);

    refinement::run(&mut mesh, &points, &mut sink, &mut ctx, RefinementStrategy::Random, &TerminationPolicy::NoTerm)
        .unwrap();
    let lookup = vertex_lookup(&mesh, &points);
    let (corner, centre) = (lookup[&0], lookup[&4]);
    insert_constraint(&mut mesh, &points, &mut sink, ctx.epsilon, corner, centre).unwrap();

    let protected = RemovalOptions { kdegree: 0, allow_features_del: false, allow_chain_break: false, ext_active: false };
    assert_eq!(remove_vertex(&mut mesh, &points, &mut sink, ctx.epsilon, centre, &protected), Err(SkipReason::ProtectedFeature));
    assert!(mesh.vertex(centre).is_some());

    let permitted = RemovalOptions { allow_features_del: true, ..protected };
    remove_vertex(&mut mesh, &points, &mut sink, ctx.epsilon, centre, &permitted).unwrap();
    assert!(mesh.vertex(centre).is_none());
    validate(&mesh);
}
