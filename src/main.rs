//! Mesh refinement/decimation CLI.
//!
//! Dispatches to the refinement or decimation driver per the subcommand
//! grammar in `config.rs` (§6), reading a point file and writing the
//! resulting mesh back out.

use std::fs::File;
use std::io::{BufReader, BufWriter};

use delaunay_mt::config::{Cli, Command};
use delaunay_mt::context::Context;
use delaunay_mt::drivers::termination::{ErrorDirection, TerminationPolicy};
use delaunay_mt::drivers::{decimation, refinement};
use delaunay_mt::errors::MeshError;
use delaunay_mt::error_metrics::PendingPoint;
use delaunay_mt::geometry::mesh::Mesh;
use delaunay_mt::history::recording::RecordingSink;
use delaunay_mt::history::sink::HistorySink;
use delaunay_mt::kernel::cdt::insert_constraint;
use delaunay_mt::util::{read_points, read_segments, vertex_lookup, write_mesh};

fn main() {
    env_logger::init();

    let cli = Cli::from_args();
    match run(&cli) {
        Ok(()) => {
            log::info!("run completed successfully");
        }
        Err(err) => {
            log::error!("run failed: {err}");
            std::process::exit(-1);
        }
    }
}

fn run(cli: &Cli) -> Result<(), MeshError> {
    match &cli.command {
        Command::Refine(args) => {
            let (points, segments) = read_input(&args.infile)?;
            let mut ctx = args.seed.map_or_else(Context::from_entropy, Context::with_seed);
            let policy = args.termination_policy(ErrorDirection::Falling)?;

            let mut mesh = Mesh::new();
            let mut sink = RecordingSink::new();
            let report = refinement::run(&mut mesh, &points, &mut sink, &mut ctx, args.refinement_strategy(), &policy)?;
            log::info!("refinement inserted {} points, skipped {}", report.inserted, report.skipped);
            apply_constraints(&mut mesh, &points, &mut sink, ctx.epsilon, &segments);

            write_mesh(create(&args.outfile)?, &mesh).map_err(|e| MeshError::InputFormat(e.to_string()))
        }
        Command::Decimate(args) => {
            let (points, segments) = read_input(&args.common.infile)?;
            let mut ctx = args.common.seed.map_or_else(Context::from_entropy, Context::with_seed);
            let policy = args.common.termination_policy(ErrorDirection::Rising)?;

            let mut mesh = Mesh::new();
            let mut sink = RecordingSink::new();
            refinement::run(&mut mesh, &points, &mut sink, &mut ctx, refinement::RefinementStrategy::Random, &TerminationPolicy::NoTerm)?;
            apply_constraints(&mut mesh, &points, &mut sink, ctx.epsilon, &segments);

            let options = args.removal_options();
            let report = decimation::run(&mut mesh, &points, &mut sink, &mut ctx, args.decimation_strategy(), &options, &policy);
            log::info!("decimation removed {} vertices, skipped {}", report.removed, report.skipped);

            write_mesh(create(&args.common.outfile)?, &mesh).map_err(|e| MeshError::InputFormat(e.to_string()))
        }
    }
}

/// Reads the point section of `path`, then, if present, its trailing
/// constrained-input segment list (§6). A missing segment section (the
/// common case — an unconstrained point file) is not an error.
fn read_input(path: &str) -> Result<(Vec<PendingPoint>, Vec<(usize, usize)>), MeshError> {
    let mut reader = open(path)?;
    let points = read_points(&mut reader).map_err(|e| MeshError::InputFormat(e.to_string()))?;
    let segments = match read_segments(&mut reader) {
        Ok(segments) => segments,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Vec::new(),
        Err(e) => return Err(MeshError::InputFormat(e.to_string())),
    };
    Ok((points, segments))
}

/// Forces each `(i, j)` point-index pair into the mesh as a constraint
/// edge (C6). An endpoint not yet promoted to a vertex (the termination
/// policy stopped refinement before reaching it) is skipped with a
/// warning rather than treated as fatal.
fn apply_constraints(
    mesh: &mut Mesh,
    points: &[PendingPoint],
    sink: &mut dyn HistorySink,
    eps: f64,
    segments: &[(usize, usize)],
) {
    if segments.is_empty() {
        return;
    }
    let lookup = vertex_lookup(mesh, points);
    for &(i, j) in segments {
        let (Some(&u), Some(&v)) = (lookup.get(&i), lookup.get(&j)) else {
            log::warn!("constraint segment ({i}, {j}) references a point never promoted to a vertex; skipped");
            continue;
        };
        if let Err(err) = insert_constraint(mesh, points, sink, eps, u, v) {
            log::warn!("constraint segment ({i}, {j}) could not be inserted: {err}");
        }
    }
}

fn open(path: &str) -> Result<BufReader<File>, MeshError> {
    File::open(path).map(BufReader::new).map_err(|e| MeshError::InputFormat(format!("cannot open {path}: {e}")))
}

fn create(path: &str) -> Result<BufWriter<File>, MeshError> {
    File::create(path).map(BufWriter::new).map_err(|e| MeshError::InputFormat(format!("cannot create {path}: {e}")))
}
