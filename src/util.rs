//! Minimal text I/O (§6): whitespace-separated readers/writer just
//! sufficient to exercise the library end to end from the CLI binary and
//! integration tests. Full format readers/writers are out of scope (§1);
//! this module owns only enough parsing to turn a point file into
//! `Vec<PendingPoint>` and a mesh back into the three output sections.

use std::io::{self, BufRead, Write};

use crate::error_metrics::PendingPoint;
use crate::geometry::mesh::Mesh;
use crate::geometry::predicates::Point2;

/// Reads a point file: an integer `N`, then `N` lines of `x y z`.
/// Duplicate `(x, y)` pairs are skipped with a warning rather than
/// rejected, matching the grammar's "rejected with a warning and
/// skipped".
///
/// # Errors
/// Returns an I/O error on a malformed line or a read failure.
pub fn read_points<R: BufRead>(mut reader: R) -> io::Result<Vec<PendingPoint>> {
    let n: usize = read_count_line(&mut reader, "missing point count", "point count is not an integer")?;

    let mut points = Vec::with_capacity(n);
    let mut seen = std::collections::HashSet::new();
    for _ in 0..n {
        let line = read_required_line(&mut reader, "fewer point lines than declared")?;
        let mut fields = line.split_whitespace();
        let (Some(x), Some(y), Some(z)) = (fields.next(), fields.next(), fields.next()) else {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "expected three fields per point line"));
        };
        let parse = |s: &str| s.parse::<f64>().map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "expected a float"));
        let (x, y, z) = (parse(x)?, parse(y)?, parse(z)?);

        let key = (x.to_bits(), y.to_bits());
        if !seen.insert(key) {
            log::warn!("duplicate point ({x}, {y}) skipped");
            continue;
        }
        points.push(PendingPoint { point: Point2::new(x, y), z });
    }
    Ok(points)
}

/// Reads a constrained-input file's trailing segment list: an integer
/// `M`, then `M` lines of `i j` (0-based point indices).
///
/// # Errors
/// Returns an I/O error on a malformed line or a read failure.
pub fn read_segments<R: BufRead>(mut reader: R) -> io::Result<Vec<(usize, usize)>> {
    let m: usize = read_count_line(&mut reader, "missing segment count", "segment count is not an integer")?;

    let mut segments = Vec::with_capacity(m);
    for _ in 0..m {
        let line = read_required_line(&mut reader, "fewer segment lines than declared")?;
        let mut fields = line.split_whitespace();
        let (Some(i), Some(j)) = (fields.next(), fields.next()) else {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "expected two fields per segment line"));
        };
        let parse = |s: &str| s.parse::<usize>().map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "expected an index"));
        segments.push((parse(i)?, parse(j)?));
    }
    Ok(segments)
}

fn read_required_line<R: BufRead>(reader: &mut R, eof_msg: &'static str) -> io::Result<String> {
    let mut buf = String::new();
    let read = reader.read_line(&mut buf)?;
    if read == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, eof_msg));
    }
    Ok(buf)
}

fn read_count_line<R: BufRead>(reader: &mut R, eof_msg: &'static str, parse_msg: &'static str) -> io::Result<usize> {
    let line = read_required_line(reader, eof_msg)?;
    line.trim().parse().map_err(|_| io::Error::new(io::ErrorKind::InvalidData, parse_msg))
}

/// Maps each input point's index back to the live vertex at the same
/// `(x, y)` position, for resolving a constrained-input file's segment
/// indices (§6) once the points behind them have been promoted to
/// vertices by C5/C9.
#[must_use]
pub fn vertex_lookup(
    mesh: &Mesh,
    points: &[PendingPoint],
) -> std::collections::HashMap<usize, crate::geometry::mesh::VertexId> {
    let by_position: std::collections::HashMap<(u64, u64), crate::geometry::mesh::VertexId> = mesh
        .vertices()
        .map(|(id, v)| ((v.point.x.to_bits(), v.point.y.to_bits()), id))
        .collect();

    points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| by_position.get(&(p.point.x.to_bits(), p.point.y.to_bits())).map(|&id| (i, id)))
        .collect()
}

/// Writes the triangulation output format (§6): vertex count and lines,
/// triangle count and 0-based index triples, edge count and `i j
/// constraint_flag` lines.
///
/// # Errors
/// Returns an I/O error if the writer fails.
pub fn write_mesh<W: Write>(mut writer: W, mesh: &Mesh) -> io::Result<()> {
    let mut index_of = std::collections::HashMap::new();
    let vertices: Vec<_> = mesh.vertices().collect();
    for (i, (id, _)) in vertices.iter().enumerate() {
        index_of.insert(*id, i);
    }

    writeln!(writer, "{}", vertices.len())?;
    for (_, v) in &vertices {
        writeln!(writer, "{} {} {}", v.point.x, v.point.y, v.z)?;
    }

    let triangles: Vec<_> = mesh.triangles().collect();
    writeln!(writer, "{}", triangles.len())?;
    for (_, t) in &triangles {
        let [a, b, c] = t.vertices.map(|v| index_of[&v]);
        writeln!(writer, "{a} {b} {c}")?;
    }

    let edges: Vec<_> = mesh.edges().collect();
    writeln!(writer, "{}", edges.len())?;
    for (_, e) in &edges {
        let flag = u8::from(e.flags.contains(crate::geometry::mesh::Flags::CONSTRAINT));
        writeln!(writer, "{} {} {flag}", index_of[&e.v0], index_of[&e.v1])?;
    }
    Ok(())
}
