//! A minimal GFA 1 reader that builds an `AssemblyGraph` from the
//! segment (`S`) and link (`L`) records of a file. Every other record
//! type is skipped.

use bstr::{io::BufReadExt, BString, ByteSlice};
use log::{debug, info};

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::{
    error::{LoadError, LoadFieldError, LoadFieldResult, LoadResult},
    graph::{node_name, AssemblyGraph, Strand},
    overlap::overlap_length,
};

/// Read depth given to segments that carry no depth tag.
pub const DEFAULT_READ_DEPTH: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
struct SegmentRecord {
    name: BString,
    sequence: BString,
    read_depth: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct LinkRecord {
    from: BString,
    to: BString,
    overlap: usize,
}

fn next_field<'a, I>(fields: &mut I) -> LoadFieldResult<&'a [u8]>
where
    I: Iterator<Item = &'a [u8]>,
{
    fields.next().ok_or(LoadFieldError::MissingFields)
}

fn parse_num<T: std::str::FromStr>(bytes: &[u8]) -> LoadFieldResult<T> {
    let s = std::str::from_utf8(bytes)?;
    s.parse().map_err(|_| LoadFieldError::ParseFromStringError)
}

/// The value of an optional field `TG:T:value` with the given tag and
/// type, if present.
fn tag_value<'a>(tags: &[&'a [u8]], tag: &[u8], ty: u8) -> Option<&'a [u8]> {
    tags.iter().find_map(|field| {
        let mut parts = field.splitn_str(3, ":");
        let t = parts.next()?;
        let y = parts.next()?;
        let v = parts.next()?;
        if t == tag && y == [ty] {
            Some(v)
        } else {
            None
        }
    })
}

/// Depth from `DP:f`, or from a total count (`KC:i`, `RC:i`, `FC:i`)
/// divided by the segment length.
fn read_depth(tags: &[&[u8]], length: usize) -> LoadFieldResult<f64> {
    if let Some(dp) = tag_value(tags, b"DP", b'f') {
        return parse_num(dp);
    }
    for &tag in [b"KC", b"RC", b"FC"].iter() {
        if let Some(count) = tag_value(tags, tag, b'i') {
            let count: f64 = parse_num::<i64>(count)? as f64;
            return Ok(if length > 0 { count / length as f64 } else { 0.0 });
        }
    }
    Ok(DEFAULT_READ_DEPTH)
}

fn parse_segment<'a, I>(mut fields: I) -> LoadFieldResult<SegmentRecord>
where
    I: Iterator<Item = &'a [u8]>,
{
    let name = next_field(&mut fields)?;
    if name.is_empty() {
        return Err(LoadFieldError::InvalidField("name"));
    }
    let sequence = match next_field(&mut fields)? {
        b"*" => &[][..],
        seq => seq,
    };
    let tags: Vec<&[u8]> = fields.collect();
    let read_depth = read_depth(&tags, sequence.len())?;

    Ok(SegmentRecord {
        name: name.into(),
        sequence: sequence.into(),
        read_depth,
    })
}

fn parse_link<'a, I>(mut fields: I) -> LoadFieldResult<LinkRecord>
where
    I: Iterator<Item = &'a [u8]>,
{
    let from = next_field(&mut fields)?;
    let from_strand = Strand::parse_error(Strand::from_bytes_plus_minus(
        next_field(&mut fields)?,
    ))?;
    let to = next_field(&mut fields)?;
    let to_strand = Strand::parse_error(Strand::from_bytes_plus_minus(
        next_field(&mut fields)?,
    ))?;
    let overlap = overlap_length(next_field(&mut fields)?)
        .ok_or(LoadFieldError::InvalidField("overlap"))?;

    Ok(LinkRecord {
        from: node_name(from, from_strand),
        to: node_name(to, to_strand),
        overlap,
    })
}

/// Builds a graph from GFA lines. Links are added once every segment
/// has been read, so they may come before the segments they connect.
pub fn load_gfa_reader<R: BufRead>(reader: R) -> LoadResult<AssemblyGraph> {
    let mut graph = AssemblyGraph::new();
    let mut links = Vec::new();
    let mut skipped = 0;

    for line in reader.byte_lines() {
        let line = line?;
        let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
        let mut fields = line.split_str("\t");
        match fields.next() {
            Some(b"S") => {
                let seg = parse_segment(fields)
                    .map_err(|err| LoadError::invalid_line(err, line))?;
                let name = node_name(&seg.name, Strand::Forward);
                graph.add_node(name, &seg.sequence, seg.read_depth)?;
            }
            Some(b"L") => {
                let link = parse_link(fields)
                    .map_err(|err| LoadError::invalid_line(err, line))?;
                links.push(link);
            }
            _ => skipped += 1,
        }
    }

    for link in links {
        graph.add_edge(&link.from, &link.to, link.overlap)?;
    }

    debug!("Skipped {} lines that were not segments or links", skipped);
    info!(
        "Loaded {} nodes and {} edges",
        graph.node_count(),
        graph.edge_count()
    );
    Ok(graph)
}

pub fn load_gfa<P: AsRef<Path>>(path: P) -> LoadResult<AssemblyGraph> {
    let path = path.as_ref();
    info!("Loading graph from {}", path.display());
    let file = File::open(path)?;
    load_gfa_reader(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GraphError;
    use std::io::Write;

    const GFA: &str = "H\tVN:Z:1.0
S\t1\tACGTACGT\tDP:f:12.5
S\t2\tCGTTTT\tKC:i:60
S\t3\t*
L\t1\t+\t2\t+\t3M
L\t2\t-\t3\t+\t*
P\tp1\t1+,2+\t*
";

    #[test]
    fn segments_and_links() {
        let graph = load_gfa_reader(GFA.as_bytes()).unwrap();
        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.edge_count(), 4);

        let one = graph.find_node("1+").unwrap();
        let two = graph.find_node("2+").unwrap();
        assert_eq!(graph.node(one).read_depth(), 12.5);
        assert_eq!(graph.node(two).read_depth(), 10.0);
        assert_eq!(graph.node(graph.twin(two)).sequence(), "AAAACG");

        let three = graph.find_node("3+").unwrap();
        assert_eq!(graph.node(three).length(), 0);
        assert_eq!(graph.node(three).read_depth(), DEFAULT_READ_DEPTH);

        let edge = graph.edge_between(one, two).unwrap();
        assert_eq!(graph.edge(edge).overlap(), 3);

        let two_rc = graph.find_node("2-").unwrap();
        let three_rc = graph.find_node("3-").unwrap();
        assert!(graph.edge_between(two_rc, three).is_some());
        assert!(graph.edge_between(three_rc, two).is_some());
        assert!(graph.check_strand_symmetry().is_ok());
    }

    #[test]
    fn links_may_precede_segments() {
        let gfa = "L\t1\t+\t2\t+\t0M\nS\t1\tAC\nS\t2\tGT\n";
        let graph = load_gfa_reader(gfa.as_bytes()).unwrap();
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn invalid_lines() {
        let bad_orient = "S\t1\tAC\nS\t2\tGT\nL\t1\t+\t2\tx\t0M\n";
        match load_gfa_reader(bad_orient.as_bytes()) {
            Err(LoadError::InvalidLine(
                LoadFieldError::OrientationError,
                line,
            )) => assert_eq!(line, "L\t1\t+\t2\tx\t0M"),
            other => panic!(
                "unexpected result: {:?}",
                other.map(|g| g.node_count())
            ),
        }

        let bad_overlap = "S\t1\tAC\nS\t2\tGT\nL\t1\t+\t2\t+\t5Q\n";
        assert!(matches!(
            load_gfa_reader(bad_overlap.as_bytes()),
            Err(LoadError::InvalidLine(
                LoadFieldError::InvalidField("overlap"),
                _
            ))
        ));

        let missing = "S\t1\n";
        assert!(matches!(
            load_gfa_reader(missing.as_bytes()),
            Err(LoadError::InvalidLine(LoadFieldError::MissingFields, _))
        ));
    }

    #[test]
    fn unknown_segments_in_links() {
        let gfa = "S\t1\tAC\nL\t1\t+\t7\t+\t0M\n";
        match load_gfa_reader(gfa.as_bytes()) {
            Err(LoadError::Graph(GraphError::UnknownNode(name))) => {
                assert_eq!(name, "7+")
            }
            other => panic!(
                "unexpected result: {:?}",
                other.map(|g| g.node_count())
            ),
        }
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GFA.as_bytes()).unwrap();
        let graph = load_gfa(file.path()).unwrap();
        assert_eq!(graph.node_count(), 6);

        assert!(matches!(
            load_gfa("/nonexistent/graph.gfa"),
            Err(LoadError::IOError(_))
        ));
    }
}
