//! Reconstruction of a single unambiguous path through an unordered
//! set of nodes.
//!
//! A node set forms a path if the subgraph it induces is a simple
//! chain (linear) or a simple cycle (circular). Anything else,
//! including a set that is disconnected or branches, has no
//! unambiguous path and gives the empty path.

use bstr::{BStr, BString, ByteSlice};
use fnv::{FnvHashMap, FnvHashSet};
use log::debug;

use std::cmp::Reverse;
use std::collections::BTreeSet;

use crate::{
    cancel::CancelToken,
    graph::{AssemblyGraph, EdgeId, NodeId},
    sequence::{fasta_string, trim_overlap},
};

/// An ordered walk through the graph with its assembled sequence.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    nodes: Vec<NodeId>,
    names: Vec<BString>,
    edges: Vec<EdgeId>,
    circular: bool,
    sequence: BString,
}

impl Path {
    /// The value returned when a node set has no unambiguous path.
    pub fn empty() -> Self {
        Default::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn is_circular(&self) -> bool {
        self.circular
    }

    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// The edges between consecutive nodes. Circular paths also
    /// include the edge from the last node back to the first.
    pub fn edges(&self) -> &[EdgeId] {
        &self.edges
    }

    /// The path sequence, with each edge's overlap included once.
    pub fn sequence(&self) -> &BStr {
        self.sequence.as_bstr()
    }

    /// Length of the path sequence.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn fasta(&self, name: &str) -> String {
        fasta_string(name, &self.sequence)
    }

    fn from_walk(
        graph: &AssemblyGraph,
        nodes: Vec<NodeId>,
        edges: Vec<EdgeId>,
        circular: bool,
    ) -> Self {
        let mut sequence = BString::from(Vec::new());

        if let Some(&first) = nodes.first() {
            let first_seq = graph.node(first).sequence();
            let wrap = if circular {
                edges.last().map(|&e| graph.edge(e).overlap()).unwrap_or(0)
            } else {
                0
            };
            sequence.extend_from_slice(trim_overlap(first_seq, wrap));
        }

        for (&node, &edge) in nodes.iter().skip(1).zip(edges.iter()) {
            let overlap = graph.edge(edge).overlap();
            let seq = graph.node(node).sequence();
            sequence.extend_from_slice(trim_overlap(seq, overlap));
        }

        let names = nodes
            .iter()
            .map(|&n| BString::from(graph.node(n).name().as_bytes()))
            .collect();

        Path {
            nodes,
            names,
            edges,
            circular,
            sequence,
        }
    }
}

/// Node names separated by commas, e.g. `1+,2+,3+`.
impl std::fmt::Display for Path {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, name) in self.names.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", name)?;
        }
        Ok(())
    }
}

/// Most contigs with both strands in one component that are tried on
/// either strand.
const MAX_FREE_CONTIGS: usize = 12;

/// Marker for an interrupted reconstruction.
struct Cancelled;

/// Builds a path from a node set. In single-strand mode the caller
/// only knows contigs, not strands, so either strand of every given
/// node may be used.
///
/// ```
/// use asmgraph::{AssemblyGraph, PathReconstructor};
///
/// let mut graph = AssemblyGraph::new();
/// let a = graph.add_node("1+", "ACGTT", 1.0).unwrap();
/// let b = graph.add_node("2+", "TTGCA", 1.0).unwrap();
/// graph.connect(a, b, 2).unwrap();
///
/// let path = PathReconstructor::new(&graph).reconstruct(&[b, a]);
/// assert_eq!(path.to_string(), "1+,2+");
/// assert_eq!(path.sequence(), "ACGTTGCA");
/// ```
pub struct PathReconstructor<'a> {
    graph: &'a AssemblyGraph,
    single_strand: bool,
    cancel: Option<&'a CancelToken>,
}

impl<'a> PathReconstructor<'a> {
    pub fn new(graph: &'a AssemblyGraph) -> Self {
        PathReconstructor {
            graph,
            single_strand: false,
            cancel: None,
        }
    }

    pub fn single_strand(mut self, single_strand: bool) -> Self {
        self.single_strand = single_strand;
        self
    }

    pub fn cancel_token(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    fn check(&self) -> Result<(), Cancelled> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(Cancelled),
            _ => Ok(()),
        }
    }

    pub fn reconstruct(&self, nodes: &[NodeId]) -> Path {
        let input: BTreeSet<NodeId> = nodes.iter().copied().collect();
        if input.is_empty() {
            return Path::empty();
        }

        let result = if self.single_strand {
            self.single_strand_path(&input)
        } else {
            self.walk(&input, &input)
        };

        match result {
            Ok(Some(path)) => path,
            Ok(None) => Path::empty(),
            Err(Cancelled) => {
                debug!("Path reconstruction cancelled");
                Path::empty()
            }
        }
    }

    /// Tries one strand of each input contig. The components of the
    /// input nodes plus their twins fix the strand of every contig
    /// with only one strand in the component; contigs with both
    /// strands in it, e.g. next to a hairpin, are tried both ways.
    /// Among the choices that form a path, the one with more input
    /// nodes in their given orientation wins, then the one holding
    /// the lowest input id.
    fn single_strand_path(
        &self,
        input: &BTreeSet<NodeId>,
    ) -> Result<Option<Path>, Cancelled> {
        let graph = self.graph;

        if input
            .iter()
            .any(|&n| graph.twin(n) != n && input.contains(&graph.twin(n)))
        {
            debug!("Path input holds both strands of a contig");
            return Ok(None);
        }

        let all: BTreeSet<NodeId> = input
            .iter()
            .flat_map(|&n| vec![n, graph.twin(n)])
            .collect();

        let mut best: Option<((Reverse<usize>, NodeId), Path)> = None;

        for comp in self.components(&all) {
            let mut fixed = BTreeSet::new();
            let mut free = Vec::new();
            let mut complete = true;

            for &n in input {
                let twin = graph.twin(n);
                match (comp.contains(&n), twin != n && comp.contains(&twin)) {
                    (true, true) => free.push(n),
                    (true, false) => {
                        fixed.insert(n);
                    }
                    (false, true) => {
                        fixed.insert(twin);
                    }
                    (false, false) => {
                        complete = false;
                        break;
                    }
                }
            }
            if !complete {
                continue;
            }
            if free.len() > MAX_FREE_CONTIGS {
                debug!(
                    "{} contigs with both strands in one component, skipped",
                    free.len()
                );
                continue;
            }

            for choice in 0..(1usize << free.len()) {
                self.check()?;
                let mut set = fixed.clone();
                for (i, &n) in free.iter().enumerate() {
                    let node = if choice & (1 << i) == 0 {
                        n
                    } else {
                        graph.twin(n)
                    };
                    set.insert(node);
                }

                let path = match self.walk(&set, input)? {
                    Some(path) => path,
                    None => continue,
                };

                let given: Vec<NodeId> =
                    input.iter().copied().filter(|n| set.contains(n)).collect();
                let lowest =
                    given.first().copied().unwrap_or(NodeId(usize::MAX));
                let key = (Reverse(given.len()), lowest);
                if best.as_ref().map_or(true, |(k, _)| key < *k) {
                    best = Some((key, path));
                }
            }
        }

        if best.is_none() {
            debug!("No choice of strands forms a single path");
        }
        Ok(best.map(|(_, path)| path))
    }

    /// Weakly connected components of the subgraph induced by `set`.
    fn components(&self, set: &BTreeSet<NodeId>) -> Vec<BTreeSet<NodeId>> {
        let graph = self.graph;
        let mut seen: FnvHashSet<NodeId> = FnvHashSet::default();
        let mut components = Vec::new();

        for &start in set {
            if !seen.insert(start) {
                continue;
            }
            let mut component = BTreeSet::new();
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                component.insert(node);
                let neighbours = graph
                    .downstream_nodes(node)
                    .chain(graph.upstream_nodes(node));
                for next in neighbours {
                    if set.contains(&next) && seen.insert(next) {
                        stack.push(next);
                    }
                }
            }
            components.push(component);
        }
        components
    }

    /// Orders the node set by following its induced edges.
    fn walk(
        &self,
        set: &BTreeSet<NodeId>,
        input: &BTreeSet<NodeId>,
    ) -> Result<Option<Path>, Cancelled> {
        let graph = self.graph;
        let n = set.len();

        let mut out_edges: FnvHashMap<NodeId, Vec<EdgeId>> =
            FnvHashMap::default();
        let mut in_counts: FnvHashMap<NodeId, usize> = FnvHashMap::default();
        let mut edge_count = 0;

        for &node in set {
            for &edge in graph.node(node).outgoing() {
                let end = graph.edge(edge).end();
                if set.contains(&end) {
                    out_edges.entry(node).or_default().push(edge);
                    *in_counts.entry(end).or_default() += 1;
                    edge_count += 1;
                }
            }
        }

        let out_degree =
            |node: &NodeId| out_edges.get(node).map_or(0, |e| e.len());
        let in_degree =
            |node: &NodeId| in_counts.get(node).copied().unwrap_or(0);

        let (start, circular) = if edge_count + 1 == n {
            if set.iter().any(|v| in_degree(v) > 1 || out_degree(v) > 1) {
                debug!("Path nodes branch");
                return Ok(None);
            }
            let mut starts = set.iter().filter(|&v| in_degree(v) == 0);
            match (starts.next(), starts.next()) {
                (Some(&start), None) => (start, false),
                _ => {
                    debug!("Path nodes don't form a single chain");
                    return Ok(None);
                }
            }
        } else if edge_count == n {
            if set.iter().any(|v| in_degree(v) != 1 || out_degree(v) != 1) {
                debug!("Path nodes don't form a simple cycle");
                return Ok(None);
            }
            // start a cycle at the lowest given node
            let start = input
                .iter()
                .find(|&v| set.contains(v))
                .or_else(|| set.iter().next())
                .copied();
            match start {
                Some(start) => (start, true),
                None => return Ok(None),
            }
        } else {
            debug!(
                "{} induced edges between {} path nodes, no unambiguous path",
                edge_count, n
            );
            return Ok(None);
        };

        let mut nodes = vec![start];
        let mut edges = Vec::new();
        let mut visited: FnvHashSet<NodeId> = FnvHashSet::default();
        visited.insert(start);
        let mut current = start;

        while let Some(&edge) =
            out_edges.get(&current).and_then(|e| e.first())
        {
            self.check()?;
            let next = graph.edge(edge).end();
            edges.push(edge);
            if !visited.insert(next) {
                if !(circular && next == start && nodes.len() == n) {
                    debug!("Path walk returned early to a visited node");
                    return Ok(None);
                }
                break;
            }
            nodes.push(next);
            current = next;
        }

        if nodes.len() != n || (circular && edges.len() != n) {
            debug!("Path walk covered {} of {} nodes", nodes.len(), n);
            return Ok(None);
        }

        Ok(Some(Path::from_walk(graph, nodes, edges, circular)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(graph: &AssemblyGraph, names: &[&str]) -> Vec<NodeId> {
        names.iter().map(|n| graph.find_node(n).unwrap()).collect()
    }

    fn chain() -> AssemblyGraph {
        let mut graph = AssemblyGraph::new();
        graph.add_node("1+", "ACGTACGT", 1.0).unwrap();
        graph.add_node("2+", "CGTTTT", 1.0).unwrap();
        graph.add_node("3+", "TTGGGA", 1.0).unwrap();
        graph.add_edge("1+", "2+", 3).unwrap();
        graph.add_edge("2+", "3+", 2).unwrap();
        graph
    }

    #[test]
    fn unordered_chain_is_ordered() {
        let graph = chain();
        let path = PathReconstructor::new(&graph)
            .reconstruct(&ids(&graph, &["3+", "1+", "2+"]));

        assert!(!path.is_empty());
        assert!(!path.is_circular());
        assert_eq!(path.nodes(), ids(&graph, &["1+", "2+", "3+"]).as_slice());
        assert_eq!(path.edges().len(), 2);
        assert_eq!(path.to_string(), "1+,2+,3+");
        assert_eq!(path.sequence(), "ACGTACGTTTTGGGA");
        assert_eq!(path.len(), 15);
    }

    #[test]
    fn reverse_strand_chain() {
        let graph = chain();
        let path = PathReconstructor::new(&graph)
            .reconstruct(&ids(&graph, &["1-", "3-", "2-"]));
        assert_eq!(path.to_string(), "3-,2-,1-");
        assert_eq!(path.sequence(), "TCCCAAAACGTACGT");
    }

    #[test]
    fn branching_set_has_no_path() {
        let mut graph = chain();
        graph.add_node("4+", "ACGT", 1.0).unwrap();
        graph.add_edge("1+", "4+", 0).unwrap();

        let path = PathReconstructor::new(&graph)
            .reconstruct(&ids(&graph, &["1+", "2+", "3+", "4+"]));
        assert!(path.is_empty());
        assert_eq!(path.to_string(), "");
    }

    #[test]
    fn disconnected_set_has_no_path() {
        let graph = chain();
        let path = PathReconstructor::new(&graph)
            .reconstruct(&ids(&graph, &["1+", "3+"]));
        assert!(path.is_empty());
        assert!(PathReconstructor::new(&graph).reconstruct(&[]).is_empty());
    }

    #[test]
    fn single_node_path() {
        let graph = chain();
        let path = PathReconstructor::new(&graph)
            .reconstruct(&ids(&graph, &["2+"]));
        assert_eq!(path.to_string(), "2+");
        assert!(path.edges().is_empty());
        assert_eq!(path.sequence(), "CGTTTT");
    }

    #[test]
    fn cycles_are_circular_and_trimmed_at_the_wrap() {
        let mut graph = AssemblyGraph::new();
        graph.add_node("1+", "AAACC", 1.0).unwrap();
        graph.add_node("2+", "CCGGG", 1.0).unwrap();
        graph.add_node("3+", "GGAAA", 1.0).unwrap();
        graph.add_edge("1+", "2+", 2).unwrap();
        graph.add_edge("2+", "3+", 2).unwrap();
        graph.add_edge("3+", "1+", 2).unwrap();

        let path = PathReconstructor::new(&graph)
            .reconstruct(&ids(&graph, &["2+", "3+", "1+"]));
        assert!(path.is_circular());
        assert_eq!(path.to_string(), "1+,2+,3+");
        assert_eq!(path.edges().len(), 3);
        assert_eq!(path.sequence(), "ACCGGGAAA");
    }

    #[test]
    fn overlap_longer_than_sequence_trims_to_empty() {
        let mut graph = AssemblyGraph::new();
        graph.add_node("1+", "ACGTACGT", 1.0).unwrap();
        graph.add_node("2+", "GT", 1.0).unwrap();
        graph.add_edge("1+", "2+", 5).unwrap();

        let path = PathReconstructor::new(&graph)
            .reconstruct(&ids(&graph, &["1+", "2+"]));
        assert_eq!(path.sequence(), "ACGTACGT");
    }

    #[test]
    fn single_strand_picks_the_given_orientation() {
        let graph = chain();
        let recon = PathReconstructor::new(&graph).single_strand(true);

        let path = recon.reconstruct(&ids(&graph, &["3-", "2-"]));
        assert_eq!(path.to_string(), "3-,2-");

        // one node on each strand: tie broken by the lowest node id
        let path = recon.reconstruct(&ids(&graph, &["1+", "2-"]));
        assert_eq!(path.to_string(), "1+,2+");

        // in double mode the same set is disconnected
        let path = PathReconstructor::new(&graph)
            .reconstruct(&ids(&graph, &["1+", "2-"]));
        assert!(path.is_empty());
    }

    #[test]
    fn single_strand_rejects_both_strands() {
        let graph = chain();
        let path = PathReconstructor::new(&graph)
            .single_strand(true)
            .reconstruct(&ids(&graph, &["1+", "1-"]));
        assert!(path.is_empty());
    }

    #[test]
    fn single_strand_through_palindromic_node() {
        let mut graph = chain();
        let pal = graph.add_palindromic_node("pal", "GAATTC", 1.0).unwrap();
        graph.add_edge("3+", "pal", 0).unwrap();

        let nodes = ids(&graph, &["pal", "3+", "2+"]);
        let double = PathReconstructor::new(&graph).reconstruct(&nodes);
        assert_eq!(double.to_string(), "2+,3+,pal");

        let single = PathReconstructor::new(&graph)
            .single_strand(true)
            .reconstruct(&nodes);
        assert!(!single.is_empty());
        assert_eq!(single.to_string(), "2+,3+,pal");
        assert_eq!(single.sequence(), "CGTTTTGGGAGAATTC");

        // given on the other strand, the same contigs are walked the
        // other way round
        let single = PathReconstructor::new(&graph)
            .single_strand(true)
            .reconstruct(&ids(&graph, &["pal", "3-"]));
        assert_eq!(single.to_string(), "pal,3-");
    }

    #[test]
    fn single_strand_next_to_a_hairpin() {
        let mut graph = chain();
        graph.add_edge("3+", "3-", 0).unwrap();
        let recon = PathReconstructor::new(&graph).single_strand(true);

        let path = recon.reconstruct(&ids(&graph, &["3+"]));
        assert_eq!(path.to_string(), "3+");

        let path = recon.reconstruct(&ids(&graph, &["2+", "3+"]));
        assert_eq!(path.to_string(), "2+,3+");
        assert_eq!(path.sequence(), "CGTTTTGGGA");

        let path = recon.reconstruct(&ids(&graph, &["3-"]));
        assert_eq!(path.to_string(), "3-");
    }

    #[test]
    fn fasta_output() {
        let graph = chain();
        let path = PathReconstructor::new(&graph)
            .reconstruct(&ids(&graph, &["1+", "2+", "3+"]));
        assert_eq!(path.fasta("path_1"), ">path_1\nACGTACGTTTTGGGA\n");
    }

    #[test]
    fn cancelled_reconstruction_is_empty() {
        let graph = chain();
        let token = CancelToken::new();
        token.cancel();
        let path = PathReconstructor::new(&graph)
            .cancel_token(&token)
            .reconstruct(&ids(&graph, &["1+", "2+", "3+"]));
        assert!(path.is_empty());
    }
}
