//! The assembly graph: an arena of nodes and directed edges, closed
//! under the reverse-complement (twin) operation.

pub mod name;
pub mod strand;

pub use self::name::*;
pub use self::strand::*;

use bstr::{BStr, BString, ByteSlice};
use fnv::{FnvHashMap, FnvHashSet};
use log::debug;

use std::collections::VecDeque;

use crate::{
    colour::Colour,
    contiguity::ContiguityStatus,
    error::{GraphError, GraphResult},
    overlay::{BarcodeMark, Hit},
    sequence::{fasta_string, is_palindromic, reverse_complement},
};

/// Index of a node in its `AssemblyGraph`. Only valid for the graph
/// that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// Index of an edge in its `AssemblyGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EdgeId(pub usize);

/// A contig on one strand.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    name: BString,
    strand: Strand,
    sequence: BString,
    read_depth: f64,
    twin: NodeId,
    outgoing: Vec<EdgeId>,
    incoming: Vec<EdgeId>,
    contiguity: ContiguityStatus,
    custom_colour: Option<Colour>,
    custom_label: Option<String>,
    drawn: bool,
    hits: Vec<Hit>,
    barcodes: Vec<BarcodeMark>,
}

impl Node {
    fn new(
        name: BString,
        strand: Strand,
        sequence: BString,
        read_depth: f64,
        twin: NodeId,
    ) -> Self {
        Node {
            name,
            strand,
            sequence,
            read_depth,
            twin,
            outgoing: Vec::new(),
            incoming: Vec::new(),
            contiguity: ContiguityStatus::default(),
            custom_colour: None,
            custom_label: None,
            drawn: true,
            hits: Vec::new(),
            barcodes: Vec::new(),
        }
    }

    pub fn name(&self) -> &BStr {
        self.name.as_bstr()
    }

    /// The contig name without the strand sign. Palindromic nodes have
    /// no sign, so this is the full name.
    pub fn base_name(&self) -> &BStr {
        match split_node_name(&self.name) {
            Some((base, _)) => base,
            None => self.name.as_bstr(),
        }
    }

    pub fn strand(&self) -> Strand {
        self.strand
    }

    pub fn is_positive(&self) -> bool {
        self.strand == Strand::Forward
    }

    pub fn sequence(&self) -> &BStr {
        self.sequence.as_bstr()
    }

    pub fn length(&self) -> usize {
        self.sequence.len()
    }

    pub fn read_depth(&self) -> f64 {
        self.read_depth
    }

    pub fn twin(&self) -> NodeId {
        self.twin
    }

    pub fn outgoing(&self) -> &[EdgeId] {
        &self.outgoing
    }

    pub fn incoming(&self) -> &[EdgeId] {
        &self.incoming
    }

    pub fn contiguity(&self) -> ContiguityStatus {
        self.contiguity
    }

    pub fn custom_colour(&self) -> Option<Colour> {
        self.custom_colour
    }

    pub fn custom_label(&self) -> Option<&str> {
        self.custom_label.as_deref()
    }

    pub fn is_drawn(&self) -> bool {
        self.drawn
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn barcodes(&self) -> &[BarcodeMark] {
        &self.barcodes
    }
}

/// A directed overlap between the end of `start` and the beginning
/// of `end`.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    start: NodeId,
    end: NodeId,
    overlap: usize,
    drawn: bool,
}

impl Edge {
    pub fn start(&self) -> NodeId {
        self.start
    }

    pub fn end(&self) -> NodeId {
        self.end
    }

    /// Number of bases shared by the two node sequences.
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn is_drawn(&self) -> bool {
        self.drawn
    }
}

/// The assembly graph. Owns every node and edge; everything else
/// refers to them by `NodeId` and `EdgeId`.
#[derive(Default, Debug, Clone)]
pub struct AssemblyGraph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    name_map: FnvHashMap<Vec<u8>, NodeId>,
    edge_map: FnvHashMap<(NodeId, NodeId), EdgeId>,
    contiguity_search_done: bool,
}

impl AssemblyGraph {
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a node named `<base>+` or `<base>-` together with its
    /// twin, which gets the opposite sign and the reverse-complement
    /// sequence. Returns the id of the named node.
    pub fn add_node<N, S>(
        &mut self,
        name: N,
        sequence: S,
        read_depth: f64,
    ) -> GraphResult<NodeId>
    where
        N: AsRef<[u8]>,
        S: AsRef<[u8]>,
    {
        let name = name.as_ref();
        let (base, strand) = split_node_name(name)
            .ok_or_else(|| GraphError::InvalidNodeName(name.into()))?;
        let twin_name = node_name(base, strand.opposite());

        if self.name_map.contains_key(name) {
            return Err(GraphError::DuplicateNode(name.into()));
        }
        if self.name_map.contains_key(twin_name.as_slice()) {
            return Err(GraphError::DuplicateNode(twin_name));
        }

        let sequence = sequence.as_ref();
        let id = NodeId(self.nodes.len());
        let twin_id = NodeId(id.0 + 1);

        self.nodes.push(Node::new(
            name.into(),
            strand,
            sequence.into(),
            read_depth,
            twin_id,
        ));
        self.nodes.push(Node::new(
            twin_name.clone(),
            strand.opposite(),
            reverse_complement(sequence),
            read_depth,
            id,
        ));

        self.name_map.insert(name.to_vec(), id);
        self.name_map.insert(twin_name.to_vec(), twin_id);

        Ok(id)
    }

    /// Add a node that is its own reverse complement. The name has no
    /// strand sign, and the sequence must equal its reverse
    /// complement.
    pub fn add_palindromic_node<N, S>(
        &mut self,
        name: N,
        sequence: S,
        read_depth: f64,
    ) -> GraphResult<NodeId>
    where
        N: AsRef<[u8]>,
        S: AsRef<[u8]>,
    {
        let name = name.as_ref();
        if !is_valid_base_name(name) {
            return Err(GraphError::InvalidNodeName(name.into()));
        }
        if self.name_map.contains_key(name) {
            return Err(GraphError::DuplicateNode(name.into()));
        }
        let sequence = sequence.as_ref();
        if !is_palindromic(sequence) {
            return Err(GraphError::NotPalindromic(name.into()));
        }

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(
            name.into(),
            Strand::Forward,
            sequence.into(),
            read_depth,
            id,
        ));
        self.name_map.insert(name.to_vec(), id);
        Ok(id)
    }

    /// Add the edge `from -> to` and its reverse-complement edge
    /// `twin(to) -> twin(from)`. If the edge already exists, its id is
    /// returned and nothing changes.
    pub fn add_edge<A, B>(
        &mut self,
        from: A,
        to: B,
        overlap: usize,
    ) -> GraphResult<EdgeId>
    where
        A: AsRef<[u8]>,
        B: AsRef<[u8]>,
    {
        let from = self.require_node(from.as_ref())?;
        let to = self.require_node(to.as_ref())?;
        self.connect(from, to, overlap)
    }

    /// Add only the edge `from -> to`. The caller is responsible for
    /// adding the twin edge; use `check_strand_symmetry` once the
    /// graph is built.
    pub fn add_unpaired_edge<A, B>(
        &mut self,
        from: A,
        to: B,
        overlap: usize,
    ) -> GraphResult<EdgeId>
    where
        A: AsRef<[u8]>,
        B: AsRef<[u8]>,
    {
        let from = self.require_node(from.as_ref())?;
        let to = self.require_node(to.as_ref())?;
        Ok(self.insert_edge(from, to, overlap))
    }

    /// Id-based variant of `add_edge`. Fails without changing the
    /// graph if the edge or its twin already exists with another
    /// overlap.
    pub fn connect(
        &mut self,
        from: NodeId,
        to: NodeId,
        overlap: usize,
    ) -> GraphResult<EdgeId> {
        let twin_from = self.twin(to);
        let twin_to = self.twin(from);
        self.check_overlap(from, to, overlap)?;
        self.check_overlap(twin_from, twin_to, overlap)?;

        let edge = self.insert_edge(from, to, overlap);
        self.insert_edge(twin_from, twin_to, overlap);
        Ok(edge)
    }

    fn check_overlap(
        &self,
        from: NodeId,
        to: NodeId,
        overlap: usize,
    ) -> GraphResult<()> {
        match self.edge_between(from, to) {
            Some(edge) if self.edge(edge).overlap != overlap => {
                Err(GraphError::OverlapMismatch {
                    from: self.node(from).name.clone(),
                    to: self.node(to).name.clone(),
                    overlap,
                    existing: self.edge(edge).overlap,
                })
            }
            _ => Ok(()),
        }
    }

    fn insert_edge(
        &mut self,
        from: NodeId,
        to: NodeId,
        overlap: usize,
    ) -> EdgeId {
        if let Some(&edge) = self.edge_map.get(&(from, to)) {
            return edge;
        }
        let edge = EdgeId(self.edges.len());
        self.edges.push(Edge {
            start: from,
            end: to,
            overlap,
            drawn: true,
        });
        self.edge_map.insert((from, to), edge);
        self.nodes[from.0].outgoing.push(edge);
        self.nodes[to.0].incoming.push(edge);
        edge
    }

    fn require_node(&self, name: &[u8]) -> GraphResult<NodeId> {
        self.find_node(name)
            .ok_or_else(|| GraphError::UnknownNode(name.into()))
    }

    /// Verify that every edge has its reverse-complement edge, with
    /// the same overlap.
    pub fn check_strand_symmetry(&self) -> GraphResult<()> {
        for edge in self.edges.iter() {
            let twin_from = self.twin(edge.end);
            let twin_to = self.twin(edge.start);
            if self.edge_between(twin_from, twin_to).is_none() {
                return Err(GraphError::MissingTwinEdge {
                    from: self.node(edge.start).name.clone(),
                    to: self.node(edge.end).name.clone(),
                });
            }
            self.check_overlap(twin_from, twin_to, edge.overlap)?;
        }
        Ok(())
    }

    pub fn find_node<N: AsRef<[u8]>>(&self, name: N) -> Option<NodeId> {
        self.name_map.get(name.as_ref()).copied()
    }

    /// Panics if the id doesn't belong to this graph.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[inline]
    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    #[inline]
    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.0]
    }

    #[inline]
    pub fn twin(&self, id: NodeId) -> NodeId {
        self.nodes[id.0].twin
    }

    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<EdgeId> {
        self.edge_map.get(&(from, to)).copied()
    }

    /// The reverse-complement edge of the given edge. May be the edge
    /// itself, e.g. for `A -> twin(A)`.
    pub fn twin_edge(&self, id: EdgeId) -> Option<EdgeId> {
        let edge = self.edge(id);
        self.edge_between(self.twin(edge.end), self.twin(edge.start))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &'_ Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &'_ Edge)> {
        self.edges.iter().enumerate().map(|(i, e)| (EdgeId(i), e))
    }

    pub fn downstream_nodes(
        &self,
        id: NodeId,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).outgoing.iter().map(move |&e| self.edge(e).end)
    }

    pub fn upstream_nodes(
        &self,
        id: NodeId,
    ) -> impl Iterator<Item = NodeId> + '_ {
        self.node(id).incoming.iter().map(move |&e| self.edge(e).start)
    }

    /// Clears per-session edge rendering state. Topology is untouched.
    pub fn reset_edges(&mut self) {
        self.edges.iter_mut().for_each(|e| e.drawn = true);
    }

    pub fn set_edge_drawn(&mut self, id: EdgeId, drawn: bool) {
        self.edges[id.0].drawn = drawn;
    }

    pub fn set_custom_colour(&mut self, id: NodeId, colour: Option<Colour>) {
        self.nodes[id.0].custom_colour = colour;
    }

    pub fn set_custom_label(&mut self, id: NodeId, label: Option<String>) {
        self.nodes[id.0].custom_label = label;
    }

    pub fn set_drawn(&mut self, id: NodeId, drawn: bool) {
        self.nodes[id.0].drawn = drawn;
    }

    pub fn set_all_drawn(&mut self, drawn: bool) {
        self.nodes.iter_mut().for_each(|n| n.drawn = drawn);
    }

    /// Marks the nodes within `distance` steps of any seed, in either
    /// direction, as drawn, together with their twins. Every other
    /// node is marked as not drawn.
    pub fn mark_drawn_around(&mut self, seeds: &[NodeId], distance: usize) {
        let mut reached: FnvHashSet<NodeId> = FnvHashSet::default();
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();

        for &seed in seeds {
            if reached.insert(seed) {
                queue.push_back((seed, 0));
            }
        }

        while let Some((id, dist)) = queue.pop_front() {
            if dist >= distance {
                continue;
            }
            let neighbours: Vec<NodeId> = self
                .downstream_nodes(id)
                .chain(self.upstream_nodes(id))
                .collect();
            for next in neighbours {
                if reached.insert(next) {
                    queue.push_back((next, dist + 1));
                }
            }
        }

        self.set_all_drawn(false);
        for id in reached {
            let twin = self.twin(id);
            self.nodes[id.0].drawn = true;
            self.nodes[twin.0].drawn = true;
        }
        debug!(
            "Marked {} nodes as drawn around {} seeds",
            self.nodes.iter().filter(|n| n.drawn).count(),
            seeds.len()
        );
    }

    /// Length-weighted mean read depth of the drawn nodes, or 0.0 if
    /// nothing is drawn.
    pub fn mean_drawn_read_depth(&self) -> f64 {
        let (depth_sum, length_sum, count) = self
            .nodes
            .iter()
            .filter(|n| n.drawn)
            .fold((0.0, 0usize, 0usize), |(d, l, c), n| {
                (d + n.read_depth * n.length() as f64, l + n.length(), c + 1)
            });
        if length_sum > 0 {
            depth_sum / length_sum as f64
        } else if count > 0 {
            let sum: f64 = self
                .nodes
                .iter()
                .filter(|n| n.drawn)
                .map(|n| n.read_depth)
                .sum();
            sum / count as f64
        } else {
            0.0
        }
    }

    /// Raise the node's contiguity status to `status` if it's higher
    /// than the current one. Returns `true` if the status changed.
    pub fn upgrade_contiguity(
        &mut self,
        id: NodeId,
        status: ContiguityStatus,
    ) -> bool {
        let node = &mut self.nodes[id.0];
        let merged = node.contiguity.merge(status);
        let changed = merged != node.contiguity;
        node.contiguity = merged;
        changed
    }

    /// Return every node to `NotContiguous` and forget that a search
    /// was done.
    pub fn reset_contiguity(&mut self) {
        self.nodes
            .iter_mut()
            .for_each(|n| n.contiguity = ContiguityStatus::NotContiguous);
        self.contiguity_search_done = false;
    }

    pub fn contiguity_search_done(&self) -> bool {
        self.contiguity_search_done
    }

    pub(crate) fn set_contiguity_search_done(&mut self) {
        self.contiguity_search_done = true;
    }

    pub fn attach_hit(&mut self, id: NodeId, hit: Hit) {
        self.nodes[id.0].hits.push(hit);
    }

    pub fn attach_barcode(&mut self, id: NodeId, barcode: BarcodeMark) {
        self.nodes[id.0].barcodes.push(barcode);
    }

    pub fn clear_hits(&mut self) {
        self.nodes.iter_mut().for_each(|n| n.hits.clear());
    }

    pub fn clear_barcodes(&mut self) {
        self.nodes.iter_mut().for_each(|n| n.barcodes.clear());
    }

    /// Whether the node has hits attached. In single-strand mode hits
    /// on the twin count too.
    pub fn has_hits(&self, id: NodeId, single_strand: bool) -> bool {
        !self.node(id).hits.is_empty()
            || (single_strand && !self.node(self.twin(id)).hits.is_empty())
    }

    /// The nodes with hits attached. In single-strand mode there is
    /// one node per contig, the positive one.
    pub fn nodes_with_hits(&self, single_strand: bool) -> Vec<NodeId> {
        self.nodes()
            .filter(|(id, n)| {
                !single_strand || n.is_positive() || self.twin(*id) == *id
            })
            .map(|(id, _)| id)
            .filter(|&id| self.has_hits(id, single_strand))
            .collect()
    }

    /// `mark_drawn_around` seeded with every node that has hits.
    pub fn mark_drawn_around_hits(&mut self, distance: usize) {
        let seeds = self.nodes_with_hits(false);
        self.mark_drawn_around(&seeds, distance);
    }

    /// Looks up a comma-separated list of names. With `exact`, a name
    /// with a strand sign gives that node and a bare contig name gives
    /// both of its nodes. Otherwise every node whose name contains the
    /// text matches. Returns the nodes found, sorted by id, and the
    /// names that matched nothing.
    pub fn find_nodes_by_names(
        &self,
        text: &str,
        exact: bool,
    ) -> (Vec<NodeId>, Vec<String>) {
        let mut found = Vec::new();
        let mut not_found = Vec::new();

        for name in text.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let matches: Vec<NodeId> = if exact {
                match self.find_node(name) {
                    Some(id) => vec![id],
                    None => [Strand::Forward, Strand::Reverse]
                        .iter()
                        .filter_map(|&s| self.find_node(node_name(name, s)))
                        .collect(),
                }
            } else {
                self.nodes()
                    .filter(|(_, n)| n.name.contains_str(name))
                    .map(|(id, _)| id)
                    .collect()
            };
            if matches.is_empty() {
                not_found.push(name.to_string());
            }
            found.extend(matches);
        }

        found.sort();
        found.dedup();
        (found, not_found)
    }

    /// FASTA record for a single node.
    pub fn node_fasta(&self, id: NodeId) -> String {
        let node = self.node(id);
        let header = format!(
            "NODE_{}_length_{}_cov_{}",
            node.name,
            node.length(),
            node.read_depth
        );
        fasta_string(&header, &node.sequence)
    }
}
