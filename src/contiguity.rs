//! Contiguity inference: classify the drawn nodes by how confidently
//! they lie on the same underlying sequence as a set of seed nodes.
//!
//! From each seed, every path leaving it downstream and upstream is
//! traced up to a step limit. Nodes on any of the paths may be
//! contiguous with the seed; nodes on all of them are contiguous. A
//! second pass checks, for each node that was reached, whether every
//! path leading out of it ends at the seed.

use fnv::{FnvHashMap, FnvHashSet};
use log::debug;

use std::collections::BTreeSet;

#[cfg(feature = "serde1")]
use serde::{Deserialize, Serialize};

use crate::{
    cancel::CancelToken,
    graph::{AssemblyGraph, NodeId},
};

pub const DEFAULT_SEARCH_STEPS: usize = 15;

/// How confidently a node is known to be contiguous with the seed
/// nodes, in ascending order of confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde1", derive(Serialize, Deserialize))]
pub enum ContiguityStatus {
    NotContiguous,
    MaybeContiguous,
    ContiguousEitherStrand,
    ContiguousStrandSpecific,
}

impl Default for ContiguityStatus {
    #[inline]
    fn default() -> Self {
        ContiguityStatus::NotContiguous
    }
}

impl ContiguityStatus {
    /// Statuses only ever move upward; merging keeps the higher one.
    #[inline]
    pub fn merge(self, other: Self) -> Self {
        self.max(other)
    }

    #[inline]
    pub fn is_contiguous(&self) -> bool {
        *self >= ContiguityStatus::ContiguousEitherStrand
    }
}

impl std::fmt::Display for ContiguityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use ContiguityStatus::*;
        let s = match self {
            NotContiguous => "not contiguous",
            MaybeContiguous => "maybe contiguous",
            ContiguousEitherStrand => "contiguous (either strand)",
            ContiguousStrandSpecific => "contiguous (strand specific)",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Downstream,
    Upstream,
}

/// Marker for an interrupted traversal.
struct Cancelled;

type Traced<T> = Result<T, Cancelled>;

/// Read-only traversal over the drawn part of the graph.
struct Tracer<'g> {
    graph: &'g AssemblyGraph,
    steps: usize,
    cancel: Option<&'g CancelToken>,
}

impl<'g> Tracer<'g> {
    #[inline]
    fn check(&self) -> Traced<()> {
        match self.cancel {
            Some(token) if token.is_cancelled() => Err(Cancelled),
            _ => Ok(()),
        }
    }

    /// The drawn neighbours of a node in the given direction.
    fn next_nodes(&self, node: NodeId, dir: Direction) -> Vec<NodeId> {
        let next: Vec<NodeId> = match dir {
            Direction::Downstream => {
                self.graph.downstream_nodes(node).collect()
            }
            Direction::Upstream => self.graph.upstream_nodes(node).collect(),
        };
        next.into_iter()
            .filter(|&n| self.graph.node(n).is_drawn())
            .collect()
    }

    /// Each drawn neighbour of `node` with the direction to keep going
    /// in: downstream along outgoing edges, upstream along incoming
    /// ones.
    fn starts(&self, node: NodeId) -> Vec<(NodeId, Direction)> {
        [Direction::Downstream, Direction::Upstream]
            .iter()
            .flat_map(|&dir| {
                self.next_nodes(node, dir).into_iter().map(move |n| (n, dir))
            })
            .collect()
    }

    /// Enumerate every path starting at `first`. A path ends when the
    /// step limit is reached, at a dead end, when it returns to the
    /// seed, or when it revisits one of its own nodes.
    fn trace_paths(
        &self,
        first: NodeId,
        dir: Direction,
        seed: NodeId,
    ) -> Traced<Vec<Vec<NodeId>>> {
        let mut all_paths = Vec::new();
        let mut path = Vec::new();
        self.trace(first, dir, self.steps, seed, &mut path, &mut all_paths)?;
        Ok(all_paths)
    }

    fn trace(
        &self,
        next: NodeId,
        dir: Direction,
        steps_remaining: usize,
        seed: NodeId,
        path: &mut Vec<NodeId>,
        all_paths: &mut Vec<Vec<NodeId>>,
    ) -> Traced<()> {
        self.check()?;

        let looped = path.contains(&next);
        path.push(next);
        let remaining = steps_remaining.saturating_sub(1);

        if remaining == 0 || next == seed || looped {
            all_paths.push(path.clone());
        } else {
            let next_nodes = self.next_nodes(next, dir);
            if next_nodes.is_empty() {
                all_paths.push(path.clone());
            }
            for n in next_nodes {
                self.trace(n, dir, remaining, seed, path, all_paths)?;
            }
        }

        path.pop();
        Ok(())
    }

    /// `true` if some edge of `node` leads, on every branch and within
    /// the step limit, to `target` (or its twin if `include_twin`).
    fn leads_only_to(
        &self,
        node: NodeId,
        target: NodeId,
        include_twin: bool,
    ) -> Traced<bool> {
        for (next, dir) in self.starts(node) {
            let mut path = vec![node];
            if self.branch_leads_only_to(
                next,
                dir,
                self.steps,
                target,
                include_twin,
                &mut path,
            )? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn branch_leads_only_to(
        &self,
        next: NodeId,
        dir: Direction,
        steps_remaining: usize,
        target: NodeId,
        include_twin: bool,
        path: &mut Vec<NodeId>,
    ) -> Traced<bool> {
        self.check()?;

        if next == target
            || (include_twin && next == self.graph.twin(target))
        {
            return Ok(true);
        }
        if path.contains(&next) {
            return Ok(false);
        }

        let remaining = steps_remaining.saturating_sub(1);
        if remaining == 0 {
            return Ok(false);
        }
        let next_nodes = self.next_nodes(next, dir);
        if next_nodes.is_empty() {
            return Ok(false);
        }

        path.push(next);
        let mut all_lead = true;
        for n in next_nodes {
            if !self.branch_leads_only_to(
                n,
                dir,
                remaining,
                target,
                include_twin,
                path,
            )? {
                all_lead = false;
                break;
            }
        }
        path.pop();
        Ok(all_lead)
    }
}

/// Nodes present in every path. With `identify_twins`, a node and its
/// twin count as the same node, and both are returned.
fn nodes_common_to_all_paths(
    graph: &AssemblyGraph,
    paths: &[Vec<NodeId>],
    identify_twins: bool,
) -> Vec<NodeId> {
    if paths.is_empty() || paths.iter().any(|p| p.is_empty()) {
        return Vec::new();
    }

    let unit = |n: NodeId| {
        if identify_twins {
            n.min(graph.twin(n))
        } else {
            n
        }
    };

    let mut common: FnvHashSet<NodeId> =
        paths[0].iter().map(|&n| unit(n)).collect();
    for path in paths[1..].iter() {
        let this: FnvHashSet<NodeId> = path.iter().map(|&n| unit(n)).collect();
        common.retain(|n| this.contains(n));
    }

    let mut result: Vec<NodeId> = if identify_twins {
        common
            .into_iter()
            .flat_map(|n| vec![n, graph.twin(n)])
            .collect()
    } else {
        common.into_iter().collect()
    };
    result.sort();
    result.dedup();
    result
}

/// Pending status upgrades, merged before being applied so each node
/// gets the highest candidate.
#[derive(Default)]
struct Upgrades(FnvHashMap<NodeId, ContiguityStatus>);

impl Upgrades {
    fn add(&mut self, node: NodeId, status: ContiguityStatus) {
        let entry = self.0.entry(node).or_default();
        *entry = entry.merge(status);
    }

    fn apply(self, graph: &mut AssemblyGraph) -> usize {
        self.0
            .into_iter()
            .filter(|&(node, status)| graph.upgrade_contiguity(node, status))
            .count()
    }
}

/// A contiguity search over an assembly graph.
///
/// ```
/// use asmgraph::{AssemblyGraph, ContiguitySearch, ContiguityStatus};
///
/// let mut graph = AssemblyGraph::new();
/// let a = graph.add_node("1+", "ACGT", 1.0).unwrap();
/// let b = graph.add_node("2+", "GTCA", 1.0).unwrap();
/// graph.connect(a, b, 2).unwrap();
///
/// ContiguitySearch::new(&mut graph).run(&[a]);
/// assert_eq!(
///     graph.node(b).contiguity(),
///     ContiguityStatus::ContiguousStrandSpecific
/// );
/// ```
pub struct ContiguitySearch<'a> {
    graph: &'a mut AssemblyGraph,
    steps: usize,
    cancel: Option<&'a CancelToken>,
}

impl<'a> ContiguitySearch<'a> {
    pub fn new(graph: &'a mut AssemblyGraph) -> Self {
        ContiguitySearch {
            graph,
            steps: DEFAULT_SEARCH_STEPS,
            cancel: None,
        }
    }

    /// Maximum number of nodes followed from a seed along any path.
    pub fn steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn cancel_token(mut self, token: &'a CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Run the search from each seed in turn. Statuses are only ever
    /// raised, so running again with other seeds combines the results.
    /// Upgrades made before a cancellation are kept.
    pub fn run(mut self, seeds: &[NodeId]) -> SearchOutcome {
        if seeds.is_empty() {
            return SearchOutcome::Completed;
        }

        let mut upgraded = 0;
        for &seed in seeds {
            match self.search_from(seed) {
                Ok(n) => upgraded += n,
                Err(Cancelled) => {
                    debug!("Contiguity search cancelled at seed {:?}", seed);
                    return SearchOutcome::Cancelled;
                }
            }
        }

        self.graph.set_contiguity_search_done();
        debug!(
            "Contiguity search from {} seeds upgraded {} nodes",
            seeds.len(),
            upgraded
        );
        SearchOutcome::Completed
    }

    fn tracer(&self) -> Tracer<'_> {
        Tracer {
            graph: &*self.graph,
            steps: self.steps,
            cancel: self.cancel,
        }
    }

    fn search_from(&mut self, seed: NodeId) -> Traced<usize> {
        use ContiguityStatus::*;

        let mut upgraded = 0;
        let mut seed_upgrades = Upgrades::default();
        seed_upgrades.add(seed, ContiguousStrandSpecific);
        seed_upgrades.add(self.graph.twin(seed), ContiguousEitherStrand);
        upgraded += seed_upgrades.apply(self.graph);
        if self.steps == 0 {
            return Ok(upgraded);
        }

        let mut checked: BTreeSet<NodeId> = BTreeSet::new();

        // The downstream and upstream neighbour sets are classified
        // independently of each other.
        for &dir in [Direction::Downstream, Direction::Upstream].iter() {
            let mut paths = Vec::new();
            for first in self.tracer().next_nodes(seed, dir) {
                paths.extend(self.tracer().trace_paths(first, dir, seed)?);
            }
            if paths.is_empty() {
                continue;
            }

            let mut upgrades = Upgrades::default();
            for &node in paths.iter().flatten() {
                upgrades.add(node, MaybeContiguous);
                checked.insert(node);
            }
            for node in nodes_common_to_all_paths(self.graph, &paths, false) {
                upgrades.add(node, ContiguousStrandSpecific);
            }
            for node in nodes_common_to_all_paths(self.graph, &paths, true) {
                upgrades.add(node, ContiguousEitherStrand);
            }
            upgraded += upgrades.apply(self.graph);
        }

        for node in checked {
            let status = self.graph.node(node).contiguity();
            if status == ContiguousStrandSpecific {
                continue;
            }

            let mut upgrades = Upgrades::default();
            if self.tracer().leads_only_to(node, seed, false)? {
                upgrades.add(node, ContiguousStrandSpecific);
            }
            if status < ContiguousEitherStrand
                && self.tracer().leads_only_to(node, seed, true)?
            {
                upgrades.add(node, ContiguousEitherStrand);
                upgrades.add(self.graph.twin(node), ContiguousEitherStrand);
            }
            upgraded += upgrades.apply(self.graph);
        }

        Ok(upgraded)
    }
}

/// The status shown for a node. When only one strand is displayed, a
/// node is shown as contiguous only as confidently as the weaker of
/// itself and its twin.
pub fn display_status(
    graph: &AssemblyGraph,
    node: NodeId,
    single_strand: bool,
) -> ContiguityStatus {
    let status = graph.node(node).contiguity();
    if single_strand {
        status.min(graph.node(graph.twin(node)).contiguity())
    } else {
        status
    }
}

/// The drawn nodes whose displayed status matches `target`, or `None`
/// if no contiguity search has been done. A `ContiguousEitherStrand`
/// target matches both contiguous statuses. In single-strand mode only
/// one node per contig is returned.
pub fn nodes_by_contiguity(
    graph: &AssemblyGraph,
    target: ContiguityStatus,
    single_strand: bool,
) -> Option<Vec<NodeId>> {
    use ContiguityStatus::*;

    if !graph.contiguity_search_done() {
        return None;
    }

    let matches = |status: ContiguityStatus| match target {
        ContiguousEitherStrand | ContiguousStrandSpecific => {
            status.is_contiguous()
        }
        _ => status == target,
    };

    let nodes = graph
        .nodes()
        .filter(|(_, n)| n.is_drawn())
        .filter(|(id, n)| {
            !single_strand || n.is_positive() || graph.twin(*id) == *id
        })
        .map(|(id, _)| id)
        .filter(|&id| matches(display_status(graph, id, single_strand)))
        .collect();
    Some(nodes)
}
