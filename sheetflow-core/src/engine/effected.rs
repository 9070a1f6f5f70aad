//! Effected Sets
//!
//! When a node's value changes, every committed link leaving it names one
//! downstream node that must react. An [`EffectedSet`] is the working set
//! of one propagation wave: `(link, node)` pairs recording not just which
//! nodes are due, but *which link* made them due. The triggering links are
//! what lets the wave tell fresh inputs apart from inputs that may still
//! be in flight.

use std::collections::HashSet;

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::graph::{Graph, LinkId, NodeId};

/// One pending recomputation: `node` is due because `link` carried a
/// changed value to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectedNode {
    pub link: LinkId,
    pub node: NodeId,
}

/// The working set of one propagation wave.
#[derive(Debug, Default)]
pub struct EffectedSet {
    entries: Vec<EffectedNode>,
    nodes: HashSet<NodeId>,
}

impl EffectedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a set from a single changed node: one entry per outgoing link.
    pub fn from_source(graph: &Graph, source: NodeId) -> Self {
        let mut set = Self::new();
        set.extend_from_source(graph, source);
        set
    }

    /// Add the downstream pairs of one more changed node.
    pub fn extend_from_source(&mut self, graph: &Graph, source: NodeId) {
        for link in graph.outgoing_links(source) {
            self.push(EffectedNode {
                link: link.id(),
                node: link.target_node(),
            });
        }
    }

    /// Add one pending pair, skipping exact duplicates.
    pub fn push(&mut self, entry: EffectedNode) {
        if self.entries.contains(&entry) {
            return;
        }
        self.nodes.insert(entry.node);
        self.entries.push(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the node is due for recomputation in this wave.
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }

    pub fn entries(&self) -> &[EffectedNode] {
        &self.entries
    }

    /// The distinct due nodes, in first-appearance order, each with the
    /// links that made it due. A node fed by several changed upstreams in
    /// the same wave appears once, with all of its triggering links.
    pub fn targets(&self) -> Vec<(NodeId, SmallVec<[LinkId; 2]>)> {
        let mut grouped: IndexMap<NodeId, SmallVec<[LinkId; 2]>> = IndexMap::new();
        for entry in &self.entries {
            grouped.entry(entry.node).or_default().push(entry.link);
        }
        grouped.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_entries_collapse() {
        let mut set = EffectedSet::new();
        let node = NodeId::new();
        let link = LinkId::next();

        set.push(EffectedNode { link, node });
        set.push(EffectedNode { link, node });
        assert_eq!(set.len(), 1);
        assert!(set.contains_node(node));
    }

    #[test]
    fn targets_group_links_per_node() {
        let mut set = EffectedSet::new();
        let node = NodeId::new();
        let other = NodeId::new();
        let l1 = LinkId::next();
        let l2 = LinkId::next();
        let l3 = LinkId::next();

        set.push(EffectedNode { link: l1, node });
        set.push(EffectedNode { link: l2, node: other });
        set.push(EffectedNode { link: l3, node });

        let targets = set.targets();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].0, node);
        assert_eq!(targets[0].1.as_slice(), &[l1, l3]);
        assert_eq!(targets[1].1.as_slice(), &[l2]);
    }
}
