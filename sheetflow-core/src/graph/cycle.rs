//! Cycle Detection
//!
//! Before a link is allowed to stand, the graph rebuilds a node-level
//! dependency view and checks it for cycles. The adjacency map is a local
//! value constructed fresh from the current links on every check — nothing
//! is cached or shared between checks, so the detector is reentrant by
//! construction.
//!
//! Edges run from the downstream (input-side) node to the upstream
//! (output-side) node. A depth-first search with an "on stack" marker set
//! finds back-edges; any back-edge is a cycle. The search keeps its own
//! explicit stack, so chain depth is bounded by memory, not by the call
//! stack.

use std::collections::{HashMap, HashSet};

use super::graph::Graph;
use super::node::NodeId;

/// Check whether the committed links already form a cycle.
pub fn has_cycle(graph: &Graph) -> bool {
    would_cycle(graph, None)
}

/// Check whether the committed links, plus an optional proposed
/// downstream→upstream edge, form a cycle.
pub(crate) fn would_cycle(graph: &Graph, proposed: Option<(NodeId, NodeId)>) -> bool {
    let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();

    for link in graph.links() {
        adjacency
            .entry(link.target_node())
            .or_default()
            .push(link.source_node());
    }
    if let Some((downstream, upstream)) = proposed {
        adjacency.entry(downstream).or_default().push(upstream);
    }

    let mut visited = HashSet::new();
    let roots: Vec<NodeId> = adjacency.keys().copied().collect();

    for root in roots {
        if !visited.contains(&root) && dfs(root, &adjacency, &mut visited) {
            return true;
        }
    }
    false
}

enum Step {
    Enter(NodeId),
    Leave(NodeId),
}

fn dfs(
    root: NodeId,
    adjacency: &HashMap<NodeId, Vec<NodeId>>,
    visited: &mut HashSet<NodeId>,
) -> bool {
    let mut on_stack = HashSet::new();
    let mut work = vec![Step::Enter(root)];

    while let Some(step) = work.pop() {
        match step {
            Step::Enter(node) => {
                if !visited.insert(node) {
                    continue;
                }
                on_stack.insert(node);
                work.push(Step::Leave(node));

                for &next in adjacency.get(&node).into_iter().flatten() {
                    if on_stack.contains(&next) {
                        return true;
                    }
                    if !visited.contains(&next) {
                        work.push(Step::Enter(next));
                    }
                }
            }
            Step::Leave(node) => {
                on_stack.remove(&node);
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::graph::{LinkOutcome, PortRef};
    use crate::graph::node::{Inputs, Node, NodeKind, ProcessError};
    use crate::graph::port::{PortId, PortSpec, PortType};
    use crate::value::Value;

    struct Pass;

    impl NodeKind for Pass {
        fn type_tag(&self) -> &'static str {
            "test.pass"
        }

        fn display_name(&self) -> &'static str {
            "Pass"
        }

        fn port_layout(&self) -> Vec<PortSpec> {
            vec![
                PortSpec::input(PortType::Numeric),
                PortSpec::output(PortType::Numeric),
            ]
        }

        fn process(&self, inputs: &Inputs<'_>) -> Result<Value, ProcessError> {
            Ok(inputs.value(&PortId::input(0)))
        }
    }

    #[test]
    fn empty_graph_has_no_cycle() {
        let graph = Graph::new();
        assert!(!has_cycle(&graph));
    }

    #[test]
    fn deep_chains_check_on_a_small_stack() {
        std::thread::Builder::new()
            .stack_size(256 * 1024)
            .spawn(|| {
                let mut graph = Graph::new();
                let ids: Vec<NodeId> = (0..2000)
                    .map(|_| graph.add_node(Node::new(Box::new(Pass))))
                    .collect();
                for pair in ids.windows(2) {
                    let outcome = graph.connect(
                        PortRef::new(pair[0], PortId::output(0)),
                        PortRef::new(pair[1], PortId::input(0)),
                    );
                    assert!(matches!(outcome, LinkOutcome::Committed(_)));
                }

                assert!(!has_cycle(&graph));
                // Closing the chain end-to-start is a cycle.
                assert!(would_cycle(&graph, Some((ids[0], *ids.last().unwrap()))));
            })
            .unwrap()
            .join()
            .unwrap();
    }

    #[test]
    fn proposed_back_edge_closes_a_chain() {
        let graph = Graph::new();
        let a = NodeId::new();
        let b = NodeId::new();

        // No committed links; a self-consistent proposal is fine.
        assert!(!would_cycle(&graph, Some((b, a))));
        // A proposed self-dependency is a cycle on its own.
        assert!(would_cycle(&graph, Some((a, a))));
    }
}
