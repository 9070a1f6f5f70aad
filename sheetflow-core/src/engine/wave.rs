//! Propagation Waves
//!
//! Change moves through the graph in waves. A wave starts from the set of
//! nodes whose values just changed, recomputes every downstream node that
//! is ready, and seeds the next wave from whatever actually changed.
//! Waves repeat until a wave produces no changes; on an acyclic graph
//! that always terminates.
//!
//! # Topological deferral
//!
//! A node is *ready* when, for every incoming link that did not trigger
//! it this wave, no transitive upstream ancestor of that link is itself
//! still due in the wave. A node that is not ready is deferred: its
//! triggering entries are carried into the next wave unchanged, so it
//! recomputes exactly once, after all of its inputs have settled. This is
//! what makes a diamond (A feeding B and C, both feeding D) recompute D a
//! single time with both fresh inputs.
//!
//! # Fault isolation
//!
//! Each recomputation is wrapped in a panic boundary. A kind that fails
//! or panics leaves its node's previous value standing, logs a warning,
//! and the rest of the wave proceeds. Faults never unwind into the
//! caller.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};

use rayon::prelude::*;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::graph::{Graph, GraphEvent, Inputs, LinkId, NodeId};

use super::effected::{EffectedNode, EffectedSet};

/// Outcome of recomputing one node.
enum ProcessOutcome {
    Changed,
    Unchanged,
    Fault,
}

/// Run propagation to completion from one changed source node.
///
/// Returns `false` when any recomputation faulted along the way; values
/// downstream of a faulted node may be stale. The wave itself always runs
/// to completion.
pub fn propagate(graph: &Graph, source: NodeId) -> bool {
    let mut clean = true;
    let mut wave = EffectedSet::from_source(graph, source);

    while !wave.is_empty() {
        debug!(pending = wave.len(), "running propagation wave");
        let mut ready: Vec<(NodeId, SmallVec<[LinkId; 2]>)> = Vec::new();
        let mut next = EffectedSet::new();

        for (node, triggering) in wave.targets() {
            if ok_to_process(graph, &wave, node, &triggering) {
                ready.push((node, triggering));
            } else {
                debug!(%node, "deferring until upstream settles");
                for link in triggering {
                    next.push(EffectedNode { link, node });
                }
            }
        }

        let results: Vec<(NodeId, ProcessOutcome)> = ready
            .par_iter()
            .map(|(node, _)| (*node, process_node(graph, *node)))
            .collect();

        for (node, outcome) in results {
            match outcome {
                ProcessOutcome::Changed => {
                    graph.emit(&GraphEvent::ValueChanged(node));
                    next.extend_from_source(graph, node);
                }
                ProcessOutcome::Unchanged => {}
                ProcessOutcome::Fault => clean = false,
            }
        }

        wave = next;
    }
    clean
}

/// Recompute a single node best-effort, outside any wave.
///
/// Returns `false` when the node is unknown or its compute step faulted.
pub fn try_update(graph: &Graph, node: NodeId) -> bool {
    match process_node(graph, node) {
        ProcessOutcome::Changed => {
            graph.emit(&GraphEvent::ValueChanged(node));
            true
        }
        ProcessOutcome::Unchanged => true,
        ProcessOutcome::Fault => false,
    }
}

/// Recompute a single node after a structural edit. Returns whether the
/// value changed, so the caller knows to start a wave.
pub(crate) fn refresh(graph: &Graph, node: NodeId) -> bool {
    match process_node(graph, node) {
        ProcessOutcome::Changed => {
            graph.emit(&GraphEvent::ValueChanged(node));
            true
        }
        _ => false,
    }
}

/// Whether the node may recompute this wave.
///
/// Every incoming link outside the triggering set is walked transitively
/// upstream; if any ancestor on such a path is still due in the wave, the
/// node must wait.
fn ok_to_process(
    graph: &Graph,
    wave: &EffectedSet,
    node: NodeId,
    triggering: &[LinkId],
) -> bool {
    for link in graph.incoming_links(node) {
        if triggering.contains(&link.id()) {
            continue;
        }
        if upstream_pending(graph, wave, link.source_node()) {
            return false;
        }
    }
    true
}

/// Whether `start` or any of its transitive upstream ancestors is due in
/// the wave.
fn upstream_pending(graph: &Graph, wave: &EffectedSet, start: NodeId) -> bool {
    let mut stack = vec![start];
    let mut visited = HashSet::new();

    while let Some(node) = stack.pop() {
        if !visited.insert(node) {
            continue;
        }
        if wave.contains_node(node) {
            return true;
        }
        for link in graph.incoming_links(node) {
            stack.push(link.source_node());
        }
    }
    false
}

fn process_node(graph: &Graph, node_id: NodeId) -> ProcessOutcome {
    let Some(node) = graph.node(node_id) else {
        warn!(%node_id, "recomputation requested for unknown node");
        return ProcessOutcome::Fault;
    };

    let inputs = Inputs::new(graph, node);
    let result = catch_unwind(AssertUnwindSafe(|| node.kind().process(&inputs)));

    match result {
        Ok(Ok(value)) => {
            if node.publish_value(value) {
                ProcessOutcome::Changed
            } else {
                ProcessOutcome::Unchanged
            }
        }
        Ok(Err(err)) => {
            warn!(%node_id, kind = node.kind().type_tag(), %err, "node process failed");
            ProcessOutcome::Fault
        }
        Err(_) => {
            warn!(%node_id, kind = node.kind().type_tag(), "node process panicked");
            ProcessOutcome::Fault
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Node, NodeKind, PortId, PortRef, PortSpec, PortType, ProcessError};
    use crate::value::Value;

    struct Source;

    impl NodeKind for Source {
        fn type_tag(&self) -> &'static str {
            "test.source"
        }

        fn display_name(&self) -> &'static str {
            "Source"
        }

        fn port_layout(&self) -> Vec<PortSpec> {
            vec![PortSpec::output(PortType::Numeric)]
        }

        fn process(&self, inputs: &Inputs<'_>) -> Result<Value, ProcessError> {
            Ok(inputs.current())
        }
    }

    struct Doubler;

    impl NodeKind for Doubler {
        fn type_tag(&self) -> &'static str {
            "test.doubler"
        }

        fn display_name(&self) -> &'static str {
            "Doubler"
        }

        fn port_layout(&self) -> Vec<PortSpec> {
            vec![
                PortSpec::input(PortType::Numeric),
                PortSpec::output(PortType::Numeric),
            ]
        }

        fn process(&self, inputs: &Inputs<'_>) -> Result<Value, ProcessError> {
            match inputs.value(&PortId::input(0)) {
                Value::Null => Ok(Value::Null),
                v => Ok(Value::Int(v.as_int()? * 2)),
            }
        }
    }

    struct Panicker;

    impl NodeKind for Panicker {
        fn type_tag(&self) -> &'static str {
            "test.panicker"
        }

        fn display_name(&self) -> &'static str {
            "Panicker"
        }

        fn port_layout(&self) -> Vec<PortSpec> {
            vec![
                PortSpec::input(PortType::Numeric),
                PortSpec::output(PortType::Numeric),
            ]
        }

        fn process(&self, _inputs: &Inputs<'_>) -> Result<Value, ProcessError> {
            panic!("boom");
        }
    }

    #[test]
    fn chain_propagates_to_the_end() {
        let mut graph = Graph::new();
        let a = graph.add_node(Node::new(Box::new(Source)));
        let b = graph.add_node(Node::new(Box::new(Doubler)));
        let c = graph.add_node(Node::new(Box::new(Doubler)));

        graph.connect(
            PortRef::new(a, PortId::output(0)),
            PortRef::new(b, PortId::input(0)),
        );
        graph.connect(
            PortRef::new(b, PortId::output(0)),
            PortRef::new(c, PortId::input(0)),
        );

        graph.set_value(a, Value::Int(3)).unwrap();
        assert_eq!(graph.node(b).unwrap().value(), Value::Int(6));
        assert_eq!(graph.node(c).unwrap().value(), Value::Int(12));
    }

    #[test]
    fn panicking_kind_leaves_previous_value_standing() {
        let mut graph = Graph::new();
        let a = graph.add_node(Node::new(Box::new(Source)));
        let b = graph.add_node(Node::new(Box::new(Panicker)));
        graph.node(b).unwrap().silent_set_value(Value::Int(99));

        graph.connect(
            PortRef::new(a, PortId::output(0)),
            PortRef::new(b, PortId::input(0)),
        );

        graph.set_value(a, Value::Int(1)).unwrap();
        assert_eq!(graph.node(b).unwrap().value(), Value::Int(99));
    }

    #[test]
    fn try_update_reports_fault() {
        let mut graph = Graph::new();
        let a = graph.add_node(Node::new(Box::new(Source)));
        let bad = graph.add_node(Node::new(Box::new(Panicker)));

        assert!(try_update(&graph, a));
        assert!(!try_update(&graph, bad));
        assert!(!try_update(&graph, NodeId::new()));
    }
}
