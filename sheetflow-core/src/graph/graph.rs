//! Sheet Graph
//!
//! The graph owns the node and link collections and is the only place
//! structural mutation happens. Everything the invariants promise — no
//! self-loops, normalized link direction, singular-input capacity,
//! acyclicity — is enforced here, at the mutation boundary.
//!
//! # Link Validation
//!
//! A connection attempt is a proposal that moves through a small state
//! machine before anything is stored:
//!
//! - still under interactive edit → deferred, no transition
//! - would close a cycle → rejected
//! - same port, or two ports of the same direction → rejected
//! - drawn backwards (input as source) → reversed: revalidated with the
//!   endpoints swapped, so the stored model is always output→input
//! - otherwise → committed, and the target node is scheduled to recompute
//!
//! A link therefore never exists in an invalid state: it is committed,
//! corrected, or discarded within the same call.
//!
//! # Concurrency
//!
//! Structural mutation takes `&mut self` and must be serialized by the
//! caller; propagation waves run against `&self` and write only per-node
//! values. The borrow checker enforces the split.

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::engine::wave;
use crate::value::Value;

use super::cycle;
use super::event::{GraphEvent, ObserverFn, ObserverId};
use super::link::{Link, LinkId};
use super::node::{Node, NodeId};
use super::port::{PortDirection, PortId};

/// Errors for operations addressed at a node that must exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("unknown node {0}")]
    UnknownNode(NodeId),
}

/// One endpoint of a connection attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRef {
    pub node: NodeId,
    pub port: PortId,
}

impl PortRef {
    pub fn new(node: NodeId, port: PortId) -> Self {
        Self { node, port }
    }
}

/// A connection attempt. `finalized` is false while the host's editing
/// surface is still dragging the endpoint around; validation waits until
/// the proposal is let go.
#[derive(Debug, Clone)]
pub struct LinkProposal {
    pub source: PortRef,
    pub target: PortRef,
    pub finalized: bool,
}

impl LinkProposal {
    pub fn new(source: PortRef, target: PortRef) -> Self {
        Self {
            source,
            target,
            finalized: true,
        }
    }

    pub fn pending(source: PortRef, target: PortRef) -> Self {
        Self {
            source,
            target,
            finalized: false,
        }
    }
}

/// Why a proposal was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A named node or port does not exist.
    UnknownEndpoint,
    /// Both endpoints are the same port.
    SamePort,
    /// Both endpoints face the same direction.
    SameDirection,
    /// Committing would close a cycle in the dependency graph.
    WouldCycle,
    /// The capability check refused: self-loop, occupied singular input,
    /// or incompatible type tags.
    CannotAttach,
}

/// Result of a connection attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The link stands as proposed.
    Committed(LinkId),
    /// The proposal was drawn backwards; the stored link has the
    /// endpoints swapped.
    Reversed(LinkId),
    /// The proposal was discarded; the graph is unchanged.
    Rejected(RejectReason),
    /// The proposal is still under interactive edit; nothing happened.
    Deferred,
}

/// The mutable dataflow graph: nodes, links, and their observers.
#[derive(Default)]
pub struct Graph {
    nodes: IndexMap<NodeId, Node>,
    links: IndexMap<LinkId, Link>,
    observers: Vec<(ObserverId, ObserverFn)>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Register an observer for structural and value-change events.
    pub fn subscribe<F>(&mut self, observer: F) -> ObserverId
    where
        F: Fn(&GraphEvent) + Send + Sync + 'static,
    {
        let id = ObserverId::new();
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Remove a previously registered observer.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub(crate) fn emit(&self, event: &GraphEvent) {
        for (_, observer) in &self.observers {
            observer(event);
        }
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(&id)
    }

    /// All committed links, in creation order.
    pub fn links(&self) -> impl Iterator<Item = &Link> {
        self.links.values()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Committed links incident to one port, in creation order.
    pub fn links_at<'a>(
        &'a self,
        node: NodeId,
        port: &'a PortId,
    ) -> impl Iterator<Item = &'a Link> {
        self.links.values().filter(move |l| l.is_at(node, port))
    }

    pub fn link_count_at(&self, node: NodeId, port: &PortId) -> usize {
        self.links_at(node, port).count()
    }

    pub fn incoming_links(&self, node: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.target_node() == node)
    }

    pub fn outgoing_links(&self, node: NodeId) -> impl Iterator<Item = &Link> {
        self.links.values().filter(move |l| l.source_node() == node)
    }

    pub fn has_outgoing_links(&self, node: NodeId) -> bool {
        self.outgoing_links(node).next().is_some()
    }

    // ------------------------------------------------------------------
    // Input reads
    // ------------------------------------------------------------------

    /// Value arriving at an input port: the connected source node's
    /// current value through the first committed link in creation order,
    /// or `Null` when unconnected.
    pub fn input_value(&self, node: NodeId, port: &PortId) -> Value {
        match self.links_at(node, port).next() {
            Some(link) => self
                .nodes
                .get(&link.source_node())
                .map(|n| n.value())
                .unwrap_or(Value::Null),
            None => Value::Null,
        }
    }

    /// Values arriving through every committed link at an input port, in
    /// creation order. `Null` source values are skipped.
    pub fn input_values(&self, node: NodeId, port: &PortId) -> Vec<Value> {
        self.links_at(node, port)
            .filter_map(|link| self.nodes.get(&link.source_node()))
            .map(|n| n.value())
            .filter(|v| !v.is_null())
            .collect()
    }

    // ------------------------------------------------------------------
    // Structural mutation
    // ------------------------------------------------------------------

    /// Add a node and announce it.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = node.id();
        self.nodes.insert(id, node);
        self.emit(&GraphEvent::NodeAdded(id));
        id
    }

    /// Remove a node, cascading to every incident link. Nodes on the far
    /// side of removed links recompute, since one of their inputs is gone.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node> {
        self.nodes.get(&id)?;

        let incident: Vec<LinkId> = self
            .links
            .values()
            .filter(|l| l.touches(id))
            .map(|l| l.id())
            .collect();

        let mut survivors = Vec::new();
        for link_id in incident {
            if let Some(link) = self.links.shift_remove(&link_id) {
                let other = if link.source_node() == id {
                    link.target_node()
                } else {
                    link.source_node()
                };
                survivors.push(other);
                self.emit(&GraphEvent::LinkRemoved(link_id));
            }
        }

        let node = self.nodes.shift_remove(&id);
        self.emit(&GraphEvent::NodeRemoved(id));

        for other in survivors {
            if wave::refresh(self, other) {
                wave::propagate(self, other);
            }
        }
        node
    }

    /// Attempt a connection with a finalized proposal.
    pub fn connect(&mut self, source: PortRef, target: PortRef) -> LinkOutcome {
        self.connect_proposal(LinkProposal::new(source, target))
    }

    /// Run a connection proposal through the validation state machine.
    pub fn connect_proposal(&mut self, proposal: LinkProposal) -> LinkOutcome {
        if !proposal.finalized {
            return LinkOutcome::Deferred;
        }
        let LinkProposal { source, target, .. } = proposal;

        let (Some(source_port), Some(target_port)) = (
            self.nodes
                .get(&source.node)
                .and_then(|n| n.port(&source.port)),
            self.nodes
                .get(&target.node)
                .and_then(|n| n.port(&target.port)),
        ) else {
            return LinkOutcome::Rejected(RejectReason::UnknownEndpoint);
        };

        if source == target {
            return LinkOutcome::Rejected(RejectReason::SamePort);
        }
        if source_port.direction() == target_port.direction() {
            return LinkOutcome::Rejected(RejectReason::SameDirection);
        }

        // The dependency edge runs from the input side (downstream) to the
        // output side (upstream), whichever way the proposal was drawn.
        let backwards = source_port.direction() == PortDirection::Input;
        let (downstream, upstream) = if backwards {
            (source.node, target.node)
        } else {
            (target.node, source.node)
        };
        if cycle::would_cycle(self, Some((downstream, upstream))) {
            debug!(%downstream, %upstream, "link rejected: would close a cycle");
            return LinkOutcome::Rejected(RejectReason::WouldCycle);
        }

        // Built backwards: recreate with the endpoints swapped and
        // revalidate the new proposal.
        if backwards {
            return match self.connect_proposal(LinkProposal::new(target, source)) {
                LinkOutcome::Committed(id) => LinkOutcome::Reversed(id),
                other => other,
            };
        }

        if !source_port.can_attach_to(target_port, self) {
            return LinkOutcome::Rejected(RejectReason::CannotAttach);
        }

        let link = Link::new(
            source.node,
            source.port.clone(),
            target.node,
            target.port.clone(),
        );
        let link_id = link.id();
        self.links.insert(link_id, link);
        self.emit(&GraphEvent::LinkAdded(link_id));

        self.grow_if_needed(target.node);

        // The target's inputs changed; recompute it and let the wave run.
        if wave::refresh(self, target.node) {
            wave::propagate(self, target.node);
        }

        LinkOutcome::Committed(link_id)
    }

    /// Remove a committed link. Both endpoint nodes recompute, since an
    /// input (or a consumer) just went away.
    pub fn disconnect(&mut self, id: LinkId) -> bool {
        let Some(link) = self.links.shift_remove(&id) else {
            return false;
        };
        self.emit(&GraphEvent::LinkRemoved(id));

        for endpoint in [link.source_node(), link.target_node()] {
            if wave::refresh(self, endpoint) {
                wave::propagate(self, endpoint);
            }
        }
        true
    }

    /// Publish a new value for a node and propagate downstream.
    ///
    /// Returns whether the value actually changed. Propagation faults are
    /// degraded to a warning; the value itself always stands.
    pub fn set_value(&mut self, node: NodeId, value: Value) -> Result<bool, GraphError> {
        let n = self
            .nodes
            .get(&node)
            .ok_or(GraphError::UnknownNode(node))?;

        if !n.publish_value(value) {
            return Ok(false);
        }
        self.emit(&GraphEvent::ValueChanged(node));

        if self.has_outgoing_links(node) && !wave::propagate(self, node) {
            warn!(%node, "propagation reported a fault; downstream values may be stale");
        }
        Ok(true)
    }

    /// Append a spare input port on kinds that declare input growth, once
    /// every existing input is occupied.
    fn grow_if_needed(&mut self, node_id: NodeId) {
        let should_grow = match self.nodes.get(&node_id) {
            Some(node) => {
                node.kind().allows_input_growth()
                    && node
                        .input_ports()
                        .all(|p| self.link_count_at(node_id, p.id()) != 0)
            }
            None => false,
        };
        if should_grow {
            if let Some(node) = self.nodes.get_mut(&node_id) {
                node.grow_input_port();
            }
        }
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("links", &self.links.len())
            .field("observers", &self.observers.len())
            .finish()
    }
}
