//! Nodes
//!
//! A node is the computation unit of the sheet: it owns a fixed set of
//! ports, holds the one `Value` it publishes, and derives that value from
//! its inputs through its [`NodeKind`].
//!
//! # Kinds
//!
//! Per-kind behavior goes through a closed trait rather than runtime type
//! lookup: a kind declares its port layout up front, computes in
//! [`NodeKind::process`], and describes its extra persisted fields with an
//! explicit codec pair ([`NodeKind::save_fields`] / [`NodeKind::load_fields`]).
//! `process` must be a pure function of the current input values; its only
//! effect is the value the engine publishes for the node.
//!
//! # Concurrency
//!
//! The published value sits behind its own lock. During a propagation wave
//! every worker writes only its own node's value and reads other nodes'
//! already-published values, so the per-node lock is the entire
//! synchronization story.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::value::{Value, ValueError};

use super::graph::Graph;
use super::port::{Port, PortDirection, PortId, PortSpec};

/// Stable identity of a node, persisted as its `Guid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(Uuid);

impl NodeId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Failure raised by a node kind's compute step.
///
/// The engine catches these and degrades to "value stays stale"; they never
/// cross the propagation boundary as panics or crashes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("process failed: {0}")]
    Failed(String),
}

/// Read-only view of a node's inputs, handed to [`NodeKind::process`].
///
/// All reads go through committed links only, in link-creation order.
pub struct Inputs<'a> {
    graph: &'a Graph,
    node: &'a Node,
}

impl<'a> Inputs<'a> {
    pub(crate) fn new(graph: &'a Graph, node: &'a Node) -> Self {
        Self { graph, node }
    }

    /// The node's own currently published value.
    ///
    /// Source kinds with no inputs return this unchanged so recomputation
    /// is idempotent.
    pub fn current(&self) -> Value {
        self.node.value()
    }

    /// Value arriving at one input port: the connected source node's
    /// current value via the first committed link, or `Null` when
    /// unconnected.
    pub fn value(&self, port: &PortId) -> Value {
        self.graph.input_value(self.node.id(), port)
    }

    /// Whether the given port has at least one committed link.
    pub fn has_links(&self, port: &PortId) -> bool {
        self.graph.link_count_at(self.node.id(), port) != 0
    }

    /// Values of every linked source across all input ports, in
    /// link-creation order, skipping `Null`s. This is the read path for
    /// kinds with variable-arity input growth.
    pub fn values(&self) -> Vec<Value> {
        let mut out = Vec::new();
        for port in self.node.input_ports() {
            out.extend(self.graph.input_values(self.node.id(), port.id()));
        }
        out
    }
}

/// Behavior of one kind of node.
///
/// Implementations are registered with the
/// [`NodeRegistry`](crate::registry::NodeRegistry) under their `type_tag`,
/// which is also the `NodeType` of the persisted record.
pub trait NodeKind: Send + Sync {
    /// Stable tag identifying this kind in the registry and on disk.
    fn type_tag(&self) -> &'static str;

    /// Human-readable kind name, used when a node has no alias.
    fn display_name(&self) -> &'static str;

    /// Ports this kind declares at construction.
    fn port_layout(&self) -> Vec<PortSpec>;

    /// Value a fresh node of this kind starts with.
    fn initial_value(&self) -> Value {
        Value::Null
    }

    /// Whether the graph may append further input ports once the declared
    /// ones are all occupied.
    fn allows_input_growth(&self) -> bool {
        false
    }

    /// Derive this node's value from its inputs. Must be pure in the
    /// current input values.
    fn process(&self, inputs: &Inputs<'_>) -> Result<Value, ProcessError>;

    /// Extra persisted fields, by explicit schema. Defaults to none.
    fn save_fields(&self) -> serde_json::Map<String, serde_json::Value> {
        serde_json::Map::new()
    }

    /// Restore extra persisted fields. Unknown or malformed entries are
    /// ignored.
    fn load_fields(&mut self, _fields: &serde_json::Map<String, serde_json::Value>) {}
}

/// A node in the sheet graph.
///
/// The node exclusively owns its ports; a port never outlives its node.
pub struct Node {
    id: NodeId,
    alias: String,
    kind: Box<dyn NodeKind>,
    ports: Vec<Port>,
    value: RwLock<Value>,
    last_update: RwLock<DateTime<Utc>>,
    position: (f64, f64),
    size: Option<(f64, f64)>,
}

impl Node {
    /// Construct a node of the given kind, instantiating its declared
    /// ports with positional ids.
    pub fn new(kind: Box<dyn NodeKind>) -> Self {
        let id = NodeId::new();
        let mut ports = Vec::new();
        let mut inputs = 0usize;
        let mut outputs = 0usize;
        for spec in kind.port_layout() {
            let port_id = match spec.direction {
                PortDirection::Input => {
                    let pid = PortId::input(inputs);
                    inputs += 1;
                    pid
                }
                PortDirection::Output => {
                    let pid = PortId::output(outputs);
                    outputs += 1;
                    pid
                }
            };
            ports.push(Port::from_spec(id, port_id, &spec));
        }
        let value = kind.initial_value();
        Self {
            id,
            alias: String::new(),
            kind,
            ports,
            value: RwLock::new(value),
            last_update: RwLock::new(Utc::now()),
            position: (0.0, 0.0),
            size: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Replace the id, re-stamping the owned ports. Used when restoring a
    /// persisted node.
    pub(crate) fn set_id(&mut self, id: NodeId) {
        self.id = id;
        for port in &mut self.ports {
            *port = Port::from_spec(id, port.id().clone(), &port.spec());
        }
    }

    pub fn kind(&self) -> &dyn NodeKind {
        self.kind.as_ref()
    }

    pub(crate) fn kind_mut(&mut self) -> &mut dyn NodeKind {
        self.kind.as_mut()
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn set_alias(&mut self, alias: impl Into<String>) {
        self.alias = alias.into();
    }

    /// Alias when set, otherwise the kind's display name.
    pub fn display_name(&self) -> &str {
        if self.alias.is_empty() {
            self.kind.display_name()
        } else {
            &self.alias
        }
    }

    /// The currently published value.
    pub fn value(&self) -> Value {
        self.value.read().clone()
    }

    /// Overwrite the value without touching the update timestamp or
    /// notifying anyone. Used when seeding a node before it joins the
    /// graph.
    pub fn silent_set_value(&self, value: Value) {
        *self.value.write() = value;
    }

    /// Publish a new value. Returns `false` (and writes nothing) when the
    /// value is structurally unchanged, which is what makes repeated
    /// recomputation idempotent.
    pub(crate) fn publish_value(&self, value: Value) -> bool {
        {
            let current = self.value.read();
            if *current == value {
                return false;
            }
        }
        *self.value.write() = value;
        *self.last_update.write() = Utc::now();
        true
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        *self.last_update.read()
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn set_position(&mut self, x: f64, y: f64) {
        self.position = (x, y);
    }

    pub fn size(&self) -> Option<(f64, f64)> {
        self.size
    }

    pub fn set_size(&mut self, size: Option<(f64, f64)>) {
        self.size = size;
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn port(&self, id: &PortId) -> Option<&Port> {
        self.ports.iter().find(|p| p.id() == id)
    }

    pub fn input_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| p.is_input())
    }

    pub fn output_ports(&self) -> impl Iterator<Item = &Port> {
        self.ports.iter().filter(|p| !p.is_input())
    }

    /// Append one more input port, cloned from the last declared input.
    /// Only meaningful for kinds with [`NodeKind::allows_input_growth`].
    pub(crate) fn grow_input_port(&mut self) {
        let count = self.input_ports().count();
        let Some(template) = self.input_ports().last() else {
            return;
        };
        let spec = template.spec();
        self.ports
            .push(Port::from_spec(self.id, PortId::input(count), &spec));
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind.type_tag())
            .field("alias", &self.alias)
            .field("value", &self.value())
            .field("ports", &self.ports.len())
            .finish()
    }
}
