//! Sheets
//!
//! A sheet is the unit of persistence: a named, versioned document whose
//! `Data` payload is the JSON array of node records for one graph. The
//! sheet owns the live graph when loaded and just the payload when not.
//!
//! # Loading
//!
//! Restore is two-phase. First every record becomes a node: the registry
//! constructs the kind from the record's `NodeType`, then identity,
//! layout, kind fields, and the raw value are applied. Then every
//! embedded link record is replayed through the graph's normal connect
//! validation, so a hand-edited or stale payload can never smuggle in a
//! cycle or a dangling endpoint. Malformed records, unknown kinds, and
//! rejected links are skipped with a warning; one bad record never takes
//! down the rest of the sheet.

pub mod record;

pub use record::{NodeRecord, PointRecord, SizeRecord};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::graph::{Graph, LinkOutcome, Node, PortRef};
use crate::registry::NodeRegistry;

/// Errors raised by sheet persistence.
#[derive(Debug, Error)]
pub enum SheetError {
    #[error("sheet payload is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("sheet is already loaded")]
    AlreadyLoaded,
}

/// Whether the sheet currently owns a live graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetState {
    Unloaded,
    Loaded,
}

/// Wire form of a stored sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetEnvelope {
    #[serde(rename = "Guid")]
    pub guid: Uuid,

    #[serde(rename = "Name")]
    pub name: String,

    /// JSON array of node records, stored as a string payload.
    #[serde(rename = "Data")]
    pub data: String,

    #[serde(rename = "Version")]
    pub version: u32,
}

type StateObserver = Box<dyn Fn(SheetState) + Send + Sync>;

/// A named, versioned sheet document and (when loaded) its live graph.
pub struct Sheet {
    guid: Uuid,
    name: String,
    data: String,
    version: u32,
    state: SheetState,
    graph: Graph,
    registry: Arc<NodeRegistry>,
    state_observers: Vec<StateObserver>,
}

impl Sheet {
    /// A fresh, empty, unloaded sheet.
    pub fn new(name: impl Into<String>, registry: Arc<NodeRegistry>) -> Self {
        Self {
            guid: Uuid::new_v4(),
            name: name.into(),
            data: "[]".to_owned(),
            version: 0,
            state: SheetState::Unloaded,
            graph: Graph::new(),
            registry,
            state_observers: Vec::new(),
        }
    }

    /// Rehydrate a sheet from its stored envelope. The graph stays
    /// unloaded until [`Sheet::load`].
    pub fn from_envelope(envelope: SheetEnvelope, registry: Arc<NodeRegistry>) -> Self {
        Self {
            guid: envelope.guid,
            name: envelope.name,
            data: envelope.data,
            version: envelope.version,
            state: SheetState::Unloaded,
            graph: Graph::new(),
            registry,
            state_observers: Vec::new(),
        }
    }

    pub fn guid(&self) -> Uuid {
        self.guid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn state(&self) -> SheetState {
        self.state
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Observe load/unload transitions.
    pub fn on_state_change<F>(&mut self, observer: F)
    where
        F: Fn(SheetState) + Send + Sync + 'static,
    {
        self.state_observers.push(Box::new(observer));
    }

    fn set_state(&mut self, state: SheetState) {
        self.state = state;
        for observer in &self.state_observers {
            observer(state);
        }
    }

    /// Serialize the live graph to a record-array payload without
    /// touching the stored one.
    pub fn save_data(&self) -> Result<String, SheetError> {
        let records: Vec<NodeRecord> = self
            .graph
            .nodes()
            .map(|node| NodeRecord::from_node(node, &self.graph))
            .collect();
        Ok(serde_json::to_string(&records)?)
    }

    /// Replace the stored payload with the live graph and bump the
    /// version.
    pub fn update_save_data(&mut self) -> Result<(), SheetError> {
        self.data = self.save_data()?;
        self.version += 1;
        Ok(())
    }

    /// The stored wire form.
    pub fn envelope(&self) -> SheetEnvelope {
        SheetEnvelope {
            guid: self.guid,
            name: self.name.clone(),
            data: self.data.clone(),
            version: self.version,
        }
    }

    /// Build the live graph from the stored payload.
    ///
    /// Fails only when the payload is not a JSON array; individual bad
    /// records and bad links are skipped with a warning.
    pub fn load(&mut self) -> Result<(), SheetError> {
        if self.state == SheetState::Loaded {
            return Err(SheetError::AlreadyLoaded);
        }
        let raw: Vec<serde_json::Value> = serde_json::from_str(&self.data)?;

        // Phase one: nodes.
        let mut records = Vec::new();
        for entry in raw {
            match serde_json::from_value::<NodeRecord>(entry) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(sheet = %self.guid, %err, "skipping malformed node record");
                }
            }
        }

        for record in &records {
            let Some(kind) = self.registry.create(&record.node_type) else {
                warn!(
                    sheet = %self.guid,
                    node_type = %record.node_type,
                    "skipping record with unregistered node type"
                );
                continue;
            };
            let mut node = Node::new(kind);
            if self.graph.node(record.guid).is_some() {
                warn!(
                    sheet = %self.guid,
                    guid = %record.guid,
                    "duplicate node guid in payload, assigning a fresh one"
                );
            } else {
                node.set_id(record.guid);
            }
            node.set_alias(record.alias.clone());
            node.set_position(record.position.x, record.position.y);
            node.set_size(record.size.map(|s| (s.w, s.h)));
            node.kind_mut().load_fields(&record.fields);
            node.silent_set_value(record.raw_value.clone());

            // Growth kinds may have persisted links on ports beyond the
            // declared layout; regrow up to the highest recorded input so
            // link replay finds its endpoints.
            if node.kind().allows_input_growth() {
                let needed = record
                    .links
                    .iter()
                    .filter_map(|l| l.target_port_guid.input_index())
                    .max()
                    .map_or(0, |i| i + 1);
                while node.input_ports().count() < needed {
                    node.grow_input_port();
                }
            }

            self.graph.add_node(node);
        }

        // Phase two: links, replayed through normal validation.
        for record in &records {
            for link in &record.links {
                let outcome = self.graph.connect(
                    PortRef::new(link.source_guid, link.source_port_guid.clone()),
                    PortRef::new(link.target_guid, link.target_port_guid.clone()),
                );
                match outcome {
                    LinkOutcome::Committed(_) | LinkOutcome::Reversed(_) => {}
                    other => {
                        warn!(
                            sheet = %self.guid,
                            source = %link.source_guid,
                            target = %link.target_guid,
                            ?other,
                            "skipping persisted link that failed validation"
                        );
                    }
                }
            }
        }

        info!(
            sheet = %self.guid,
            nodes = self.graph.node_count(),
            links = self.graph.link_count(),
            "sheet loaded"
        );
        self.set_state(SheetState::Loaded);
        Ok(())
    }

    /// Drop the live graph, keeping the stored payload as-is.
    pub fn unload(&mut self) {
        self.graph = Graph::new();
        self.set_state(SheetState::Unloaded);
    }
}

impl std::fmt::Debug for Sheet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sheet")
            .field("guid", &self.guid)
            .field("name", &self.name)
            .field("version", &self.version)
            .field("state", &self.state)
            .field("nodes", &self.graph.node_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeId, PortId};
    use crate::nodes::{AddNode, ConstantNode, SumNode};
    use crate::value::Value;

    fn registry() -> Arc<NodeRegistry> {
        Arc::new(NodeRegistry::with_builtins())
    }

    fn build_pair(sheet: &mut Sheet) -> (NodeId, NodeId) {
        let graph = sheet.graph_mut();
        let c = graph.add_node(Node::new(Box::new(ConstantNode)));
        let add = graph.add_node(Node::new(Box::new(AddNode::default())));
        graph.set_value(c, Value::Int(6)).unwrap();
        let outcome = graph.connect(
            PortRef::new(c, PortId::output(0)),
            PortRef::new(add, PortId::input(0)),
        );
        assert!(matches!(outcome, LinkOutcome::Committed(_)));
        (c, add)
    }

    #[test]
    fn save_then_load_restores_structure_and_values() {
        let mut sheet = Sheet::new("totals", registry());
        let (c, add) = build_pair(&mut sheet);
        sheet.update_save_data().unwrap();
        assert_eq!(sheet.version(), 1);

        let mut restored = Sheet::from_envelope(sheet.envelope(), registry());
        restored.load().unwrap();

        let graph = restored.graph();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.link_count(), 1);
        assert_eq!(graph.node(c).unwrap().value(), Value::Int(6));
        assert_eq!(graph.node(add).unwrap().value(), Value::Int(6));
    }

    #[test]
    fn links_on_grown_ports_survive_reload() {
        let registry = registry();
        let mut sheet = Sheet::new("grown", Arc::clone(&registry));

        let graph = sheet.graph_mut();
        let a = graph.add_node(Node::new(Box::new(ConstantNode)));
        let b = graph.add_node(Node::new(Box::new(ConstantNode)));
        let sum = graph.add_node(Node::new(Box::new(SumNode)));
        graph.set_value(a, Value::Int(2)).unwrap();
        graph.set_value(b, Value::Int(5)).unwrap();

        let first = graph.connect(
            PortRef::new(a, PortId::output(0)),
            PortRef::new(sum, PortId::input(0)),
        );
        let LinkOutcome::Committed(first_id) = first else {
            panic!("commit expected, got {first:?}");
        };
        let second = graph.connect(
            PortRef::new(b, PortId::output(0)),
            PortRef::new(sum, PortId::input(1)),
        );
        assert!(matches!(second, LinkOutcome::Committed(_)));

        // Leave only the link on the grown port.
        assert!(graph.disconnect(first_id));
        assert_eq!(graph.node(sum).unwrap().value(), Value::Int(5));

        sheet.update_save_data().unwrap();
        let mut restored = Sheet::from_envelope(sheet.envelope(), registry);
        restored.load().unwrap();

        let graph = restored.graph();
        assert_eq!(graph.link_count(), 1);
        let link = graph.links().next().unwrap();
        assert_eq!(link.target_node(), sum);
        assert_eq!(link.target_port(), &PortId::input(1));
        assert_eq!(graph.node(sum).unwrap().value(), Value::Int(5));
    }

    #[test]
    fn load_twice_is_an_error() {
        let mut sheet = Sheet::new("x", registry());
        sheet.load().unwrap();
        assert!(matches!(sheet.load(), Err(SheetError::AlreadyLoaded)));
    }

    #[test]
    fn unknown_node_type_is_skipped() {
        let mut sheet = Sheet::new("partial", registry());
        build_pair(&mut sheet);
        sheet.update_save_data().unwrap();

        let mut envelope = sheet.envelope();
        envelope.data = envelope.data.replace("core.add", "plugin.mystery");
        let mut restored = Sheet::from_envelope(envelope, registry());
        restored.load().unwrap();

        // The constant survives; the unknown node and its link do not.
        assert_eq!(restored.graph().node_count(), 1);
        assert_eq!(restored.graph().link_count(), 0);
    }

    #[test]
    fn garbage_payload_is_malformed() {
        let envelope = SheetEnvelope {
            guid: Uuid::new_v4(),
            name: "bad".into(),
            data: "not json".into(),
            version: 3,
        };
        let mut sheet = Sheet::from_envelope(envelope, registry());
        assert!(matches!(sheet.load(), Err(SheetError::Malformed(_))));
        assert_eq!(sheet.state(), SheetState::Unloaded);
    }

    #[test]
    fn unload_drops_the_graph_but_keeps_the_payload() {
        let mut sheet = Sheet::new("keep", registry());
        build_pair(&mut sheet);
        sheet.update_save_data().unwrap();
        let payload = sheet.envelope().data;

        sheet.unload();
        assert_eq!(sheet.state(), SheetState::Unloaded);
        assert_eq!(sheet.graph().node_count(), 0);
        assert_eq!(sheet.envelope().data, payload);
    }

    #[test]
    fn state_observers_hear_transitions() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let mut sheet = Sheet::new("obs", registry());
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&loads);
        sheet.on_state_change(move |state| {
            if state == SheetState::Loaded {
                counter.fetch_add(1, Ordering::Relaxed);
            }
        });

        sheet.load().unwrap();
        assert_eq!(loads.load(Ordering::Relaxed), 1);
        sheet.unload();
        assert_eq!(loads.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn envelope_round_trips_as_json() {
        let mut sheet = Sheet::new("wire", registry());
        build_pair(&mut sheet);
        sheet.update_save_data().unwrap();

        let json = serde_json::to_string(&sheet.envelope()).unwrap();
        assert!(json.contains("\"Guid\""));
        assert!(json.contains("\"Version\":1"));

        let parsed: SheetEnvelope = serde_json::from_str(&json).unwrap();
        let mut restored = Sheet::from_envelope(parsed, registry());
        restored.load().unwrap();
        assert_eq!(restored.graph().node_count(), 2);
    }
}
