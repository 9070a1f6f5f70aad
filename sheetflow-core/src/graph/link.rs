//! Links
//!
//! A link is a directed edge from an output port to an input port on two
//! distinct nodes. Links are identified by a monotonically increasing id,
//! so id order is creation order — the tie-breaker the input-value reads
//! rely on.
//!
//! A committed link is always stored normalized: `source` is the output
//! side, `target` the input side, regardless of which end the connection
//! was drawn from.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use super::node::NodeId;
use super::port::PortId;

/// Unique identifier for a link. Ordering follows creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkId(u64);

impl LinkId {
    /// Generate the next link id.
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A committed directed edge between two ports.
#[derive(Debug, Clone)]
pub struct Link {
    id: LinkId,
    source_node: NodeId,
    source_port: PortId,
    target_node: NodeId,
    target_port: PortId,
}

impl Link {
    pub(crate) fn new(
        source_node: NodeId,
        source_port: PortId,
        target_node: NodeId,
        target_port: PortId,
    ) -> Self {
        Self {
            id: LinkId::next(),
            source_node,
            source_port,
            target_node,
            target_port,
        }
    }

    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Output-side node.
    pub fn source_node(&self) -> NodeId {
        self.source_node
    }

    pub fn source_port(&self) -> &PortId {
        &self.source_port
    }

    /// Input-side node.
    pub fn target_node(&self) -> NodeId {
        self.target_node
    }

    pub fn target_port(&self) -> &PortId {
        &self.target_port
    }

    /// Whether the link touches the given port.
    pub fn is_at(&self, node: NodeId, port: &PortId) -> bool {
        (self.source_node == node && &self.source_port == port)
            || (self.target_node == node && &self.target_port == port)
    }

    /// Whether the link touches the given node at all.
    pub fn touches(&self, node: NodeId) -> bool {
        self.source_node == node || self.target_node == node
    }
}

/// Persisted form of a link, stored inside the target-side node record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRecord {
    #[serde(rename = "SourceGuid")]
    pub source_guid: NodeId,
    #[serde(rename = "SourcePortGuid")]
    pub source_port_guid: PortId,
    #[serde(rename = "TargetGuid")]
    pub target_guid: NodeId,
    #[serde(rename = "TargetPortGuid")]
    pub target_port_guid: PortId,
}

impl From<&Link> for LinkRecord {
    fn from(link: &Link) -> Self {
        Self {
            source_guid: link.source_node,
            source_port_guid: link.source_port.clone(),
            target_guid: link.target_node,
            target_port_guid: link.target_port.clone(),
        }
    }
}
