//! Persisted Node Records
//!
//! One record per node, with the node's incoming links embedded on the
//! target side. Kind-specific fields are flattened into the same object
//! under the names the kind's codec pair declares, so a record is a
//! single flat JSON object regardless of kind.

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, LinkRecord, Node, NodeId};
use crate::value::Value;

/// Persisted canvas position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointRecord {
    pub x: f64,
    pub y: f64,
}

/// Persisted canvas size, present only when the host measured the node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SizeRecord {
    pub w: f64,
    pub h: f64,
}

/// The persisted form of one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    #[serde(rename = "NodeType")]
    pub node_type: String,

    #[serde(rename = "Guid")]
    pub guid: NodeId,

    #[serde(rename = "NodeAlias", default)]
    pub alias: String,

    #[serde(rename = "NodePosition")]
    pub position: PointRecord,

    #[serde(rename = "NodeSize", default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeRecord>,

    #[serde(rename = "RawValue", default)]
    pub raw_value: Value,

    /// Incoming links only; the source side never repeats them.
    #[serde(rename = "LiveLinks", default)]
    pub links: Vec<LinkRecord>,

    /// Kind-specific fields, by the kind's explicit schema.
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl NodeRecord {
    /// Snapshot one node, embedding its incoming links in creation order.
    pub fn from_node(node: &Node, graph: &Graph) -> Self {
        let (x, y) = node.position();
        Self {
            node_type: node.kind().type_tag().to_owned(),
            guid: node.id(),
            alias: node.alias().to_owned(),
            position: PointRecord { x, y },
            size: node.size().map(|(w, h)| SizeRecord { w, h }),
            raw_value: node.value(),
            links: graph
                .incoming_links(node.id())
                .map(LinkRecord::from)
                .collect(),
            fields: node.kind().save_fields(),
        }
    }
}
