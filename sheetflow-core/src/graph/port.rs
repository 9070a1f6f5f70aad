//! Ports
//!
//! A port is a typed, directional attachment point owned by a node. Ports
//! never own anything themselves: the back-reference to the owning node is a
//! plain [`NodeId`] lookup, and incident links live in the graph's link
//! table. That keeps the ownership graph strictly tree-shaped even though
//! the dataflow graph is not.
//!
//! Attachability is a capability check, never an error: callers ask
//! [`Port::can_attach_to`] and must not build a link when it says no.

use serde::{Deserialize, Serialize};

use super::graph::Graph;
use super::node::NodeId;

/// Whether a port consumes or produces values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

/// Type tag carried by a port.
///
/// Two ports are compatible when their tags are equal or either side is the
/// `Multi` wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortType {
    Numeric,
    Logic,
    Text,
    Time,
    /// Wildcard: compatible with every other tag.
    Multi,
}

impl PortType {
    pub fn compatible_with(self, other: PortType) -> bool {
        self == other || self == PortType::Multi || other == PortType::Multi
    }
}

/// Stable identifier of a port within its owning node.
///
/// Ids are positional (`in-0`, `in-1`, `out-0`) and persist with the node
/// record, so link endpoints resolve across save/load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(String);

impl PortId {
    pub fn input(index: usize) -> Self {
        Self(format!("in-{index}"))
    }

    pub fn output(index: usize) -> Self {
        Self(format!("out-{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Positional index when this names an input port.
    pub fn input_index(&self) -> Option<usize> {
        self.0.strip_prefix("in-")?.parse().ok()
    }
}

impl std::fmt::Display for PortId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declaration of a port, produced by a node kind's layout.
///
/// The owning [`Node`](super::node::Node) turns specs into live ports at
/// construction time and assigns positional ids.
#[derive(Debug, Clone)]
pub struct PortSpec {
    pub direction: PortDirection,
    pub port_type: PortType,
    pub singular_input: bool,
    pub name: &'static str,
}

impl PortSpec {
    /// A singular input of the given type.
    pub fn input(port_type: PortType) -> Self {
        Self {
            direction: PortDirection::Input,
            port_type,
            singular_input: true,
            name: "",
        }
    }

    /// An output of the given type.
    pub fn output(port_type: PortType) -> Self {
        Self {
            direction: PortDirection::Output,
            port_type,
            singular_input: false,
            name: "",
        }
    }

    /// Allow multiple committed links into this input.
    pub fn multi_link(mut self) -> Self {
        self.singular_input = false;
        self
    }

    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

/// A live port on a node.
#[derive(Debug, Clone)]
pub struct Port {
    id: PortId,
    node: NodeId,
    direction: PortDirection,
    port_type: PortType,
    singular_input: bool,
    name: &'static str,
}

impl Port {
    pub(crate) fn from_spec(node: NodeId, id: PortId, spec: &PortSpec) -> Self {
        Self {
            id,
            node,
            direction: spec.direction,
            port_type: spec.port_type,
            singular_input: spec.singular_input && spec.direction == PortDirection::Input,
            name: spec.name,
        }
    }

    pub fn id(&self) -> &PortId {
        &self.id
    }

    /// The owning node, as a lookup id rather than an ownership edge.
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn direction(&self) -> PortDirection {
        self.direction
    }

    pub fn port_type(&self) -> PortType {
        self.port_type
    }

    pub fn is_input(&self) -> bool {
        self.direction == PortDirection::Input
    }

    /// Whether this input accepts at most one committed link.
    pub fn singular_input(&self) -> bool {
        self.singular_input
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub(crate) fn spec(&self) -> PortSpec {
        PortSpec {
            direction: self.direction,
            port_type: self.port_type,
            singular_input: self.singular_input,
            name: self.name,
        }
    }

    /// Capability check for connecting this port to `other`.
    ///
    /// False when the ports share a node, share a direction, when a
    /// singular input on either side is already occupied, or when the type
    /// tags are incompatible. A `false` here means the caller must not
    /// construct the link.
    pub fn can_attach_to(&self, other: &Port, graph: &Graph) -> bool {
        if other.node == self.node {
            return false;
        }
        if other.direction == self.direction {
            return false;
        }
        if self.is_input() && self.singular_input && graph.link_count_at(self.node, &self.id) != 0
        {
            return false;
        }
        if other.is_input()
            && other.singular_input
            && graph.link_count_at(other.node, &other.id) != 0
        {
            return false;
        }
        if !self.port_type.compatible_with(other.port_type) {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_is_compatible_with_everything() {
        for tag in [
            PortType::Numeric,
            PortType::Logic,
            PortType::Text,
            PortType::Time,
            PortType::Multi,
        ] {
            assert!(PortType::Multi.compatible_with(tag));
            assert!(tag.compatible_with(PortType::Multi));
        }
    }

    #[test]
    fn distinct_tags_are_incompatible() {
        assert!(!PortType::Numeric.compatible_with(PortType::Logic));
        assert!(!PortType::Text.compatible_with(PortType::Time));
        assert!(PortType::Numeric.compatible_with(PortType::Numeric));
    }

    #[test]
    fn port_ids_are_positional() {
        assert_eq!(PortId::input(0).as_str(), "in-0");
        assert_eq!(PortId::output(2).as_str(), "out-2");
    }

    #[test]
    fn input_index_parses_only_input_ids() {
        assert_eq!(PortId::input(3).input_index(), Some(3));
        assert_eq!(PortId::output(0).input_index(), None);
    }

    #[test]
    fn singular_flag_only_applies_to_inputs() {
        let node = NodeId::new();
        let spec = PortSpec::output(PortType::Numeric);
        let port = Port::from_spec(node, PortId::output(0), &spec);
        assert!(!port.singular_input());
    }
}
