//! Two-term addition.

use serde_json::{json, Map};

use crate::graph::{Inputs, NodeKind, PortId, PortSpec, PortType, ProcessError};
use crate::value::Value;

/// Adds its two inputs. An unlinked or `Null` input falls back to the
/// node's persisted default term.
#[derive(Debug)]
pub struct AddNode {
    default_term: i64,
}

impl AddNode {
    pub fn with_default_term(default_term: i64) -> Self {
        Self { default_term }
    }

    pub fn default_term(&self) -> i64 {
        self.default_term
    }

    fn term(&self, inputs: &Inputs<'_>, port: &PortId) -> Value {
        match inputs.value(port) {
            Value::Null => Value::Int(self.default_term),
            v => v,
        }
    }
}

impl Default for AddNode {
    fn default() -> Self {
        Self { default_term: 0 }
    }
}

impl NodeKind for AddNode {
    fn type_tag(&self) -> &'static str {
        "core.add"
    }

    fn display_name(&self) -> &'static str {
        "Add"
    }

    fn port_layout(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input(PortType::Numeric),
            PortSpec::input(PortType::Numeric),
            PortSpec::output(PortType::Numeric),
        ]
    }

    fn initial_value(&self) -> Value {
        Value::Int(0)
    }

    fn process(&self, inputs: &Inputs<'_>) -> Result<Value, ProcessError> {
        let a = self.term(inputs, &PortId::input(0));
        let b = self.term(inputs, &PortId::input(1));
        Ok(a.add(&b)?)
    }

    fn save_fields(&self) -> Map<String, serde_json::Value> {
        let mut fields = Map::new();
        fields.insert("DefaultTerm".into(), json!(self.default_term));
        fields
    }

    fn load_fields(&mut self, fields: &Map<String, serde_json::Value>) {
        if let Some(term) = fields.get("DefaultTerm").and_then(|v| v.as_i64()) {
            self.default_term = term;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, LinkOutcome, Node, PortRef};
    use crate::nodes::ConstantNode;

    fn wire(graph: &mut Graph, source: crate::graph::NodeId, add: crate::graph::NodeId, slot: usize) {
        let outcome = graph.connect(
            PortRef::new(source, PortId::output(0)),
            PortRef::new(add, PortId::input(slot)),
        );
        assert!(matches!(outcome, LinkOutcome::Committed(_)));
    }

    #[test]
    fn adds_two_linked_inputs() {
        let mut graph = Graph::new();
        let a = graph.add_node(Node::new(Box::new(ConstantNode)));
        let b = graph.add_node(Node::new(Box::new(ConstantNode)));
        let add = graph.add_node(Node::new(Box::new(AddNode::default())));

        graph.set_value(a, Value::Int(3)).unwrap();
        graph.set_value(b, Value::Int(4)).unwrap();
        wire(&mut graph, a, add, 0);
        wire(&mut graph, b, add, 1);

        assert_eq!(graph.node(add).unwrap().value(), Value::Int(7));
    }

    #[test]
    fn unlinked_input_uses_the_default_term() {
        let mut graph = Graph::new();
        let a = graph.add_node(Node::new(Box::new(ConstantNode)));
        let add = graph.add_node(Node::new(Box::new(AddNode::with_default_term(10))));

        graph.set_value(a, Value::Int(5)).unwrap();
        wire(&mut graph, a, add, 0);

        assert_eq!(graph.node(add).unwrap().value(), Value::Int(15));
    }

    #[test]
    fn default_term_round_trips_through_fields() {
        let saved = AddNode::with_default_term(-2).save_fields();
        let mut restored = AddNode::default();
        restored.load_fields(&saved);
        assert_eq!(restored.default_term(), -2);
    }

    #[test]
    fn no_links_means_both_terms_default() {
        let mut graph = Graph::new();
        let add = graph.add_node(Node::new(Box::new(AddNode::with_default_term(4))));
        let node = graph.node(add).unwrap();

        let inputs = Inputs::new(&graph, node);
        assert_eq!(
            AddNode::with_default_term(4).process(&inputs).unwrap(),
            Value::Int(8)
        );
    }
}
