//! A time source.

use chrono::Utc;

use crate::graph::{Inputs, NodeKind, PortSpec, PortType, ProcessError};
use crate::value::Value;

/// Source kind publishing a timestamp. The host ticks it by calling
/// `Graph::set_value` with a fresh `Value::Timestamp`; recomputation
/// leaves the last published instant alone.
#[derive(Debug, Default)]
pub struct ClockNode;

impl NodeKind for ClockNode {
    fn type_tag(&self) -> &'static str {
        "core.clock"
    }

    fn display_name(&self) -> &'static str {
        "Clock"
    }

    fn port_layout(&self) -> Vec<PortSpec> {
        vec![PortSpec::output(PortType::Time)]
    }

    fn initial_value(&self) -> Value {
        Value::Timestamp(Utc::now())
    }

    fn process(&self, inputs: &Inputs<'_>) -> Result<Value, ProcessError> {
        Ok(inputs.current())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, Node};

    #[test]
    fn starts_with_a_timestamp() {
        let node = Node::new(Box::new(ClockNode));
        assert!(matches!(node.value(), Value::Timestamp(_)));
    }

    #[test]
    fn host_tick_propagates() {
        let mut graph = Graph::new();
        let clock = graph.add_node(Node::new(Box::new(ClockNode)));
        let instant = Utc::now();

        graph.set_value(clock, Value::Timestamp(instant)).unwrap();
        assert_eq!(graph.node(clock).unwrap().value(), Value::Timestamp(instant));
    }
}
