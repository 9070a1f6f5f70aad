//! Variable-arity summation.

use crate::graph::{Inputs, NodeKind, PortSpec, PortType, ProcessError};
use crate::value::Value;

/// Sums every linked input. Declares input growth, so the graph appends a
/// spare input port whenever the existing ones are all occupied.
#[derive(Debug, Default)]
pub struct SumNode;

impl NodeKind for SumNode {
    fn type_tag(&self) -> &'static str {
        "core.sum"
    }

    fn display_name(&self) -> &'static str {
        "Sum"
    }

    fn port_layout(&self) -> Vec<PortSpec> {
        vec![
            PortSpec::input(PortType::Numeric),
            PortSpec::output(PortType::Numeric),
        ]
    }

    fn initial_value(&self) -> Value {
        Value::Int(0)
    }

    fn allows_input_growth(&self) -> bool {
        true
    }

    fn process(&self, inputs: &Inputs<'_>) -> Result<Value, ProcessError> {
        let mut total = Value::Int(0);
        for value in inputs.values() {
            total = total.add(&value)?;
        }
        Ok(total)
    }
}
