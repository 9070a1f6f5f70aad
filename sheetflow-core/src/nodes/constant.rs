//! A source node holding one directly edited numeric value.

use crate::graph::{Inputs, NodeKind, PortSpec, PortType, ProcessError};
use crate::value::Value;

/// Source kind: no inputs, publishes whatever value the host set on it.
#[derive(Debug, Default)]
pub struct ConstantNode;

impl NodeKind for ConstantNode {
    fn type_tag(&self) -> &'static str {
        "core.constant"
    }

    fn display_name(&self) -> &'static str {
        "Constant"
    }

    fn port_layout(&self) -> Vec<PortSpec> {
        vec![PortSpec::output(PortType::Numeric)]
    }

    // Recomputation must not disturb an edited source value.
    fn process(&self, inputs: &Inputs<'_>) -> Result<Value, ProcessError> {
        Ok(inputs.current())
    }
}
