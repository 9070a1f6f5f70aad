//! # sheetflow-core
//!
//! A reactive dataflow graph engine: nodes compute values, typed ports
//! connect them, and changes propagate downstream in waves until the
//! graph settles. Think of a spreadsheet whose cells are free-floating
//! nodes wired together by explicit links.
//!
//! ## Core Concepts
//!
//! **Values** — a small dynamic scalar type ([`Value`]) flows along every
//! link: integers, floats, booleans, text, timestamps, or null.
//!
//! **Nodes and Kinds** — a [`Node`](graph::Node) owns typed ports and one
//! published value; its behavior lives in a [`NodeKind`](graph::NodeKind)
//! implementation registered with the [`NodeRegistry`](registry::NodeRegistry).
//!
//! **Links** — directed edges from output ports to input ports. Every
//! connection attempt runs through a validation state machine that
//! normalizes direction, refuses capacity and type violations, and keeps
//! the graph acyclic. See [`graph::Graph::connect_proposal`].
//!
//! **Propagation** — a value change seeds a wave over the downstream
//! nodes. Nodes with unsettled upstream inputs defer to a later wave, so
//! every node recomputes at most once per cascade with all of its inputs
//! fresh. See [`engine`].
//!
//! **Sheets** — a [`Sheet`](sheet::Sheet) persists a graph as a versioned
//! JSON document of per-node records and restores it through the same
//! validation the live graph enforces.
//!
//! ## Example
//!
//! ```
//! use sheetflow_core::graph::{Graph, Node, PortId, PortRef};
//! use sheetflow_core::nodes::{AddNode, ConstantNode};
//! use sheetflow_core::value::Value;
//!
//! let mut graph = Graph::new();
//! let a = graph.add_node(Node::new(Box::new(ConstantNode)));
//! let b = graph.add_node(Node::new(Box::new(ConstantNode)));
//! let sum = graph.add_node(Node::new(Box::new(AddNode::default())));
//!
//! graph.connect(PortRef::new(a, PortId::output(0)), PortRef::new(sum, PortId::input(0)));
//! graph.connect(PortRef::new(b, PortId::output(0)), PortRef::new(sum, PortId::input(1)));
//!
//! graph.set_value(a, Value::Int(3)).unwrap();
//! graph.set_value(b, Value::Int(4)).unwrap();
//! assert_eq!(graph.node(sum).unwrap().value(), Value::Int(7));
//! ```

pub mod engine;
pub mod graph;
pub mod nodes;
pub mod registry;
pub mod sheet;
pub mod value;

pub use graph::{Graph, GraphEvent, LinkOutcome, Node, NodeId, NodeKind, PortId, PortRef};
pub use registry::NodeRegistry;
pub use sheet::{Sheet, SheetEnvelope, SheetState};
pub use value::Value;
