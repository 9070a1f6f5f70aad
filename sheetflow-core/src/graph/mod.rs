//! The Sheet Graph Model
//!
//! Nodes, typed ports, and directed links, plus the validation that keeps
//! the whole structure a DAG. The model is deliberately split from the
//! propagation engine: this module decides what the graph *is*, the
//! [`engine`](crate::engine) decides how change moves through it.
//!
//! - [`node`] — computation units, the [`NodeKind`] behavior trait, and
//!   the [`Inputs`] read view handed to compute steps
//! - [`port`] — typed, directed attachment points and their capability
//!   check
//! - [`link`] — normalized output→input edges
//! - [`graph`] — the owning collection and the link-validation state
//!   machine
//! - [`cycle`] — the reentrant DFS cycle check
//! - [`event`] — observer notifications for structural and value changes

pub mod cycle;
pub mod event;
#[allow(clippy::module_inception)]
pub mod graph;
pub mod link;
pub mod node;
pub mod port;

pub use cycle::has_cycle;
pub use event::{GraphEvent, ObserverId};
pub use graph::{Graph, GraphError, LinkOutcome, LinkProposal, PortRef, RejectReason};
pub use link::{Link, LinkId, LinkRecord};
pub use node::{Inputs, Node, NodeId, NodeKind, ProcessError};
pub use port::{Port, PortDirection, PortId, PortSpec, PortType};
