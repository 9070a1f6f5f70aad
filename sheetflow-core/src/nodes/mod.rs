//! Built-in Node Kinds
//!
//! A small standard set: enough for a working sheet and a template for
//! host-defined kinds. Every kind here is registered by
//! [`NodeRegistry::with_builtins`](crate::registry::NodeRegistry::with_builtins).

pub mod add;
pub mod clock;
pub mod constant;
pub mod sum;

pub use add::AddNode;
pub use clock::ClockNode;
pub use constant::ConstantNode;
pub use sum::SumNode;
