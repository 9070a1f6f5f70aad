//! The Propagation Engine
//!
//! Turns a published value change into a settled graph. The engine never
//! mutates structure; it reads the graph through `&Graph`, writes only
//! per-node published values, and fans recomputation out across a rayon
//! pool within each wave.
//!
//! - [`effected`] — the per-wave working set of `(link, node)` pairs
//! - [`wave`] — the wave loop, readiness check, and fault boundary

pub mod effected;
pub mod wave;

pub use effected::{EffectedNode, EffectedSet};
pub use wave::{propagate, try_update};
