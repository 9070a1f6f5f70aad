//! Graph Events
//!
//! External collaborators (rendering surface, persistence, host loop)
//! observe the graph through explicit events rather than hooks on the
//! underlying collections. The graph publishes; it never pulls anything
//! back from an observer.

use std::sync::atomic::{AtomicU64, Ordering};

use super::link::LinkId;
use super::node::NodeId;

/// Structural and value-change notifications published by the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphEvent {
    NodeAdded(NodeId),
    NodeRemoved(NodeId),
    LinkAdded(LinkId),
    LinkRemoved(LinkId),
    ValueChanged(NodeId),
}

/// Handle identifying a registered observer, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

impl ObserverId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

pub(crate) type ObserverFn = Box<dyn Fn(&GraphEvent) + Send + Sync>;
