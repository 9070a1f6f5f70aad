//! The Node Registry
//!
//! Persistence names node kinds by their stable type tag. The registry is
//! the closed mapping from tag to constructor: a sheet can only restore
//! kinds that were registered before loading, and an unknown tag is a
//! skip, never a crash.
//!
//! The map is concurrent so hosts can share one registry behind an `Arc`
//! and register kinds from anywhere before loading begins.

use dashmap::DashMap;
use thiserror::Error;

use crate::graph::NodeKind;
use crate::nodes::{AddNode, ClockNode, ConstantNode, SumNode};

/// Constructor for one node kind.
pub type NodeFactory = fn() -> Box<dyn NodeKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("node kind tag {0:?} is already registered")]
    DuplicateTag(&'static str),
}

/// Closed mapping from type tag to node constructor.
#[derive(Default)]
pub struct NodeRegistry {
    factories: DashMap<&'static str, NodeFactory>,
}

impl NodeRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the built-in kinds.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        // Fresh registry, built-in tags are distinct.
        let _ = registry.register(|| Box::new(ConstantNode::default()));
        let _ = registry.register(|| Box::new(AddNode::default()));
        let _ = registry.register(|| Box::new(SumNode::default()));
        let _ = registry.register(|| Box::new(ClockNode::default()));
        registry
    }

    /// Register a kind under the tag its instances report.
    pub fn register(&self, factory: NodeFactory) -> Result<(), RegistryError> {
        let tag = factory().type_tag();
        if self.factories.contains_key(tag) {
            return Err(RegistryError::DuplicateTag(tag));
        }
        self.factories.insert(tag, factory);
        Ok(())
    }

    /// Construct a fresh kind instance for the tag, if registered.
    pub fn create(&self, tag: &str) -> Option<Box<dyn NodeKind>> {
        self.factories.get(tag).map(|factory| (factory.value())())
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.factories.contains_key(tag)
    }

    /// Registered tags, in no particular order.
    pub fn tags(&self) -> Vec<&'static str> {
        self.factories.iter().map(|entry| *entry.key()).collect()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("kinds", &self.factories.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_present() {
        let registry = NodeRegistry::with_builtins();
        assert!(registry.contains("core.constant"));
        assert!(registry.contains("core.add"));
        assert!(registry.contains("core.sum"));
        assert!(registry.contains("core.clock"));
        assert!(!registry.contains("core.unknown"));
    }

    #[test]
    fn duplicate_registration_is_refused() {
        let registry = NodeRegistry::with_builtins();
        let err = registry
            .register(|| Box::new(ConstantNode::default()))
            .unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTag("core.constant"));
    }

    #[test]
    fn create_returns_a_fresh_instance() {
        let registry = NodeRegistry::with_builtins();
        let kind = registry.create("core.add").expect("registered");
        assert_eq!(kind.type_tag(), "core.add");
        assert!(registry.create("nope").is_none());
    }
}
