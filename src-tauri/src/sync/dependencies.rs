use std::collections::{BTreeSet, HashMap};
use std::sync::RwLock;

use crate::models::ResourceKey;

/// Which cached keys go stale when a resource is mutated.
///
/// Built-in rule: mutating an application invalidates its detail record and
/// its running status. Further edges can be linked at runtime.
#[derive(Debug, Default)]
pub struct DependencyMap {
    edges: RwLock<HashMap<ResourceKey, BTreeSet<ResourceKey>>>,
}

impl DependencyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `dependent` must be refreshed whenever `source` changes.
    pub fn link(&self, source: ResourceKey, dependent: ResourceKey) {
        let mut edges = self.edges.write().unwrap_or_else(|p| p.into_inner());
        edges.entry(source).or_default().insert(dependent);
    }

    /// Keys to invalidate after `source` was mutated, `source` included.
    pub fn dependents_of(&self, source: &ResourceKey) -> Vec<ResourceKey> {
        let mut keys = BTreeSet::new();
        keys.insert(source.clone());

        if let ResourceKey::Application(id) = source {
            keys.insert(ResourceKey::ApplicationStatus(id.clone()));
        }

        let edges = self.edges.read().unwrap_or_else(|p| p.into_inner());
        if let Some(linked) = edges.get(source) {
            keys.extend(linked.iter().cloned());
        }

        keys.into_iter().collect()
    }
}
