use std::collections::HashMap;
use std::sync::RwLock;

use crate::model::{Dependency, DependencyRelation, ThreadId};

/// Stores `ChildOf` / `ReplyTo` / `AttachedTo` edges.
///
/// Indexed both ways: `child -> parent` (every message has at most one
/// incoming edge of each relation) and `parent -> children` (for history
/// listing and reply-count summaries).
#[derive(Debug, Default)]
pub struct DependencyRepository {
    by_child: RwLock<HashMap<ThreadId, Vec<Dependency>>>,
    by_parent: RwLock<HashMap<ThreadId, Vec<Dependency>>>,
}

impl DependencyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, dep: Dependency) {
        self.by_child
            .write()
            .expect("dependency repo lock poisoned")
            .entry(dep.child_id)
            .or_default()
            .push(dep.clone());
        self.by_parent
            .write()
            .expect("dependency repo lock poisoned")
            .entry(dep.parent_id)
            .or_default()
            .push(dep);
    }

    pub fn parent_of(&self, child_id: ThreadId, relation: DependencyRelation) -> Option<ThreadId> {
        self.by_child
            .read()
            .expect("dependency repo lock poisoned")
            .get(&child_id)
            .and_then(|deps| deps.iter().find(|d| d.relation == relation))
            .map(|d| d.parent_id)
    }

    pub fn children_of(&self, parent_id: ThreadId, relation: DependencyRelation) -> Vec<ThreadId> {
        self.by_parent
            .read()
            .expect("dependency repo lock poisoned")
            .get(&parent_id)
            .map(|deps| {
                deps.iter()
                    .filter(|d| d.relation == relation)
                    .map(|d| d.child_id)
                    .collect()
            })
            .unwrap_or_default()
    }
}
