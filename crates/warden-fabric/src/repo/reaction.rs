use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use crate::model::{AgentId, ThreadId};

/// Set-typed reactions keyed by `(thread_id, emoji)`.
///
/// Not named as its own component in the control-plane spec's component
/// table, but `FabricService::react` needs somewhere to live; follows the
/// same narrow-repository shape as the named entities.
#[derive(Debug, Default)]
pub struct ReactionRepository {
    by_key: RwLock<HashMap<(ThreadId, String), HashSet<AgentId>>>,
}

impl ReactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, thread_id: ThreadId, emoji: &str, agent_id: &str) {
        self.by_key
            .write()
            .expect("reaction repo lock poisoned")
            .entry((thread_id, emoji.to_string()))
            .or_default()
            .insert(agent_id.to_string());
    }

    pub fn remove(&self, thread_id: ThreadId, emoji: &str, agent_id: &str) {
        if let Some(set) = self
            .by_key
            .write()
            .expect("reaction repo lock poisoned")
            .get_mut(&(thread_id, emoji.to_string()))
        {
            set.remove(agent_id);
        }
    }

    pub fn agents_for(&self, thread_id: ThreadId, emoji: &str) -> HashSet<AgentId> {
        self.by_key
            .read()
            .expect("reaction repo lock poisoned")
            .get(&(thread_id, emoji.to_string()))
            .cloned()
            .unwrap_or_default()
    }
}
