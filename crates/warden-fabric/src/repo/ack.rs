use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use chrono::{DateTime, Utc};

use crate::model::{Ack, AgentId, ThreadId};

/// `(thread_id, agent_id)` is the primary key; re-acking is a no-op.
///
/// Also indexes acked thread ids per agent, since [`crate::service::FabricService::get_unacked`]
/// needs that set on every call and repeatedly scanning the full ack map
/// would make unread listing `O(total_acks)` instead of `O(acks_of_agent)`.
#[derive(Debug, Default)]
pub struct AckRepository {
    by_key: RwLock<HashMap<(ThreadId, AgentId), Ack>>,
    by_agent: RwLock<HashMap<AgentId, HashSet<ThreadId>>>,
}

impl AckRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent: a second ack for the same `(thread_id, agent_id)` leaves
    /// the stored timestamp and the unread set unchanged.
    pub fn ack(&self, thread_id: ThreadId, agent_id: &str, at: DateTime<Utc>) {
        if self.is_acked(thread_id, agent_id) {
            return;
        }
        self.by_key.write().expect("ack repo lock poisoned").insert(
            (thread_id, agent_id.to_string()),
            Ack { thread_id, agent_id: agent_id.to_string(), acked_at: at },
        );
        self.by_agent
            .write()
            .expect("ack repo lock poisoned")
            .entry(agent_id.to_string())
            .or_default()
            .insert(thread_id);
    }

    pub fn is_acked(&self, thread_id: ThreadId, agent_id: &str) -> bool {
        self.by_key
            .read()
            .expect("ack repo lock poisoned")
            .contains_key(&(thread_id, agent_id.to_string()))
    }

    pub fn acked_set(&self, agent_id: &str) -> HashSet<ThreadId> {
        self.by_agent
            .read()
            .expect("ack repo lock poisoned")
            .get(agent_id)
            .cloned()
            .unwrap_or_default()
    }
}
