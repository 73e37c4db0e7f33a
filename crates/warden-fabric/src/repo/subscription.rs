use std::collections::HashMap;
use std::sync::RwLock;

use crate::model::{AgentId, Subscription, SubscriptionMode, ThreadId};

#[derive(Debug, Default)]
pub struct SubscriptionRepository {
    // (channel_id, agent_id) -> subscription
    by_key: RwLock<HashMap<(ThreadId, AgentId), Subscription>>,
}

impl SubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, sub: Subscription) {
        self.by_key
            .write()
            .expect("subscription repo lock poisoned")
            .insert((sub.channel_id, sub.agent_id.clone()), sub);
    }

    pub fn mode_for(&self, channel_id: ThreadId, agent_id: &str) -> Option<SubscriptionMode> {
        self.by_key
            .read()
            .expect("subscription repo lock poisoned")
            .get(&(channel_id, agent_id.to_string()))
            .map(|s| s.mode)
    }
}
