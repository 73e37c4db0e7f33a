use std::collections::HashMap;
use std::sync::RwLock;

use crate::model::{AgentId, Participant};

/// Registered agents — the target set for `@here` expansion.
#[derive(Debug, Default)]
pub struct ParticipantRepository {
    by_agent: RwLock<HashMap<AgentId, Participant>>,
}

impl ParticipantRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, participant: Participant) {
        self.by_agent
            .write()
            .expect("participant repo lock poisoned")
            .insert(participant.agent_id.clone(), participant);
    }

    pub fn is_registered(&self, agent_id: &str) -> bool {
        self.by_agent.read().expect("participant repo lock poisoned").contains_key(agent_id)
    }

    pub fn all(&self) -> Vec<Participant> {
        self.by_agent.read().expect("participant repo lock poisoned").values().cloned().collect()
    }
}
