use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{FabricError, FabricResult};
use crate::model::{Thread, ThreadId, ThreadType};

/// Stores both channels and messages, keyed by [`ThreadId`].
#[derive(Debug, Default)]
pub struct ThreadRepository {
    by_id: RwLock<HashMap<ThreadId, Thread>>,
}

impl ThreadRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, thread: Thread) -> ThreadId {
        let id = thread.id;
        self.by_id.write().expect("thread repo lock poisoned").insert(id, thread);
        id
    }

    pub fn get(&self, id: ThreadId) -> Option<Thread> {
        self.by_id.read().expect("thread repo lock poisoned").get(&id).cloned()
    }

    pub fn require(&self, id: ThreadId) -> FabricResult<Thread> {
        self.get(id).ok_or(FabricError::ThreadNotFound { thread_id: id })
    }

    pub fn find_channel_by_slug(&self, slug: &str) -> Option<Thread> {
        self.by_id
            .read()
            .expect("thread repo lock poisoned")
            .values()
            .find(|t| t.kind == ThreadType::Channel && t.slug.as_deref() == Some(slug))
            .cloned()
    }

    pub fn archive(&self, id: ThreadId, at: chrono::DateTime<chrono::Utc>) -> FabricResult<()> {
        let mut guard = self.by_id.write().expect("thread repo lock poisoned");
        let thread = guard.get_mut(&id).ok_or(FabricError::ThreadNotFound { thread_id: id })?;
        thread.archived_at = Some(at);
        Ok(())
    }

    /// All non-archived messages, in insertion (creation time) order.
    pub fn all_messages(&self) -> Vec<Thread> {
        let guard = self.by_id.read().expect("thread repo lock poisoned");
        let mut messages: Vec<Thread> = guard
            .values()
            .filter(|t| t.kind == ThreadType::Message)
            .cloned()
            .collect();
        messages.sort_by_key(|t| t.created_at);
        messages
    }

    /// Fetch many threads by id, preserving the input order and silently
    /// skipping ids that no longer resolve.
    pub fn get_many(&self, ids: &[ThreadId]) -> Vec<Thread> {
        let guard = self.by_id.read().expect("thread repo lock poisoned");
        ids.iter().filter_map(|id| guard.get(id).cloned()).collect()
    }
}
