use std::collections::HashMap;
use std::sync::RwLock;

use crate::model::{Attachment, ThreadId};

/// Attachment pointers. The payload bytes themselves live on an external
/// filesystem collaborator (spec §1 out-of-scope); this repo only tracks
/// `(target_id, path, name)`.
#[derive(Debug, Default)]
pub struct AttachmentRepository {
    by_target: RwLock<HashMap<ThreadId, Vec<Attachment>>>,
}

impl AttachmentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, attachment: Attachment) {
        self.by_target
            .write()
            .expect("attachment repo lock poisoned")
            .entry(attachment.target_id)
            .or_default()
            .push(attachment);
    }

    pub fn for_target(&self, target_id: ThreadId) -> Vec<Attachment> {
        self.by_target
            .read()
            .expect("attachment repo lock poisoned")
            .get(&target_id)
            .cloned()
            .unwrap_or_default()
    }
}
