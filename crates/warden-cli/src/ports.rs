//! In-memory stand-ins for the external collaborators the core consumes
//! (spec §6). Sufficient to drive every command handler end-to-end for a
//! local demo; a real deployment swaps these for an HTTP issue-tracker
//! client and a child-process supervisor.

use std::collections::HashMap;
use std::sync::Mutex;

use warden_control::{IssueError, IssueExecutor, ProcessError, ProcessId, ProcessRegistry};

#[derive(Debug, Default)]
pub(crate) struct InMemoryIssueExecutor {
    statuses: Mutex<HashMap<String, String>>,
    comments: Mutex<Vec<(String, String, String)>>,
}

impl IssueExecutor for InMemoryIssueExecutor {
    fn update_status(&self, task_id: &str, status: &str) -> Result<(), IssueError> {
        self.statuses.lock().expect("issue executor lock poisoned").insert(task_id.to_string(), status.to_string());
        Ok(())
    }

    fn add_comment(&self, task_id: &str, author: &str, text: &str) -> Result<(), IssueError> {
        self.comments.lock().expect("issue executor lock poisoned").push((
            task_id.to_string(),
            author.to_string(),
            text.to_string(),
        ));
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct NoopProcessRegistry {
    coordinator: Option<ProcessId>,
    workers: Vec<ProcessId>,
    sent: Mutex<Vec<(String, Vec<u8>)>>,
}

impl NoopProcessRegistry {
    pub(crate) fn new(coordinator: Option<ProcessId>, workers: Vec<ProcessId>) -> Self {
        Self { coordinator, workers, sent: Mutex::new(Vec::new()) }
    }

    pub(crate) fn sent_messages(&self) -> Vec<(String, Vec<u8>)> {
        self.sent.lock().expect("process registry lock poisoned").clone()
    }
}

impl ProcessRegistry for NoopProcessRegistry {
    fn send(&self, process_id: &str, bytes: &[u8]) -> Result<(), ProcessError> {
        self.sent.lock().expect("process registry lock poisoned").push((process_id.to_string(), bytes.to_vec()));
        Ok(())
    }

    fn replace(&self, _process_id: &str, _reason: &str) -> Result<(), ProcessError> {
        Ok(())
    }

    fn stop_all(&self) -> Result<(), ProcessError> {
        Ok(())
    }

    fn workers(&self) -> Vec<ProcessId> {
        self.workers.clone()
    }

    fn coordinator(&self) -> Option<ProcessId> {
        self.coordinator.clone()
    }
}
