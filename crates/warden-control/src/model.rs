//! Process and task data model (spec §3).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type ProcessId = String;
pub type WorkflowId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessRole {
    Coordinator,
    Worker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessStatus {
    Ready,
    Working,
    Stopped,
    Retired,
    Failed,
}

impl ProcessStatus {
    /// Terminal statuses are excluded from the task-completion reset in
    /// `MarkTaskComplete` (spec §4.4).
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessStatus::Retired | ProcessStatus::Stopped | ProcessStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProcessPhase {
    Idle,
    Implementing,
    Reviewing,
    AwaitingReview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Process {
    pub id: ProcessId,
    pub role: ProcessRole,
    pub status: ProcessStatus,
    pub phase: Option<ProcessPhase>,
    pub task_id: Option<String>,
}

impl Process {
    pub fn new_coordinator(id: impl Into<ProcessId>) -> Self {
        Self { id: id.into(), role: ProcessRole::Coordinator, status: ProcessStatus::Ready, phase: Some(ProcessPhase::Idle), task_id: None }
    }

    pub fn new_worker(id: impl Into<ProcessId>) -> Self {
        Self { id: id.into(), role: ProcessRole::Worker, status: ProcessStatus::Ready, phase: Some(ProcessPhase::Idle), task_id: None }
    }

    /// Reset to idle/ready, as `MarkTaskComplete` does for the implementer
    /// and reviewer — unless the process is already idle or terminal, in
    /// which case this is a no-op (no event should be emitted for it).
    pub fn reset_to_idle(&mut self) -> bool {
        if self.status.is_terminal() || self.phase == Some(ProcessPhase::Idle) {
            return false;
        }
        self.status = ProcessStatus::Ready;
        self.phase = Some(ProcessPhase::Idle);
        self.task_id = None;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Implementing,
    InReview,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskAssignment {
    pub task_id: String,
    pub implementer: ProcessId,
    pub reviewer: ProcessId,
    pub status: TaskStatus,
}
