//! External collaborator ports (spec §6).
//!
//! These are the interfaces the core *consumes*. Concrete implementations
//! (a real issue-tracker client, a real child-process supervisor) live
//! outside this crate — `warden-cli` supplies in-memory stand-ins. Kept as
//! narrow, role-specific traits rather than one sprawling interface,
//! per spec §9's "pervasive interfaces" design note.

use thiserror::Error;

pub use crate::model::ProcessId;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("issue not found: {task_id}")]
    NotFound { task_id: String },

    #[error("issue tracker unavailable: {reason}")]
    Unavailable { reason: String },
}

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("process not found: {process_id}")]
    NotFound { process_id: ProcessId },

    #[error("process I/O failed: {reason}")]
    Io { reason: String },
}

/// `IssueExecutor` — the external issue-tracker ("beads") write surface.
/// All operations are synchronous and return an error on failure; command
/// handlers wrap these with context per spec §7's propagation policy.
pub trait IssueExecutor: Send + Sync + std::fmt::Debug {
    fn update_status(&self, task_id: &str, status: &str) -> Result<(), IssueError>;
    fn add_comment(&self, task_id: &str, author: &str, text: &str) -> Result<(), IssueError>;
}

/// `ProcessRegistry` — owns child-process handles; handlers talk to it
/// only through typed commands (spec §5), never mutate a process directly.
pub trait ProcessRegistry: Send + Sync + std::fmt::Debug {
    fn send(&self, process_id: &str, bytes: &[u8]) -> Result<(), ProcessError>;
    fn replace(&self, process_id: &str, reason: &str) -> Result<(), ProcessError>;
    fn stop_all(&self) -> Result<(), ProcessError>;
    fn workers(&self) -> Vec<ProcessId>;
    fn coordinator(&self) -> Option<ProcessId>;
}
