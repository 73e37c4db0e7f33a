//! Error taxonomy for the control plane (spec §7).

use thiserror::Error;
use uuid::Uuid;

use crate::ports::{IssueError, ProcessError};

pub type ControlResult<T> = Result<T, ControlError>;

/// Tagged errors returned by the command bus, health monitor, recovery
/// executor, and supervisor. Mirrors a `ClientError`-style shape:
/// one enum per crate, `#[from]` for wrapped collaborator errors,
/// constructor helpers for the variants that take more than one field.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error("workflow not found: {workflow_id}")]
    WorkflowNotFound { workflow_id: Uuid },

    #[error("task not found: {task_id}")]
    TaskNotFound { task_id: String },

    #[error("process not found: {process_id}")]
    ProcessNotFound { process_id: String },

    #[error("invalid lifecycle transition: {from:?} -> {to:?}")]
    InvalidTransition { from: String, to: String },

    #[error("command was cancelled before dispatch")]
    Cancelled,

    #[error("issue tracker operation failed: {0}")]
    IssueTracker(#[from] IssueError),

    #[error("process registry operation failed: {0}")]
    ProcessRegistry(#[from] ProcessError),

    #[error("external collaborator failed: {reason}")]
    External { reason: String },

    #[error("no recovery rung available: recovery_count {recovery_count} exceeds policy")]
    RecoveryExhausted { recovery_count: u32 },
}

impl ControlError {
    pub fn external(reason: impl Into<String>) -> Self {
        Self::External { reason: reason.into() }
    }

    pub fn invalid_transition(from: impl std::fmt::Debug, to: impl std::fmt::Debug) -> Self {
        Self::InvalidTransition { from: format!("{from:?}"), to: format!("{to:?}") }
    }

    /// Errors worth retrying at the call site (external-collaborator class
    /// in spec §7) vs. ones that indicate a programmer/invariant bug.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ControlError::ProcessRegistry(_) | ControlError::External { .. })
    }
}
