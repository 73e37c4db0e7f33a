//! Workflow Lifecycle state machine and per-workflow aggregate (spec §4.3).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::{ControlError, ControlResult};
use crate::model::WorkflowId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Running,
    Paused,
    Completed,
    Failed,
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowState::Completed | WorkflowState::Failed)
    }

    /// The transition table from spec §4.3, as an adjacency check rather
    /// than a match-per-edge list so adding a state can't silently forget
    /// a symmetrical case.
    fn allows(self, to: WorkflowState) -> bool {
        use WorkflowState::*;
        matches!(
            (self, to),
            (Running, Paused) | (Paused, Running) | (Running, Completed) | (Running, Failed) | (Paused, Failed)
        )
    }
}

/// Per-workflow aggregate: state machine, cancellation handle, identity.
/// Infrastructure (fabric, bus, health monitor) is wired in by
/// `ControlPlane` at construction rather than owned here, so this struct
/// stays a thin state holder.
pub struct WorkflowInstance {
    pub id: WorkflowId,
    pub name: String,
    state: std::sync::Mutex<WorkflowState>,
    cancel: CancellationToken,
}

impl WorkflowInstance {
    pub fn new(id: WorkflowId, name: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id,
            name: name.into(),
            state: std::sync::Mutex::new(WorkflowState::Running),
            cancel: CancellationToken::new(),
        })
    }

    pub fn state(&self) -> WorkflowState {
        *self.state.lock().expect("workflow state lock poisoned")
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Atomic with respect to concurrent transitions; side effects (the
    /// Supervisor's infrastructure teardown) happen under the same guard
    /// the caller already holds by serializing through here.
    pub fn transition_to(&self, to: WorkflowState) -> ControlResult<()> {
        let mut state = self.state.lock().expect("workflow state lock poisoned");
        if !state.allows(to) {
            return Err(ControlError::invalid_transition(*state, to));
        }
        *state = to;
        Ok(())
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for WorkflowInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowInstance").field("id", &self.id).field("state", &self.state()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_to_paused_and_back_is_allowed() {
        let wf = WorkflowInstance::new(uuid::Uuid::now_v7(), "w");
        wf.transition_to(WorkflowState::Paused).unwrap();
        assert_eq!(wf.state(), WorkflowState::Paused);
        wf.transition_to(WorkflowState::Running).unwrap();
        assert_eq!(wf.state(), WorkflowState::Running);
    }

    #[test]
    fn completed_is_terminal_and_rejects_further_transitions() {
        let wf = WorkflowInstance::new(uuid::Uuid::now_v7(), "w");
        wf.transition_to(WorkflowState::Completed).unwrap();
        assert!(wf.state().is_terminal());
        let err = wf.transition_to(WorkflowState::Running).unwrap_err();
        assert!(matches!(err, ControlError::InvalidTransition { .. }));
    }

    #[test]
    fn paused_to_completed_is_rejected() {
        let wf = WorkflowInstance::new(uuid::Uuid::now_v7(), "w");
        wf.transition_to(WorkflowState::Paused).unwrap();
        assert!(wf.transition_to(WorkflowState::Completed).is_err());
    }
}
