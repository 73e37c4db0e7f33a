//! Recovery Executor (spec §4.6): consumes a stuck-verdict from the health
//! monitor and dispatches the corresponding action through the command bus
//! and supervisor.

use std::sync::Arc;

use tracing::warn;

use crate::bus::EventBus;
use crate::clock::Clock;
use crate::commands::{Command, CommandBus, CommandSource};
use crate::error::{ControlError, ControlResult};
use crate::events::{ControlPlaneEvent, HealthEvent, HealthEventKind, RecoveryAction};
use crate::lifecycle::{WorkflowInstance, WorkflowState};
use crate::ports::ProcessRegistry;
use crate::supervisor::Supervisor;

const NUDGE_PROMPT: &str = "heads up: no progress has been observed recently, please report status";

pub struct RecoveryExecutor {
    clock: Arc<dyn Clock>,
    bus: EventBus,
    command_bus: Arc<CommandBus>,
    supervisor: Arc<Supervisor>,
    process_registry: Arc<dyn ProcessRegistry>,
}

impl RecoveryExecutor {
    pub fn new(
        clock: Arc<dyn Clock>,
        bus: EventBus,
        command_bus: Arc<CommandBus>,
        supervisor: Arc<Supervisor>,
        process_registry: Arc<dyn ProcessRegistry>,
    ) -> Self {
        Self { clock, bus, command_bus, supervisor, process_registry }
    }

    /// Preconditions per spec §4.6: Nudge/Replace require `Running`; Fail
    /// requires the workflow is not already terminal; Pause defers its own
    /// preconditions to the Supervisor.
    pub async fn execute_recovery(
        &self,
        workflow: &WorkflowInstance,
        action: RecoveryAction,
    ) -> ControlResult<()> {
        self.emit(workflow.id, HealthEventKind::RecoveryStarted, Some(action), "recovery started");

        let outcome = self.dispatch(workflow, action).await;

        match &outcome {
            Ok(()) => self.emit(workflow.id, HealthEventKind::RecoverySuccess, Some(action), "recovery succeeded"),
            Err(err) => self.emit(
                workflow.id,
                HealthEventKind::RecoveryFailed,
                Some(action),
                &format!("recovery failed: {err}"),
            ),
        }

        outcome
    }

    async fn dispatch(&self, workflow: &WorkflowInstance, action: RecoveryAction) -> ControlResult<()> {
        match action {
            RecoveryAction::Nudge => {
                self.require_running(workflow)?;
                let result = self
                    .command_bus
                    .submit_and_wait(Command::NudgeCoordinator {
                        workflow_id: workflow.id,
                        source: CommandSource::Internal,
                        prompt: NUDGE_PROMPT.to_string(),
                    })
                    .await?;
                self.require_command_success(result)
            }
            RecoveryAction::Replace => {
                self.require_running(workflow)?;
                let Some(coordinator) = self.coordinator_id() else {
                    return Err(ControlError::external("no coordinator registered to replace"));
                };
                let result = self
                    .command_bus
                    .submit_and_wait(Command::ReplaceProcess {
                        workflow_id: workflow.id,
                        source: CommandSource::Internal,
                        target: coordinator,
                        reason: "stuck workflow recovery".to_string(),
                    })
                    .await?;
                self.require_command_success(result)
            }
            RecoveryAction::Pause => self.supervisor.pause(workflow),
            RecoveryAction::Fail => {
                if workflow.state().is_terminal() {
                    return Err(ControlError::invalid_transition(workflow.state(), WorkflowState::Failed));
                }
                self.supervisor.shutdown(workflow, WorkflowState::Failed)
            }
        }
    }

    fn require_running(&self, workflow: &WorkflowInstance) -> ControlResult<()> {
        if workflow.state() != WorkflowState::Running {
            return Err(ControlError::invalid_transition(workflow.state(), WorkflowState::Running));
        }
        Ok(())
    }

    fn require_command_success(&self, result: crate::commands::CommandResult) -> ControlResult<()> {
        if result.success {
            Ok(())
        } else {
            Err(ControlError::external(result.error.unwrap_or_else(|| "command failed".to_string())))
        }
    }

    fn coordinator_id(&self) -> Option<String> {
        self.process_registry.coordinator()
    }

    fn emit(
        &self,
        workflow_id: uuid::Uuid,
        kind: HealthEventKind,
        recovery_action: Option<RecoveryAction>,
        details: &str,
    ) {
        if !matches!(
            kind,
            HealthEventKind::RecoveryStarted | HealthEventKind::RecoverySuccess | HealthEventKind::RecoveryFailed
        ) {
            warn!(?kind, "recovery executor emitting an unexpected event kind");
        }
        let event = HealthEvent {
            kind,
            workflow_id,
            recovery_action,
            details: details.to_string(),
            timestamp: self.clock.now(),
        };
        self.bus.publish(ControlPlaneEvent::Health(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::commands::HandlerContext;
    use crate::health::HealthMonitor;
    use crate::health::HealthPolicy;
    use crate::ports::{IssueError, IssueExecutor, ProcessError, ProcessId};
    use crate::repo::{ProcessRepository, TaskRepository};

    #[derive(Debug, Default)]
    struct FakeIssueExecutor;

    impl IssueExecutor for FakeIssueExecutor {
        fn update_status(&self, _task_id: &str, _status: &str) -> Result<(), IssueError> {
            Ok(())
        }
        fn add_comment(&self, _task_id: &str, _author: &str, _text: &str) -> Result<(), IssueError> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct FakeRegistry {
        coordinator: Option<ProcessId>,
    }

    impl ProcessRegistry for FakeRegistry {
        fn send(&self, _process_id: &str, _bytes: &[u8]) -> Result<(), ProcessError> {
            Ok(())
        }
        fn replace(&self, _process_id: &str, _reason: &str) -> Result<(), ProcessError> {
            Ok(())
        }
        fn stop_all(&self) -> Result<(), ProcessError> {
            Ok(())
        }
        fn workers(&self) -> Vec<ProcessId> {
            Vec::new()
        }
        fn coordinator(&self) -> Option<ProcessId> {
            self.coordinator.clone()
        }
    }

    fn executor(registry: Arc<FakeRegistry>) -> RecoveryExecutor {
        let bus = EventBus::new();
        let ctx = HandlerContext {
            processes: Arc::new(ProcessRepository::new()),
            tasks: Arc::new(TaskRepository::new()),
            issue_tracker: Arc::new(FakeIssueExecutor),
            process_registry: registry.clone(),
        };
        let command_bus = Arc::new(CommandBus::new(ctx, bus.clone()));
        let monitor = HealthMonitor::new(Arc::new(SystemClock), bus.clone(), HealthPolicy::default());
        let supervisor = Arc::new(Supervisor::new(registry.clone(), monitor));
        RecoveryExecutor::new(Arc::new(SystemClock), bus, command_bus, supervisor, registry)
    }

    #[tokio::test]
    async fn nudge_requires_running_workflow() {
        let registry = Arc::new(FakeRegistry { coordinator: Some("coord".into()) });
        let exec = executor(registry);
        let workflow = WorkflowInstance::new(uuid::Uuid::now_v7(), "w");
        workflow.transition_to(WorkflowState::Paused).unwrap();

        let err = exec.execute_recovery(&workflow, RecoveryAction::Nudge).await.unwrap_err();
        assert!(matches!(err, ControlError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn nudge_succeeds_when_coordinator_registered() {
        let registry = Arc::new(FakeRegistry { coordinator: Some("coord".into()) });
        let exec = executor(registry);
        let workflow = WorkflowInstance::new(uuid::Uuid::now_v7(), "w");

        exec.execute_recovery(&workflow, RecoveryAction::Nudge).await.unwrap();
    }

    #[tokio::test]
    async fn replace_without_coordinator_fails_externally() {
        let registry = Arc::new(FakeRegistry::default());
        let exec = executor(registry);
        let workflow = WorkflowInstance::new(uuid::Uuid::now_v7(), "w");

        let err = exec.execute_recovery(&workflow, RecoveryAction::Replace).await.unwrap_err();
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn fail_shuts_down_and_cancels_the_workflow() {
        let registry = Arc::new(FakeRegistry::default());
        let exec = executor(registry);
        let workflow = WorkflowInstance::new(uuid::Uuid::now_v7(), "w");
        let token = workflow.cancellation_token();

        exec.execute_recovery(&workflow, RecoveryAction::Fail).await.unwrap();
        assert!(token.is_cancelled());
        assert_eq!(workflow.state(), WorkflowState::Failed);
    }

    #[tokio::test]
    async fn fail_on_already_terminal_workflow_errors() {
        let registry = Arc::new(FakeRegistry::default());
        let exec = executor(registry);
        let workflow = WorkflowInstance::new(uuid::Uuid::now_v7(), "w");
        workflow.transition_to(WorkflowState::Completed).unwrap();

        let err = exec.execute_recovery(&workflow, RecoveryAction::Fail).await.unwrap_err();
        assert!(matches!(err, ControlError::InvalidTransition { .. }));
    }
}
