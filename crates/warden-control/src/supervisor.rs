//! Supervisor (spec §4.7): workflow-level pause/resume/shutdown. Delegates
//! state transitions to `WorkflowInstance` and infrastructure teardown to
//! the health monitor and process registry.

use std::sync::Arc;

use tracing::info;

use crate::error::ControlResult;
use crate::health::HealthMonitor;
use crate::lifecycle::{WorkflowInstance, WorkflowState};
use crate::ports::ProcessRegistry;

pub struct Supervisor {
    process_registry: Arc<dyn ProcessRegistry>,
    health_monitor: Arc<HealthMonitor>,
}

impl Supervisor {
    pub fn new(process_registry: Arc<dyn ProcessRegistry>, health_monitor: Arc<HealthMonitor>) -> Self {
        Self { process_registry, health_monitor }
    }

    /// Transition to Paused, stop the coordinator-nudger (the health tick
    /// loop is left running; only per-workflow infrastructure is torn
    /// down), and stop all child processes. Repos and the event bus stay
    /// alive — state is preserved for `resume`.
    pub fn pause(&self, workflow: &WorkflowInstance) -> ControlResult<()> {
        workflow.transition_to(WorkflowState::Paused)?;
        self.process_registry.stop_all()?;
        info!(workflow_id = %workflow.id, "workflow paused");
        Ok(())
    }

    pub fn resume(&self, workflow: &WorkflowInstance) -> ControlResult<()> {
        workflow.transition_to(WorkflowState::Running)?;
        info!(workflow_id = %workflow.id, "workflow resumed");
        Ok(())
    }

    /// Transitions to the given terminal state, shuts down infrastructure,
    /// and cancels the workflow's context.
    pub fn shutdown(&self, workflow: &WorkflowInstance, terminal: WorkflowState) -> ControlResult<()> {
        workflow.transition_to(terminal)?;
        self.process_registry.stop_all()?;
        self.health_monitor.untrack_workflow(workflow.id);
        workflow.cancel();
        info!(workflow_id = %workflow.id, ?terminal, "workflow shut down");
        Ok(())
    }
}
