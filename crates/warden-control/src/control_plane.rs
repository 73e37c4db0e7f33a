//! Control Plane facade (spec §4.7, §6): registry of workflows, wiring
//! Supervisor + Recovery + Health together behind the ports the HTTP/MCP/
//! CLI collaborators consume.
//!
//! This is also where the health -> recovery loop spec §2/§4.7 describe
//! actually closes: the Health Monitor consumes `ProcessEvent`s off the
//! event bus and its tick loop emits verdicts; the handoff wired up here
//! dispatches each verdict to the stuck workflow's own `RecoveryExecutor`,
//! which issues commands back through that workflow's `CommandBus`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::error;

use crate::bus::EventBus;
use crate::commands::CommandBus;
use crate::error::{ControlError, ControlResult};
use crate::events::ControlPlaneEvent;
use crate::health::{HealthMonitor, RecoveryHandoff};
use crate::lifecycle::{WorkflowInstance, WorkflowState};
use crate::model::WorkflowId;
use crate::recovery::RecoveryExecutor;
use crate::supervisor::Supervisor;

/// Everything a single workflow needs wired together. `ControlPlane` owns
/// a registry of these; each workflow gets its own command bus and
/// recovery executor but shares the process-wide event bus and health
/// monitor instance passed in at construction.
pub struct WorkflowHandle {
    pub instance: Arc<WorkflowInstance>,
    pub command_bus: Arc<CommandBus>,
    pub recovery: Arc<RecoveryExecutor>,
}

pub struct ControlPlane {
    workflows: Arc<RwLock<HashMap<WorkflowId, WorkflowHandle>>>,
    health_monitor: Arc<HealthMonitor>,
    supervisor: Arc<Supervisor>,
    bus: EventBus,
    check_interval: Duration,
    loops_started: AtomicBool,
}

impl ControlPlane {
    pub fn new(
        bus: EventBus,
        health_monitor: Arc<HealthMonitor>,
        supervisor: Arc<Supervisor>,
        check_interval: Duration,
    ) -> Self {
        Self {
            workflows: Arc::new(RwLock::new(HashMap::new())),
            health_monitor,
            supervisor,
            bus,
            check_interval,
            loops_started: AtomicBool::new(false),
        }
    }

    /// Subscribes the health monitor to `ProcessEvent`s on the bus and
    /// starts its tick loop with a handoff that looks the stuck workflow
    /// up in the registry and runs its `RecoveryExecutor`. Idempotent —
    /// only the first call after construction spawns anything, so calling
    /// this from every `register` is cheap and keeps registration the one
    /// place that has to remember to wire a new workflow in.
    fn ensure_loops_started(&self) {
        if self.loops_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let mut events = self.bus.subscribe();
        let monitor = Arc::clone(&self.health_monitor);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if let ControlPlaneEvent::Process(process_event) = event {
                    monitor.ingest(&process_event);
                }
            }
        });

        let workflows = Arc::clone(&self.workflows);
        let handoff: RecoveryHandoff = Arc::new(move |workflow_id, action| {
            let workflows = Arc::clone(&workflows);
            tokio::spawn(async move {
                let target = workflows
                    .read()
                    .expect("control plane lock poisoned")
                    .get(&workflow_id)
                    .map(|handle| (Arc::clone(&handle.instance), Arc::clone(&handle.recovery)));
                let Some((instance, recovery)) = target else { return };
                if let Err(err) = recovery.execute_recovery(&instance, action).await {
                    error!(%workflow_id, ?action, error = %err, "recovery action failed");
                }
            });
        });
        self.health_monitor.start(self.check_interval, handoff);
    }

    pub fn register(&self, handle: WorkflowHandle) {
        self.ensure_loops_started();
        let id = handle.instance.id;
        self.health_monitor.track_workflow(id);
        self.workflows.write().expect("control plane lock poisoned").insert(id, handle);
    }

    pub fn get(&self, id: WorkflowId) -> ControlResult<Arc<WorkflowInstance>> {
        self.workflows
            .read()
            .expect("control plane lock poisoned")
            .get(&id)
            .map(|h| Arc::clone(&h.instance))
            .ok_or(ControlError::WorkflowNotFound { workflow_id: id })
    }

    pub fn list(&self) -> Vec<Arc<WorkflowInstance>> {
        self.workflows.read().expect("control plane lock poisoned").values().map(|h| Arc::clone(&h.instance)).collect()
    }

    pub fn pause(&self, id: WorkflowId) -> ControlResult<()> {
        let workflow = self.get(id)?;
        self.supervisor.pause(&workflow)
    }

    pub fn resume(&self, id: WorkflowId) -> ControlResult<()> {
        let workflow = self.get(id)?;
        self.supervisor.resume(&workflow)
    }

    pub fn shutdown(&self, id: WorkflowId) -> ControlResult<()> {
        let workflow = self.get(id)?;
        let terminal =
            if workflow.state() == WorkflowState::Failed { WorkflowState::Failed } else { WorkflowState::Completed };
        self.supervisor.shutdown(&workflow, terminal)?;
        self.workflows.write().expect("control plane lock poisoned").remove(&id);
        Ok(())
    }

    pub fn command_bus(&self, id: WorkflowId) -> ControlResult<Arc<CommandBus>> {
        self.workflows
            .read()
            .expect("control plane lock poisoned")
            .get(&id)
            .map(|h| Arc::clone(&h.command_bus))
            .ok_or(ControlError::WorkflowNotFound { workflow_id: id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::commands::HandlerContext;
    use crate::health::HealthPolicy;
    use crate::ports::{IssueError, IssueExecutor, ProcessError, ProcessId, ProcessRegistry};
    use crate::recovery::RecoveryExecutor;
    use crate::repo::{ProcessRepository, TaskRepository};

    #[derive(Debug, Default)]
    struct NoopIssueExecutor;
    impl IssueExecutor for NoopIssueExecutor {
        fn update_status(&self, _task_id: &str, _status: &str) -> Result<(), IssueError> {
            Ok(())
        }
        fn add_comment(&self, _task_id: &str, _author: &str, _text: &str) -> Result<(), IssueError> {
            Ok(())
        }
    }

    #[derive(Debug, Default)]
    struct NoopRegistry;
    impl ProcessRegistry for NoopRegistry {
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
            None
        }
    }

    fn control_plane() -> (ControlPlane, WorkflowId) {
        let registry = Arc::new(NoopRegistry);
        let bus = EventBus::new();
        let monitor = HealthMonitor::new(Arc::new(SystemClock), bus.clone(), HealthPolicy::default());
        let supervisor = Arc::new(Supervisor::new(registry.clone(), monitor.clone()));
        let plane = ControlPlane::new(bus.clone(), monitor, supervisor.clone(), Duration::from_secs(60));

        let ctx = HandlerContext {
            processes: Arc::new(ProcessRepository::new()),
            tasks: Arc::new(TaskRepository::new()),
            issue_tracker: Arc::new(NoopIssueExecutor),
            process_registry: registry.clone(),
        };
        let command_bus = Arc::new(CommandBus::new(ctx, bus.clone()));
        let id = uuid::Uuid::now_v7();
        let instance = WorkflowInstance::new(id, "demo");
        let recovery = Arc::new(RecoveryExecutor::new(
            Arc::new(SystemClock),
            bus,
            command_bus.clone(),
            supervisor,
            registry,
        ));
        plane.register(WorkflowHandle { instance, command_bus, recovery });
        (plane, id)
    }

    #[tokio::test]
    async fn get_returns_registered_workflow() {
        let (plane, id) = control_plane();
        assert_eq!(plane.get(id).unwrap().id, id);
    }

    #[tokio::test]
    async fn get_missing_workflow_errors() {
        let (plane, _id) = control_plane();
        let err = plane.get(uuid::Uuid::now_v7()).unwrap_err();
        assert!(matches!(err, ControlError::WorkflowNotFound { .. }));
    }

    #[tokio::test]
    async fn shutdown_removes_the_workflow_from_the_registry() {
        let (plane, id) = control_plane();
        plane.shutdown(id).unwrap();
        assert!(plane.get(id).is_err());
    }

    #[tokio::test]
    async fn pause_then_resume_round_trips_state() {
        let (plane, id) = control_plane();
        plane.pause(id).unwrap();
        assert_eq!(plane.get(id).unwrap().state(), WorkflowState::Paused);
        plane.resume(id).unwrap();
        assert_eq!(plane.get(id).unwrap().state(), WorkflowState::Running);
    }

    #[tokio::test]
    async fn register_closes_the_health_to_recovery_loop() {
        // A stuck workflow (no heartbeat/progress ever recorded beyond
        // registration) should get nudged automatically once the tick
        // loop fires, without any test code calling `execute_recovery`
        // directly.
        let registry = Arc::new(NoopRegistry);
        let bus = EventBus::new();
        let policy = HealthPolicy {
            heartbeat_timeout: chrono::Duration::milliseconds(5),
            progress_timeout: chrono::Duration::milliseconds(5),
            max_recoveries: 4,
            max_nudges: 2,
            recovery_backoff: chrono::Duration::milliseconds(5),
            enable_auto_nudge: true,
            enable_auto_replace: true,
            enable_auto_pause: true,
            enable_auto_fail: true,
        };
        let monitor = HealthMonitor::new(Arc::new(SystemClock), bus.clone(), policy);
        let supervisor = Arc::new(Supervisor::new(registry.clone(), monitor.clone()));
        let plane = ControlPlane::new(bus.clone(), monitor, supervisor.clone(), Duration::from_millis(10));

        let ctx = HandlerContext {
            processes: Arc::new(ProcessRepository::new()),
            tasks: Arc::new(TaskRepository::new()),
            issue_tracker: Arc::new(NoopIssueExecutor),
            process_registry: registry.clone(),
        };
        let command_bus = Arc::new(CommandBus::new(ctx, bus.clone()));
        let id = uuid::Uuid::now_v7();
        let instance = WorkflowInstance::new(id, "demo");
        let recovery = Arc::new(RecoveryExecutor::new(Arc::new(SystemClock), bus, command_bus.clone(), supervisor, registry));
        plane.register(WorkflowHandle { instance, command_bus, recovery });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(plane.get(id).unwrap().state() == WorkflowState::Running, "a nudge keeps the workflow running");
    }
}
