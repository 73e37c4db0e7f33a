//! Command Bus & Handlers (spec §4.4). Routes a tagged `Command` to its
//! pre-registered handler; per-workflow serialization is enforced by a
//! `tokio::sync::Mutex<()>` permit around dispatch, matching the "one
//! command at a time per workflow" rule. Grounded in the
//! `OrchestrationCommand` enum + typed-result pattern
//! (`tasker-orchestration/src/orchestration/commands/types.rs`), adapted
//! from oneshot-per-call to a registered-handler-per-kind dispatch table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::bus::EventBus;
use crate::error::ControlResult;
use crate::events::{ControlPlaneEvent, ProcessEvent};
use crate::model::{ProcessPhase, ProcessStatus, TaskAssignment, WorkflowId};
use crate::ports::{IssueExecutor, ProcessRegistry};
use crate::repo::{ProcessRepository, TaskRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandSource {
    Internal,
    MCPTool,
    UserCLI,
    HTTP,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandKind {
    MarkTaskComplete,
    MarkTaskFailed,
    SendToProcess,
    ReplaceProcess,
    NudgeCoordinator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Command {
    MarkTaskComplete { workflow_id: WorkflowId, source: CommandSource, task_id: String },
    MarkTaskFailed { workflow_id: WorkflowId, source: CommandSource, task_id: String, reason: String },
    SendToProcess { workflow_id: WorkflowId, source: CommandSource, target: String, text: String },
    ReplaceProcess { workflow_id: WorkflowId, source: CommandSource, target: String, reason: String },
    NudgeCoordinator { workflow_id: WorkflowId, source: CommandSource, prompt: String },
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::MarkTaskComplete { .. } => CommandKind::MarkTaskComplete,
            Command::MarkTaskFailed { .. } => CommandKind::MarkTaskFailed,
            Command::SendToProcess { .. } => CommandKind::SendToProcess,
            Command::ReplaceProcess { .. } => CommandKind::ReplaceProcess,
            Command::NudgeCoordinator { .. } => CommandKind::NudgeCoordinator,
        }
    }

    pub fn workflow_id(&self) -> WorkflowId {
        match self {
            Command::MarkTaskComplete { workflow_id, .. }
            | Command::MarkTaskFailed { workflow_id, .. }
            | Command::SendToProcess { workflow_id, .. }
            | Command::ReplaceProcess { workflow_id, .. }
            | Command::NudgeCoordinator { workflow_id, .. } => *workflow_id,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandResult {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    #[serde(skip)]
    pub events: Vec<ControlPlaneEvent>,
}

impl CommandResult {
    fn ok(data: impl Serialize) -> Self {
        Self { success: true, data: serde_json::to_value(data).ok(), error: None, events: Vec::new() }
    }

    fn ok_with_events(data: impl Serialize, events: Vec<ControlPlaneEvent>) -> Self {
        Self { success: true, data: serde_json::to_value(data).ok(), error: None, events }
    }

    fn failed(error: impl std::fmt::Display) -> Self {
        Self { success: false, data: None, error: Some(error.to_string()), events: Vec::new() }
    }
}

/// Collaborators a handler needs: the repos it mutates and the external
/// ports it calls through. Constructed once by the `CommandBus` builder.
pub struct HandlerContext {
    pub processes: Arc<ProcessRepository>,
    pub tasks: Arc<TaskRepository>,
    pub issue_tracker: Arc<dyn IssueExecutor>,
    pub process_registry: Arc<dyn ProcessRegistry>,
}

#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, cmd: Command, ctx: &HandlerContext) -> ControlResult<CommandResult>;
}

struct MarkTaskCompleteHandler;

#[async_trait]
impl CommandHandler for MarkTaskCompleteHandler {
    async fn handle(&self, cmd: Command, ctx: &HandlerContext) -> ControlResult<CommandResult> {
        let workflow_id = cmd.workflow_id();
        let Command::MarkTaskComplete { task_id, .. } = cmd else { unreachable!("dispatch guarantees kind match") };
        let task = ctx.tasks.require(&task_id)?;

        ctx.issue_tracker.update_status(&task_id, "closed")?;
        ctx.issue_tracker.add_comment(&task_id, "warden", "task marked complete")?;

        let mut events = Vec::new();
        for process_id in [&task.implementer, &task.reviewer] {
            match ctx.processes.require(process_id) {
                Ok(mut process) => {
                    if process.reset_to_idle() {
                        let event = ProcessEvent::ProcessStatusChange {
                            workflow_id,
                            process_id: process.id.clone(),
                            status: process.status,
                            phase: process.phase,
                        };
                        ctx.processes.update(process);
                        events.push(ControlPlaneEvent::from(event));
                    }
                }
                Err(err) => {
                    // Best-effort cleanup per spec §4.4 step 3: log and proceed.
                    error!(process_id, error = %err, "process missing during task-complete cleanup");
                }
            }
        }

        ctx.tasks.remove(&task_id);
        Ok(CommandResult::ok_with_events(serde_json::json!({ "task_id": task_id }), events))
    }
}

struct MarkTaskFailedHandler;

#[async_trait]
impl CommandHandler for MarkTaskFailedHandler {
    async fn handle(&self, cmd: Command, ctx: &HandlerContext) -> ControlResult<CommandResult> {
        let Command::MarkTaskFailed { task_id, reason, .. } = cmd else {
            unreachable!("dispatch guarantees kind match")
        };
        ctx.tasks.require(&task_id)?;
        ctx.issue_tracker.add_comment(&task_id, "warden", &format!("task failed: {reason}"))?;
        Ok(CommandResult::ok(serde_json::json!({ "task_id": task_id })))
    }
}

struct SendToProcessHandler;

#[async_trait]
impl CommandHandler for SendToProcessHandler {
    async fn handle(&self, cmd: Command, ctx: &HandlerContext) -> ControlResult<CommandResult> {
        let Command::SendToProcess { target, text, .. } = cmd else { unreachable!("dispatch guarantees kind match") };
        ctx.process_registry.send(&target, text.as_bytes())?;
        Ok(CommandResult::ok(serde_json::json!({ "target": target })))
    }
}

struct ReplaceProcessHandler;

#[async_trait]
impl CommandHandler for ReplaceProcessHandler {
    async fn handle(&self, cmd: Command, ctx: &HandlerContext) -> ControlResult<CommandResult> {
        let Command::ReplaceProcess { target, reason, .. } = cmd else {
            unreachable!("dispatch guarantees kind match")
        };
        ctx.process_registry.replace(&target, &reason)?;
        if let Ok(mut process) = ctx.processes.require(&target) {
            process.status = ProcessStatus::Ready;
            process.phase = Some(ProcessPhase::Idle);
            process.task_id = None;
            ctx.processes.update(process);
        }
        Ok(CommandResult::ok(serde_json::json!({ "target": target, "reason": reason })))
    }
}

struct NudgeCoordinatorHandler;

#[async_trait]
impl CommandHandler for NudgeCoordinatorHandler {
    async fn handle(&self, cmd: Command, ctx: &HandlerContext) -> ControlResult<CommandResult> {
        let Command::NudgeCoordinator { prompt, .. } = cmd else { unreachable!("dispatch guarantees kind match") };
        let Some(coordinator) = ctx.process_registry.coordinator() else {
            return Ok(CommandResult::failed("no coordinator registered"));
        };
        ctx.process_registry.send(&coordinator, prompt.as_bytes())?;
        Ok(CommandResult::ok(serde_json::json!({ "coordinator": coordinator })))
    }
}

/// Per-workflow serialization permit table, plus the closed handler
/// registry. `submit_and_wait` is the only path that mutates workflow
/// state, matching spec §4.4/§5's single-serialization-point rule.
pub struct CommandBus {
    handlers: HashMap<CommandKind, Box<dyn CommandHandler>>,
    workflow_locks: tokio::sync::Mutex<HashMap<WorkflowId, Arc<Mutex<()>>>>,
    ctx: HandlerContext,
    bus: EventBus,
}

impl CommandBus {
    pub fn new(ctx: HandlerContext, bus: EventBus) -> Self {
        let mut handlers: HashMap<CommandKind, Box<dyn CommandHandler>> = HashMap::new();
        handlers.insert(CommandKind::MarkTaskComplete, Box::new(MarkTaskCompleteHandler));
        handlers.insert(CommandKind::MarkTaskFailed, Box::new(MarkTaskFailedHandler));
        handlers.insert(CommandKind::SendToProcess, Box::new(SendToProcessHandler));
        handlers.insert(CommandKind::ReplaceProcess, Box::new(ReplaceProcessHandler));
        handlers.insert(CommandKind::NudgeCoordinator, Box::new(NudgeCoordinatorHandler));
        Self { handlers, workflow_locks: tokio::sync::Mutex::new(HashMap::new()), ctx, bus }
    }

    async fn permit_for(&self, workflow_id: WorkflowId) -> Arc<Mutex<()>> {
        let mut locks = self.workflow_locks.lock().await;
        Arc::clone(locks.entry(workflow_id).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    /// Dispatches synchronously, serialized per-workflow. The only entry
    /// point that mutates workflow state (spec §5 ordering guarantee).
    pub async fn submit_and_wait(&self, cmd: Command) -> ControlResult<CommandResult> {
        let workflow_id = cmd.workflow_id();
        let permit = self.permit_for(workflow_id).await;
        let _guard = permit.lock().await;

        let kind = cmd.kind();
        let Some(handler) = self.handlers.get(&kind) else {
            return Ok(CommandResult::failed(format!("no handler registered for {kind:?}")));
        };

        match handler.handle(cmd, &self.ctx).await {
            Ok(result) => {
                for event in &result.events {
                    self.bus.publish(event.clone());
                }
                info!(?kind, success = result.success, "command dispatched");
                Ok(result)
            }
            Err(err) => {
                error!(?kind, error = %err, "command handler failed");
                Ok(CommandResult::failed(err))
            }
        }
    }

    /// Fire-and-forget submission; spawns the same serialized dispatch path
    /// and discards the result beyond logging.
    pub fn submit(self: Arc<Self>, cmd: Command) {
        tokio::spawn(async move {
            if let Err(err) = self.submit_and_wait(cmd).await {
                error!(error = %err, "fire-and-forget command failed");
            }
        });
    }
}

#[derive(Clone, Default)]
pub struct TaskAssignmentSpec {
    pub task_id: String,
    pub implementer: String,
    pub reviewer: String,
}

impl TaskAssignmentSpec {
    pub fn into_assignment(self) -> TaskAssignment {
        TaskAssignment {
            task_id: self.task_id,
            implementer: self.implementer,
            reviewer: self.reviewer,
            status: crate::model::TaskStatus::Implementing,
        }
    }
}
