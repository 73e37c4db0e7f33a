//! Typed control-plane events (spec §3, §4.1).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{ProcessId, ProcessPhase, ProcessStatus, WorkflowId};

/// Events produced by processes; the event bus fans these out and the
/// health monitor filters them for liveness/progress signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ProcessEvent {
    Spawned {
        workflow_id: WorkflowId,
        process_id: ProcessId,
    },
    Output {
        workflow_id: WorkflowId,
        process_id: ProcessId,
        line: String,
    },
    ProcessStatusChange {
        workflow_id: WorkflowId,
        process_id: ProcessId,
        status: ProcessStatus,
        phase: Option<ProcessPhase>,
    },
    Error {
        workflow_id: WorkflowId,
        process_id: ProcessId,
        message: String,
    },
    WorkflowComplete {
        workflow_id: WorkflowId,
    },
}

impl ProcessEvent {
    pub fn workflow_id(&self) -> WorkflowId {
        match self {
            ProcessEvent::Spawned { workflow_id, .. }
            | ProcessEvent::Output { workflow_id, .. }
            | ProcessEvent::ProcessStatusChange { workflow_id, .. }
            | ProcessEvent::Error { workflow_id, .. }
            | ProcessEvent::WorkflowComplete { workflow_id } => *workflow_id,
        }
    }

    /// "Progress" per spec §4.5: a status transition into Working/Ready, or
    /// any phase transition. `Output`, `Spawned`, `Error`, `WorkflowComplete`
    /// never count (the last is handled separately via untrack).
    pub fn is_progress(&self) -> bool {
        match self {
            ProcessEvent::ProcessStatusChange { status, phase, .. } => {
                matches!(status, ProcessStatus::Working | ProcessStatus::Ready) || phase.is_some()
            }
            _ => false,
        }
    }
}

/// The wrapper enum the bus actually transports. Open for future event
/// families; only `Process` is populated today.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ControlPlaneEvent {
    Process(ProcessEvent),
    Health(HealthEvent),
}

impl From<ProcessEvent> for ControlPlaneEvent {
    fn from(event: ProcessEvent) -> Self {
        ControlPlaneEvent::Process(event)
    }
}

impl From<HealthEvent> for ControlPlaneEvent {
    fn from(event: HealthEvent) -> Self {
        ControlPlaneEvent::Health(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryAction {
    Nudge,
    Replace,
    Pause,
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthEventKind {
    HeartbeatMissed,
    StuckSuspected,
    StillStuck,
    RecoveryStarted,
    RecoverySuccess,
    RecoveryFailed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthEvent {
    pub kind: HealthEventKind,
    pub workflow_id: WorkflowId,
    pub recovery_action: Option<RecoveryAction>,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}
