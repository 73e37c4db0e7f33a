//! Control plane for supervised multi-agent workflows: an event bus, the
//! process/task repositories, the command bus and its handlers, a
//! tick-driven health monitor and recovery executor implementing the
//! nudge → replace → pause → fail ladder, the workflow lifecycle state
//! machine, a supervisor for pause/resume/shutdown, and the top-level
//! `ControlPlane` facade that wires them together.
//!
//! Does not implement persistence beyond what a collaborator chooses to
//! layer on top, recipient-level fabric ACLs, pluggable DAG scheduling, or
//! cross-host workflow distribution — a workflow is pinned to the process
//! that created it.

pub mod bus;
pub mod clock;
pub mod commands;
pub mod config;
pub mod control_plane;
pub mod error;
pub mod events;
pub mod health;
pub mod lifecycle;
pub mod model;
pub mod ports;
pub mod recovery;
pub mod repo;
pub mod supervisor;

pub use bus::{ControlPlaneEventStream, EventBus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use commands::{Command, CommandBus, CommandKind, CommandResult, CommandSource, HandlerContext};
pub use control_plane::{ControlPlane, WorkflowHandle};
pub use error::{ControlError, ControlResult};
pub use events::{ControlPlaneEvent, HealthEvent, HealthEventKind, ProcessEvent, RecoveryAction};
pub use health::{determine_recovery_action, HealthMonitor, HealthObserver, HealthPolicy, HealthSnapshot, HealthStatus};
pub use lifecycle::{WorkflowInstance, WorkflowState};
pub use model::*;
pub use ports::{IssueError, IssueExecutor, ProcessError, ProcessRegistry};
pub use recovery::RecoveryExecutor;
pub use repo::{ProcessRepository, TaskRepository};
pub use supervisor::Supervisor;
