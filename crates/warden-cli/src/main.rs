//! `wardenctl` — a thin operator CLI over the Warden control plane, wiring
//! it against in-memory port stand-ins the way `tasker-ctl` wires
//! `tasker-client` against the HTTP API.

mod cli_config;
mod output;
mod ports;
mod session_index;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use warden_control::{
    Command, CommandBus, CommandSource, ControlPlane, EventBus, HandlerContext, HealthMonitor, Process,
    ProcessRepository, RecoveryExecutor, Supervisor, SystemClock, TaskRepository, WorkflowHandle, WorkflowInstance,
};

use ports::{InMemoryIssueExecutor, NoopProcessRegistry};

#[derive(Parser)]
#[command(name = "wardenctl", version, about = "Operator CLI for the Warden control plane", styles = output::clap_styles())]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a self-contained demo workflow end-to-end and print its outcome.
    Demo,
    /// Show the current configuration that would be loaded.
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Demo => run_demo().await,
        Commands::ShowConfig => show_config(),
    }
}

fn show_config() -> anyhow::Result<()> {
    let config = cli_config::load_warden_config();
    output::header("warden configuration");
    output::label("check_interval_seconds", config.check_interval_seconds);
    output::label("max_nudges", config.health_policy.max_nudges);
    output::label("max_recoveries", config.health_policy.max_recoveries);
    output::label("heartbeat_timeout_seconds", config.health_policy.heartbeat_timeout_seconds);
    output::label("progress_timeout_seconds", config.health_policy.progress_timeout_seconds);
    Ok(())
}

/// Wires a complete control plane against in-memory ports, tracks one
/// workflow, and drives `MarkTaskComplete` through the command bus so an
/// operator can see the wiring work without a real issue tracker or
/// child-process supervisor attached.
async fn run_demo() -> anyhow::Result<()> {
    output::header("warden demo workflow");

    let config = cli_config::load_warden_config();
    let bus = EventBus::new();
    let clock: Arc<dyn warden_control::Clock> = Arc::new(SystemClock);
    let registry = Arc::new(NoopProcessRegistry::new(Some("coordinator".into()), vec!["worker-1".into()]));
    let issue_tracker = Arc::new(InMemoryIssueExecutor::default());

    let processes = Arc::new(ProcessRepository::new());
    processes.insert(Process::new_coordinator("coordinator"));
    processes.insert(Process::new_worker("worker-1"));

    let tasks = Arc::new(TaskRepository::new());
    tasks.insert(warden_control::TaskAssignment {
        task_id: "T-1".into(),
        implementer: "worker-1".into(),
        reviewer: "coordinator".into(),
        status: warden_control::TaskStatus::Implementing,
    });

    let ctx = HandlerContext {
        processes: processes.clone(),
        tasks: tasks.clone(),
        issue_tracker: issue_tracker.clone(),
        process_registry: registry.clone(),
    };
    let command_bus = Arc::new(CommandBus::new(ctx, bus.clone()));

    let monitor = HealthMonitor::new(clock.clone(), bus.clone(), config.health_policy.to_runtime());
    let supervisor = Arc::new(Supervisor::new(registry.clone(), monitor.clone()));
    let recovery =
        Arc::new(RecoveryExecutor::new(clock, bus.clone(), command_bus.clone(), supervisor.clone(), registry));

    let control_plane = ControlPlane::new(bus, monitor, supervisor, config.check_interval());
    let workflow_id = uuid::Uuid::now_v7();
    let instance = WorkflowInstance::new(workflow_id, "demo-workflow");
    control_plane.register(WorkflowHandle { instance, command_bus: command_bus.clone(), recovery });

    output::label("workflow_id", workflow_id);
    output::status_icon(true, "workflow registered and tracked");

    let result = command_bus
        .submit_and_wait(Command::MarkTaskComplete {
            workflow_id,
            source: CommandSource::UserCLI,
            task_id: "T-1".into(),
        })
        .await?;

    if result.success {
        output::success("task T-1 marked complete");
    } else {
        output::error(result.error.unwrap_or_else(|| "unknown error".to_string()));
    }

    output::blank();
    output::dim("both the implementer and reviewer were reset to Ready/Idle");

    Ok(())
}
