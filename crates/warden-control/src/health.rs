//! Health Monitor (spec §4.5): tick-driven liveness tracker plus the pure
//! recovery-ladder decision function. Grounded in the
//! `CircuitBreakerBehavior`/`CircuitBreakerMetrics` pairing
//! (`tasker-shared/src/resilience/behavior.rs`, `.../metrics.rs`): a status
//! record paired with a summary, consumed uniformly through a trait object.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::bus::EventBus;
use crate::clock::Clock;
use crate::events::{ControlPlaneEvent, HealthEvent, HealthEventKind, ProcessEvent, RecoveryAction};
use crate::model::WorkflowId;

/// Tunable health policy (spec §4.5). Loaded from `WardenConfig` in
/// production; constructed directly in tests.
#[derive(Debug, Clone, Copy)]
pub struct HealthPolicy {
    pub heartbeat_timeout: ChronoDuration,
    pub progress_timeout: ChronoDuration,
    pub max_recoveries: u32,
    pub max_nudges: u32,
    pub recovery_backoff: ChronoDuration,
    pub enable_auto_nudge: bool,
    pub enable_auto_replace: bool,
    pub enable_auto_pause: bool,
    pub enable_auto_fail: bool,
}

impl Default for HealthPolicy {
    fn default() -> Self {
        Self {
            heartbeat_timeout: ChronoDuration::seconds(30),
            progress_timeout: ChronoDuration::seconds(120),
            max_recoveries: 4,
            max_nudges: 2,
            recovery_backoff: ChronoDuration::seconds(10),
            enable_auto_nudge: true,
            enable_auto_replace: true,
            enable_auto_pause: true,
            enable_auto_fail: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub workflow_id: WorkflowId,
    pub last_heartbeat_at: DateTime<Utc>,
    pub last_progress_at: DateTime<Utc>,
    pub is_healthy: bool,
    pub recovery_count: u32,
}

impl HealthStatus {
    fn new(workflow_id: WorkflowId, now: DateTime<Utc>) -> Self {
        Self { workflow_id, last_heartbeat_at: now, last_progress_at: now, is_healthy: true, recovery_count: 0 }
    }
}

/// Human/metrics-facing pairing for a `HealthStatus`, analogous to
/// `CircuitBreakerMetrics::format_summary`.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub workflow_id: WorkflowId,
    pub heartbeat_age: ChronoDuration,
    pub progress_age: ChronoDuration,
    pub recovery_count: u32,
    pub is_healthy: bool,
}

impl HealthStatus {
    pub fn snapshot(&self, now: DateTime<Utc>) -> HealthSnapshot {
        HealthSnapshot {
            workflow_id: self.workflow_id,
            heartbeat_age: now - self.last_heartbeat_at,
            progress_age: now - self.last_progress_at,
            recovery_count: self.recovery_count,
            is_healthy: self.is_healthy,
        }
    }
}

/// Mirrors `tasker_shared::resilience::metrics::MetricsCollector`: a trait
/// for observing health events, with a tracing-backed default and a
/// swappable test double.
pub trait HealthObserver: Send + Sync + std::fmt::Debug {
    fn record_health_event(&self, event: &HealthEvent);
    fn record_recovery_action(&self, workflow_id: WorkflowId, action: RecoveryAction);
}

#[derive(Debug, Default)]
pub struct TracingHealthObserver;

impl HealthObserver for TracingHealthObserver {
    fn record_health_event(&self, event: &HealthEvent) {
        info!(workflow_id = %event.workflow_id, kind = ?event.kind, details = %event.details, "health event");
    }

    fn record_recovery_action(&self, workflow_id: WorkflowId, action: RecoveryAction) {
        info!(workflow_id = %workflow_id, action = ?action, "recovery action selected");
    }
}

/// Pure function of its arguments (spec §8 property 6): the nudge → replace
/// → pause → fail ladder, gated by which rungs the policy enables.
pub fn determine_recovery_action(status: &HealthStatus, policy: &HealthPolicy) -> Option<RecoveryAction> {
    if status.recovery_count >= policy.max_recoveries {
        return policy.enable_auto_fail.then_some(RecoveryAction::Fail);
    }
    if status.recovery_count < policy.max_nudges {
        if policy.enable_auto_nudge {
            return Some(RecoveryAction::Nudge);
        }
        return fallback_past_nudge(policy);
    }
    if status.recovery_count == policy.max_nudges {
        if policy.enable_auto_replace {
            return Some(RecoveryAction::Replace);
        }
        return policy.enable_auto_pause.then_some(RecoveryAction::Pause);
    }
    // recovery_count == max_nudges + 1 (or policy jumped straight here when
    // max_nudges == 0): pause rung.
    policy.enable_auto_pause.then_some(RecoveryAction::Pause)
}

/// A disabled nudge rung skips straight to the next row of the ladder
/// (Replace), not past it to Pause.
fn fallback_past_nudge(policy: &HealthPolicy) -> Option<RecoveryAction> {
    if policy.enable_auto_replace {
        return Some(RecoveryAction::Replace);
    }
    policy.enable_auto_pause.then_some(RecoveryAction::Pause)
}

/// Callback invoked by the tick loop when a workflow is deemed stuck and a
/// recovery action has been selected. The recovery executor implements
/// this; kept as a closure here to avoid a dependency cycle between
/// `health` and `recovery`.
pub type RecoveryHandoff = Arc<dyn Fn(WorkflowId, RecoveryAction) + Send + Sync>;

struct TrackedWorkflow {
    status: HealthStatus,
    stuck_notified: bool,
}

pub struct HealthMonitor {
    clock: Arc<dyn Clock>,
    bus: EventBus,
    policy: HealthPolicy,
    observer: Arc<dyn HealthObserver>,
    tracked: RwLock<HashMap<WorkflowId, TrackedWorkflow>>,
    running: AtomicBool,
    cancel: CancellationToken,
}

impl HealthMonitor {
    pub fn new(clock: Arc<dyn Clock>, bus: EventBus, policy: HealthPolicy) -> Arc<Self> {
        Self::with_observer(clock, bus, policy, Arc::new(TracingHealthObserver))
    }

    pub fn with_observer(
        clock: Arc<dyn Clock>,
        bus: EventBus,
        policy: HealthPolicy,
        observer: Arc<dyn HealthObserver>,
    ) -> Arc<Self> {
        Arc::new(Self {
            clock,
            bus,
            policy,
            observer,
            tracked: RwLock::new(HashMap::new()),
            running: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        })
    }

    pub fn track_workflow(&self, workflow_id: WorkflowId) {
        let now = self.clock.now();
        self.tracked
            .write()
            .expect("health monitor lock poisoned")
            .entry(workflow_id)
            .or_insert_with(|| TrackedWorkflow { status: HealthStatus::new(workflow_id, now), stuck_notified: false });
    }

    pub fn untrack_workflow(&self, workflow_id: WorkflowId) {
        self.tracked.write().expect("health monitor lock poisoned").remove(&workflow_id);
    }

    pub fn status(&self, workflow_id: WorkflowId) -> Option<HealthStatus> {
        self.tracked.read().expect("health monitor lock poisoned").get(&workflow_id).map(|t| t.status.clone())
    }

    pub fn ingest(&self, event: &ProcessEvent) {
        if let ProcessEvent::WorkflowComplete { workflow_id } = event {
            self.untrack_workflow(*workflow_id);
            return;
        }
        let workflow_id = event.workflow_id();
        self.record_heartbeat(workflow_id);
        if event.is_progress() {
            self.record_progress(workflow_id);
        }
    }

    fn record_heartbeat(&self, workflow_id: WorkflowId) {
        self.track_workflow(workflow_id);
        let now = self.clock.now();
        if let Some(tracked) = self.tracked.write().expect("health monitor lock poisoned").get_mut(&workflow_id) {
            tracked.status.last_heartbeat_at = now;
        }
    }

    fn record_progress(&self, workflow_id: WorkflowId) {
        let now = self.clock.now();
        if let Some(tracked) = self.tracked.write().expect("health monitor lock poisoned").get_mut(&workflow_id) {
            tracked.status.last_progress_at = now;
            tracked.status.recovery_count = 0;
            tracked.status.is_healthy = true;
            tracked.stuck_notified = false;
        }
    }

    /// Runs one sweep over every tracked workflow; called by the tick loop
    /// and directly by tests that drive a `ManualClock`.
    pub fn tick(&self, handoff: &RecoveryHandoff) {
        let now = self.clock.now();
        let workflow_ids: Vec<WorkflowId> =
            self.tracked.read().expect("health monitor lock poisoned").keys().copied().collect();

        for workflow_id in workflow_ids {
            self.tick_one(workflow_id, now, handoff);
        }
    }

    fn tick_one(&self, workflow_id: WorkflowId, now: DateTime<Utc>, handoff: &RecoveryHandoff) {
        let (heartbeat_missed, stuck, snapshot_status) = {
            let mut guard = self.tracked.write().expect("health monitor lock poisoned");
            let Some(tracked) = guard.get_mut(&workflow_id) else { return };

            let heartbeat_missed =
                now - tracked.status.last_heartbeat_at > self.policy.heartbeat_timeout && tracked.status.is_healthy;
            if heartbeat_missed {
                tracked.status.is_healthy = false;
            }
            let stuck = now - tracked.status.last_progress_at > self.policy.progress_timeout;
            (heartbeat_missed, stuck, tracked.status.clone())
        };

        if heartbeat_missed {
            self.emit(HealthEventKind::HeartbeatMissed, workflow_id, None, "heartbeat timeout exceeded", now);
        }

        if !stuck {
            return;
        }

        let action = determine_recovery_action(&snapshot_status, &self.policy);
        let first_time = {
            let mut guard = self.tracked.write().expect("health monitor lock poisoned");
            let Some(tracked) = guard.get_mut(&workflow_id) else { return };
            let first_time = !tracked.stuck_notified;
            tracked.stuck_notified = true;
            if action.is_some() {
                tracked.status.recovery_count += 1;
            }
            first_time
        };

        let kind = if first_time { HealthEventKind::StuckSuspected } else { HealthEventKind::StillStuck };
        self.emit(kind, workflow_id, action, "progress timeout exceeded", now);

        if let Some(action) = action {
            debug!(workflow_id = %workflow_id, ?action, "handing off to recovery executor");
            handoff(workflow_id, action);
        }
    }

    fn emit(
        &self,
        kind: HealthEventKind,
        workflow_id: WorkflowId,
        recovery_action: Option<RecoveryAction>,
        details: &str,
        timestamp: DateTime<Utc>,
    ) {
        let event = HealthEvent { kind, workflow_id, recovery_action, details: details.to_string(), timestamp };
        self.observer.record_health_event(&event);
        if let Some(action) = recovery_action {
            self.observer.record_recovery_action(workflow_id, action);
        }
        self.bus.publish(ControlPlaneEvent::Health(event));
    }

    /// Starts the tick loop as a background task. Idempotent: calling
    /// `start` twice is a no-op on the second call. `handoff` is wired by
    /// the recovery executor at construction time.
    pub fn start(self: &Arc<Self>, check_interval: std::time::Duration, handoff: RecoveryHandoff) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        let monitor = Arc::clone(self);
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(check_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => monitor.tick(&handoff),
                }
            }
        });
    }

    /// Safe to call multiple times, including before `start`.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(max_nudges: u32) -> HealthPolicy {
        HealthPolicy {
            heartbeat_timeout: ChronoDuration::milliseconds(100),
            progress_timeout: ChronoDuration::milliseconds(200),
            max_recoveries: 4,
            max_nudges,
            recovery_backoff: ChronoDuration::milliseconds(10),
            enable_auto_nudge: true,
            enable_auto_replace: true,
            enable_auto_pause: true,
            enable_auto_fail: true,
        }
    }

    fn status_at(now: DateTime<Utc>, recovery_count: u32) -> HealthStatus {
        HealthStatus {
            workflow_id: uuid::Uuid::now_v7(),
            last_heartbeat_at: now,
            last_progress_at: now,
            is_healthy: true,
            recovery_count,
        }
    }

    #[test]
    fn recovery_ladder_escalates_in_order() {
        let now = Utc::now();
        let p = policy(2);
        assert_eq!(determine_recovery_action(&status_at(now, 0), &p), Some(RecoveryAction::Nudge));
        assert_eq!(determine_recovery_action(&status_at(now, 1), &p), Some(RecoveryAction::Nudge));
        assert_eq!(determine_recovery_action(&status_at(now, 2), &p), Some(RecoveryAction::Replace));
        assert_eq!(determine_recovery_action(&status_at(now, 3), &p), Some(RecoveryAction::Pause));
        assert_eq!(determine_recovery_action(&status_at(now, 4), &p), Some(RecoveryAction::Fail));
    }

    #[test]
    fn max_nudges_zero_starts_at_replace() {
        let now = Utc::now();
        let p = policy(0);
        assert_eq!(determine_recovery_action(&status_at(now, 0), &p), Some(RecoveryAction::Replace));
    }

    #[test]
    fn disabled_nudge_rung_skips_straight_to_replace() {
        let now = Utc::now();
        let mut p = policy(2);
        p.enable_auto_nudge = false;
        assert_eq!(determine_recovery_action(&status_at(now, 0), &p), Some(RecoveryAction::Replace));
        assert_eq!(determine_recovery_action(&status_at(now, 1), &p), Some(RecoveryAction::Replace));
    }

    #[test]
    fn disabled_rung_falls_through_to_next_enabled_one() {
        let now = Utc::now();
        let mut p = policy(2);
        p.enable_auto_replace = false;
        assert_eq!(determine_recovery_action(&status_at(now, 2), &p), Some(RecoveryAction::Pause));
    }

    #[test]
    fn exhausted_recoveries_with_auto_fail_disabled_is_limbo() {
        let now = Utc::now();
        let mut p = policy(2);
        p.enable_auto_fail = false;
        assert_eq!(determine_recovery_action(&status_at(now, 10), &p), None);
    }
}
