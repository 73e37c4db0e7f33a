//! Injectable time source (spec §6: `Clock.Now()` — injectable).

use std::sync::RwLock;

use chrono::{DateTime, Utc};

pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation used outside of tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanceable clock for deterministic health-monitor and fabric
/// tests (e.g. scenario S3's "advance clock 250ms with no events; tick").
#[derive(Debug)]
pub struct ManualClock {
    current: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { current: RwLock::new(start) }
    }

    pub fn advance(&self, delta: chrono::Duration) {
        let mut guard = self.current.write().expect("manual clock lock poisoned");
        *guard += delta;
    }

    pub fn set(&self, at: DateTime<Utc>) {
        *self.current.write().expect("manual clock lock poisoned") = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().expect("manual clock lock poisoned")
    }
}
