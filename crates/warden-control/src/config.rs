//! Canonical, serializable configuration plus adapters into the runtime
//! types the components actually consume. Grounded in
//! `tasker-shared/src/config/circuit_breaker.rs`'s split between a
//! TOML-friendly config struct and its `to_resilience_config()` adapter.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use serde::{Deserialize, Serialize};

use crate::health::HealthPolicy;

/// TOML-friendly mirror of `HealthPolicy` (plain integers/bools, no
/// `chrono` types) so it can be deserialized directly by the `config`
/// crate without a custom visitor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HealthPolicyConfig {
    pub heartbeat_timeout_seconds: u64,
    pub progress_timeout_seconds: u64,
    pub max_recoveries: u32,
    pub max_nudges: u32,
    pub recovery_backoff_seconds: u64,
    pub enable_auto_nudge: bool,
    pub enable_auto_replace: bool,
    pub enable_auto_pause: bool,
    pub enable_auto_fail: bool,
}

impl Default for HealthPolicyConfig {
    fn default() -> Self {
        let defaults = HealthPolicy::default();
        Self {
            heartbeat_timeout_seconds: defaults.heartbeat_timeout.num_seconds() as u64,
            progress_timeout_seconds: defaults.progress_timeout.num_seconds() as u64,
            max_recoveries: defaults.max_recoveries,
            max_nudges: defaults.max_nudges,
            recovery_backoff_seconds: defaults.recovery_backoff.num_seconds() as u64,
            enable_auto_nudge: defaults.enable_auto_nudge,
            enable_auto_replace: defaults.enable_auto_replace,
            enable_auto_pause: defaults.enable_auto_pause,
            enable_auto_fail: defaults.enable_auto_fail,
        }
    }
}

impl HealthPolicyConfig {
    pub fn to_runtime(self) -> HealthPolicy {
        HealthPolicy {
            heartbeat_timeout: ChronoDuration::seconds(self.heartbeat_timeout_seconds as i64),
            progress_timeout: ChronoDuration::seconds(self.progress_timeout_seconds as i64),
            max_recoveries: self.max_recoveries,
            max_nudges: self.max_nudges,
            recovery_backoff: ChronoDuration::seconds(self.recovery_backoff_seconds as i64),
            enable_auto_nudge: self.enable_auto_nudge,
            enable_auto_replace: self.enable_auto_replace,
            enable_auto_pause: self.enable_auto_pause,
            enable_auto_fail: self.enable_auto_fail,
        }
    }
}

/// Top-level control-plane configuration, the `warden-cli` loader's
/// deserialization target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WardenConfig {
    pub health_policy: HealthPolicyConfig,
    pub check_interval_seconds: u64,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self { health_policy: HealthPolicyConfig::default(), check_interval_seconds: 5 }
    }
}

impl WardenConfig {
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_runtime_conversion() {
        let config = WardenConfig::default();
        let policy = config.health_policy.to_runtime();
        assert_eq!(policy.max_nudges, 2);
        assert_eq!(policy.heartbeat_timeout, ChronoDuration::seconds(30));
    }

    #[test]
    fn config_deserializes_from_toml() {
        let toml_src = r#"
            check_interval_seconds = 10

            [health_policy]
            heartbeat_timeout_seconds = 15
            progress_timeout_seconds = 60
            max_recoveries = 3
            max_nudges = 1
            recovery_backoff_seconds = 5
            enable_auto_nudge = true
            enable_auto_replace = true
            enable_auto_pause = false
            enable_auto_fail = true
        "#;
        let config: WardenConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.check_interval_seconds, 10);
        assert_eq!(config.health_policy.max_nudges, 1);
        assert!(!config.health_policy.enable_auto_pause);
    }
}
