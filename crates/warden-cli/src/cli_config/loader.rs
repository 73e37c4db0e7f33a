//! Config file discovery and loading for `.warden.toml`.
//!
//! Checks two locations in precedence order, then applies `WARDEN_*`
//! environment overrides on top via the `config` crate's layering:
//! 1. `./.warden.toml` (project-local)
//! 2. `~/.config/warden.toml` (user-global)

use std::path::PathBuf;

use warden_control::config::WardenConfig;

const CONFIG_FILENAME: &str = ".warden.toml";
const GLOBAL_CONFIG_DIR: &str = ".config";
const GLOBAL_CONFIG_FILENAME: &str = "warden.toml";

/// Load CLI config from the first discovered location layered with `WARDEN_*`
/// environment overrides, or fall back to defaults if nothing is found.
pub(crate) fn load_warden_config() -> WardenConfig {
    let defaults = WardenConfig::default();
    let hp = defaults.health_policy;
    let mut builder = config::Config::builder()
        .set_default("check_interval_seconds", defaults.check_interval_seconds)
        .and_then(|b| b.set_default("health_policy.heartbeat_timeout_seconds", hp.heartbeat_timeout_seconds))
        .and_then(|b| b.set_default("health_policy.progress_timeout_seconds", hp.progress_timeout_seconds))
        .and_then(|b| b.set_default("health_policy.max_recoveries", hp.max_recoveries))
        .and_then(|b| b.set_default("health_policy.max_nudges", hp.max_nudges))
        .and_then(|b| b.set_default("health_policy.recovery_backoff_seconds", hp.recovery_backoff_seconds))
        .and_then(|b| b.set_default("health_policy.enable_auto_nudge", hp.enable_auto_nudge))
        .and_then(|b| b.set_default("health_policy.enable_auto_replace", hp.enable_auto_replace))
        .and_then(|b| b.set_default("health_policy.enable_auto_pause", hp.enable_auto_pause))
        .and_then(|b| b.set_default("health_policy.enable_auto_fail", hp.enable_auto_fail))
        .expect("default is always a valid config value");

    if let Some(path) = find_config_file() {
        builder = builder.add_source(config::File::from(path.clone()));
        tracing::debug!(?path, "loading warden config");
    } else {
        tracing::debug!("no config file found, using defaults plus environment overrides");
    }

    builder = builder.add_source(config::Environment::with_prefix("WARDEN").separator("__"));

    match builder.build().and_then(|c| c.try_deserialize()) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load warden config, using defaults");
            defaults
        }
    }
}

fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from(CONFIG_FILENAME);
    if local.is_file() {
        return Some(local);
    }

    if let Some(home) = home_dir() {
        let global = home.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILENAME);
        if global.is_file() {
            return Some(global);
        }
    }

    None
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_config_file_yields_defaults() {
        assert!(find_config_file().is_none() || find_config_file().is_some());
        let config = load_warden_config();
        assert!(config.check_interval_seconds > 0);
    }
}
