//! `wardenctl` configuration: the `WardenConfig` health-policy document,
//! loaded from TOML plus environment overrides.

mod loader;

pub(crate) use loader::load_warden_config;
