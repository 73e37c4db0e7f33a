//! Workspace root for the Warden control plane.
//!
//! This crate carries no runtime code of its own — `warden-fabric` and
//! `warden-control` hold the implementation. It exists to pin workspace
//! metadata and to host the end-to-end scenario tests in `tests/` that
//! exercise both crates together.
