//! # Warden Fabric
//!
//! A thread-based channel messaging system with per-agent acknowledgement
//! tracking, mention semantics (`@here`, direct), subscriptions, and
//! participant membership. Flat-threaded: every reply resolves to the
//! root message of its thread, never to an intermediate reply.
//!
//! This crate holds no persistence, no networking, and no access control
//! beyond subscriptions/participation/mentions — it is a broadcast
//! substrate, not an authorization layer (see the control-plane spec §1
//! Non-goals).

pub mod clock;
pub mod error;
pub mod model;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{FabricError, FabricResult};
pub use model::*;
pub use service::FabricService;
