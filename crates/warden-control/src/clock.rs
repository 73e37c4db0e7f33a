//! Re-exports the `Clock` port from `warden_fabric` so the control plane
//! and the fabric share one time abstraction and one `ManualClock` test
//! double rather than two parallel ones.

pub use warden_fabric::{Clock, ManualClock, SystemClock};
