//! Error types for fabric operations.

use thiserror::Error;

use crate::model::ThreadId;

pub type FabricResult<T> = Result<T, FabricError>;

/// Failures raised by [`crate::service::FabricService`] operations.
#[derive(Debug, Error)]
pub enum FabricError {
    #[error("channel not found: {slug}")]
    ChannelNotFound { slug: String },

    #[error("parent message not found: {parent_id}")]
    ParentNotFound { parent_id: ThreadId },

    #[error("thread not found: {thread_id}")]
    ThreadNotFound { thread_id: ThreadId },

    #[error("ack references a non-existent thread: {thread_id}")]
    UnknownAckTarget { thread_id: ThreadId },

    #[error("reply-chain walk exceeded depth limit starting at {start}")]
    ReplyChainTooDeep { start: ThreadId },

    #[error("invalid channel slug: {0}")]
    InvalidSlug(String),
}

impl FabricError {
    /// Failures the caller can retry after fixing the request; `false`
    /// means the fabric itself is in an inconsistent state worth surfacing
    /// loudly rather than swallowing (see spec §7 invariant-violation class).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FabricError::ChannelNotFound { .. }
                | FabricError::ParentNotFound { .. }
                | FabricError::ThreadNotFound { .. }
                | FabricError::InvalidSlug(_)
        )
    }
}
