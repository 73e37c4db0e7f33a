//! Entity types for the messaging fabric.
//!
//! Mirrors the data model in the control-plane spec: channels and messages
//! are both represented as [`Thread`]s, replies are flat-threaded (a
//! [`Dependency`] of kind [`DependencyRelation::ReplyTo`] always points at
//! the root message, never at an intermediate reply).

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Literal mention sentinel for "everyone registered as a participant".
///
/// Stored as a plain agent-id-shaped string in the mention set. An agent
/// literally named `here` collides with this sentinel; the fabric does not
/// disambiguate (see spec Open Questions).
pub const HERE_MENTION: &str = "here";

pub type AgentId = String;
pub type ThreadId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ThreadType {
    Channel,
    Message,
}

/// A channel (named, slug-addressed) or a message (opaque-id-addressed).
///
/// Channels never have `mentions`/`participants` of their own; those fields
/// are populated on messages only. Kept on one struct because both are
/// stored in the same repository and share a primary key space.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: ThreadId,
    pub kind: ThreadType,
    /// Present only for `ThreadType::Channel`.
    pub slug: Option<String>,
    /// Present only for `ThreadType::Message`.
    pub content: Option<String>,
    pub message_kind: Option<String>,
    pub created_by: AgentId,
    pub created_at: DateTime<Utc>,
    pub mentions: BTreeSet<AgentId>,
    pub participants: BTreeSet<AgentId>,
    pub archived_at: Option<DateTime<Utc>>,
}

impl Thread {
    pub fn new_channel(slug: impl Into<String>, created_by: impl Into<AgentId>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind: ThreadType::Channel,
            slug: Some(slug.into()),
            content: None,
            message_kind: None,
            created_by: created_by.into(),
            created_at: now,
            mentions: BTreeSet::new(),
            participants: BTreeSet::new(),
            archived_at: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn new_message(
        content: impl Into<String>,
        message_kind: impl Into<String>,
        created_by: impl Into<AgentId>,
        mentions: BTreeSet<AgentId>,
        participants: BTreeSet<AgentId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind: ThreadType::Message,
            slug: None,
            content: Some(content.into()),
            message_kind: Some(message_kind.into()),
            created_by: created_by.into(),
            created_at: now,
            mentions,
            participants,
            archived_at: None,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.archived_at.is_some()
    }

    pub fn mentions_here(&self) -> bool {
        self.mentions.contains(HERE_MENTION)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyRelation {
    /// Binds a top-level message to the channel it was posted in.
    ChildOf,
    /// Binds a reply to the root message of its thread.
    ReplyTo,
    /// Binds an attachment to its target thread.
    AttachedTo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dependency {
    pub child_id: ThreadId,
    pub parent_id: ThreadId,
    pub relation: DependencyRelation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubscriptionMode {
    All,
    Mentions,
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub channel_id: ThreadId,
    pub agent_id: AgentId,
    pub mode: SubscriptionMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub agent_id: AgentId,
    pub role: String,
}

/// `(thread_id, agent_id)` is the primary key; acks are idempotent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub thread_id: ThreadId,
    pub agent_id: AgentId,
    pub acked_at: DateTime<Utc>,
}

/// An attachment edge; the payload bytes live on an external filesystem
/// collaborator (out of scope, see spec §1) — the fabric only tracks the
/// pointer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub target_id: ThreadId,
    pub path: String,
    pub name: String,
}

/// One agent's unread summary for a single channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnackedChannel {
    pub count: usize,
    pub thread_ids: Vec<ThreadId>,
}

/// A top-level message plus its reply count, as returned by history listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message: Thread,
    pub reply_count: usize,
}
