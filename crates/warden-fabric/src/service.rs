//! Public messaging API over the fabric repositories.
//!
//! See spec §4.2. Every repository operation takes its own lock; this
//! service composes them without holding any lock across a repo call, so
//! the visibility and unread-listing reads (read-only) never block a
//! concurrent send.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::clock::Clock;
use crate::error::{FabricError, FabricResult};
use crate::model::{
    AgentId, Attachment, Dependency, DependencyRelation, HistoryEntry, Participant, Subscription,
    SubscriptionMode, Thread, ThreadId, ThreadType, UnackedChannel, HERE_MENTION,
};
use crate::repo::{
    AckRepository, AttachmentRepository, DependencyRepository, ParticipantRepository,
    ReactionRepository, SubscriptionRepository, ThreadRepository,
};

/// Cycle-guard bound for the `ReplyTo` walk (spec §8 property 3, §9).
/// The insert path never produces a cycle; the limit is kept anyway.
const MAX_REPLY_DEPTH: u32 = 10;

#[derive(Debug)]
pub struct FabricService {
    threads: ThreadRepository,
    dependencies: DependencyRepository,
    subscriptions: SubscriptionRepository,
    participants: ParticipantRepository,
    acks: AckRepository,
    reactions: ReactionRepository,
    attachments: AttachmentRepository,
    clock: Arc<dyn Clock>,
}

impl FabricService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            threads: ThreadRepository::new(),
            dependencies: DependencyRepository::new(),
            subscriptions: SubscriptionRepository::new(),
            participants: ParticipantRepository::new(),
            acks: AckRepository::new(),
            reactions: ReactionRepository::new(),
            attachments: AttachmentRepository::new(),
            clock,
        }
    }

    pub fn create_channel(&self, slug: &str, created_by: &str) -> FabricResult<ThreadId> {
        if slug.trim().is_empty() {
            return Err(FabricError::InvalidSlug(slug.to_string()));
        }
        if self.threads.find_channel_by_slug(slug).is_some() {
            return Err(FabricError::InvalidSlug(format!("slug already exists: {slug}")));
        }
        let channel = Thread::new_channel(slug, created_by, self.clock.now());
        Ok(self.threads.insert(channel))
    }

    pub fn subscribe(&self, channel_slug: &str, agent_id: &str, mode: SubscriptionMode) -> FabricResult<()> {
        let channel = self.require_channel(channel_slug)?;
        self.subscriptions.upsert(Subscription { channel_id: channel.id, agent_id: agent_id.to_string(), mode });
        Ok(())
    }

    pub fn register_participant(&self, agent_id: &str, role: &str) {
        self.participants.register(Participant { agent_id: agent_id.to_string(), role: role.to_string() });
    }

    pub fn participants(&self) -> Vec<Participant> {
        self.participants.all()
    }

    /// `SendMessage` — spec §4.2.
    pub fn send_message(
        &self,
        channel_slug: &str,
        content: &str,
        kind: &str,
        created_by: &str,
        mentions: impl IntoIterator<Item = String>,
    ) -> FabricResult<Thread> {
        let channel = self.require_channel(channel_slug)?;
        let mentions: BTreeSet<String> = mentions.into_iter().collect();
        let participants = materialize_participants(created_by, &mentions);

        let message = Thread::new_message(content, kind, created_by, mentions, participants, self.clock.now());
        let message_id = self.threads.insert(message.clone());
        self.dependencies.insert(Dependency { child_id: message_id, parent_id: channel.id, relation: DependencyRelation::ChildOf });
        Ok(message)
    }

    /// `Reply` — flat-threaded: the new message's `ReplyTo` always points
    /// at the root, even when replying to another reply.
    pub fn reply(
        &self,
        parent_message_id: ThreadId,
        content: &str,
        kind: &str,
        created_by: &str,
        mentions: impl IntoIterator<Item = String>,
    ) -> FabricResult<Thread> {
        let parent = self
            .threads
            .get(parent_message_id)
            .ok_or(FabricError::ParentNotFound { parent_id: parent_message_id })?;

        let root_id = self.resolve_root(&parent)?;
        let mentions: BTreeSet<String> = mentions.into_iter().collect();

        // Replies don't augment the root's materialized participant set
        // (spec §3 invariant); the reply's own participants field is unused
        // by the visibility algorithm and left empty.
        let reply = Thread::new_message(content, kind, created_by, mentions, BTreeSet::new(), self.clock.now());
        let reply_id = self.threads.insert(reply.clone());
        self.dependencies.insert(Dependency { child_id: reply_id, parent_id: root_id, relation: DependencyRelation::ReplyTo });
        Ok(reply)
    }

    /// Walks `ReplyTo` edges from `parent` until it is itself a root
    /// (has no `ReplyTo` edge), so a reply to a reply still targets the
    /// original root message.
    fn resolve_root(&self, parent: &Thread) -> FabricResult<ThreadId> {
        let mut current = parent.id;
        for _ in 0..MAX_REPLY_DEPTH {
            match self.dependencies.parent_of(current, DependencyRelation::ReplyTo) {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
        Err(FabricError::ReplyChainTooDeep { start: parent.id })
    }

    /// `Ack` — idempotent per thread/agent pair.
    pub fn ack(&self, agent_id: &str, thread_ids: impl IntoIterator<Item = ThreadId>) -> FabricResult<()> {
        let now = self.clock.now();
        for thread_id in thread_ids {
            if self.threads.get(thread_id).is_none() {
                return Err(FabricError::UnknownAckTarget { thread_id });
            }
            self.acks.ack(thread_id, agent_id, now);
        }
        Ok(())
    }

    /// `GetUnacked` — spec §4.2 algorithm, steps 1-5.
    pub fn get_unacked(&self, agent_id: &str) -> HashMap<ThreadId, UnackedChannel> {
        let acked = self.acks.acked_set(agent_id);
        let mut out: HashMap<ThreadId, UnackedChannel> = HashMap::new();

        for message in self.threads.all_messages() {
            if message.is_archived() || message.created_by == agent_id || acked.contains(&message.id) {
                continue;
            }
            let Some((channel_id, root_id)) = self.locate_channel(message.id) else {
                tracing::warn!(message_id = %message.id, "could not resolve channel for message; skipping in unread listing");
                continue;
            };
            let is_reply = root_id != message.id;
            let visible = if is_reply {
                self.reply_visible(&message, root_id, agent_id)
            } else {
                self.top_level_visible(&message, channel_id, agent_id)
            };
            if !visible {
                continue;
            }
            let entry = out.entry(channel_id).or_default();
            entry.count += 1;
            entry.thread_ids.push(message.id);
        }
        out
    }

    fn top_level_visible(&self, message: &Thread, channel_id: ThreadId, agent_id: &str) -> bool {
        let subscribed_all = matches!(self.subscriptions.mode_for(channel_id, agent_id), Some(SubscriptionMode::All));
        subscribed_all
            || message.mentions.contains(agent_id)
            || message.participants.contains(agent_id)
            || (message.mentions_here() && self.participants.is_registered(agent_id))
    }

    fn reply_visible(&self, message: &Thread, root_id: ThreadId, agent_id: &str) -> bool {
        let root_participant = self
            .threads
            .get(root_id)
            .map(|root| root.participants.contains(agent_id))
            .unwrap_or(false);
        message.mentions.contains(agent_id)
            || root_participant
            || (message.mentions_here() && self.participants.is_registered(agent_id))
    }

    /// Returns `(channel_id, root_id)` for any message: for a top-level
    /// message `root_id == message_id`; for a reply, `root_id` is the
    /// thread the `ChildOf` edge was found on after walking `ReplyTo`
    /// edges (cycle-guarded, spec §8 property 3).
    fn locate_channel(&self, message_id: ThreadId) -> Option<(ThreadId, ThreadId)> {
        let mut current = message_id;
        for _ in 0..MAX_REPLY_DEPTH {
            if let Some(channel_id) = self.dependencies.parent_of(current, DependencyRelation::ChildOf) {
                return Some((channel_id, current));
            }
            match self.dependencies.parent_of(current, DependencyRelation::ReplyTo) {
                Some(parent) => current = parent,
                None => return None,
            }
        }
        None
    }

    /// `ListHistory` — ordered top-level messages with reply-count
    /// summaries, most-recent first.
    pub fn list_history(&self, channel_slug: &str, limit: usize, before_id: Option<ThreadId>) -> FabricResult<Vec<HistoryEntry>> {
        let channel = self.require_channel(channel_slug)?;
        let top_level_ids = self.dependencies.children_of(channel.id, DependencyRelation::ChildOf);
        let mut messages = self.threads.get_many(&top_level_ids);
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if let Some(cursor) = before_id {
            if let Some(pos) = messages.iter().position(|m| m.id == cursor) {
                messages = messages.split_off(pos + 1);
            }
        }
        messages.truncate(limit);

        Ok(messages
            .into_iter()
            .map(|message| {
                let reply_count = self.dependencies.children_of(message.id, DependencyRelation::ReplyTo).len();
                HistoryEntry { message, reply_count }
            })
            .collect())
    }

    pub fn attach(&self, target_id: ThreadId, path: &str, name: &str) -> FabricResult<()> {
        self.threads.require(target_id)?;
        self.attachments.insert(Attachment { target_id, path: path.to_string(), name: name.to_string() });
        Ok(())
    }

    pub fn attachments_for(&self, target_id: ThreadId) -> Vec<Attachment> {
        self.attachments.for_target(target_id)
    }

    pub fn react(&self, message_id: ThreadId, agent_id: &str, emoji: &str, add: bool) -> FabricResult<()> {
        self.threads.require(message_id)?;
        if add {
            self.reactions.add(message_id, emoji, agent_id);
        } else {
            self.reactions.remove(message_id, emoji, agent_id);
        }
        Ok(())
    }

    pub fn reactions_for(&self, message_id: ThreadId, emoji: &str) -> std::collections::HashSet<AgentId> {
        self.reactions.agents_for(message_id, emoji)
    }

    pub fn archive(&self, thread_id: ThreadId) -> FabricResult<()> {
        self.threads.archive(thread_id, self.clock.now())
    }

    fn require_channel(&self, slug: &str) -> FabricResult<Thread> {
        let thread = self.threads.find_channel_by_slug(slug).ok_or(FabricError::ChannelNotFound { slug: slug.to_string() })?;
        debug_assert_eq!(thread.kind, ThreadType::Channel);
        Ok(thread)
    }
}

/// `participants = {created_by} ∪ resolve(mentions)`, where `@here`
/// expands lazily at visibility-check time rather than being baked into
/// the participant set here (spec §4.2).
fn materialize_participants(created_by: &str, mentions: &BTreeSet<String>) -> BTreeSet<String> {
    let mut participants = BTreeSet::new();
    participants.insert(created_by.to_string());
    for mention in mentions {
        if mention != HERE_MENTION {
            participants.insert(mention.clone());
        }
    }
    participants
}
