//! Inbound provider events.
//!
//! Events are decoded only from a [`Verified`] body, into a closed set of
//! kinds. Unknown kinds are rejected. A decoded event is then resolved to
//! internal ids (gym from the channel id, user from the subject) before a
//! handler sees it.
//!
//! The provider delivers at least once. [`IdempotentHandler`] wraps a
//! handler and skips events it has already handled successfully.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gymchat_core::{GymId, UserId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;
use crate::error::{ChatAuthError, ChatAuthResult};
use crate::identity::IdentityMapper;
use crate::webhook::Verified;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventUser {
    pub id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReaction {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user: EventUser,
    pub message: EventMessage,
    /// Required: it is what tells two edits of one message apart.
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub channel_id: String,
    pub user: EventUser,
    pub message: EventMessage,
    pub reaction: EventReaction,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberEvent {
    pub channel_id: String,
    /// Who performed the change.
    pub user: EventUser,
    /// Who joined or left.
    pub member: EventUser,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEvent {
    pub channel_id: String,
    pub user: EventUser,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Every event kind this service understands.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum WebhookEvent {
    #[serde(rename = "message.new")]
    MessageNew(MessageEvent),
    #[serde(rename = "message.updated")]
    MessageUpdated(MessageEvent),
    #[serde(rename = "message.deleted")]
    MessageDeleted(MessageEvent),
    #[serde(rename = "reaction.new")]
    ReactionNew(ReactionEvent),
    #[serde(rename = "member.added")]
    MemberAdded(MemberEvent),
    #[serde(rename = "member.removed")]
    MemberRemoved(MemberEvent),
    #[serde(rename = "channel.created")]
    ChannelCreated(ChannelEvent),
}

impl WebhookEvent {
    /// Decode a verified body.
    pub fn decode(verified: Verified<'_>) -> ChatAuthResult<Self> {
        serde_json::from_slice(verified.body())
            .map_err(|e| ChatAuthError::InvalidEvent(e.to_string()))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WebhookEvent::MessageNew(_) => "message.new",
            WebhookEvent::MessageUpdated(_) => "message.updated",
            WebhookEvent::MessageDeleted(_) => "message.deleted",
            WebhookEvent::ReactionNew(_) => "reaction.new",
            WebhookEvent::MemberAdded(_) => "member.added",
            WebhookEvent::MemberRemoved(_) => "member.removed",
            WebhookEvent::ChannelCreated(_) => "channel.created",
        }
    }

    pub fn channel_id(&self) -> &str {
        match self {
            WebhookEvent::MessageNew(e)
            | WebhookEvent::MessageUpdated(e)
            | WebhookEvent::MessageDeleted(e) => &e.channel_id,
            WebhookEvent::ReactionNew(e) => &e.channel_id,
            WebhookEvent::MemberAdded(e) | WebhookEvent::MemberRemoved(e) => &e.channel_id,
            WebhookEvent::ChannelCreated(e) => &e.channel_id,
        }
    }

    /// External subject of the user who caused the event.
    pub fn actor(&self) -> &str {
        match self {
            WebhookEvent::MessageNew(e)
            | WebhookEvent::MessageUpdated(e)
            | WebhookEvent::MessageDeleted(e) => &e.user.id,
            WebhookEvent::ReactionNew(e) => &e.user.id,
            WebhookEvent::MemberAdded(e) | WebhookEvent::MemberRemoved(e) => &e.user.id,
            WebhookEvent::ChannelCreated(e) => &e.user.id,
        }
    }

    /// Identity of the event for redelivery detection.
    pub fn dedup_key(&self) -> String {
        let kind = self.kind();
        match self {
            WebhookEvent::MessageNew(e)
            | WebhookEvent::MessageUpdated(e)
            | WebhookEvent::MessageDeleted(e) => {
                format!("{kind}:{}:{}", e.message.id, e.created_at.timestamp_millis())
            }
            WebhookEvent::ReactionNew(e) => format!(
                "{kind}:{}:{}:{}",
                e.message.id, e.user.id, e.reaction.kind
            ),
            WebhookEvent::MemberAdded(e) | WebhookEvent::MemberRemoved(e) => format!(
                "{kind}:{}:{}:{}",
                e.channel_id,
                e.member.id,
                e.created_at.timestamp_millis()
            ),
            WebhookEvent::ChannelCreated(e) => format!("{kind}:{}", e.channel_id),
        }
    }
}

/// An event with its gym, channel and actor resolved to internal ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEvent {
    pub gym: GymId,
    pub channel: ChannelId,
    pub actor: UserId,
    /// Internal id of the member for `member.*` events.
    pub member: Option<UserId>,
    pub event: WebhookEvent,
}

impl ResolvedEvent {
    /// Resolve ids; an unparseable channel or unknown subject rejects the
    /// event.
    pub fn resolve(event: WebhookEvent, mapper: &IdentityMapper) -> ChatAuthResult<Self> {
        let channel = ChannelId::parse(event.channel_id())?;
        let actor = mapper.reverse(event.actor())?;
        let member = match &event {
            WebhookEvent::MemberAdded(e) | WebhookEvent::MemberRemoved(e) => {
                Some(mapper.reverse(&e.member.id)?)
            }
            _ => None,
        };

        Ok(Self {
            gym: channel.gym(),
            channel,
            actor,
            member,
            event,
        })
    }
}

/// Downstream consumer of verified, resolved events.
#[async_trait]
pub trait WebhookHandler: Send + Sync {
    async fn handle(&self, event: &ResolvedEvent) -> Result<()>;
}

#[async_trait]
impl<H> WebhookHandler for Arc<H>
where
    H: WebhookHandler + ?Sized,
{
    async fn handle(&self, event: &ResolvedEvent) -> Result<()> {
        (**self).handle(event).await
    }
}

/// Handler that only records events in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingHandler;

#[async_trait]
impl WebhookHandler for LoggingHandler {
    async fn handle(&self, event: &ResolvedEvent) -> Result<()> {
        tracing::info!(
            kind = event.event.kind(),
            gym_id = %event.gym,
            channel = %event.channel,
            actor = %event.actor,
            "chat event received"
        );
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Handled,
    /// Already handled successfully.
    Duplicate,
    /// Another delivery of the same event is still being handled; the
    /// caller must answer with a retryable error.
    InFlight,
}

enum Claim {
    Fresh,
    Done,
    InFlight,
}

/// Keys being handled right now, plus a bounded FIFO of keys that were
/// handled successfully.
#[derive(Debug)]
struct SeenWindow {
    done: HashSet<String>,
    order: VecDeque<String>,
    in_flight: HashSet<String>,
    capacity: usize,
}

impl SeenWindow {
    fn new(capacity: usize) -> Self {
        Self {
            done: HashSet::new(),
            order: VecDeque::new(),
            in_flight: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    fn claim(&mut self, key: &str) -> Claim {
        if self.done.contains(key) {
            Claim::Done
        } else if !self.in_flight.insert(key.to_string()) {
            Claim::InFlight
        } else {
            Claim::Fresh
        }
    }

    fn complete(&mut self, key: &str) {
        self.in_flight.remove(key);
        if self.done.contains(key) {
            return;
        }
        while self.order.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.done.remove(&old);
            }
        }
        self.done.insert(key.to_string());
        self.order.push_back(key.to_string());
    }

    fn abandon(&mut self, key: &str) {
        self.in_flight.remove(key);
    }
}

/// Releases an in-flight key unless the handle completed, including when
/// the dispatch future is dropped mid-handle.
struct InFlightGuard<'a> {
    seen: &'a Mutex<SeenWindow>,
    key: &'a str,
    completed: bool,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if !self.completed {
            self.seen.lock().abandon(self.key);
        }
    }
}

/// Makes a handler idempotent per [`WebhookEvent::dedup_key`].
///
/// Only successfully handled keys count as duplicates. A failed or
/// cancelled handle forgets its key so a redelivery is processed again.
/// The window lock is never held while the inner handler runs.
pub struct IdempotentHandler<H> {
    inner: H,
    seen: Mutex<SeenWindow>,
}

impl<H> IdempotentHandler<H>
where
    H: WebhookHandler,
{
    pub fn new(inner: H, window: usize) -> Self {
        Self {
            inner,
            seen: Mutex::new(SeenWindow::new(window)),
        }
    }

    pub async fn dispatch(&self, event: &ResolvedEvent) -> Result<DispatchOutcome> {
        let key = event.event.dedup_key();

        let claim = self.seen.lock().claim(&key);
        match claim {
            Claim::Done => {
                tracing::debug!(key = %key, "duplicate chat event skipped");
                return Ok(DispatchOutcome::Duplicate);
            }
            Claim::InFlight => {
                tracing::debug!(key = %key, "chat event already in flight");
                return Ok(DispatchOutcome::InFlight);
            }
            Claim::Fresh => {}
        }

        let mut guard = InFlightGuard {
            seen: &self.seen,
            key: &key,
            completed: false,
        };

        self.inner.handle(event).await?;

        self.seen.lock().complete(&key);
        guard.completed = true;
        Ok(DispatchOutcome::Handled)
    }
}
