//! Conversation list and active-session routing.
//!
//! The inbox keeps one summary row per conversation and at most one open
//! [`Conversation`] session. Envelopes for the open conversation go to the
//! session; envelopes for the others only touch their summary row.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vowchat_client::{
    ChannelStatus, ClientIdentity, Conversation, ConversationAction, ConversationConfig,
    ConversationEvent, ConversationView,
};
use vowchat_core::{PeerTyping, env::Environment};
use vowchat_proto::{Envelope, Payload};

/// One row of the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Conversation id.
    pub id: String,
    /// Other participant's user id.
    pub participant_id: String,
    /// Other participant's display name.
    pub participant_name: String,
    /// Vendor business name, when the participant is a vendor.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor_name: Option<String>,
    /// Event the conversation is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_name: Option<String>,
    /// Preview of the latest message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<String>,
    /// Timestamp of the latest message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_time: Option<DateTime<Utc>>,
    /// Inbound messages not yet read.
    pub unread_count: usize,
    /// Participant presence.
    pub is_online: bool,
    /// Participant typing indicator.
    pub is_typing: bool,
    #[serde(skip)]
    last_message_id: Option<String>,
}

impl ConversationSummary {
    /// Empty summary for a conversation with `participant_name`.
    pub fn new(
        id: impl Into<String>,
        participant_id: impl Into<String>,
        participant_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            participant_id: participant_id.into(),
            participant_name: participant_name.into(),
            vendor_name: None,
            event_name: None,
            last_message: None,
            last_message_time: None,
            unread_count: 0,
            is_online: false,
            is_typing: false,
            last_message_id: None,
        }
    }

    /// Set the vendor business name.
    #[must_use]
    pub fn with_vendor(mut self, vendor_name: impl Into<String>) -> Self {
        self.vendor_name = Some(vendor_name.into());
        self
    }

    /// Set the event name.
    #[must_use]
    pub fn with_event(mut self, event_name: impl Into<String>) -> Self {
        self.event_name = Some(event_name.into());
        self
    }

    /// Case-insensitive match on participant, vendor or event name.
    ///
    /// An empty query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        std::iter::once(self.participant_name.as_str())
            .chain(self.vendor_name.as_deref())
            .chain(self.event_name.as_deref())
            .any(|field| field.to_lowercase().contains(&query))
    }
}

/// What the driver renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxView {
    /// Channel connection status.
    pub channel: ChannelStatus,
    /// Conversation list in inbox order.
    pub conversations: Vec<ConversationSummary>,
    /// Open conversation, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<ConversationView>,
}

/// Conversation list with at most one open session.
pub struct Inbox<E: Environment> {
    env: E,
    identity: ClientIdentity,
    config: ConversationConfig,
    summaries: Vec<ConversationSummary>,
    /// Typing indicators of conversations that are not open.
    background_typing: HashMap<String, PeerTyping<E::Instant>>,
    active: Option<Conversation<E>>,
    /// Unread count the open conversation had before its session existed.
    /// Those messages never reach the session, so they stay unread.
    carried_unread: usize,
    channel: ChannelStatus,
}

impl<E: Environment> Inbox<E> {
    /// Empty inbox for `identity`.
    pub fn new(env: E, identity: ClientIdentity, config: ConversationConfig) -> Self {
        Self {
            env,
            identity,
            config,
            summaries: Vec::new(),
            background_typing: HashMap::new(),
            active: None,
            carried_unread: 0,
            channel: ChannelStatus::default(),
        }
    }

    /// Add a conversation row, replacing any row with the same id.
    pub fn upsert(&mut self, summary: ConversationSummary) {
        match self.summaries.iter_mut().find(|s| s.id == summary.id) {
            Some(existing) => *existing = summary,
            None => self.summaries.push(summary),
        }
    }

    /// All rows in inbox order.
    pub fn summaries(&self) -> &[ConversationSummary] {
        &self.summaries
    }

    /// Row for `id`.
    pub fn summary(&self, id: &str) -> Option<&ConversationSummary> {
        self.summaries.iter().find(|s| s.id == id)
    }

    /// Rows matching a search query.
    pub fn filter(&self, query: &str) -> Vec<&ConversationSummary> {
        self.summaries.iter().filter(|s| s.matches(query)).collect()
    }

    /// Open session, if any.
    pub fn active(&self) -> Option<&Conversation<E>> {
        self.active.as_ref()
    }

    /// Channel connection status as last reported.
    pub fn channel_status(&self) -> ChannelStatus {
        self.channel
    }

    /// Snapshot for rendering.
    pub fn view(&self) -> InboxView {
        InboxView {
            channel: self.channel,
            conversations: self.summaries.clone(),
            active: self.active.as_ref().map(Conversation::view),
        }
    }

    /// Open conversation `id`, closing the previously open one.
    ///
    /// Returns actions from closing the old session and from bringing the
    /// new one up to the current Channel status. Unknown ids are ignored.
    pub fn open(&mut self, id: &str) -> Vec<ConversationAction> {
        if self.active.as_ref().is_some_and(|c| c.id() == id) {
            return Vec::new();
        }
        let Some(summary) = self.summary(id) else {
            tracing::debug!(conversation = id, "open ignored: unknown conversation");
            return Vec::new();
        };
        let participant_id = summary.participant_id.clone();
        let is_online = summary.is_online;
        let carried_unread = summary.unread_count;

        let mut actions = self.close();
        self.carried_unread = carried_unread;

        let mut session = Conversation::new(
            self.env.clone(),
            self.identity.clone(),
            id,
            participant_id,
            self.config,
        );
        actions.extend(session.handle(ConversationEvent::ChannelStatusChanged(self.channel)));
        actions.extend(session.handle(ConversationEvent::PresenceChanged { is_online }));
        self.background_typing.remove(id);
        self.active = Some(session);

        self.sync_active();
        actions.push(ConversationAction::Render);
        actions
    }

    /// Close the open session, if any.
    pub fn close(&mut self) -> Vec<ConversationAction> {
        let Some(mut session) = self.active.take() else {
            return Vec::new();
        };
        self.carried_unread = 0;
        let actions = session.handle(ConversationEvent::Close);
        tracing::debug!(conversation = session.id(), "conversation closed");
        actions
    }

    /// Record presence for any conversation.
    pub fn set_presence(
        &mut self,
        conversation_id: &str,
        is_online: bool,
    ) -> Vec<ConversationAction> {
        if let Some(session) = self.active.as_mut().filter(|c| c.id() == conversation_id) {
            let actions = session.handle(ConversationEvent::PresenceChanged { is_online });
            self.sync_active();
            return actions;
        }

        match self.summaries.iter_mut().find(|s| s.id == conversation_id) {
            Some(summary) if summary.is_online != is_online => {
                summary.is_online = is_online;
                vec![ConversationAction::Render]
            },
            _ => Vec::new(),
        }
    }

    /// Route an event to the open session or the matching summary row.
    ///
    /// Envelopes for conversations that are not open update their summary.
    /// Status changes and ticks reach both. User intents without an open
    /// session are dropped.
    pub fn handle(&mut self, event: ConversationEvent<E::Instant>) -> Vec<ConversationAction> {
        match event {
            ConversationEvent::EnvelopeReceived(envelope) => {
                if self.active.as_ref().is_some_and(|c| c.id() == envelope.conversation_id) {
                    self.forward(ConversationEvent::EnvelopeReceived(envelope))
                } else {
                    self.update_background(&envelope)
                }
            },
            ConversationEvent::ChannelStatusChanged(status) => {
                let changed = self.channel != status;
                self.channel = status;
                let mut actions = self.forward(ConversationEvent::ChannelStatusChanged(status));
                if changed && actions.is_empty() {
                    actions.push(ConversationAction::Render);
                }
                actions
            },
            ConversationEvent::Tick { now } => {
                let mut actions = self.forward(ConversationEvent::Tick { now });
                let expired = self.expire_background_typing(now);
                if expired && !actions.contains(&ConversationAction::Render) {
                    actions.push(ConversationAction::Render);
                }
                actions
            },
            ConversationEvent::Close => {
                let mut actions = self.close();
                actions.push(ConversationAction::Render);
                actions
            },
            other => self.forward(other),
        }
    }

    fn forward(&mut self, event: ConversationEvent<E::Instant>) -> Vec<ConversationAction> {
        let Some(session) = self.active.as_mut() else {
            return Vec::new();
        };
        let actions = session.handle(event);
        self.sync_active();
        actions
    }

    fn sync_active(&mut self) {
        let Some(session) = self.active.as_ref() else {
            return;
        };
        let Some(summary) = self.summaries.iter_mut().find(|s| s.id == session.id()) else {
            return;
        };

        if let Some(last) = session.messages().last() {
            summary.last_message = Some(preview(last.content.as_deref(), &last.attachments));
            summary.last_message_time = Some(last.timestamp);
            summary.last_message_id = Some(last.id.clone());
        }
        summary.unread_count = self.carried_unread + session.unread_count();
        summary.is_typing = session.is_peer_typing();
        summary.is_online = session.is_online();
    }

    fn update_background(&mut self, envelope: &Envelope) -> Vec<ConversationAction> {
        let Some(summary) = self.summaries.iter_mut().find(|s| s.id == envelope.conversation_id)
        else {
            tracing::debug!(
                conversation = %envelope.conversation_id,
                "envelope for unlisted conversation ignored"
            );
            return Vec::new();
        };
        let from_peer = envelope.sender_id != self.identity.user_id;

        let changed = match envelope.payload() {
            Ok(Payload::Message(payload)) => {
                if payload.id.is_some() && payload.id == summary.last_message_id {
                    return Vec::new();
                }
                summary.last_message = Some(preview(
                    payload.content.as_deref(),
                    payload.attachments.as_deref().unwrap_or_default(),
                ));
                summary.last_message_time = Some(envelope.timestamp);
                summary.last_message_id = payload.id;
                if from_peer {
                    summary.unread_count += 1;
                    if let Some(typing) = self.background_typing.get_mut(&summary.id) {
                        typing.on_peer_message();
                    }
                    summary.is_typing = false;
                }
                true
            },
            Ok(Payload::Typing(typing)) if from_peer => {
                let timeout = self.config.peer_typing_timeout;
                let indicator = self
                    .background_typing
                    .entry(summary.id.clone())
                    .or_insert_with(|| PeerTyping::new(timeout));
                let changed = indicator.on_typing_event(typing.is_typing, self.env.now());
                summary.is_typing = indicator.is_typing();
                changed
            },
            Ok(_) => false,
            Err(e) => {
                tracing::debug!(kind = %envelope.kind, error = %e, "background envelope dropped");
                false
            },
        };

        if changed { vec![ConversationAction::Render] } else { Vec::new() }
    }

    fn expire_background_typing(&mut self, now: E::Instant) -> bool {
        let mut changed = false;
        for (id, typing) in &mut self.background_typing {
            if typing.tick(now)
                && let Some(summary) = self.summaries.iter_mut().find(|s| &s.id == id)
            {
                summary.is_typing = false;
                changed = true;
            }
        }
        changed
    }
}

/// One-line preview of a message for the conversation list.
fn preview(content: Option<&str>, attachments: &[vowchat_core::Attachment]) -> String {
    match (content.map(str::trim).filter(|c| !c.is_empty()), attachments.first()) {
        (Some(text), _) => text.to_string(),
        (None, Some(attachment)) => attachment.name.clone(),
        (None, None) => String::new(),
    }
}
