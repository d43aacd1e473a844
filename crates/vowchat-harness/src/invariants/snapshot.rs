//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture what a user could observe at one point in time, plus
//! the history and Channel traffic needed by checks that span time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use vowchat_client::ConversationView;
use vowchat_core::{DeliveryStatus, Message};
use vowchat_proto::{Envelope, Payload};

/// Snapshot of the entire system state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SystemSnapshot {
    /// Per-conversation state snapshots.
    pub conversations: Vec<ConversationSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot (no conversations).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single conversation.
    pub fn single(conversation: ConversationSnapshot) -> Self {
        Self { conversations: vec![conversation] }
    }
}

/// One message as rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageSnapshot {
    /// Message id (local or server-assigned).
    pub id: String,
    /// Authored by the signed-in user.
    pub is_own: bool,
    /// Delivery status.
    pub status: DeliveryStatus,
    /// Display timestamp.
    pub timestamp: DateTime<Utc>,
    /// Message text.
    pub content: String,
}

impl From<&Message> for MessageSnapshot {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            is_own: message.is_own,
            status: message.status,
            timestamp: message.timestamp,
            content: message.text().to_owned(),
        }
    }
}

/// Snapshot of one conversation's observable state.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConversationSnapshot {
    /// Conversation id.
    pub id: String,
    /// Messages in display order.
    pub messages: Vec<MessageSnapshot>,
    /// Every status observed per message id, oldest first.
    pub status_history: HashMap<String, Vec<DeliveryStatus>>,
    /// Read receipts accepted by the Channel, per message id.
    pub receipts_sent: HashMap<String, usize>,
    /// Non-blank messages the user submitted.
    pub submitted: usize,
}

impl ConversationSnapshot {
    /// Create a snapshot with no messages.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), ..Self::default() }
    }

    /// Capture the messages of a rendered conversation.
    pub fn from_view(view: &ConversationView) -> Self {
        Self {
            id: view.id.clone(),
            messages: view.messages.iter().map(MessageSnapshot::from).collect(),
            ..Self::default()
        }
    }

    /// Attach the status history recorded so far.
    #[must_use]
    pub fn with_history(mut self, history: HashMap<String, Vec<DeliveryStatus>>) -> Self {
        self.status_history = history;
        self
    }

    /// Count read receipts for this conversation among accepted envelopes.
    #[must_use]
    pub fn with_traffic<'a>(mut self, accepted: impl IntoIterator<Item = &'a Envelope>) -> Self {
        for envelope in accepted {
            if envelope.conversation_id != self.id {
                continue;
            }
            if let Ok(Payload::ReadReceipt(receipt)) = envelope.payload() {
                *self.receipts_sent.entry(receipt.message_id).or_default() += 1;
            }
        }
        self
    }

    /// Record how many messages the user submitted.
    #[must_use]
    pub fn with_submitted(mut self, submitted: usize) -> Self {
        self.submitted = submitted;
        self
    }

    /// Add a message.
    #[must_use]
    pub fn with_message(mut self, message: MessageSnapshot) -> Self {
        self.messages.push(message);
        self
    }

    /// Record a status observation for history tracking.
    pub fn record_status(&mut self, id: impl Into<String>, status: DeliveryStatus) {
        self.status_history.entry(id.into()).or_default().push(status);
    }
}

/// Status observations across renders, keyed by message id.
///
/// Only changes are recorded, so a long-lived message does not grow its
/// history on every frame.
#[derive(Debug, Clone, Default)]
pub struct StatusHistory {
    by_id: HashMap<String, Vec<DeliveryStatus>>,
}

impl StatusHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the statuses shown in a rendered conversation.
    pub fn observe<'a>(&mut self, messages: impl IntoIterator<Item = &'a Message>) {
        for message in messages {
            let history = self.by_id.entry(message.id.clone()).or_default();
            if history.last() != Some(&message.status) {
                history.push(message.status);
            }
        }
    }

    /// Recorded history.
    pub fn snapshot(&self) -> HashMap<String, Vec<DeliveryStatus>> {
        self.by_id.clone()
    }
}
