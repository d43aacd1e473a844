//! Conversation events and actions.

use serde::{Deserialize, Serialize};
use vowchat_core::Attachment;
use vowchat_proto::Envelope;

/// Connection status reported by the Channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Connection attempt in progress.
    #[default]
    Connecting,
    /// Ready to carry events.
    Connected,
    /// Not connected; the Channel retries on its own.
    Disconnected,
}

impl ChannelStatus {
    /// Whether sends are possible.
    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Correlates a [`ConversationAction::Send`] with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SendTicket(pub u64);

impl std::fmt::Display for SendTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Asynchronous result of a send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The Channel accepted the event.
    Accepted,
    /// The Channel refused the event.
    Rejected {
        /// Reason reported by the Channel.
        reason: String,
    },
    /// The Channel was not connected, so nothing was sent.
    ///
    /// Message sends go back to the queue and are retried on reconnect.
    Unavailable,
}

/// Envelope to hand to the Channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    /// Ticket to report the outcome with.
    pub ticket: SendTicket,
    /// Event to send.
    pub envelope: Envelope,
}

/// Events the caller feeds into a conversation.
///
/// The caller is responsible for:
/// - Receiving envelopes from the Channel
/// - Reporting Channel status changes and send outcomes
/// - Driving time forward via ticks
/// - Forwarding user intents (input, submit, visibility)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation (virtual) environments.
#[derive(Debug, Clone)]
pub enum ConversationEvent<I = std::time::Instant> {
    /// Envelope received from the Channel.
    EnvelopeReceived(Envelope),

    /// User submitted the composer.
    Submit {
        /// Message text (trimmed before use).
        content: String,
        /// Already uploaded attachments.
        attachments: Vec<Attachment>,
    },

    /// Composer draft changed.
    InputChanged {
        /// Current draft text.
        draft: String,
    },

    /// Messages currently on screen.
    MessagesVisible {
        /// Ids of visible messages.
        ids: Vec<String>,
    },

    /// Channel connection status changed.
    ChannelStatusChanged(ChannelStatus),

    /// Outcome of an earlier [`ConversationAction::Send`].
    SendCompleted {
        /// Ticket from the `Send` action.
        ticket: SendTicket,
        /// Result of the send.
        outcome: SendOutcome,
    },

    /// Participant presence changed.
    PresenceChanged {
        /// Whether the participant is online.
        is_online: bool,
    },

    /// Time tick for timeout processing.
    ///
    /// The caller should send ticks periodically so typing indicators and
    /// stalled sends expire.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// Conversation closed by the user.
    Close,
}

/// Actions a conversation produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversationAction {
    /// Send an envelope over the Channel and report the outcome.
    Send(Outbound),

    /// Visible state changed; redraw.
    Render,
}
