//! Event envelope shared by both directions of the Channel.
//!
//! ```text
//! {
//!   "type": "message" | "typing" | "read_receipt",
//!   "conversationId": "...",
//!   "senderId": "...",
//!   "timestamp": "2026-01-18T09:30:00Z",
//!   "data": { ... kind-specific ... }
//! }
//! ```
//!
//! The `data` object stays untyped until [`Envelope::payload`] is called.
//! Routing (conversation filtering, own-echo detection) only needs the
//! header fields, so a broken payload is reported per event instead of
//! poisoning the whole stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Payload, Result};

/// Event discriminator carried in the envelope `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A chat message (new or echo).
    Message,
    /// Typing indicator change.
    Typing,
    /// Read receipt for a single message.
    ReadReceipt,
    /// Any `type` this client does not understand.
    #[serde(other)]
    Unknown,
}

impl EventKind {
    /// Wire name of this kind.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Typing => "typing",
            Self::ReadReceipt => "read_receipt",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Routing fields of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// Conversation the event belongs to.
    pub conversation_id: String,
    /// User that originated the event.
    pub sender_id: String,
    /// Origin timestamp.
    pub timestamp: DateTime<Utc>,
}

impl EnvelopeHeader {
    /// Create a header for an outbound event.
    pub fn new(
        conversation_id: impl Into<String>,
        sender_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self { conversation_id: conversation_id.into(), sender_id: sender_id.into(), timestamp }
    }
}

/// A single Channel event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// Event kind.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Conversation the event belongs to.
    pub conversation_id: String,
    /// User that originated the event.
    pub sender_id: String,
    /// Origin timestamp (RFC 3339).
    pub timestamp: DateTime<Utc>,
    /// Kind-specific payload, decoded by [`Envelope::payload`].
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    /// Assemble an envelope from a header and raw payload.
    pub fn new(header: EnvelopeHeader, kind: EventKind, data: serde_json::Value) -> Self {
        Self {
            kind,
            conversation_id: header.conversation_id,
            sender_id: header.sender_id,
            timestamp: header.timestamp,
            data,
        }
    }

    /// Routing fields of this envelope.
    pub fn header(&self) -> EnvelopeHeader {
        EnvelopeHeader {
            conversation_id: self.conversation_id.clone(),
            sender_id: self.sender_id.clone(),
            timestamp: self.timestamp,
        }
    }

    /// Decode the typed payload.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnexpectedKind` for [`EventKind::Unknown`]
    /// - `ProtocolError::InvalidPayload` if `data` does not match the kind
    pub fn payload(&self) -> Result<Payload> {
        Payload::from_envelope(self)
    }

    /// Serialize to a JSON text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if serialization fails
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a JSON text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if the text is not a valid envelope
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a JSON binary frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if the bytes are not a valid envelope
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
