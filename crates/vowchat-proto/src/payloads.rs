//! Typed payloads carried in the envelope `data` field.
//!
//! The payload type is determined by the envelope's [`EventKind`], so the
//! JSON object carries no variant tag of its own.
//!
//! # Invariants
//!
//! Each payload variant maps to exactly one kind (enforced by match
//! exhaustiveness in [`Payload::kind`]).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Envelope, EnvelopeHeader, EventKind, ProtocolError, Result};

/// Media category of an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentKind {
    /// Still image.
    Image,
    /// Video clip.
    Video,
    /// Document (PDF, contract, quote).
    Document,
    /// Audio clip or voice note.
    Audio,
}

/// Reference to a file already uploaded to the Media Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Media Service id.
    pub id: String,
    /// Media category.
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    /// Download URL.
    pub url: String,
    /// Display file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// Preview image URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// `message` payload.
///
/// Inbound messages carry the server-assigned `id` and sender display
/// fields; outbound messages carry only content, attachments and the
/// conversation id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    /// Server-assigned message id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Sender display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    /// Sender avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
    /// Message text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Attachment references, in display order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Conversation id, repeated inside outbound payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// `typing` payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    /// Whether the sender is currently typing.
    pub is_typing: bool,
}

/// `read_receipt` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceiptPayload {
    /// Id of the message that was read.
    pub message_id: String,
}

/// All payloads this client understands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Chat message.
    Message(MessagePayload),
    /// Typing indicator.
    Typing(TypingPayload),
    /// Read receipt.
    ReadReceipt(ReadReceiptPayload),
}

impl Payload {
    /// Event kind corresponding to this payload.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Message(_) => EventKind::Message,
            Self::Typing(_) => EventKind::Typing,
            Self::ReadReceipt(_) => EventKind::ReadReceipt,
        }
    }

    /// Decode the payload of an envelope according to its kind.
    ///
    /// A `message` envelope without `data` decodes to an empty message
    /// payload; other kinds require their fields.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::UnexpectedKind` for [`EventKind::Unknown`]
    /// - `ProtocolError::InvalidPayload` if `data` does not match the kind
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        let kind = envelope.kind;
        let data = match (&envelope.data, kind) {
            (Value::Null, EventKind::Message) => Value::Object(Map::new()),
            (data, _) => data.clone(),
        };

        let invalid = |e: serde_json::Error| ProtocolError::InvalidPayload {
            kind,
            reason: e.to_string(),
        };

        match kind {
            EventKind::Message => serde_json::from_value(data).map(Self::Message).map_err(invalid),
            EventKind::Typing => serde_json::from_value(data).map(Self::Typing).map_err(invalid),
            EventKind::ReadReceipt => {
                serde_json::from_value(data).map(Self::ReadReceipt).map_err(invalid)
            },
            EventKind::Unknown => Err(ProtocolError::UnexpectedKind(kind)),
        }
    }

    /// Wrap this payload in an envelope with the given routing fields.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Json` if the payload cannot be represented as JSON
    pub fn into_envelope(self, header: EnvelopeHeader) -> Result<Envelope> {
        let kind = self.kind();
        let data = match self {
            Self::Message(inner) => serde_json::to_value(inner),
            Self::Typing(inner) => serde_json::to_value(inner),
            Self::ReadReceipt(inner) => serde_json::to_value(inner),
        }?;

        Ok(Envelope::new(header, kind, data))
    }
}
