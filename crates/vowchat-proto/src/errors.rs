//! Protocol error types.

use thiserror::Error;

use crate::EventKind;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding envelopes.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Envelope is not valid JSON or lacks a routing field.
    #[error("malformed envelope: {0}")]
    Json(#[from] serde_json::Error),

    /// Envelope `data` does not match the schema for its kind.
    #[error("invalid {kind:?} payload: {reason}")]
    InvalidPayload {
        /// Kind declared by the envelope.
        kind: EventKind,
        /// Decoder error message.
        reason: String,
    },

    /// Envelope kind has no payload schema (unknown `type`).
    #[error("no payload schema for event kind {0:?}")]
    UnexpectedKind(EventKind),
}
