//! Wire protocol for vowchat conversations.
//!
//! Every event exchanged with the messaging backend travels in an
//! [`Envelope`]: a small JSON object carrying the event kind, the routing
//! fields (conversation, sender, timestamp) and a kind-specific `data`
//! object. The `data` object is kept as raw JSON inside the envelope and
//! decoded into a typed [`Payload`] on demand, so unknown or malformed
//! payloads never prevent the routing fields from being read.
//!
//! # Components
//!
//! - [`Envelope`]: routing fields plus raw payload
//! - [`EnvelopeHeader`]: routing fields used to build outbound envelopes
//! - [`EventKind`]: discriminator carried in the `type` field
//! - [`Payload`]: typed payloads (`message`, `typing`, `read_receipt`)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod envelope;
pub mod errors;
pub mod payloads;

pub use envelope::{Envelope, EnvelopeHeader, EventKind};
pub use errors::{ProtocolError, Result};
pub use payloads::{
    Attachment, AttachmentKind, MessagePayload, Payload, ReadReceiptPayload, TypingPayload,
};
