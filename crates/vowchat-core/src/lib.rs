//! Core state machines for a single vowchat conversation.
//!
//! Everything in this crate is pure: no I/O, no clocks, no channels. Time is
//! passed in by the caller and side effects are returned as values, so the
//! same code runs in production and in deterministic simulation.
//!
//! # Components
//!
//! - [`MessageStore`]: ordered, id-deduplicated messages with monotonic
//!   delivery status
//! - [`DeliveryStatus`]: `sending → sent → delivered → read`, plus `failed`
//! - [`ReceiptTracker`]: at-most-once read receipt bookkeeping
//! - [`LocalTyping`] / [`PeerTyping`]: typing indicators with expiry
//! - [`env::Environment`]: clock abstraction for drivers and simulation

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
mod message;
mod receipts;
mod status;
mod store;
mod typing;

pub use message::{DeliveryError, Message};
pub use receipts::ReceiptTracker;
pub use status::{DeliveryStatus, StatusError};
pub use store::{DEFAULT_MAX_PARKED, MessageStore};
pub use typing::{
    DEFAULT_LOCAL_TYPING_TIMEOUT, DEFAULT_PEER_TYPING_TIMEOUT, LocalTyping, PeerTyping,
    TypingState,
};
pub use vowchat_proto::{Attachment, AttachmentKind};
