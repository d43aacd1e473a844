//! Conversation client
//!
//! Action-based session state machine for a single vowchat conversation.
//! Keeps the message list consistent while exchanging events with the
//! messaging backend over an abstract Channel.
//!
//! # Architecture
//!
//! The session follows the same Sans-IO pattern as [`vowchat_core`]. It
//! receives events ([`ConversationEvent`]), processes them through pure state
//! machine logic, and returns actions ([`ConversationAction`]) for the caller
//! to execute. Sends are asynchronous: every [`ConversationAction::Send`]
//! carries a [`SendTicket`], and the caller reports the outcome back as
//! [`ConversationEvent::SendCompleted`].
//!
//! # Components
//!
//! - [`Conversation`]: session state machine (dispatch, receipts, typing)
//! - [`Reconciler`]: optimistic sends, queue-on-reconnect, echo matching
//! - [`ConversationConfig`]: timeouts and buffer limits

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod config;
mod conversation;
mod event;
mod reconciler;

pub use config::ConversationConfig;
pub use conversation::{ClientIdentity, Conversation, ConversationView};
pub use event::{
    ChannelStatus, ConversationAction, ConversationEvent, Outbound, SendOutcome, SendTicket,
};
pub use reconciler::{EchoOutcome, Reconciler};
pub use vowchat_core::{DeliveryError, DeliveryStatus, Message, env::Environment};
