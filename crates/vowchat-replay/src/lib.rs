//! Transcript replay for vowchat conversations.
//!
//! Feeds a recorded sequence of user actions and Channel events through a
//! [`vowchat_client::Conversation`] on a virtual clock, so a bug report can
//! be reproduced as a file.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod replay;
mod transcript;

pub use error::ReplayError;
pub use replay::Replay;
pub use transcript::{Step, parse};
