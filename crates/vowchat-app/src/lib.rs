//! Application layer for vowchat
//!
//! Inbox state and a generic runtime that wires conversation sessions to a
//! Channel, so the same orchestration runs in production and in
//! deterministic simulation.
//!
//! # Components
//!
//! - [`Inbox`]: conversation list, search filter and open-session routing
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver
//! - [`SystemEnv`]: Production clocks

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod inbox;
mod input;
mod runtime;
mod system_env;

pub use driver::Driver;
pub use inbox::{ConversationSummary, Inbox, InboxView};
pub use input::UserInput;
pub use runtime::Runtime;
pub use system_env::SystemEnv;
