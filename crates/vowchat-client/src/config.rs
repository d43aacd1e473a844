//! Session configuration.

use std::time::Duration;

use vowchat_core::{DEFAULT_LOCAL_TYPING_TIMEOUT, DEFAULT_MAX_PARKED, DEFAULT_PEER_TYPING_TIMEOUT};

/// Default time a message may wait for the Channel before it fails.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeouts and limits for a [`crate::Conversation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationConfig {
    /// Inactivity before the local user is reported as no longer typing.
    pub local_typing_timeout: Duration,
    /// Lifetime of a peer typing indicator without a follow-up event.
    pub peer_typing_timeout: Duration,
    /// Bounded wait for a queued or in-flight message.
    pub send_timeout: Duration,
    /// Capacity of the parked transition buffer.
    pub max_parked_transitions: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            local_typing_timeout: DEFAULT_LOCAL_TYPING_TIMEOUT,
            peer_typing_timeout: DEFAULT_PEER_TYPING_TIMEOUT,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            max_parked_transitions: DEFAULT_MAX_PARKED,
        }
    }
}
