//! Operations for model-based testing.
//!
//! Operations are the inputs that drive both the model and the real
//! implementation: user actions, peer traffic and Channel faults. They are
//! designed to be generated by proptest or arbitrary.

use arbitrary::Arbitrary;

/// Drafts the generated operations draw from.
///
/// Includes blank drafts (never sent) and a repeated text, so two pending
/// messages can share content.
const DRAFTS: &[&str] = &[
    "Hello!",
    "Is the venue confirmed for Saturday?",
    "",
    "   ",
    "Quote attached, let me know",
    "Hello!",
    "  Thanks so much  ",
];

/// Draft text chosen by index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Arbitrary)]
pub struct Draft(pub u8);

impl Draft {
    /// Text as typed by the user.
    pub fn text(self) -> &'static str {
        DRAFTS[self.0 as usize % DRAFTS.len()]
    }

    /// Text the conversation keeps, or `None` if nothing is sent.
    pub fn sent_text(self) -> Option<&'static str> {
        let trimmed = self.text().trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// Operations that can be applied to the system.
#[derive(Debug, Clone, PartialEq, Eq, Arbitrary)]
pub enum Operation {
    /// The user submits a draft.
    Submit {
        /// Draft to submit.
        draft: Draft,
    },

    /// The user edits the composer.
    Type {
        /// Composer contents after the edit.
        draft: Draft,
    },

    /// The peer sends a message.
    PeerMessage {
        /// Message text.
        draft: Draft,
    },

    /// The peer starts or stops typing.
    PeerTyping {
        /// Whether the peer is typing.
        is_typing: bool,
    },

    /// The peer reads the newest own message that reached the server.
    PeerReadsLatest,

    /// Every rendered message scrolls into view.
    ViewAll,

    /// The Channel drops.
    Disconnect,

    /// The Channel comes back.
    Reconnect,

    /// The Channel refuses the next outbound event.
    RefuseNext,

    /// Time passes.
    AdvanceTime {
        /// Milliseconds to advance.
        millis: u16,
    },

    /// The runtime runs a few cycles.
    Deliver {
        /// Cycle count hint (1-8).
        steps: u8,
    },
}
