//! User input abstraction.

use vowchat_core::Attachment;

/// Platform-independent user intents.
///
/// Frontends translate their native events (key presses, clicks, scroll
/// positions) into these before handing them to the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserInput {
    /// Composer draft changed.
    InputChanged {
        /// Current draft text.
        draft: String,
    },
    /// Composer submitted.
    Submit {
        /// Message text.
        content: String,
        /// Already uploaded attachments.
        attachments: Vec<Attachment>,
    },
    /// Conversation selected in the list.
    Open {
        /// Conversation to open.
        conversation_id: String,
    },
    /// Messages scrolled into view.
    Visible {
        /// Ids of visible messages.
        ids: Vec<String>,
    },
    /// Open conversation closed.
    Close,
    /// Exit the application.
    Quit,
}
