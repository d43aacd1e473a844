//! JSON-lines transcript format.
//!
//! One [`Step`] per line, tagged by `step`. Blank lines and lines starting
//! with `//` are skipped.
//!
//! ```text
//! {"step":"status","status":"connected"}
//! {"step":"submit","content":"Hello"}
//! {"step":"receive","envelope":{"type":"message","conversationId":"conv-1", ...}}
//! {"step":"wait","ms":3000}
//! ```

use std::io::BufRead;

use serde::Deserialize;
use vowchat_client::ChannelStatus;
use vowchat_core::Attachment;
use vowchat_proto::Envelope;

use crate::ReplayError;

/// One recorded interaction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// The Channel changed status.
    Status {
        /// New status.
        status: ChannelStatus,
    },

    /// The Channel delivered an event.
    Receive {
        /// Event as received.
        envelope: Envelope,
    },

    /// The user edited the composer.
    Input {
        /// Composer contents.
        draft: String,
    },

    /// The user submitted a message.
    Submit {
        /// Message text.
        content: String,
        /// Already-uploaded attachments.
        #[serde(default)]
        attachments: Vec<Attachment>,
    },

    /// Messages scrolled into view.
    Visible {
        /// Visible message ids.
        ids: Vec<String>,
    },

    /// The participant's presence changed.
    Presence {
        /// Whether the participant is online.
        is_online: bool,
    },

    /// Time passed.
    Wait {
        /// Milliseconds.
        ms: u64,
    },

    /// The Channel refuses the next sends.
    Reject {
        /// Number of sends to refuse.
        count: usize,
        /// Reason reported for each refusal.
        #[serde(default)]
        reason: Option<String>,
    },

    /// The conversation was closed.
    Close,
}

/// Parse a transcript.
///
/// # Errors
///
/// - [`ReplayError::Io`] if reading fails
/// - [`ReplayError::Step`] for the first line that is not a valid step
pub fn parse(reader: impl BufRead) -> Result<Vec<Step>, ReplayError> {
    let mut steps = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }

        let step = serde_json::from_str(trimmed)
            .map_err(|source| ReplayError::Step { line: index + 1, source })?;
        steps.push(step);
    }

    Ok(steps)
}
