//! Model world, the oracle for model-based tests.
//!
//! The model ignores timing, faults and delivery order entirely. It only
//! records what the user typed and what the peer said, which is exactly
//! what the conversation must show once the Channel has settled: every
//! submission once (delivered or failed), every peer message once.

use super::operation::Operation;

/// Observable state for oracle comparison.
///
/// This is the subset of conversation state that can be compared against
/// the real implementation after the Channel has settled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservableState {
    /// Contents of own messages, sorted.
    pub own: Vec<String>,
    /// Peer messages as `(id, content)`, sorted by id.
    pub peer: Vec<(String, String)>,
}

/// Id the peer's `n`th message (zero-based) carries.
pub fn peer_message_id(n: u64) -> String {
    format!("peer-{n}")
}

/// Model world - the reference implementation.
#[derive(Debug, Clone, Default)]
pub struct ModelWorld {
    own: Vec<String>,
    peer: Vec<(String, String)>,
}

impl ModelWorld {
    /// Create an empty conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an operation.
    pub fn apply(&mut self, op: &Operation) {
        match op {
            Operation::Submit { draft } => {
                if let Some(text) = draft.sent_text() {
                    self.own.push(text.to_owned());
                }
            },
            Operation::PeerMessage { draft } => {
                let id = peer_message_id(self.peer.len() as u64);
                self.peer.push((id, draft.text().to_owned()));
            },
            Operation::Type { .. }
            | Operation::PeerTyping { .. }
            | Operation::PeerReadsLatest
            | Operation::ViewAll
            | Operation::Disconnect
            | Operation::Reconnect
            | Operation::RefuseNext
            | Operation::AdvanceTime { .. }
            | Operation::Deliver { .. } => {},
        }
    }

    /// Number of submissions that produce a message.
    pub fn submitted(&self) -> usize {
        self.own.len()
    }

    /// Extract observable state for comparison.
    pub fn observable_state(&self) -> ObservableState {
        let mut own = self.own.clone();
        own.sort();
        let mut peer = self.peer.clone();
        peer.sort();
        ObservableState { own, peer }
    }
}
