//! At-most-once read receipt bookkeeping.
//!
//! The tracker only decides which messages need a receipt; the session emits
//! the envelopes. An id stays acknowledged until the conversation closes,
//! unless the receipt send itself failed ([`ReceiptTracker::forget`]).

use std::collections::HashSet;

use crate::{DeliveryStatus, Message};

/// Pending Receipt Set for one conversation.
#[derive(Debug, Clone, Default)]
pub struct ReceiptTracker {
    acknowledged: HashSet<String>,
}

impl ReceiptTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `message` should be acknowledged now.
    ///
    /// True for peer messages observed as delivered (not yet read) that have
    /// no receipt on record.
    pub fn needs_receipt(&self, message: &Message) -> bool {
        !message.is_own
            && message.status == DeliveryStatus::Delivered
            && !self.acknowledged.contains(&message.id)
    }

    /// Record receipts for every visible message that needs one.
    ///
    /// Returns the newly acknowledged ids in input order. Calling this again
    /// with the same messages returns nothing.
    pub fn select<'a>(&mut self, visible: impl IntoIterator<Item = &'a Message>) -> Vec<String> {
        let mut selected = Vec::new();
        for message in visible {
            if self.needs_receipt(message) {
                self.acknowledged.insert(message.id.clone());
                selected.push(message.id.clone());
            }
        }
        selected
    }

    /// Whether a receipt for `id` was emitted.
    pub fn is_acknowledged(&self, id: &str) -> bool {
        self.acknowledged.contains(id)
    }

    /// Drop `id` after its receipt failed to send, so it can be re-emitted.
    pub fn forget(&mut self, id: &str) -> bool {
        self.acknowledged.remove(id)
    }

    /// Drop all records. Called when the conversation closes.
    pub fn clear(&mut self) {
        self.acknowledged.clear();
    }

    /// Number of acknowledged ids.
    pub fn len(&self) -> usize {
        self.acknowledged.len()
    }

    /// Whether no receipt has been emitted.
    pub fn is_empty(&self) -> bool {
        self.acknowledged.is_empty()
    }
}
