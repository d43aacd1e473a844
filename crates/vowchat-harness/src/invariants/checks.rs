//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashSet;

use vowchat_core::DeliveryStatus;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// No two messages in a conversation share an id.
///
/// A duplicate means an echo or a redelivered event was appended instead
/// of being reconciled.
pub struct UniqueMessageIds;

impl Invariant for UniqueMessageIds {
    fn name(&self) -> &'static str {
        "unique_message_ids"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for conversation in &state.conversations {
            let mut seen = HashSet::new();
            for message in &conversation.messages {
                if !seen.insert(message.id.as_str()) {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "conversation {}: message {} appears twice",
                            conversation.id, message.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Delivery status only moves forward.
///
/// Within one message's history: ranks never decrease, `failed` only
/// follows `sending`, and nothing follows `failed`.
pub struct StatusMonotonicity;

impl Invariant for StatusMonotonicity {
    fn name(&self) -> &'static str {
        "status_monotonicity"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for conversation in &state.conversations {
            for (id, history) in &conversation.status_history {
                for window in history.windows(2) {
                    let (from, to) = (window[0], window[1]);
                    let valid = match (from.rank(), to.rank()) {
                        (Some(a), Some(b)) => b >= a,
                        (Some(_), None) => from == DeliveryStatus::Sending,
                        (None, _) => false,
                    };
                    if !valid {
                        return Err(Violation {
                            invariant: self.name(),
                            message: format!(
                                "conversation {} message {id}: {from:?} -> {to:?} in {history:?}",
                                conversation.id
                            ),
                        });
                    }
                }
            }
        }
        Ok(())
    }
}

/// Messages are displayed in timestamp order.
pub struct ChronologicalOrder;

impl Invariant for ChronologicalOrder {
    fn name(&self) -> &'static str {
        "chronological_order"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for conversation in &state.conversations {
            for window in conversation.messages.windows(2) {
                if window[1].timestamp < window[0].timestamp {
                    return Err(Violation {
                        invariant: self.name(),
                        message: format!(
                            "conversation {}: {} ({}) shown before {} ({})",
                            conversation.id,
                            window[0].id,
                            window[0].timestamp,
                            window[1].id,
                            window[1].timestamp
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Each message is acknowledged to the Channel at most once.
pub struct AtMostOnceReceipt;

impl Invariant for AtMostOnceReceipt {
    fn name(&self) -> &'static str {
        "at_most_once_receipt"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for conversation in &state.conversations {
            if let Some((id, count)) = conversation.receipts_sent.iter().find(|(_, n)| **n > 1) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "conversation {}: {count} read receipts for {id}",
                        conversation.id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Every own message traces back to one submission.
///
/// More own messages than submissions means an echo was shown next to its
/// optimistic copy.
pub struct SingleCopyPerSubmission;

impl Invariant for SingleCopyPerSubmission {
    fn name(&self) -> &'static str {
        "single_copy_per_submission"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for conversation in &state.conversations {
            let own = conversation.messages.iter().filter(|m| m.is_own).count();
            if own > conversation.submitted {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!(
                        "conversation {}: {own} own messages for {} submissions",
                        conversation.id, conversation.submitted
                    ),
                });
            }
        }
        Ok(())
    }
}
