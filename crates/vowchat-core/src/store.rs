//! Ordered, id-deduplicated message storage.
//!
//! The store is the single source of truth for a conversation's messages.
//! Rendering reads [`MessageStore::ordered_view`]; nothing else keeps a copy.
//!
//! # Invariants
//!
//! - At most one message per id, across appends and re-keys.
//! - A message's status rank never decreases (see [`DeliveryStatus`]).
//! - `Failed` is only entered from `Sending` and never left.
//! - Transitions for ids that are not (yet) stored are parked, bounded by
//!   `max_parked`, and applied when the id appears.

use std::collections::{BTreeSet, HashMap, VecDeque};

use chrono::{DateTime, Utc};

use crate::{DeliveryError, DeliveryStatus, Message};

/// Default capacity of the parked transition buffer.
pub const DEFAULT_MAX_PARKED: usize = 256;

/// Conversation message store.
#[derive(Debug, Clone)]
pub struct MessageStore {
    /// Messages in insertion order. Never shrinks.
    slots: Vec<Message>,
    /// id -> slot
    index: HashMap<String, usize>,
    /// (timestamp, slot) for the ordered view; slot breaks timestamp ties.
    order: BTreeSet<(DateTime<Utc>, usize)>,
    /// Highest status seen for ids not yet stored.
    parked: HashMap<String, DeliveryStatus>,
    /// Park order for eviction, oldest first.
    parked_order: VecDeque<String>,
    max_parked: usize,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore {
    /// Empty store with the default parked capacity.
    pub fn new() -> Self {
        Self::with_parked_capacity(DEFAULT_MAX_PARKED)
    }

    /// Empty store that parks at most `max_parked` early transitions.
    pub fn with_parked_capacity(max_parked: usize) -> Self {
        Self {
            slots: Vec::new(),
            index: HashMap::new(),
            order: BTreeSet::new(),
            parked: HashMap::new(),
            parked_order: VecDeque::new(),
            max_parked,
        }
    }

    /// Insert a message unless its id is already present.
    ///
    /// Returns `false` (and leaves the store untouched) for a duplicate id.
    /// A transition parked for this id is applied immediately.
    pub fn append(&mut self, message: Message) -> bool {
        if self.index.contains_key(&message.id) {
            tracing::debug!(id = %message.id, "duplicate message id ignored");
            return false;
        }

        let slot = self.slots.len();
        let id = message.id.clone();
        self.order.insert((message.timestamp, slot));
        self.index.insert(id.clone(), slot);
        self.slots.push(message);

        self.apply_parked(&id);
        true
    }

    /// Apply a status change under the maximum-so-far rule.
    ///
    /// Returns the previous status if the change was applied. Stale or
    /// invalid transitions are logged and dropped. Transitions for unknown
    /// ids are parked, except `Failed`, which only makes sense for a message
    /// this client is still sending.
    pub fn transition(&mut self, id: &str, status: DeliveryStatus) -> Option<DeliveryStatus> {
        let Some(&slot) = self.index.get(id) else {
            self.park(id, status);
            return None;
        };

        let message = &mut self.slots[slot];
        match message.status.advance(status) {
            Ok(next) => {
                let prev = message.status;
                message.status = next;
                Some(prev)
            },
            Err(e) => {
                tracing::debug!(id, error = %e, "status transition ignored");
                None
            },
        }
    }

    /// Move a `Sending` message to `Failed`, recording why.
    ///
    /// Returns `true` if the message failed; `false` if it is unknown or has
    /// already left `Sending`.
    pub fn fail(&mut self, id: &str, reason: DeliveryError) -> bool {
        if self.transition(id, DeliveryStatus::Failed).is_none() {
            return false;
        }
        if let Some(&slot) = self.index.get(id) {
            self.slots[slot].failure = Some(reason);
        }
        true
    }

    /// Replace a local id with the server-assigned id.
    ///
    /// Refuses (returns `false`) if `old_id` is unknown or `new_id` is
    /// already stored. A transition parked for `new_id` is applied.
    pub fn rekey(&mut self, old_id: &str, new_id: &str) -> bool {
        if old_id == new_id {
            return self.index.contains_key(old_id);
        }
        if self.index.contains_key(new_id) {
            tracing::debug!(old_id, new_id, "rekey refused: target id exists");
            return false;
        }
        let Some(slot) = self.index.remove(old_id) else {
            return false;
        };

        self.slots[slot].id = new_id.to_string();
        self.index.insert(new_id.to_string(), slot);
        self.apply_parked(new_id);
        true
    }

    /// Messages sorted by timestamp ascending, insertion order on ties.
    pub fn ordered_view(&self) -> impl Iterator<Item = &Message> + '_ {
        self.order.iter().map(|&(_, slot)| &self.slots[slot])
    }

    /// Messages in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> + '_ {
        self.slots.iter()
    }

    /// Message by id.
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.index.get(id).map(|&slot| &self.slots[slot])
    }

    /// Insertion position of message `id`. Re-keying keeps it.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Whether a message with this id is stored.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of stored messages.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the store holds no messages.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Most recently inserted message matching `pred`.
    pub fn latest_matching(&self, pred: impl Fn(&Message) -> bool) -> Option<&Message> {
        self.slots.iter().rev().find(|m| pred(m))
    }

    /// Number of transitions waiting for their message.
    pub fn parked_len(&self) -> usize {
        self.parked.len()
    }

    fn park(&mut self, id: &str, status: DeliveryStatus) {
        if status == DeliveryStatus::Failed || self.max_parked == 0 {
            tracing::debug!(id, ?status, "transition for unknown id dropped");
            return;
        }

        if let Some(existing) = self.parked.get_mut(id) {
            if let Ok(next) = existing.advance(status) {
                *existing = next;
            }
            return;
        }

        if self.parked.len() >= self.max_parked
            && let Some(evicted) = self.parked_order.pop_front()
        {
            tracing::debug!(id = %evicted, "parked transition evicted");
            self.parked.remove(&evicted);
        }

        tracing::debug!(id, ?status, "transition parked for unknown id");
        self.parked.insert(id.to_string(), status);
        self.parked_order.push_back(id.to_string());
    }

    fn apply_parked(&mut self, id: &str) {
        let Some(status) = self.parked.remove(id) else {
            return;
        };
        self.parked_order.retain(|parked| parked != id);
        self.transition(id, status);
    }
}
