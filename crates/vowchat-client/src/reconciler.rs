//! Optimistic send reconciliation.
//!
//! A submitted message is shown immediately under a local id (`local-<n>`)
//! in `Sending`. It then waits in the queue until the Channel is connected,
//! is handed over under a [`SendTicket`], and is finally matched against
//! the server's echo of it, which re-keys it to the server id.
//!
//! ```text
//! submit ─> queue ──(connected)──> in flight ──(echo)──> reconciled
//!             │                        │
//!             └──── send_timeout ──────┴──> failed (TransportUnavailable)
//! ```
//!
//! # Invariants
//!
//! - Every local id is unique within the session.
//! - A message is in at most one of: queue, in flight.
//! - A send that never reached the Channel returns to the queue and keeps
//!   its deadline.
//! - An echo reconciles at most one local message, and never inserts a
//!   second copy of a message already in the store.

use std::{
    collections::{HashMap, VecDeque},
    ops::Sub,
    time::Duration,
};

use chrono::{DateTime, Utc};
use vowchat_core::{Attachment, DeliveryError, DeliveryStatus, Message, MessageStore};

use crate::{SendOutcome, SendTicket};

/// Prefix of ids assigned to messages before the server confirms them.
const LOCAL_ID_PREFIX: &str = "local-";

/// Result of matching an own inbound message against pending sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EchoOutcome {
    /// The echo confirmed a pending local message.
    Reconciled {
        /// Id the message had before the echo.
        local_id: String,
        /// Id after reconciliation (server id if the echo carried one).
        id: String,
    },
    /// The echo's id is already stored; it only bumped the status.
    Duplicate,
    /// No pending local message matched; the caller stores the echo as a new
    /// message (e.g. sent from another session).
    Miss,
}

#[derive(Debug, Clone)]
struct Pending<I> {
    id: String,
    since: I,
}

/// Tracks locally authored messages until the server confirms them.
#[derive(Debug, Clone)]
pub struct Reconciler<I> {
    next_local: u64,
    /// Waiting for a connected Channel, in creation order.
    queue: VecDeque<Pending<I>>,
    /// Handed to the Channel, waiting for an outcome.
    in_flight: HashMap<SendTicket, Pending<I>>,
}

impl<I> Default for Reconciler<I> {
    fn default() -> Self {
        Self { next_local: 1, queue: VecDeque::new(), in_flight: HashMap::new() }
    }
}

impl<I> Reconciler<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Empty reconciler.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an optimistic message and queue it for sending.
    ///
    /// Content is trimmed. Returns `None` (and stores nothing) for a
    /// submission with neither text nor attachments.
    #[allow(clippy::too_many_arguments)]
    pub fn compose(
        &mut self,
        store: &mut MessageStore,
        conversation_id: &str,
        sender_id: &str,
        content: &str,
        attachments: Vec<Attachment>,
        timestamp: DateTime<Utc>,
        now: I,
    ) -> Option<String> {
        let content = content.trim();
        if content.is_empty() && attachments.is_empty() {
            return None;
        }

        let id = format!("{LOCAL_ID_PREFIX}{}", self.next_local);
        self.next_local += 1;

        let message = Message::local(
            id.clone(),
            conversation_id.to_string(),
            sender_id.to_string(),
            (!content.is_empty()).then(|| content.to_string()),
            attachments,
            timestamp,
        );

        if !store.append(message) {
            // Only possible if the server reused a local-looking id
            tracing::warn!(%id, "local id collides with stored message");
            return None;
        }

        self.queue.push_back(Pending { id: id.clone(), since: now });
        Some(id)
    }

    /// Take queued messages that still need sending, in creation order.
    ///
    /// Entries whose message left `Sending` (failed, or confirmed by an
    /// echo) are dropped.
    pub fn take_queued(&mut self, store: &MessageStore) -> Vec<String> {
        let mut queued: Vec<_> = self
            .queue
            .drain(..)
            .filter(|p| store.get(&p.id).is_some_and(|m| m.status == DeliveryStatus::Sending))
            .filter_map(|p| Some((store.position(&p.id)?, p.id)))
            .collect();
        queued.sort_unstable_by_key(|(position, _)| *position);
        queued.into_iter().map(|(_, id)| id).collect()
    }

    /// Record that message `id` was handed to the Channel under `ticket`.
    pub fn track(&mut self, ticket: SendTicket, id: String, now: I) {
        self.in_flight.insert(ticket, Pending { id, since: now });
    }

    /// Whether `ticket` belongs to a message send.
    pub fn owns(&self, ticket: SendTicket) -> bool {
        self.in_flight.contains_key(&ticket)
    }

    /// Apply a send outcome. Returns the message id if the store changed.
    ///
    /// [`SendOutcome::Unavailable`] changes nothing visible: a message still
    /// in `Sending` is queued again, so the next connect resends it and
    /// [`Reconciler::expire`] still bounds its wait.
    pub fn complete(
        &mut self,
        store: &mut MessageStore,
        ticket: SendTicket,
        outcome: SendOutcome,
    ) -> Option<String> {
        let pending = self.in_flight.remove(&ticket)?;

        let changed = match outcome {
            SendOutcome::Accepted => {
                store.transition(&pending.id, DeliveryStatus::Sent).is_some()
            },
            SendOutcome::Rejected { reason } => {
                tracing::debug!(id = %pending.id, %reason, "send rejected");
                store.fail(&pending.id, DeliveryError::SendRejected { reason })
            },
            SendOutcome::Unavailable => {
                if store.get(&pending.id).is_some_and(|m| m.status == DeliveryStatus::Sending) {
                    tracing::debug!(id = %pending.id, "channel unavailable, message queued again");
                    self.queue.push_front(pending);
                }
                return None;
            },
        };

        changed.then_some(pending.id)
    }

    /// Match an own inbound message against pending local messages.
    ///
    /// The target is the most recent own message in `Sending` or `Sent`
    /// with the same conversation and content. On a match it is re-keyed to
    /// `server_id` (when present) and marked delivered.
    pub fn reconcile_echo(
        &mut self,
        store: &mut MessageStore,
        conversation_id: &str,
        server_id: Option<&str>,
        content: Option<&str>,
    ) -> EchoOutcome {
        if let Some(id) = server_id
            && store.contains(id)
        {
            store.transition(id, DeliveryStatus::Delivered);
            return EchoOutcome::Duplicate;
        }

        let content = content.map(str::trim).filter(|c| !c.is_empty());
        let Some(local_id) = store
            .latest_matching(|m| {
                m.is_own
                    && m.status.is_pending()
                    && m.conversation_id == conversation_id
                    && m.content.as_deref() == content
            })
            .map(|m| m.id.clone())
        else {
            return EchoOutcome::Miss;
        };

        let id = match server_id {
            Some(server_id) if store.rekey(&local_id, server_id) => {
                self.follow_rekey(&local_id, server_id);
                server_id.to_string()
            },
            _ => local_id.clone(),
        };

        store.transition(&id, DeliveryStatus::Delivered);
        EchoOutcome::Reconciled { local_id, id }
    }

    /// Fail messages that waited longer than `timeout` for the Channel.
    ///
    /// Returns the ids that failed.
    pub fn expire(&mut self, store: &mut MessageStore, now: I, timeout: Duration) -> Vec<String> {
        let mut failed = Vec::new();

        let mut fail = |pending: &Pending<I>| {
            let waited = now - pending.since;
            if waited < timeout {
                return false;
            }
            if store.fail(&pending.id, DeliveryError::TransportUnavailable { waited }) {
                failed.push(pending.id.clone());
            }
            true
        };

        self.queue.retain(|p| !fail(p));
        self.in_flight.retain(|_, p| !fail(p));

        failed
    }

    /// Messages waiting for a connected Channel.
    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// Message sends waiting for an outcome.
    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    fn follow_rekey(&mut self, old: &str, new: &str) {
        let entries = self.queue.iter_mut().chain(self.in_flight.values_mut());
        for pending in entries.filter(|p| p.id == old) {
            pending.id = new.to_string();
        }
    }
}
