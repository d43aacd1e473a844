//! Conversation session state machine.
//!
//! A `Conversation` owns everything the chat view shows for one
//! conversation: the message store, the read receipt set, both typing
//! indicators and participant presence. Inbound envelopes are filtered by
//! conversation id and dispatched by kind; user intents flow through the
//! [`Reconciler`] and the typing state machines.

use std::collections::HashMap;

use serde::Serialize;
use vowchat_core::{
    Attachment, DeliveryError, DeliveryStatus, LocalTyping, Message, MessageStore, PeerTyping,
    ReceiptTracker, env::Environment,
};
use vowchat_proto::{
    Envelope, EnvelopeHeader, MessagePayload, Payload, ProtocolError, ReadReceiptPayload,
    TypingPayload,
};

use crate::{
    ChannelStatus, ConversationAction, ConversationConfig, ConversationEvent, EchoOutcome,
    Outbound, Reconciler, SendOutcome, SendTicket,
};

/// Prefix of fallback ids for inbound messages that carry none.
const REMOTE_ID_PREFIX: &str = "remote-";

/// Identity of the current user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Current user id, compared against envelope `senderId`.
    pub user_id: String,
}

impl ClientIdentity {
    /// Create an identity for `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self { user_id: user_id.into() }
    }
}

/// What a non-message send was for.
#[derive(Debug, Clone)]
enum Side<I> {
    Receipt { message_id: String, sent_at: I },
    Typing { sent_at: I },
}

/// Serializable snapshot of what the chat view shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    /// Conversation id.
    pub id: String,
    /// Other participant's user id.
    pub participant_id: String,
    /// Channel connection status.
    pub channel: ChannelStatus,
    /// Participant presence.
    pub is_online: bool,
    /// Participant typing indicator.
    pub is_typing: bool,
    /// Inbound messages not yet read or acknowledged.
    pub unread_count: usize,
    /// Messages in display order.
    pub messages: Vec<Message>,
}

/// Session state for one conversation.
pub struct Conversation<E: Environment> {
    /// Environment for clocks.
    env: E,

    /// Current user.
    identity: ClientIdentity,

    /// Conversation id; envelopes for any other id are ignored.
    id: String,

    /// Other participant.
    participant_id: String,

    config: ConversationConfig,

    store: MessageStore,
    receipts: ReceiptTracker,
    reconciler: Reconciler<E::Instant>,
    local_typing: LocalTyping<E::Instant>,
    peer_typing: PeerTyping<E::Instant>,

    /// Receipt and typing sends waiting for an outcome.
    side_sends: HashMap<SendTicket, Side<E::Instant>>,

    /// Last reported visible ids, re-evaluated on reconnect.
    visible: Vec<String>,

    channel: ChannelStatus,
    is_online: bool,
    next_ticket: u64,
    next_remote: u64,
}

impl<E: Environment> Conversation<E> {
    /// Open a session for `conversation_id` with `participant_id`.
    ///
    /// The Channel starts out as [`ChannelStatus::Connecting`]; messages
    /// submitted before it connects are queued.
    pub fn new(
        env: E,
        identity: ClientIdentity,
        conversation_id: impl Into<String>,
        participant_id: impl Into<String>,
        config: ConversationConfig,
    ) -> Self {
        Self {
            env,
            identity,
            id: conversation_id.into(),
            participant_id: participant_id.into(),
            store: MessageStore::with_parked_capacity(config.max_parked_transitions),
            receipts: ReceiptTracker::new(),
            reconciler: Reconciler::new(),
            local_typing: LocalTyping::new(config.local_typing_timeout),
            peer_typing: PeerTyping::new(config.peer_typing_timeout),
            config,
            side_sends: HashMap::new(),
            visible: Vec::new(),
            channel: ChannelStatus::default(),
            is_online: false,
            next_ticket: 0,
            next_remote: 1,
        }
    }

    /// Conversation id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Other participant's user id.
    pub fn participant_id(&self) -> &str {
        &self.participant_id
    }

    /// Current user.
    pub fn identity(&self) -> &ClientIdentity {
        &self.identity
    }

    /// Session configuration.
    pub fn config(&self) -> &ConversationConfig {
        &self.config
    }

    /// Message store.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Messages in display order.
    pub fn messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.store.ordered_view()
    }

    /// Read receipt bookkeeping.
    pub fn receipts(&self) -> &ReceiptTracker {
        &self.receipts
    }

    /// Optimistic send bookkeeping.
    pub fn reconciler(&self) -> &Reconciler<E::Instant> {
        &self.reconciler
    }

    /// Channel connection status as last reported.
    pub fn channel_status(&self) -> ChannelStatus {
        self.channel
    }

    /// Participant presence.
    pub fn is_online(&self) -> bool {
        self.is_online
    }

    /// Whether the participant is shown as typing.
    pub fn is_peer_typing(&self) -> bool {
        self.peer_typing.is_typing()
    }

    /// Whether the current user is reported as typing.
    pub fn is_typing(&self) -> bool {
        self.local_typing.is_typing()
    }

    /// Inbound messages neither read nor acknowledged.
    pub fn unread_count(&self) -> usize {
        self.store.iter().filter(|m| self.is_unread(m)).count()
    }

    /// Snapshot of the rendered state.
    pub fn view(&self) -> ConversationView {
        ConversationView {
            id: self.id.clone(),
            participant_id: self.participant_id.clone(),
            channel: self.channel,
            is_online: self.is_online,
            is_typing: self.peer_typing.is_typing(),
            unread_count: self.unread_count(),
            messages: self.store.ordered_view().cloned().collect(),
        }
    }

    /// Process an event and return resulting actions.
    ///
    /// At most one [`ConversationAction::Render`] is returned, last.
    pub fn handle(&mut self, event: ConversationEvent<E::Instant>) -> Vec<ConversationAction> {
        let mut actions = Vec::new();

        let changed = match event {
            ConversationEvent::EnvelopeReceived(envelope) => self.handle_envelope(&envelope),
            ConversationEvent::Submit { content, attachments } => {
                self.handle_submit(&content, attachments, &mut actions)
            },
            ConversationEvent::InputChanged { draft } => {
                self.handle_input(&draft, &mut actions);
                false
            },
            ConversationEvent::MessagesVisible { ids } => {
                self.visible = ids;
                self.emit_receipts(&mut actions)
            },
            ConversationEvent::ChannelStatusChanged(status) => {
                self.handle_status(status, &mut actions)
            },
            ConversationEvent::SendCompleted { ticket, outcome } => {
                self.handle_send_completed(ticket, outcome)
            },
            ConversationEvent::PresenceChanged { is_online } => {
                let changed = self.is_online != is_online;
                self.is_online = is_online;
                changed
            },
            ConversationEvent::Tick { now } => self.handle_tick(now, &mut actions),
            ConversationEvent::Close => self.handle_close(&mut actions),
        };

        if changed {
            actions.push(ConversationAction::Render);
        }
        actions
    }

    fn handle_envelope(&mut self, envelope: &Envelope) -> bool {
        if envelope.conversation_id != self.id {
            tracing::debug!(
                conversation = %envelope.conversation_id,
                "envelope for another conversation ignored"
            );
            return false;
        }

        let header = envelope.header();
        match envelope.payload() {
            Ok(Payload::Message(payload)) => self.handle_inbound_message(&header, payload),
            Ok(Payload::Typing(TypingPayload { is_typing })) => {
                if header.sender_id == self.identity.user_id {
                    return false;
                }
                self.peer_typing.on_typing_event(is_typing, self.env.now())
            },
            Ok(Payload::ReadReceipt(ReadReceiptPayload { message_id })) => {
                if header.sender_id == self.identity.user_id {
                    return false;
                }
                self.store.transition(&message_id, DeliveryStatus::Read).is_some()
            },
            Err(ProtocolError::UnexpectedKind(kind)) => {
                tracing::debug!(%kind, "unknown event kind ignored");
                false
            },
            Err(e) => {
                tracing::warn!(kind = %envelope.kind, error = %e, "undecodable envelope dropped");
                false
            },
        }
    }

    fn handle_inbound_message(&mut self, header: &EnvelopeHeader, payload: MessagePayload) -> bool {
        if header.sender_id == self.identity.user_id {
            let outcome = self.reconciler.reconcile_echo(
                &mut self.store,
                &self.id,
                payload.id.as_deref(),
                payload.content.as_deref(),
            );
            tracing::debug!(?outcome, "own message echo");

            return match outcome {
                EchoOutcome::Reconciled { .. } => true,
                EchoOutcome::Duplicate => false,
                EchoOutcome::Miss => self.append_inbound(header, payload),
            };
        }

        let typing_cleared = self.peer_typing.on_peer_message();

        if let Some(id) = payload.id.as_deref()
            && self.store.contains(id)
        {
            let bumped = self.store.transition(id, DeliveryStatus::Delivered).is_some();
            return bumped || typing_cleared;
        }

        self.append_inbound(header, payload) || typing_cleared
    }

    fn append_inbound(&mut self, header: &EnvelopeHeader, payload: MessagePayload) -> bool {
        let id = match payload.id.clone() {
            Some(id) => id,
            None => {
                let id = format!("{REMOTE_ID_PREFIX}{}", self.next_remote);
                self.next_remote += 1;
                id
            },
        };
        self.store.append(Message::inbound(id, header, payload, &self.identity.user_id))
    }

    fn handle_submit(
        &mut self,
        content: &str,
        attachments: Vec<Attachment>,
        actions: &mut Vec<ConversationAction>,
    ) -> bool {
        let now = self.env.now();
        let Some(id) = self.reconciler.compose(
            &mut self.store,
            &self.id,
            &self.identity.user_id,
            content,
            attachments,
            self.env.wall_clock(),
            now,
        ) else {
            return false;
        };
        tracing::debug!(%id, "message composed");

        if let Some(is_typing) = self.local_typing.reset() {
            self.emit_typing(is_typing, actions);
        }

        if self.channel.is_connected() {
            self.flush_queue(actions);
        }
        true
    }

    fn handle_input(&mut self, draft: &str, actions: &mut Vec<ConversationAction>) {
        let now = self.env.now();
        if let Some(is_typing) = self.local_typing.on_input(draft.is_empty(), now) {
            self.emit_typing(is_typing, actions);
        }
    }

    fn handle_status(
        &mut self,
        status: ChannelStatus,
        actions: &mut Vec<ConversationAction>,
    ) -> bool {
        let was_connected = self.channel.is_connected();
        if self.channel == status {
            return false;
        }
        self.channel = status;

        if status.is_connected() && !was_connected {
            let queued = self.reconciler.queued_len();
            if queued > 0 {
                tracing::info!(conversation = %self.id, queued, "flushing queued messages");
            }
            self.flush_queue(actions);
            self.emit_receipts(actions);
        }
        true
    }

    fn handle_send_completed(&mut self, ticket: SendTicket, outcome: SendOutcome) -> bool {
        if self.reconciler.owns(ticket) {
            return self.reconciler.complete(&mut self.store, ticket, outcome).is_some();
        }

        match (self.side_sends.remove(&ticket), outcome) {
            (
                Some(Side::Receipt { message_id, .. }),
                outcome @ (SendOutcome::Rejected { .. } | SendOutcome::Unavailable),
            ) => {
                tracing::debug!(%message_id, ?outcome, "read receipt not sent");
                self.receipts.forget(&message_id);
                // Unread again until re-emitted
                true
            },
            (Some(_), _) => false,
            (None, _) => {
                tracing::debug!(%ticket, "outcome for unknown ticket ignored");
                false
            },
        }
    }

    fn handle_tick(&mut self, now: E::Instant, actions: &mut Vec<ConversationAction>) -> bool {
        if let Some(is_typing) = self.local_typing.tick(now) {
            self.emit_typing(is_typing, actions);
        }

        let peer_expired = self.peer_typing.tick(now);

        let failed = self.reconciler.expire(&mut self.store, now, self.config.send_timeout);
        for id in &failed {
            tracing::debug!(%id, "message failed: transport unavailable");
        }

        let timeout = self.config.send_timeout;
        self.side_sends.retain(|_, side| {
            let sent_at = match side {
                Side::Receipt { sent_at, .. } | Side::Typing { sent_at } => *sent_at,
            };
            now - sent_at < timeout
        });

        peer_expired || !failed.is_empty()
    }

    fn handle_close(&mut self, actions: &mut Vec<ConversationAction>) -> bool {
        if let Some(is_typing) = self.local_typing.reset() {
            self.emit_typing(is_typing, actions);
        }
        self.receipts.clear();
        self.visible.clear();
        false
    }

    fn is_unread(&self, message: &Message) -> bool {
        !message.is_own
            && message.status != DeliveryStatus::Read
            && !self.receipts.is_acknowledged(&message.id)
    }

    fn flush_queue(&mut self, actions: &mut Vec<ConversationAction>) {
        let now = self.env.now();
        for id in self.reconciler.take_queued(&self.store) {
            let Some(message) = self.store.get(&id) else {
                continue;
            };

            let payload = Payload::Message(MessagePayload {
                content: message.content.clone(),
                attachments: (!message.attachments.is_empty())
                    .then(|| message.attachments.clone()),
                conversation_id: Some(self.id.clone()),
                ..MessagePayload::default()
            });

            match self.envelope(payload) {
                Ok(envelope) => {
                    let ticket = self.next_ticket();
                    self.reconciler.track(ticket, id, now);
                    actions.push(ConversationAction::Send(Outbound { ticket, envelope }));
                },
                Err(e) => {
                    tracing::warn!(%id, error = %e, "message could not be encoded");
                    self.store.fail(
                        &id,
                        DeliveryError::SendRejected { reason: e.to_string() },
                    );
                },
            }
        }
    }

    fn emit_receipts(&mut self, actions: &mut Vec<ConversationAction>) -> bool {
        if !self.channel.is_connected() {
            return false;
        }

        let visible = self.visible.iter().filter_map(|id| self.store.get(id));
        let selected = self.receipts.select(visible);
        let now = self.env.now();

        for message_id in &selected {
            let payload =
                Payload::ReadReceipt(ReadReceiptPayload { message_id: message_id.clone() });
            match self.envelope(payload) {
                Ok(envelope) => {
                    let ticket = self.next_ticket();
                    let side = Side::Receipt { message_id: message_id.clone(), sent_at: now };
                    self.side_sends.insert(ticket, side);
                    actions.push(ConversationAction::Send(Outbound { ticket, envelope }));
                },
                Err(e) => {
                    tracing::warn!(%message_id, error = %e, "read receipt could not be encoded");
                    self.receipts.forget(message_id);
                },
            }
        }

        // Acknowledged messages drop out of the unread count
        !selected.is_empty()
    }

    fn emit_typing(&mut self, is_typing: bool, actions: &mut Vec<ConversationAction>) {
        if !self.channel.is_connected() {
            return;
        }

        match self.envelope(Payload::Typing(TypingPayload { is_typing })) {
            Ok(envelope) => {
                let ticket = self.next_ticket();
                self.side_sends.insert(ticket, Side::Typing { sent_at: self.env.now() });
                actions.push(ConversationAction::Send(Outbound { ticket, envelope }));
            },
            Err(e) => tracing::warn!(error = %e, "typing indicator could not be encoded"),
        }
    }

    fn envelope(&self, payload: Payload) -> Result<Envelope, ProtocolError> {
        let header = EnvelopeHeader::new(
            self.id.clone(),
            self.identity.user_id.clone(),
            self.env.wall_clock(),
        );
        payload.into_envelope(header)
    }

    fn next_ticket(&mut self) -> SendTicket {
        self.next_ticket += 1;
        SendTicket(self.next_ticket)
    }
}
