//! Fuzz target for Conversation::handle
//!
//! Feeds arbitrary event sequences straight into a session, bypassing the
//! runtime, so outcomes, ticks and inbound traffic can arrive in any order.
//!
//! # Strategy
//!
//! - Raw envelopes: arbitrary bytes through the JSON decoder
//! - Crafted envelopes: messages, typing and receipts from self or peer,
//!   for this or another conversation, with colliding ids
//! - Outcomes for tickets that were never issued or already completed
//!
//! # Invariants
//!
//! - Ids stay unique, statuses never regress, order follows timestamps
//! - Envelopes for other conversations never change the session
//! - NEVER panic

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vowchat_client::{
    ChannelStatus, ClientIdentity, Conversation, ConversationConfig, ConversationEvent,
    SendOutcome, SendTicket,
};
use vowchat_core::env::Environment;
use vowchat_harness::{
    ChronologicalOrder, ConversationSnapshot, InvariantRegistry, SimEnv, SimInstant,
    StatusHistory, StatusMonotonicity, SystemSnapshot, UniqueMessageIds,
};
use vowchat_proto::{
    Envelope, EnvelopeHeader, MessagePayload, Payload, ReadReceiptPayload, TypingPayload,
};

const USER: &str = "user-1";
const PEER: &str = "vendor-7";
const CONVERSATION: &str = "conv-1";

#[derive(Debug, Clone, Arbitrary)]
enum FuzzEvent {
    Raw(Vec<u8>),
    Message { from_self: bool, other_conversation: bool, id: Option<u8>, content: u8 },
    Typing { from_self: bool, is_typing: bool },
    Receipt { from_self: bool, id: u8 },
    Submit { content: u8 },
    Input { content: u8 },
    Visible { ids: Vec<u8> },
    Status(u8),
    Completed { ticket: u8, outcome: u8 },
    Presence(bool),
    Advance { millis: u16 },
    Close,
}

fn text(n: u8) -> String {
    match n % 4 {
        0 => String::new(),
        1 => "Hello!".to_owned(),
        2 => "  Hello!  ".to_owned(),
        _ => format!("message {n}"),
    }
}

fn id(n: u8) -> String {
    match n % 3 {
        0 => format!("srv-{}", n / 3),
        1 => format!("local-{}", n / 3),
        _ => format!("peer-{}", n / 3),
    }
}

fn envelope(env: &SimEnv, conversation: &str, sender: &str, payload: Payload) -> Option<Envelope> {
    payload.into_envelope(EnvelopeHeader::new(conversation, sender, env.wall_clock())).ok()
}

fn to_event(env: &SimEnv, event: FuzzEvent) -> Option<ConversationEvent<SimInstant>> {
    let sender = |from_self: bool| if from_self { USER } else { PEER };

    let event = match event {
        FuzzEvent::Raw(bytes) => {
            ConversationEvent::EnvelopeReceived(Envelope::from_slice(&bytes).ok()?)
        },
        FuzzEvent::Message { from_self, other_conversation, id: message_id, content } => {
            let payload = MessagePayload {
                id: message_id.map(id),
                content: Some(text(content)),
                ..MessagePayload::default()
            };
            let conversation = if other_conversation { "conv-2" } else { CONVERSATION };
            ConversationEvent::EnvelopeReceived(envelope(
                env,
                conversation,
                sender(from_self),
                Payload::Message(payload),
            )?)
        },
        FuzzEvent::Typing { from_self, is_typing } => ConversationEvent::EnvelopeReceived(envelope(
            env,
            CONVERSATION,
            sender(from_self),
            Payload::Typing(TypingPayload { is_typing }),
        )?),
        FuzzEvent::Receipt { from_self, id: message_id } => {
            let payload = ReadReceiptPayload { message_id: id(message_id) };
            ConversationEvent::EnvelopeReceived(envelope(
                env,
                CONVERSATION,
                sender(from_self),
                Payload::ReadReceipt(payload),
            )?)
        },
        FuzzEvent::Submit { content } => {
            ConversationEvent::Submit { content: text(content), attachments: Vec::new() }
        },
        FuzzEvent::Input { content } => ConversationEvent::InputChanged { draft: text(content) },
        FuzzEvent::Visible { ids } => {
            ConversationEvent::MessagesVisible { ids: ids.into_iter().map(id).collect() }
        },
        FuzzEvent::Status(n) => ConversationEvent::ChannelStatusChanged(match n % 3 {
            0 => ChannelStatus::Connecting,
            1 => ChannelStatus::Connected,
            _ => ChannelStatus::Disconnected,
        }),
        FuzzEvent::Completed { ticket, outcome } => ConversationEvent::SendCompleted {
            ticket: SendTicket(u64::from(ticket)),
            outcome: match outcome % 3 {
                0 => SendOutcome::Accepted,
                1 => SendOutcome::Unavailable,
                _ => SendOutcome::Rejected { reason: "fuzz".to_owned() },
            },
        },
        FuzzEvent::Presence(is_online) => ConversationEvent::PresenceChanged { is_online },
        FuzzEvent::Advance { millis } => {
            ConversationEvent::Tick { now: env.advance(Duration::from_millis(u64::from(millis))) }
        },
        FuzzEvent::Close => ConversationEvent::Close,
    };
    Some(event)
}

fuzz_target!(|events: Vec<FuzzEvent>| {
    let env = SimEnv::new();
    let mut conversation = Conversation::new(
        env.clone(),
        ClientIdentity::new(USER),
        CONVERSATION,
        PEER,
        ConversationConfig::default(),
    );
    // Own messages may arrive from raw traffic, so submissions are not
    // counted here.
    let mut registry = InvariantRegistry::new();
    registry.add(UniqueMessageIds);
    registry.add(StatusMonotonicity);
    registry.add(ChronologicalOrder);
    let mut history = StatusHistory::new();

    for event in events {
        let other_conversation =
            matches!(event, FuzzEvent::Message { other_conversation: true, .. });
        let Some(event) = to_event(&env, event) else {
            continue;
        };

        let before = conversation.view();
        conversation.handle(event);
        let view = conversation.view();

        if other_conversation {
            assert_eq!(before, view);
        }

        history.observe(&view.messages);
        let snapshot = ConversationSnapshot::from_view(&view).with_history(history.snapshot());
        registry.assert_all(&SystemSnapshot::single(snapshot), "after fuzz event");
    }
});
