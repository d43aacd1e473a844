//! Conversation session behavior tests.
//!
//! Each test drives a `Conversation` through events the way a driver would
//! and checks the emitted actions and the resulting view.

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use vowchat_client::{
    ChannelStatus, ClientIdentity, Conversation, ConversationAction, ConversationConfig,
    ConversationEvent, DeliveryError, DeliveryStatus, Environment, Outbound, SendOutcome,
};
use vowchat_proto::{Envelope, EnvelopeHeader, EventKind, Payload};

const ME: &str = "user-1";
const PEER: &str = "vendor-7";
const CONV: &str = "conv-1";

/// Virtual clock: time only moves when a test advances it.
#[derive(Clone)]
struct TestEnv {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl TestEnv {
    fn new() -> Self {
        Self { base: Instant::now(), offset: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    fn advance(&self, by: Duration) -> Instant {
        let mut offset = self.offset.lock().unwrap();
        *offset += by;
        self.base + *offset
    }
}

impl Environment for TestEnv {
    type Instant = Instant;

    fn now(&self) -> Instant {
        self.base + *self.offset.lock().unwrap()
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let offset = chrono::Duration::from_std(*self.offset.lock().unwrap()).unwrap();
        Utc.with_ymd_and_hms(2026, 1, 18, 9, 0, 0).unwrap() + offset
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }
}

fn conversation(env: &TestEnv) -> Conversation<TestEnv> {
    Conversation::new(
        env.clone(),
        ClientIdentity::new(ME),
        CONV,
        PEER,
        ConversationConfig::default(),
    )
}

fn connected(env: &TestEnv) -> Conversation<TestEnv> {
    let mut conv = conversation(env);
    conv.handle(ConversationEvent::ChannelStatusChanged(ChannelStatus::Connected));
    conv
}

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 18, 10, 0, 0).unwrap() + chrono::Duration::seconds(secs)
}

fn envelope(
    kind: &str,
    sender: &str,
    conversation: &str,
    secs: i64,
    data: serde_json::Value,
) -> Envelope {
    let text = json!({
        "type": kind,
        "conversationId": conversation,
        "senderId": sender,
        "timestamp": at(secs),
        "data": data,
    });
    Envelope::from_json(&text.to_string()).unwrap()
}

fn inbound(event: Envelope) -> ConversationEvent<Instant> {
    ConversationEvent::EnvelopeReceived(event)
}

fn submit(content: &str) -> ConversationEvent<Instant> {
    ConversationEvent::Submit { content: content.into(), attachments: Vec::new() }
}

fn sends(actions: &[ConversationAction]) -> Vec<Outbound> {
    actions
        .iter()
        .filter_map(|a| match a {
            ConversationAction::Send(outbound) => Some(outbound.clone()),
            ConversationAction::Render => None,
        })
        .collect()
}

fn payloads(actions: &[ConversationAction]) -> Vec<Payload> {
    sends(actions).iter().map(|o| o.envelope.payload().unwrap()).collect()
}

#[test]
fn disconnected_submit_is_sent_after_reconnect_and_reconciled() {
    let env = TestEnv::new();
    let mut conv = conversation(&env);
    conv.handle(ConversationEvent::ChannelStatusChanged(ChannelStatus::Disconnected));

    let actions = conv.handle(submit("Hello"));
    assert!(sends(&actions).is_empty());
    assert_eq!(actions.last(), Some(&ConversationAction::Render));
    let msg = conv.messages().next().unwrap();
    assert_eq!(msg.status, DeliveryStatus::Sending);
    assert!(msg.is_own);

    let actions = conv.handle(ConversationEvent::ChannelStatusChanged(ChannelStatus::Connected));
    let outbound = sends(&actions);
    assert_eq!(outbound.len(), 1);
    assert_eq!(outbound[0].envelope.kind, EventKind::Message);
    assert_eq!(outbound[0].envelope.data["content"], "Hello");
    assert_eq!(outbound[0].envelope.data["conversationId"], CONV);

    conv.handle(ConversationEvent::SendCompleted {
        ticket: outbound[0].ticket,
        outcome: SendOutcome::Accepted,
    });
    assert_eq!(conv.messages().next().unwrap().status, DeliveryStatus::Sent);

    let received = envelope("message", ME, CONV, 0, json!({"id": "srv-1", "content": "Hello"}));
    conv.handle(inbound(received));

    let messages: Vec<_> = conv.messages().collect();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "srv-1");
    assert_eq!(messages[0].text(), "Hello");
    assert_eq!(messages[0].status, DeliveryStatus::Delivered);
}

#[test]
fn echo_before_ack_is_not_regressed_by_ack() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    let ticket = sends(&conv.handle(submit("Hi")))[0].ticket;
    conv.handle(inbound(envelope("message", ME, CONV, 0, json!({"id": "srv-1", "content": "Hi"}))));
    conv.handle(ConversationEvent::SendCompleted { ticket, outcome: SendOutcome::Accepted });

    assert_eq!(conv.store().get("srv-1").unwrap().status, DeliveryStatus::Delivered);
    assert_eq!(conv.store().len(), 1);
}

#[test]
fn duplicate_inbound_message_is_stored_once() {
    let env = TestEnv::new();
    let mut conv = connected(&env);
    let event = envelope("message", PEER, CONV, 0, json!({"id": "m1", "content": "Quote ready"}));

    conv.handle(inbound(event.clone()));
    let actions = conv.handle(inbound(event));

    assert_eq!(conv.store().len(), 1);
    assert!(actions.is_empty());
}

#[test]
fn out_of_order_messages_render_by_timestamp() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    let received = envelope("message", PEER, CONV, 20, json!({"id": "t2", "content": "second"}));
    conv.handle(inbound(received));
    let received = envelope("message", PEER, CONV, 10, json!({"id": "t1", "content": "first"}));
    conv.handle(inbound(received));

    let ids: Vec<_> = conv.messages().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["t1", "t2"]);
}

#[test]
fn inbound_defaults_missing_fields() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    conv.handle(inbound(envelope("message", PEER, CONV, 0, json!({"content": "no id"}))));
    conv.handle(inbound(envelope("message", PEER, CONV, 1, json!({"content": "no id either"}))));

    let messages: Vec<_> = conv.messages().collect();
    assert_eq!(messages[0].id, "remote-1");
    assert_eq!(messages[1].id, "remote-2");
    assert_eq!(messages[0].sender_name, "Unknown");
}

#[test]
fn other_conversation_is_ignored() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    let received = envelope("message", PEER, "conv-2", 0, json!({"id": "x", "content": "?"}));
    let actions = conv.handle(inbound(received));
    conv.handle(inbound(envelope("typing", PEER, "conv-2", 0, json!({"isTyping": true}))));

    assert!(actions.is_empty());
    assert!(conv.store().is_empty());
    assert!(!conv.is_peer_typing());
}

#[test]
fn visible_messages_get_one_receipt() {
    let env = TestEnv::new();
    let mut conv = connected(&env);
    conv.handle(inbound(envelope("message", PEER, CONV, 0, json!({"id": "m1", "content": "hi"}))));
    assert_eq!(conv.unread_count(), 1);

    let visible = ConversationEvent::MessagesVisible { ids: vec!["m1".into()] };
    let first = conv.handle(visible.clone());
    let second = conv.handle(visible);

    let receipts = payloads(&first);
    assert_eq!(receipts.len(), 1);
    let Payload::ReadReceipt(receipt) = &receipts[0] else {
        panic!("expected read receipt, got {receipts:?}");
    };
    assert_eq!(receipt.message_id, "m1");
    assert!(sends(&second).is_empty());
    assert_eq!(conv.unread_count(), 0);
}

#[test]
fn receipts_wait_for_connection() {
    let env = TestEnv::new();
    let mut conv = conversation(&env);
    conv.handle(inbound(envelope("message", PEER, CONV, 0, json!({"id": "m1", "content": "hi"}))));

    let offline = conv.handle(ConversationEvent::MessagesVisible { ids: vec!["m1".into()] });
    assert!(sends(&offline).is_empty());

    let online = conv.handle(ConversationEvent::ChannelStatusChanged(ChannelStatus::Connected));
    assert_eq!(sends(&online).len(), 1);
}

#[test]
fn failed_receipt_is_reemitted() {
    let env = TestEnv::new();
    let mut conv = connected(&env);
    conv.handle(inbound(envelope("message", PEER, CONV, 0, json!({"id": "m1", "content": "hi"}))));
    let visible = ConversationEvent::MessagesVisible { ids: vec!["m1".into()] };

    let ticket = sends(&conv.handle(visible.clone()))[0].ticket;
    conv.handle(ConversationEvent::SendCompleted {
        ticket,
        outcome: SendOutcome::Rejected { reason: "socket closed".into() },
    });

    assert_eq!(sends(&conv.handle(visible)).len(), 1);
}

#[test]
fn own_messages_get_no_receipt() {
    let env = TestEnv::new();
    let mut conv = connected(&env);
    let received = envelope("message", ME, CONV, 0, json!({"id": "srv-5", "content": "from web"}));
    conv.handle(inbound(received));

    let actions = conv.handle(ConversationEvent::MessagesVisible { ids: vec!["srv-5".into()] });

    assert!(sends(&actions).is_empty());
    assert!(conv.store().get("srv-5").unwrap().is_own);
}

#[test]
fn read_receipt_before_echo_is_applied() {
    let env = TestEnv::new();
    let mut conv = connected(&env);
    conv.handle(submit("Hello"));

    conv.handle(inbound(envelope("read_receipt", PEER, CONV, 1, json!({"messageId": "srv-1"}))));
    let received = envelope("message", ME, CONV, 0, json!({"id": "srv-1", "content": "Hello"}));
    conv.handle(inbound(received));

    assert_eq!(conv.store().get("srv-1").unwrap().status, DeliveryStatus::Read);
}

#[test]
fn rejected_send_fails_message() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    let ticket = sends(&conv.handle(submit("Hello")))[0].ticket;
    let actions = conv.handle(ConversationEvent::SendCompleted {
        ticket,
        outcome: SendOutcome::Rejected { reason: "blocked".into() },
    });

    assert_eq!(actions, [ConversationAction::Render]);
    let msg = conv.store().get("local-1").unwrap();
    assert_eq!(msg.status, DeliveryStatus::Failed);
    assert_eq!(msg.failure, Some(DeliveryError::SendRejected { reason: "blocked".into() }));

    // Retrying is a new submission
    let retry = sends(&conv.handle(submit("Hello")));
    assert_eq!(retry.len(), 1);
    assert_eq!(conv.store().len(), 2);
}

#[test]
fn queued_message_fails_when_channel_never_returns() {
    let env = TestEnv::new();
    let mut conv = conversation(&env);
    conv.handle(submit("Hello"));

    let now = env.advance(Duration::from_secs(9));
    assert!(conv.handle(ConversationEvent::Tick { now }).is_empty());

    let now = env.advance(Duration::from_secs(1));
    assert_eq!(conv.handle(ConversationEvent::Tick { now }), [ConversationAction::Render]);

    let msg = conv.store().get("local-1").unwrap();
    assert_eq!(msg.status, DeliveryStatus::Failed);
    assert!(matches!(msg.failure, Some(DeliveryError::TransportUnavailable { .. })));

    // Failed messages are not flushed on reconnect
    let actions = conv.handle(ConversationEvent::ChannelStatusChanged(ChannelStatus::Connected));
    assert!(sends(&actions).is_empty());
}

#[test]
fn local_typing_is_emitted_and_expires() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    let start = payloads(&conv.handle(ConversationEvent::InputChanged { draft: "H".into() }));
    assert!(matches!(start.as_slice(), [Payload::Typing(t)] if t.is_typing));

    let more = conv.handle(ConversationEvent::InputChanged { draft: "He".into() });
    assert!(more.is_empty());

    let now = env.advance(Duration::from_secs(3));
    let stop = payloads(&conv.handle(ConversationEvent::Tick { now }));
    assert!(matches!(stop.as_slice(), [Payload::Typing(t)] if !t.is_typing));
    assert!(!conv.is_typing());
}

#[test]
fn submit_stops_typing() {
    let env = TestEnv::new();
    let mut conv = connected(&env);
    conv.handle(ConversationEvent::InputChanged { draft: "Hello".into() });

    let sent = payloads(&conv.handle(submit("Hello")));

    assert_eq!(sent.len(), 2);
    assert!(matches!(&sent[0], Payload::Typing(t) if !t.is_typing));
    assert!(matches!(&sent[1], Payload::Message(m) if m.content.as_deref() == Some("Hello")));
}

#[test]
fn typing_offline_is_tracked_but_not_sent() {
    let env = TestEnv::new();
    let mut conv = conversation(&env);

    let actions = conv.handle(ConversationEvent::InputChanged { draft: "H".into() });

    assert!(actions.is_empty());
    assert!(conv.is_typing());
}

#[test]
fn peer_typing_expires_and_clears_on_message() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    conv.handle(inbound(envelope("typing", PEER, CONV, 0, json!({"isTyping": true}))));
    assert!(conv.is_peer_typing());

    let now = env.advance(Duration::from_secs(5));
    assert_eq!(conv.handle(ConversationEvent::Tick { now }), [ConversationAction::Render]);
    assert!(!conv.is_peer_typing());

    conv.handle(inbound(envelope("typing", PEER, CONV, 6, json!({"isTyping": true}))));
    let received = envelope("message", PEER, CONV, 7, json!({"id": "m1", "content": "done"}));
    conv.handle(inbound(received));
    assert!(!conv.is_peer_typing());
}

#[test]
fn own_typing_echo_is_ignored() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    conv.handle(inbound(envelope("typing", ME, CONV, 0, json!({"isTyping": true}))));

    assert!(!conv.is_peer_typing());
}

#[test]
fn unknown_and_malformed_events_are_dropped() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    let received = envelope("presence", PEER, CONV, 0, json!({"online": true}));
    let unknown = conv.handle(inbound(received));
    let malformed = conv.handle(inbound(envelope("typing", PEER, CONV, 0, json!({"typing": 1}))));

    assert!(unknown.is_empty());
    assert!(malformed.is_empty());
}

#[test]
fn close_clears_receipts_and_stops_typing() {
    let env = TestEnv::new();
    let mut conv = connected(&env);
    conv.handle(inbound(envelope("message", PEER, CONV, 0, json!({"id": "m1", "content": "hi"}))));
    conv.handle(ConversationEvent::MessagesVisible { ids: vec!["m1".into()] });
    conv.handle(ConversationEvent::InputChanged { draft: "typing".into() });

    let actions = payloads(&conv.handle(ConversationEvent::Close));

    assert!(matches!(actions.as_slice(), [Payload::Typing(t)] if !t.is_typing));
    assert!(conv.receipts().is_empty());
}

#[test]
fn presence_changes_render() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    assert_eq!(
        conv.handle(ConversationEvent::PresenceChanged { is_online: true }),
        [ConversationAction::Render]
    );
    assert!(conv.handle(ConversationEvent::PresenceChanged { is_online: true }).is_empty());
    assert!(conv.view().is_online);
}

#[test]
fn outbound_envelopes_carry_routing_fields() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    let outbound = sends(&conv.handle(submit("Hello")));

    assert_eq!(outbound[0].envelope.header(), EnvelopeHeader::new(CONV, ME, env.wall_clock()));
}

#[test]
fn whitespace_draft_starts_typing() {
    let env = TestEnv::new();
    let mut conv = connected(&env);

    let start = payloads(&conv.handle(ConversationEvent::InputChanged { draft: " ".into() }));

    assert!(matches!(start.as_slice(), [Payload::Typing(t)] if t.is_typing));
    assert!(conv.is_typing());
}

#[test]
fn in_flight_message_without_outcome_times_out() {
    let env = TestEnv::new();
    let mut conv = connected(&env);
    let ticket = sends(&conv.handle(submit("Is the venue confirmed?")))[0].ticket;

    let now = env.advance(Duration::from_secs(9));
    conv.handle(ConversationEvent::Tick { now });
    assert_eq!(conv.messages().next().unwrap().status, DeliveryStatus::Sending);

    let now = env.advance(Duration::from_secs(1));
    let actions = conv.handle(ConversationEvent::Tick { now });
    assert_eq!(actions, [ConversationAction::Render]);

    let msg = conv.messages().next().unwrap();
    assert_eq!(msg.status, DeliveryStatus::Failed);
    assert!(matches!(msg.failure, Some(DeliveryError::TransportUnavailable { .. })));
    assert_eq!(conv.reconciler().in_flight_len(), 0);

    // A late acceptance does not revive the message
    let late = conv.handle(ConversationEvent::SendCompleted {
        ticket,
        outcome: SendOutcome::Accepted,
    });
    assert!(late.is_empty());
    assert_eq!(conv.messages().next().unwrap().status, DeliveryStatus::Failed);
}

#[test]
fn unavailable_send_is_resent_on_reconnect() {
    let env = TestEnv::new();
    let mut conv = connected(&env);
    let ticket = sends(&conv.handle(submit("Hello")))[0].ticket;

    let actions =
        conv.handle(ConversationEvent::SendCompleted { ticket, outcome: SendOutcome::Unavailable });
    assert!(actions.is_empty());
    assert_eq!(conv.messages().next().unwrap().status, DeliveryStatus::Sending);
    assert_eq!(conv.reconciler().queued_len(), 1);

    conv.handle(ConversationEvent::ChannelStatusChanged(ChannelStatus::Disconnected));
    let actions = conv.handle(ConversationEvent::ChannelStatusChanged(ChannelStatus::Connected));

    let resent = payloads(&actions);
    let [Payload::Message(message)] = resent.as_slice() else {
        panic!("expected one message, got {resent:?}");
    };
    assert_eq!(message.content.as_deref(), Some("Hello"));
    assert_eq!(conv.reconciler().queued_len(), 0);
    assert_eq!(conv.reconciler().in_flight_len(), 1);
}

#[test]
fn unavailable_receipt_is_reemitted_on_reconnect() {
    let env = TestEnv::new();
    let mut conv = connected(&env);
    let received = envelope("message", PEER, CONV, 0, json!({"id": "m1", "content": "hi"}));
    conv.handle(inbound(received));

    let visible = ConversationEvent::MessagesVisible { ids: vec!["m1".into()] };
    let ticket = sends(&conv.handle(visible))[0].ticket;
    conv.handle(ConversationEvent::SendCompleted { ticket, outcome: SendOutcome::Unavailable });
    assert_eq!(conv.unread_count(), 1);

    conv.handle(ConversationEvent::ChannelStatusChanged(ChannelStatus::Disconnected));
    let actions = conv.handle(ConversationEvent::ChannelStatusChanged(ChannelStatus::Connected));

    let receipts = payloads(&actions);
    assert!(matches!(receipts.as_slice(), [Payload::ReadReceipt(r)] if r.message_id == "m1"));
}
