//! Integration tests for Inbox routing and the conversation list.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - Summary rows reflect what arrived for their conversation
//! - Only the open conversation has a session
//! - Envelopes never leak into another conversation

use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use chrono::{DateTime, TimeZone, Utc};
use vowchat_app::{ConversationSummary, Inbox};
use vowchat_client::{
    ChannelStatus, ClientIdentity, ConversationAction, ConversationConfig, ConversationEvent,
};
use vowchat_core::env::Environment;
use vowchat_proto::{Envelope, EnvelopeHeader, MessagePayload, Payload, TypingPayload};

const ME: &str = "user-1";

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
        Utc.with_ymd_and_hms(2026, 1, 18, 9, 0, 0).unwrap()
    }

    fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        std::future::ready(())
    }
}

fn inbox(env: &TestEnv) -> Inbox<TestEnv> {
    let mut inbox = Inbox::new(env.clone(), ClientIdentity::new(ME), ConversationConfig::default());
    inbox.upsert(
        ConversationSummary::new("conv-1", "vendor-7", "Sarah Johnson")
            .with_vendor("Bloom Florals")
            .with_event("Johnson Wedding"),
    );
    inbox.upsert(
        ConversationSummary::new("conv-2", "vendor-9", "Mike Chen")
            .with_vendor("Chen Photography")
            .with_event("Garden Reception"),
    );
    inbox.handle(ConversationEvent::ChannelStatusChanged(ChannelStatus::Connected));
    inbox
}

fn sent_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 1, 18, 10, 0, 0).unwrap()
}

fn message(
    conversation: &str,
    sender: &str,
    id: &str,
    content: &str,
) -> ConversationEvent<Instant> {
    let header = EnvelopeHeader::new(conversation, sender, sent_at());
    let payload = Payload::Message(MessagePayload {
        id: Some(id.into()),
        content: Some(content.into()),
        ..MessagePayload::default()
    });
    ConversationEvent::EnvelopeReceived(payload.into_envelope(header).unwrap())
}

fn typing(conversation: &str, sender: &str) -> ConversationEvent<Instant> {
    let header = EnvelopeHeader::new(conversation, sender, sent_at());
    let envelope: Envelope =
        Payload::Typing(TypingPayload { is_typing: true }).into_envelope(header).unwrap();
    ConversationEvent::EnvelopeReceived(envelope)
}

#[test]
fn filter_matches_any_name_case_insensitively() {
    let env = TestEnv::new();
    let inbox = inbox(&env);

    let ids = |query: &str| inbox.filter(query).iter().map(|s| s.id.clone()).collect::<Vec<_>>();

    assert_eq!(ids("sarah"), ["conv-1"]);
    assert_eq!(ids("PHOTOGRAPHY"), ["conv-2"]);
    assert_eq!(ids("wedding"), ["conv-1"]);
    assert_eq!(ids(""), ["conv-1", "conv-2"]);
    assert!(ids("caterer").is_empty());
}

#[test]
fn background_message_updates_summary_only() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);
    inbox.open("conv-1");

    let actions = inbox.handle(message("conv-2", "vendor-9", "m1", "Photos are ready"));

    assert_eq!(actions, [ConversationAction::Render]);
    let summary = inbox.summary("conv-2").unwrap();
    assert_eq!(summary.unread_count, 1);
    assert_eq!(summary.last_message.as_deref(), Some("Photos are ready"));
    assert!(inbox.active().unwrap().store().is_empty());
}

#[test]
fn background_duplicate_is_counted_once() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);

    inbox.handle(message("conv-2", "vendor-9", "m1", "hi"));
    inbox.handle(message("conv-2", "vendor-9", "m1", "hi"));

    assert_eq!(inbox.summary("conv-2").unwrap().unread_count, 1);
}

#[test]
fn active_conversation_gets_session_events() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);
    inbox.open("conv-1");

    inbox.handle(message("conv-1", "vendor-7", "m1", "Quote attached"));

    let session = inbox.active().unwrap();
    assert_eq!(session.store().len(), 1);
    assert_eq!(inbox.summary("conv-1").unwrap().unread_count, 1);

    let actions = inbox.handle(ConversationEvent::MessagesVisible { ids: vec!["m1".into()] });
    assert!(actions.iter().any(|a| matches!(a, ConversationAction::Send(_))));
    assert_eq!(inbox.summary("conv-1").unwrap().unread_count, 0);
}

#[test]
fn opening_another_conversation_closes_the_first() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);
    inbox.open("conv-1");
    inbox.handle(ConversationEvent::InputChanged { draft: "Hel".into() });

    let actions = inbox.open("conv-2");

    // typing stop for conv-1, then a render for the new session
    let sent: Vec<_> = actions
        .iter()
        .filter_map(|a| match a {
            ConversationAction::Send(outbound) => Some(outbound.envelope.clone()),
            ConversationAction::Render => None,
        })
        .collect();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].conversation_id, "conv-1");
    assert_eq!(inbox.active().unwrap().id(), "conv-2");
    assert_eq!(inbox.active().unwrap().channel_status(), ChannelStatus::Connected);
}

#[test]
fn opening_keeps_background_unread_count() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);
    inbox.handle(message("conv-2", "vendor-9", "m1", "Photos are ready"));
    inbox.handle(message("conv-2", "vendor-9", "m2", "Gallery link inside"));

    inbox.open("conv-2");
    assert_eq!(inbox.summary("conv-2").unwrap().unread_count, 2);

    inbox.handle(message("conv-2", "vendor-9", "m3", "Any favourites?"));
    assert_eq!(inbox.summary("conv-2").unwrap().unread_count, 3);

    // Only the message the session holds can be acknowledged
    inbox.handle(ConversationEvent::MessagesVisible { ids: vec!["m3".into()] });
    assert_eq!(inbox.summary("conv-2").unwrap().unread_count, 2);
}

#[test]
fn unknown_conversation_cannot_be_opened() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);

    assert!(inbox.open("conv-404").is_empty());
    assert!(inbox.active().is_none());
}

#[test]
fn background_typing_expires() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);

    inbox.handle(typing("conv-2", "vendor-9"));
    assert!(inbox.summary("conv-2").unwrap().is_typing);

    let now = env.advance(Duration::from_secs(5));
    let actions = inbox.handle(ConversationEvent::Tick { now });

    assert_eq!(actions, [ConversationAction::Render]);
    assert!(!inbox.summary("conv-2").unwrap().is_typing);
}

#[test]
fn own_background_message_is_not_unread() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);

    inbox.handle(message("conv-2", ME, "m1", "sent from phone"));

    let summary = inbox.summary("conv-2").unwrap();
    assert_eq!(summary.unread_count, 0);
    assert_eq!(summary.last_message.as_deref(), Some("sent from phone"));
}

#[test]
fn presence_reaches_rows_and_session() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);
    inbox.open("conv-1");

    inbox.set_presence("conv-1", true);
    inbox.set_presence("conv-2", true);

    assert!(inbox.active().unwrap().is_online());
    assert!(inbox.summary("conv-1").unwrap().is_online);
    assert!(inbox.summary("conv-2").unwrap().is_online);
}

#[test]
fn intents_without_open_session_are_dropped() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);

    let actions = inbox.handle(ConversationEvent::Submit {
        content: "hello?".into(),
        attachments: Vec::new(),
    });

    assert!(actions.is_empty());
}

#[test]
fn view_includes_active_conversation() {
    let env = TestEnv::new();
    let mut inbox = inbox(&env);
    assert!(inbox.view().active.is_none());

    inbox.open("conv-2");
    let view = inbox.view();

    assert_eq!(view.conversations.len(), 2);
    assert_eq!(view.active.unwrap().participant_id, "vendor-9");
}
