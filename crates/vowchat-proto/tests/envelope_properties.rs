//! Property-based tests for envelope encoding/decoding.
//!
//! The decoder sits directly behind the transport, so it must accept every
//! envelope the encoder produces and must never panic on hostile input.

use chrono::{DateTime, Utc};
use proptest::prelude::*;
use vowchat_proto::{
    Attachment, AttachmentKind, Envelope, EnvelopeHeader, MessagePayload, Payload,
    ReadReceiptPayload, TypingPayload,
};

fn arbitrary_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    // 2000-01-01 .. 2100-01-01, whole milliseconds
    (946_684_800_000i64..4_102_444_800_000i64)
        .prop_filter_map("valid timestamp", DateTime::<Utc>::from_timestamp_millis)
}

fn arbitrary_attachment() -> impl Strategy<Value = Attachment> {
    (
        "[a-z0-9-]{1,12}",
        prop_oneof![
            Just(AttachmentKind::Image),
            Just(AttachmentKind::Video),
            Just(AttachmentKind::Document),
            Just(AttachmentKind::Audio),
        ],
        "[a-z]{1,10}\\.[a-z]{3}",
        any::<u32>(),
    )
        .prop_map(|(id, kind, name, size)| Attachment {
            url: format!("https://media.example/{id}"),
            id,
            kind,
            name,
            size: u64::from(size),
            thumbnail: None,
        })
}

fn arbitrary_payload() -> impl Strategy<Value = Payload> {
    prop_oneof![
        (
            proptest::option::of("[a-z0-9-]{1,16}"),
            proptest::option::of(".{0,64}"),
            proptest::option::of(prop::collection::vec(arbitrary_attachment(), 0..3)),
        )
            .prop_map(|(id, content, attachments)| Payload::Message(MessagePayload {
                id,
                content,
                attachments,
                ..MessagePayload::default()
            })),
        any::<bool>().prop_map(|is_typing| Payload::Typing(TypingPayload { is_typing })),
        "[a-z0-9-]{1,16}"
            .prop_map(|message_id| Payload::ReadReceipt(ReadReceiptPayload { message_id })),
    ]
}

proptest! {
    #[test]
    fn prop_payload_survives_wire(
        payload in arbitrary_payload(),
        conversation_id in "[a-z0-9-]{1,16}",
        sender_id in "[a-z0-9-]{1,16}",
        timestamp in arbitrary_timestamp(),
    ) {
        let header = EnvelopeHeader::new(conversation_id, sender_id, timestamp);
        let envelope = payload.clone().into_envelope(header.clone()).unwrap();
        let text = envelope.to_json().unwrap();

        let decoded = Envelope::from_json(&text).unwrap();

        prop_assert_eq!(decoded.header(), header);
        prop_assert_eq!(decoded.payload().unwrap(), payload);
    }

    #[test]
    fn prop_decoder_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        if let Ok(envelope) = Envelope::from_slice(&bytes) {
            let _ = envelope.payload();
        }
    }

    #[test]
    fn prop_wrong_shape_data_is_rejected_not_panicking(
        kind in prop_oneof!["message", "typing", "read_receipt"],
        data in prop_oneof![
            Just("42".to_string()),
            Just("\"text\"".to_string()),
            Just("[1,2,3]".to_string()),
            Just("true".to_string()),
        ],
    ) {
        let text = format!(
            r#"{{"type":"{kind}","conversationId":"c","senderId":"u","timestamp":"2026-01-18T00:00:00Z","data":{data}}}"#
        );
        let envelope = Envelope::from_json(&text).unwrap();
        prop_assert!(envelope.payload().is_err());
    }
}
