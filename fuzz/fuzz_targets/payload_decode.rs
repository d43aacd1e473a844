//! Fuzz target for Payload::from_envelope
//!
//! This fuzzer tests payload decoding with:
//! - Arbitrary JSON under every event kind (type confusion)
//! - Missing, null or mistyped fields
//! - Oversized strings or collections
//!
//! # Invariants
//!
//! - Unknown kinds never decode
//! - A decoded payload reports the kind it was decoded under
//! - NEVER panic on malformed data

#![no_main]

use chrono::{TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use vowchat_proto::{Envelope, EnvelopeHeader, EventKind, Payload};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let Some(timestamp) = Utc.with_ymd_and_hms(2026, 1, 18, 9, 0, 0).single() else {
        return;
    };

    let kinds = [EventKind::Message, EventKind::Typing, EventKind::ReadReceipt, EventKind::Unknown];
    for kind in kinds {
        let header = EnvelopeHeader::new("conv-1", "user-1", timestamp);
        let envelope = Envelope::new(header, kind, value.clone());

        match Payload::from_envelope(&envelope) {
            Ok(payload) => {
                assert_ne!(kind, EventKind::Unknown);
                assert_eq!(payload.kind(), kind);
            },
            Err(_) => {},
        }
    }
});
