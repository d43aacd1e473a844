//! Fuzz target for Envelope::from_slice
//!
//! This fuzzer tests envelope decoding with arbitrary byte sequences to find:
//! - Parser crashes or panics
//! - Timestamps that parse but cannot be re-serialized
//! - Envelopes whose payload decoding panics
//!
//! The fuzzer should NEVER panic. All invalid inputs should return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use vowchat_proto::Envelope;

fuzz_target!(|data: &[u8]| {
    let Ok(envelope) = Envelope::from_slice(data) else {
        return;
    };

    // Anything that decoded must encode again
    let text = envelope.to_json().expect("decoded envelope must encode");
    let again = Envelope::from_json(&text).expect("encoded envelope must decode");
    assert_eq!(again.kind, envelope.kind);
    assert_eq!(again.conversation_id, envelope.conversation_id);
    assert_eq!(again.timestamp, envelope.timestamp);

    let _ = envelope.payload();
});
