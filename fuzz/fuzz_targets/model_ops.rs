//! Fuzz target for model-based testing
//!
//! Applies arbitrary operation sequences to the model and to a full
//! simulated session (runtime, driver, Channel with seeded faults).
//!
//! # Invariants
//!
//! - Standard invariants hold on every render
//! - After the Channel settles, the session shows exactly what the model
//!   predicts: every submission once, every peer message once

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use vowchat_harness::{Chaos, ModelWorld, Operation, SimSession};

#[derive(Debug, Arbitrary)]
struct Scenario {
    seed: u64,
    hostile: bool,
    ops: Vec<Operation>,
}

fuzz_target!(|scenario: Scenario| {
    let chaos = if scenario.hostile { Chaos::hostile() } else { Chaos::default() };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("current-thread runtime");

    runtime.block_on(async {
        let mut model = ModelWorld::new();
        let mut session = SimSession::open(scenario.seed, chaos).await.expect("open");

        for op in &scenario.ops {
            model.apply(op);
            if let Err(e) = session.apply(op).await {
                panic!("{e} after {op:?}");
            }
        }
        session.settle().await.expect("settle");

        assert_eq!(session.observable_state(), model.observable_state());
    });
});
