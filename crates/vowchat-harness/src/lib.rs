//! Deterministic simulation harness for vowchat conversations.
//!
//! A virtual clock, an in-memory Channel with seeded faults, and a driver
//! that lets the production [`vowchat_app::Runtime`] run reproducibly.
//!
//! # Model-Based Testing
//!
//! The `model` module provides a reference implementation for model-based
//! testing. Operations are applied to both the model and a [`SimSession`],
//! and their observable states are compared once the Channel settles.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the
//! conversation invariants.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod invariants;
pub mod model;
pub mod session;
pub mod sim_channel;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    AtMostOnceReceipt, ChronologicalOrder, ConversationSnapshot, Invariant, InvariantRegistry,
    InvariantResult, MessageSnapshot, SingleCopyPerSubmission, StatusHistory, StatusMonotonicity,
    SystemSnapshot, UniqueMessageIds, Violation,
};
pub use model::{Draft, ModelWorld, ObservableState, Operation, peer_message_id};
pub use session::{CONVERSATION_ID, PARTICIPANT_ID, SimSession, USER_ID};
pub use sim_channel::{Chaos, SimChannel, SimChannelError};
pub use sim_driver::{SimDriver, SimDriverError};
pub use sim_env::{SimEnv, SimInstant};
