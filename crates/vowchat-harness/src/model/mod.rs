//! Model-based testing infrastructure.
//!
//! Operations are applied both to a [`ModelWorld`] and to a real
//! [`SimSession`](crate::SimSession); after the Channel settles, their
//! observable states must match.

mod operation;
mod world;

pub use operation::{Draft, Operation};
pub use world::{ModelWorld, ObservableState, peer_message_id};
