//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use vowchat_client::ChannelStatus;
use vowchat_proto::Envelope;

use crate::{InboxView, UserInput};

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in production and simulation.
///
/// The Channel owns its connection lifecycle (reconnects, backoff); the
/// driver only reports its status.
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Poll for the next user input.
    ///
    /// Returns `None` if no input is ready.
    fn poll_input(&mut self) -> impl Future<Output = Result<Option<UserInput>, Self::Error>> + Send;

    /// Hand an envelope to the Channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the Channel refused the event. The runtime reports
    /// it as a rejected send for that event only.
    fn send_envelope(
        &mut self,
        envelope: Envelope,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Receive the next envelope from the Channel.
    ///
    /// Returns `None` if nothing is ready.
    fn recv_envelope(&mut self) -> impl Future<Output = Option<Envelope>> + Send;

    /// Current Channel connection status.
    fn status(&self) -> ChannelStatus;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the inbox.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, view: &InboxView) -> Result<(), Self::Error>;

    /// Release Channel resources.
    fn stop(&mut self);
}
