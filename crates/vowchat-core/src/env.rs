//! Environment abstraction for deterministic testing.
//!
//! Decouples conversation logic from system clocks. Production drivers use
//! the monotonic system clock and wall-clock UTC; the simulation harness
//! uses a virtual clock that only moves when a test advances it.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Abstract environment providing time and async sleep.
///
/// Implementations MUST guarantee that `now()` never goes backwards.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, simulation uses a
    /// virtual instant.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic). Used for timeouts only.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time. Used to timestamp locally authored events.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code may call this; state machines never sleep.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
