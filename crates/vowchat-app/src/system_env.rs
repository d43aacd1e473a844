//! Production Environment implementation using system clocks.
//!
//! `SystemEnv` uses the monotonic system clock for timeouts, wall-clock UTC
//! for message timestamps, and tokio for async sleep. Production behavior
//! is therefore not reproducible; tests use a virtual clock instead.

use std::time::Duration;

use chrono::{DateTime, Utc};
use vowchat_core::env::Environment;

/// Production environment using system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }
}
