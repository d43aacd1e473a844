//! Delivery status of a message.
//!
//! ```text
//! ┌─────────┐ ack  ┌──────┐ echo ┌───────────┐ receipt ┌──────┐
//! │ Sending │─────>│ Sent │─────>│ Delivered │────────>│ Read │
//! └─────────┘      └──────┘      └───────────┘         └──────┘
//!      │
//!      │ rejected / transport unavailable
//!      ↓
//! ┌────────┐
//! │ Failed │ (terminal)
//! └────────┘
//! ```
//!
//! Network events arrive in any order, so transitions are applied as a
//! running maximum over the rank `sending(0) < sent(1) < delivered(2) <
//! read(3)`: a skipped step is fine (a receipt may arrive before the ack), a
//! step backwards is dropped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delivery status of a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Created locally, not yet accepted by the Channel.
    Sending,
    /// Accepted by the Channel.
    Sent,
    /// Stored by the server (echo observed) or received from a peer.
    Delivered,
    /// Acknowledged by the recipient.
    Read,
    /// Could not be sent. Only reachable from `Sending`.
    Failed,
}

/// Reasons a status transition is not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StatusError {
    /// Target rank is below the current rank.
    #[error("status would regress from {from:?} to {to:?}")]
    Regression {
        /// Current status.
        from: DeliveryStatus,
        /// Requested status.
        to: DeliveryStatus,
    },

    /// Target equals the current status.
    #[error("status already {0:?}")]
    Duplicate(DeliveryStatus),

    /// `Failed` requested after the message left `Sending`.
    #[error("cannot fail a message that is already {from:?}")]
    FailedAfterSending {
        /// Current status.
        from: DeliveryStatus,
    },

    /// Message already failed; only a new submission can retry it.
    #[error("message failed; cannot move to {to:?}")]
    Terminal {
        /// Requested status.
        to: DeliveryStatus,
    },
}

impl DeliveryStatus {
    /// Position in the delivery order. `None` for `Failed`.
    #[must_use]
    pub const fn rank(self) -> Option<u8> {
        match self {
            Self::Sending => Some(0),
            Self::Sent => Some(1),
            Self::Delivered => Some(2),
            Self::Read => Some(3),
            Self::Failed => None,
        }
    }

    /// Status after applying `to`, or why it is not applied.
    ///
    /// # Errors
    ///
    /// - `StatusError::Terminal` if `self` is `Failed`
    /// - `StatusError::FailedAfterSending` if `to` is `Failed` and `self` is
    ///   not `Sending`
    /// - `StatusError::Duplicate` / `StatusError::Regression` if `to` does not
    ///   raise the rank
    pub fn advance(self, to: Self) -> Result<Self, StatusError> {
        match (self.rank(), to.rank()) {
            (None, _) => Err(StatusError::Terminal { to }),
            (Some(0), None) => Ok(Self::Failed),
            (Some(_), None) => Err(StatusError::FailedAfterSending { from: self }),
            (Some(from), Some(next)) if next > from => Ok(to),
            (Some(from), Some(next)) if next == from => Err(StatusError::Duplicate(self)),
            (Some(_), Some(_)) => Err(StatusError::Regression { from: self, to }),
        }
    }

    /// Whether the message has reached the server or a peer.
    #[must_use]
    pub const fn is_delivered(self) -> bool {
        matches!(self, Self::Delivered | Self::Read)
    }

    /// Whether the message still awaits a send outcome or echo.
    #[must_use]
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Sending | Self::Sent)
    }
}
