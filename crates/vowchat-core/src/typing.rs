//! Typing indicators.
//!
//! Both sides expire on inactivity, so a lost `isTyping: false` never leaves
//! an indicator stuck on.
//!
//! ```text
//!             draft non-empty (emit true)
//!   ┌──────┐ ───────────────────────────> ┌────────┐
//!   │ Idle │                              │ Typing │ ─┐ keystroke
//!   └──────┘ <─────────────────────────── └────────┘ <┘ (refresh)
//!             draft empty / timeout / submit (emit false)
//! ```
//!
//! Methods return the indicator value to emit, if any; the session decides
//! whether the Channel is available to carry it.

use std::{ops::Sub, time::Duration};

/// Local inactivity window before an implicit `isTyping: false`.
pub const DEFAULT_LOCAL_TYPING_TIMEOUT: Duration = Duration::from_secs(3);

/// Peer indicator lifetime without a follow-up typing event.
pub const DEFAULT_PEER_TYPING_TIMEOUT: Duration = Duration::from_secs(5);

/// Local typing state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingState<I> {
    /// Not typing.
    Idle,
    /// Typing; `last_input` is the most recent keystroke.
    Typing {
        /// Time of the most recent input change.
        last_input: I,
    },
}

/// Typing state of the current user.
#[derive(Debug, Clone)]
pub struct LocalTyping<I> {
    state: TypingState<I>,
    timeout: Duration,
}

impl<I> LocalTyping<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Idle indicator with the given inactivity timeout.
    pub fn new(timeout: Duration) -> Self {
        Self { state: TypingState::Idle, timeout }
    }

    /// Current state.
    pub fn state(&self) -> TypingState<I> {
        self.state
    }

    /// Whether the user is currently typing.
    pub fn is_typing(&self) -> bool {
        matches!(self.state, TypingState::Typing { .. })
    }

    /// Record an input change.
    ///
    /// Returns `Some(true)` when typing starts, `Some(false)` when the draft
    /// was cleared while typing, `None` otherwise.
    pub fn on_input(&mut self, draft_empty: bool, now: I) -> Option<bool> {
        match (self.state, draft_empty) {
            (TypingState::Idle, true) => None,
            (TypingState::Idle, false) => {
                self.state = TypingState::Typing { last_input: now };
                Some(true)
            },
            (TypingState::Typing { .. }, true) => {
                self.state = TypingState::Idle;
                Some(false)
            },
            (TypingState::Typing { .. }, false) => {
                self.state = TypingState::Typing { last_input: now };
                None
            },
        }
    }

    /// Expire typing after the inactivity timeout.
    ///
    /// Returns `Some(false)` on expiry.
    pub fn tick(&mut self, now: I) -> Option<bool> {
        match self.state {
            TypingState::Typing { last_input } if now - last_input >= self.timeout => {
                self.state = TypingState::Idle;
                Some(false)
            },
            _ => None,
        }
    }

    /// Return to idle (message submitted or conversation closed).
    ///
    /// Returns `Some(false)` if the user was typing.
    pub fn reset(&mut self) -> Option<bool> {
        match std::mem::replace(&mut self.state, TypingState::Idle) {
            TypingState::Typing { .. } => Some(false),
            TypingState::Idle => None,
        }
    }
}

/// Typing indicator asserted by the other participant.
#[derive(Debug, Clone)]
pub struct PeerTyping<I> {
    since: Option<I>,
    timeout: Duration,
}

impl<I> PeerTyping<I>
where
    I: Copy + Ord + Sub<Output = Duration>,
{
    /// Cleared indicator with the given expiry.
    pub fn new(timeout: Duration) -> Self {
        Self { since: None, timeout }
    }

    /// Whether the peer is shown as typing.
    pub fn is_typing(&self) -> bool {
        self.since.is_some()
    }

    /// Apply an inbound typing event. Returns `true` if visibility changed.
    pub fn on_typing_event(&mut self, is_typing: bool, now: I) -> bool {
        let was = self.is_typing();
        self.since = is_typing.then_some(now);
        was != is_typing
    }

    /// A message from the peer arrived; they are no longer typing.
    pub fn on_peer_message(&mut self) -> bool {
        self.since.take().is_some()
    }

    /// Expire a stale indicator. Returns `true` if it was cleared.
    pub fn tick(&mut self, now: I) -> bool {
        match self.since {
            Some(since) if now - since >= self.timeout => {
                self.since = None;
                true
            },
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[test]
    fn local_emits_on_start_and_clear() {
        let t0 = Instant::now();
        let mut typing = LocalTyping::new(DEFAULT_LOCAL_TYPING_TIMEOUT);

        assert_eq!(typing.on_input(true, t0), None);
        assert_eq!(typing.on_input(false, t0), Some(true));
        assert_eq!(typing.on_input(false, t0 + Duration::from_secs(1)), None);
        assert_eq!(typing.on_input(true, t0 + Duration::from_secs(2)), Some(false));
        assert_eq!(typing.state(), TypingState::Idle);
    }

    #[test]
    fn local_expires_after_inactivity() {
        let t0 = Instant::now();
        let mut typing = LocalTyping::new(Duration::from_secs(3));
        typing.on_input(false, t0);
        typing.on_input(false, t0 + Duration::from_secs(2));

        // refreshed at t0+2, so t0+4 is still within the window
        assert_eq!(typing.tick(t0 + Duration::from_secs(4)), None);
        assert_eq!(typing.tick(t0 + Duration::from_secs(5)), Some(false));
        assert!(!typing.is_typing());
        assert_eq!(typing.tick(t0 + Duration::from_secs(9)), None);
    }

    #[test]
    fn local_reset_emits_only_when_typing() {
        let t0 = Instant::now();
        let mut typing = LocalTyping::new(DEFAULT_LOCAL_TYPING_TIMEOUT);
        assert_eq!(typing.reset(), None);

        typing.on_input(false, t0);
        assert_eq!(typing.reset(), Some(false));
        assert_eq!(typing.reset(), None);
    }

    #[test]
    fn peer_expires_without_followup() {
        let t0 = Instant::now();
        let mut peer = PeerTyping::new(DEFAULT_PEER_TYPING_TIMEOUT);

        assert!(peer.on_typing_event(true, t0));
        assert!(!peer.tick(t0 + Duration::from_secs(4)));
        assert!(peer.is_typing());

        // follow-up refreshes the window
        assert!(!peer.on_typing_event(true, t0 + Duration::from_secs(4)));
        assert!(!peer.tick(t0 + Duration::from_secs(8)));
        assert!(peer.tick(t0 + Duration::from_secs(9)));
        assert!(!peer.is_typing());
    }

    #[test]
    fn peer_message_clears_immediately() {
        let t0 = Instant::now();
        let mut peer = PeerTyping::new(DEFAULT_PEER_TYPING_TIMEOUT);
        peer.on_typing_event(true, t0);

        assert!(peer.on_peer_message());
        assert!(!peer.is_typing());
        assert!(!peer.on_peer_message());
    }

    #[test]
    fn peer_explicit_stop() {
        let t0 = Instant::now();
        let mut peer = PeerTyping::new(DEFAULT_PEER_TYPING_TIMEOUT);
        peer.on_typing_event(true, t0);
        assert!(peer.on_typing_event(false, t0));
        assert!(!peer.on_typing_event(false, t0));
    }
}
