//! In-memory messaging backend for one signed-in user.
//!
//! The channel accepts envelopes from the client, echoes accepted messages
//! back with a server-assigned id (as the real backend does), and delivers
//! peer traffic injected by tests. Delivery order, duplication and refusals
//! are driven by a seeded RNG so a failing run replays exactly.

use std::collections::VecDeque;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use vowchat_client::ChannelStatus;
use vowchat_proto::{Envelope, EventKind, Payload};

/// Errors returned when the channel refuses an outbound envelope.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SimChannelError {
    /// The channel is not connected.
    #[error("channel is not connected")]
    Disconnected,

    /// The backend refused the event.
    #[error("backend refused {0} event")]
    Refused(EventKind),
}

/// Fault injection settings.
///
/// Rates are probabilities in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Chaos {
    /// Deliver queued inbound envelopes in random order.
    pub reorder: bool,
    /// Probability that an echo is delivered twice.
    pub duplicate_rate: f64,
    /// Probability that an outbound envelope is refused.
    pub refuse_rate: f64,
}

impl Chaos {
    /// Reordering, 20% duplicate echoes and 10% refusals.
    pub fn hostile() -> Self {
        Self { reorder: true, duplicate_rate: 0.2, refuse_rate: 0.1 }
    }
}

/// Simulated Channel.
#[derive(Debug)]
pub struct SimChannel {
    rng: ChaCha8Rng,
    chaos: Chaos,
    status: ChannelStatus,
    echo: bool,
    refuse_next: usize,
    next_server_id: u64,
    inbound: VecDeque<Envelope>,
    accepted: Vec<Envelope>,
}

impl SimChannel {
    /// Create a connected channel that echoes messages, without faults.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            chaos: Chaos::default(),
            status: ChannelStatus::Connected,
            echo: true,
            refuse_next: 0,
            next_server_id: 1,
            inbound: VecDeque::new(),
            accepted: Vec::new(),
        }
    }

    /// Enable fault injection.
    #[must_use]
    pub fn with_chaos(mut self, chaos: Chaos) -> Self {
        self.chaos = chaos;
        self
    }

    /// Stop echoing accepted messages.
    #[must_use]
    pub fn without_echo(mut self) -> Self {
        self.echo = false;
        self
    }

    /// Current status.
    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    /// Change the connection status.
    pub fn set_status(&mut self, status: ChannelStatus) {
        if self.status != status {
            tracing::debug!(?status, "sim channel status");
        }
        self.status = status;
    }

    /// Refuse the next `count` outbound envelopes regardless of chaos.
    pub fn refuse_next(&mut self, count: usize) {
        self.refuse_next += count;
    }

    /// Queue peer traffic for delivery.
    pub fn inject(&mut self, envelope: Envelope) {
        self.inbound.push_back(envelope);
    }

    /// Hand an outbound envelope to the backend.
    ///
    /// # Errors
    ///
    /// - [`SimChannelError::Disconnected`] unless connected
    /// - [`SimChannelError::Refused`] if forced or chosen by chaos
    pub fn accept(&mut self, envelope: Envelope) -> Result<(), SimChannelError> {
        if !self.status.is_connected() {
            return Err(SimChannelError::Disconnected);
        }

        if self.refuse_next > 0 {
            self.refuse_next -= 1;
            return Err(SimChannelError::Refused(envelope.kind));
        }
        if self.roll(self.chaos.refuse_rate) {
            return Err(SimChannelError::Refused(envelope.kind));
        }

        if self.echo
            && let Some(echo) = self.echo_of(&envelope)
        {
            if self.roll(self.chaos.duplicate_rate) {
                self.inbound.push_back(echo.clone());
            }
            self.inbound.push_back(echo);
        }

        self.accepted.push(envelope);
        Ok(())
    }

    /// Next envelope for the client, if any.
    pub fn deliver(&mut self) -> Option<Envelope> {
        if self.chaos.reorder && self.inbound.len() > 1 {
            let index = self.rng.gen_range(0..self.inbound.len());
            return self.inbound.remove(index);
        }
        self.inbound.pop_front()
    }

    /// Number of envelopes waiting for delivery.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    /// Every envelope the backend accepted, in order.
    pub fn accepted(&self) -> &[Envelope] {
        &self.accepted
    }

    /// Accepted envelopes of one kind.
    pub fn accepted_of(&self, kind: EventKind) -> impl Iterator<Item = &Envelope> + '_ {
        self.accepted.iter().filter(move |e| e.kind == kind)
    }

    /// Server copy of an accepted message: same routing fields and content
    /// plus a fresh server id.
    fn echo_of(&mut self, envelope: &Envelope) -> Option<Envelope> {
        let Ok(Payload::Message(mut message)) = envelope.payload() else {
            return None;
        };

        message.id = Some(format!("srv-{}", self.next_server_id));
        self.next_server_id += 1;

        Payload::Message(message).into_envelope(envelope.header()).ok()
    }

    fn roll(&mut self, rate: f64) -> bool {
        rate > 0.0 && self.rng.gen_bool(rate.min(1.0))
    }
}
