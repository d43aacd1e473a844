//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as a production frontend but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`vowchat_app::Runtime`] orchestration code runs in both production and
//! simulation. Clones share state, so a test keeps one handle to inject
//! input and peer traffic while the runtime owns another.

#![allow(clippy::disallowed_types, reason = "Synchronous locking operations only")]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use vowchat_app::{Driver, InboxView, UserInput};
use vowchat_client::ChannelStatus;
use vowchat_core::env::Environment;
use vowchat_proto::Envelope;

use crate::{
    invariants::{ConversationSnapshot, InvariantRegistry, StatusHistory, SystemSnapshot},
    sim_channel::{SimChannel, SimChannelError},
    sim_env::{SimEnv, SimInstant},
};

/// Error type for simulation driver.
#[derive(Debug, thiserror::Error)]
pub enum SimDriverError {
    /// The simulated Channel refused an envelope.
    #[error(transparent)]
    Channel(#[from] SimChannelError),

    /// A rendered frame broke a registered invariant.
    #[error("invariant violation: {0}")]
    Invariant(String),
}

/// Shared state for injection and inspection.
///
/// This allows injection from outside async contexts.
#[derive(Debug)]
struct SharedState {
    inputs: VecDeque<UserInput>,
    channel: SimChannel,
    last_view: Option<InboxView>,
    renders: usize,
    submitted: HashMap<String, usize>,
    history: HashMap<String, StatusHistory>,
    stopped: bool,
}

/// Simulation driver for deterministic testing.
///
/// Implements [`Driver`] so the same [`vowchat_app::Runtime`] orchestration
/// code runs in both production and simulation tests.
#[derive(Debug, Clone)]
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
    env: SimEnv,
    invariants: Option<Arc<InvariantRegistry>>,
}

impl SimDriver {
    /// Create a driver over `channel`, reading time from `env`.
    pub fn new(env: SimEnv, channel: SimChannel) -> Self {
        let state = SharedState {
            inputs: VecDeque::new(),
            channel,
            last_view: None,
            renders: 0,
            submitted: HashMap::new(),
            history: HashMap::new(),
            stopped: false,
        };
        Self { state: Arc::new(Mutex::new(state)), env, invariants: None }
    }

    /// Enable invariant checking on every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(Arc::new(registry));
        self
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a user action.
    pub fn inject_input(&self, input: UserInput) {
        self.lock().inputs.push_back(input);
    }

    /// Queue peer traffic on the Channel.
    pub fn inject_envelope(&self, envelope: Envelope) {
        self.lock().channel.inject(envelope);
    }

    /// Change the Channel status.
    pub fn set_status(&self, status: ChannelStatus) {
        self.lock().channel.set_status(status);
    }

    /// Refuse the next `count` outbound envelopes.
    pub fn refuse_next(&self, count: usize) {
        self.lock().channel.refuse_next(count);
    }

    /// Run `f` against the simulated Channel.
    pub fn with_channel<T>(&self, f: impl FnOnce(&SimChannel) -> T) -> T {
        f(&self.lock().channel)
    }

    /// Check if there is queued input or undelivered Channel traffic.
    ///
    /// Traffic only counts while connected, since the runtime does not
    /// receive otherwise.
    pub fn has_pending(&self) -> bool {
        let state = self.lock();
        !state.inputs.is_empty()
            || (state.channel.status().is_connected() && state.channel.pending() > 0)
    }

    /// Most recently rendered inbox.
    pub fn last_view(&self) -> Option<InboxView> {
        self.lock().last_view.clone()
    }

    /// Number of renders so far.
    pub fn renders(&self) -> usize {
        self.lock().renders
    }

    /// Whether the runtime released the driver.
    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    /// Snapshot of the open conversation as last rendered.
    pub fn snapshot(&self) -> SystemSnapshot {
        let state = self.lock();
        Self::snapshot_locked(&state)
    }

    fn snapshot_locked(state: &SharedState) -> SystemSnapshot {
        let Some(active) = state.last_view.as_ref().and_then(|view| view.active.as_ref()) else {
            return SystemSnapshot::empty();
        };

        let history = state.history.get(&active.id).map(StatusHistory::snapshot);
        let conversation = ConversationSnapshot::from_view(active)
            .with_history(history.unwrap_or_default())
            .with_traffic(state.channel.accepted())
            .with_submitted(state.submitted.get(&active.id).copied().unwrap_or(0));

        SystemSnapshot::single(conversation)
    }
}

/// Whether a submission produces a message.
fn is_substantive(content: &str, attachments: usize) -> bool {
    !content.trim().is_empty() || attachments > 0
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_input(&mut self) -> Result<Option<UserInput>, Self::Error> {
        let mut state = self.lock();
        let input = state.inputs.pop_front();

        let active =
            state.last_view.as_ref().and_then(|v| v.active.as_ref()).map(|a| a.id.clone());
        match (&input, active) {
            (Some(UserInput::Submit { content, attachments }), Some(active))
                if is_substantive(content, attachments.len()) =>
            {
                *state.submitted.entry(active).or_default() += 1;
            },
            (Some(UserInput::Open { conversation_id }), _) => {
                // new session, local ids restart
                state.history.remove(conversation_id);
            },
            _ => {},
        }

        Ok(input)
    }

    async fn send_envelope(&mut self, envelope: Envelope) -> Result<(), Self::Error> {
        Ok(self.lock().channel.accept(envelope)?)
    }

    async fn recv_envelope(&mut self) -> Option<Envelope> {
        self.lock().channel.deliver()
    }

    fn status(&self) -> ChannelStatus {
        self.lock().channel.status()
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn render(&mut self, view: &InboxView) -> Result<(), Self::Error> {
        let invariants = self.invariants.clone();
        let mut state = self.lock();
        state.renders += 1;

        if let Some(active) = &view.active {
            state.history.entry(active.id.clone()).or_default().observe(&active.messages);
        }
        state.last_view = Some(view.clone());

        if let Some(registry) = invariants
            && let Err(violations) = registry.check_all(&Self::snapshot_locked(&state))
        {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            return Err(SimDriverError::Invariant(messages.join("; ")));
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.lock().stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use vowchat_client::{ClientIdentity, ConversationConfig};

    use super::*;

    fn driver() -> SimDriver {
        SimDriver::new(SimEnv::new(), SimChannel::new(7))
    }

    #[test]
    fn injected_input_is_pending() {
        let driver = driver();
        assert!(!driver.has_pending());

        driver.inject_input(UserInput::Quit);

        assert!(driver.has_pending());
    }

    #[test]
    fn traffic_is_not_pending_while_disconnected() {
        let driver = driver();
        driver.set_status(ChannelStatus::Disconnected);
        let envelope = Envelope::from_json(
            r#"{"type":"typing","conversationId":"c","senderId":"p","timestamp":"2026-01-18T10:00:00Z","data":{"isTyping":true}}"#,
        )
        .unwrap();

        driver.inject_envelope(envelope);

        assert!(!driver.has_pending());
    }

    #[test]
    fn invariant_violation_is_a_render_error() {
        let env = SimEnv::new();
        let mut driver = SimDriver::new(env.clone(), SimChannel::new(7))
            .with_invariants(InvariantRegistry::standard());
        let message = vowchat_core::Message::local(
            "local-1".into(),
            "conv-1".into(),
            "user-1".into(),
            Some("Hello".into()),
            Vec::new(),
            env.wall_clock(),
        );
        let view = InboxView {
            channel: ChannelStatus::Connected,
            conversations: Vec::new(),
            active: Some(vowchat_client::ConversationView {
                id: "conv-1".into(),
                participant_id: "vendor-7".into(),
                channel: ChannelStatus::Connected,
                is_online: false,
                is_typing: false,
                unread_count: 0,
                messages: vec![message.clone(), message],
            }),
        };

        let result = driver.render(&view);

        let Err(SimDriverError::Invariant(report)) = result else {
            panic!("expected an invariant error, got {result:?}");
        };
        assert!(report.contains("unique_message_ids"));
        assert_eq!(driver.renders(), 1);
    }

    #[tokio::test]
    async fn runtime_renders_and_stops() {
        let env = SimEnv::new();
        let handle = SimDriver::new(env.clone(), SimChannel::new(7))
            .with_invariants(InvariantRegistry::standard());
        handle.inject_input(UserInput::Quit);

        let runtime = vowchat_app::Runtime::new(
            handle.clone(),
            env,
            ClientIdentity::new("user-1"),
            ConversationConfig::default(),
        );
        runtime.run().await.unwrap();

        assert!(handle.renders() >= 1);
        assert!(handle.is_stopped());
    }
}
