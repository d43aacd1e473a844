//! One signed-in user with one open conversation, run end to end.
//!
//! A `SimSession` wires the production [`Runtime`] to a [`SimDriver`] and
//! a [`SimChannel`], so operations exercise the same orchestration code a
//! real frontend runs.

use std::time::Duration;

use vowchat_app::{ConversationSummary, Runtime, UserInput};
use vowchat_client::{ChannelStatus, ClientIdentity, Conversation, ConversationConfig};
use vowchat_core::env::Environment;
use vowchat_proto::{
    Envelope, EnvelopeHeader, MessagePayload, Payload, ReadReceiptPayload, TypingPayload,
};

use crate::{
    invariants::InvariantRegistry,
    model::{ObservableState, Operation, peer_message_id},
    sim_channel::{Chaos, SimChannel},
    sim_driver::{SimDriver, SimDriverError},
    sim_env::SimEnv,
};

/// Signed-in user.
pub const USER_ID: &str = "user-1";
/// Open conversation.
pub const CONVERSATION_ID: &str = "conv-1";
/// The other participant.
pub const PARTICIPANT_ID: &str = "vendor-7";

/// Upper bound on cycles spent draining the Channel.
const MAX_SETTLE_CYCLES: usize = 10_000;

/// Simulated session.
pub struct SimSession {
    env: SimEnv,
    driver: SimDriver,
    runtime: Runtime<SimDriver, SimEnv>,
    peer_messages: u64,
}

impl SimSession {
    /// Start a session with `conv-1` open and invariants checked on every
    /// render.
    ///
    /// # Errors
    ///
    /// Returns an error if an invariant breaks while opening.
    pub async fn open(seed: u64, chaos: Chaos) -> Result<Self, SimDriverError> {
        Self::open_with(seed, chaos, ConversationConfig::default()).await
    }

    /// Start a session with a custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an invariant breaks while opening.
    pub async fn open_with(
        seed: u64,
        chaos: Chaos,
        config: ConversationConfig,
    ) -> Result<Self, SimDriverError> {
        let env = SimEnv::new();
        let channel = SimChannel::new(seed).with_chaos(chaos);
        let driver =
            SimDriver::new(env.clone(), channel).with_invariants(InvariantRegistry::standard());

        let mut runtime =
            Runtime::new(driver.clone(), env.clone(), ClientIdentity::new(USER_ID), config);
        runtime.inbox_mut().upsert(
            ConversationSummary::new(CONVERSATION_ID, PARTICIPANT_ID, "Sarah Johnson")
                .with_vendor("Bloom Florals")
                .with_event("Johnson Wedding"),
        );

        let mut session = Self { env, driver, runtime, peer_messages: 0 };
        session.input(UserInput::Open { conversation_id: CONVERSATION_ID.into() }).await?;
        Ok(session)
    }

    /// Virtual clock.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Driver handle.
    pub fn driver(&self) -> &SimDriver {
        &self.driver
    }

    /// The open conversation.
    pub fn conversation(&self) -> Option<&Conversation<SimEnv>> {
        self.runtime.inbox().active()
    }

    /// Run one runtime cycle.
    ///
    /// # Errors
    ///
    /// Returns an error if a render broke an invariant.
    pub async fn step(&mut self) -> Result<(), SimDriverError> {
        self.runtime.process_cycle().await?;
        Ok(())
    }

    /// Queue a user action and run the cycle that handles it.
    ///
    /// # Errors
    ///
    /// Returns an error if a render broke an invariant.
    pub async fn input(&mut self, input: UserInput) -> Result<(), SimDriverError> {
        self.driver.inject_input(input);
        self.step().await
    }

    /// Run cycles until nothing is queued.
    ///
    /// # Errors
    ///
    /// Returns an error if a render broke an invariant.
    pub async fn run_until_idle(&mut self) -> Result<(), SimDriverError> {
        let mut cycles = 0;
        while self.driver.has_pending() && cycles < MAX_SETTLE_CYCLES {
            self.step().await?;
            cycles += 1;
        }
        Ok(())
    }

    /// Reconnect and drain all Channel traffic.
    ///
    /// # Errors
    ///
    /// Returns an error if a render broke an invariant.
    pub async fn settle(&mut self) -> Result<(), SimDriverError> {
        self.driver.set_status(ChannelStatus::Connected);
        self.step().await?;
        self.run_until_idle().await?;
        self.step().await
    }

    /// Queue a peer message, returning its id.
    pub fn peer_message(&mut self, content: &str) -> String {
        let id = peer_message_id(self.peer_messages);
        self.peer_messages += 1;

        let payload = MessagePayload {
            id: Some(id.clone()),
            sender_name: Some("Sarah Johnson".into()),
            content: Some(content.into()),
            ..MessagePayload::default()
        };
        self.inject_from_peer(Payload::Message(payload));
        id
    }

    /// Queue a peer typing change.
    pub fn peer_typing(&self, is_typing: bool) {
        self.inject_from_peer(Payload::Typing(TypingPayload { is_typing }));
    }

    /// Queue a peer read receipt.
    pub fn peer_reads(&self, message_id: &str) {
        let receipt = ReadReceiptPayload { message_id: message_id.into() };
        self.inject_from_peer(Payload::ReadReceipt(receipt));
    }

    fn inject_from_peer(&self, payload: Payload) {
        let header = EnvelopeHeader::new(CONVERSATION_ID, PARTICIPANT_ID, self.env.wall_clock());
        match payload.into_envelope(header) {
            Ok(envelope) => self.driver.inject_envelope(envelope),
            Err(e) => tracing::warn!(error = %e, "peer payload could not be encoded"),
        }
    }

    /// Inject a raw envelope.
    pub fn inject(&self, envelope: Envelope) {
        self.driver.inject_envelope(envelope);
    }

    /// Apply a model operation.
    ///
    /// # Errors
    ///
    /// Returns an error if a render broke an invariant.
    pub async fn apply(&mut self, op: &Operation) -> Result<(), SimDriverError> {
        match op {
            Operation::Submit { draft } => {
                let content = draft.text().to_owned();
                self.input(UserInput::Submit { content, attachments: Vec::new() }).await
            },
            Operation::Type { draft } => {
                self.input(UserInput::InputChanged { draft: draft.text().to_owned() }).await
            },
            Operation::PeerMessage { draft } => {
                self.peer_message(draft.text());
                Ok(())
            },
            Operation::PeerTyping { is_typing } => {
                self.peer_typing(*is_typing);
                Ok(())
            },
            Operation::PeerReadsLatest => {
                let latest = self.conversation().and_then(|c| {
                    c.store().latest_matching(|m| m.is_own && m.status.is_delivered())
                });
                if let Some(id) = latest.map(|m| m.id.clone()) {
                    self.peer_reads(&id);
                }
                Ok(())
            },
            Operation::ViewAll => {
                let ids = self
                    .conversation()
                    .map(|c| c.messages().map(|m| m.id.clone()).collect())
                    .unwrap_or_default();
                self.input(UserInput::Visible { ids }).await
            },
            Operation::Disconnect => {
                self.driver.set_status(ChannelStatus::Disconnected);
                self.step().await
            },
            Operation::Reconnect => {
                self.driver.set_status(ChannelStatus::Connected);
                self.step().await
            },
            Operation::RefuseNext => {
                self.driver.refuse_next(1);
                Ok(())
            },
            Operation::AdvanceTime { millis } => {
                self.env.advance(Duration::from_millis(u64::from(*millis)));
                self.step().await
            },
            Operation::Deliver { steps } => {
                for _ in 0..=(steps % 8) {
                    self.step().await?;
                }
                Ok(())
            },
        }
    }

    /// Extract observable state for comparison with the model.
    pub fn observable_state(&self) -> ObservableState {
        let Some(conversation) = self.conversation() else {
            return ObservableState::default();
        };

        let mut state = ObservableState::default();
        for message in conversation.messages() {
            if message.is_own {
                state.own.push(message.text().to_owned());
            } else {
                state.peer.push((message.id.clone(), message.text().to_owned()));
            }
        }
        state.own.sort();
        state.peer.sort();
        state
    }
}
