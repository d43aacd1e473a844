//! Drives a conversation from transcript steps.
//!
//! The replay stands in for both the user and the Channel: user steps
//! become conversation events, every send is accepted unless a `reject`
//! step said otherwise, and `wait` steps move a virtual clock so timeouts
//! fire exactly where the transcript puts them.

use std::{collections::VecDeque, time::Duration};

use chrono::{DateTime, Utc};
use vowchat_client::{
    ClientIdentity, Conversation, ConversationAction, ConversationConfig, ConversationEvent,
    ConversationView, Outbound, SendOutcome,
};
use vowchat_harness::SimEnv;
use vowchat_proto::Envelope;

use crate::Step;

/// Reason reported for refused sends when the transcript gives none.
const DEFAULT_REJECT_REASON: &str = "rejected by transcript";

/// A conversation being replayed.
pub struct Replay {
    env: SimEnv,
    conversation: Conversation<SimEnv>,
    rejections: VecDeque<String>,
    sent: Vec<Envelope>,
    renders: usize,
}

impl Replay {
    /// Open a conversation whose wall clock starts at `start`.
    pub fn new(
        identity: ClientIdentity,
        conversation_id: &str,
        participant_id: &str,
        config: ConversationConfig,
        start: DateTime<Utc>,
    ) -> Self {
        let env = SimEnv::with_epoch(start);
        let conversation =
            Conversation::new(env.clone(), identity, conversation_id, participant_id, config);
        Self { env, conversation, rejections: VecDeque::new(), sent: Vec::new(), renders: 0 }
    }

    /// Apply every step in order.
    pub fn run(&mut self, steps: impl IntoIterator<Item = Step>) {
        for (index, step) in steps.into_iter().enumerate() {
            let sent = self.apply(step);
            tracing::debug!(step = index + 1, sent = sent.len(), "step applied");
        }
    }

    /// Apply one step, returning the envelopes the Channel accepted.
    pub fn apply(&mut self, step: Step) -> Vec<Envelope> {
        let event = match step {
            Step::Status { status } => ConversationEvent::ChannelStatusChanged(status),
            Step::Receive { envelope } => ConversationEvent::EnvelopeReceived(envelope),
            Step::Input { draft } => ConversationEvent::InputChanged { draft },
            Step::Submit { content, attachments } => {
                ConversationEvent::Submit { content, attachments }
            },
            Step::Visible { ids } => ConversationEvent::MessagesVisible { ids },
            Step::Presence { is_online } => ConversationEvent::PresenceChanged { is_online },
            Step::Wait { ms } => {
                let now = self.env.advance(Duration::from_millis(ms));
                ConversationEvent::Tick { now }
            },
            Step::Reject { count, reason } => {
                let reason = reason.unwrap_or_else(|| DEFAULT_REJECT_REASON.to_owned());
                self.rejections.extend(std::iter::repeat_n(reason, count));
                return Vec::new();
            },
            Step::Close => ConversationEvent::Close,
        };

        let actions = self.conversation.handle(event);
        self.execute(actions)
    }

    fn execute(&mut self, actions: Vec<ConversationAction>) -> Vec<Envelope> {
        let mut pending: VecDeque<_> = actions.into();
        let mut accepted = Vec::new();

        while let Some(action) = pending.pop_front() {
            match action {
                ConversationAction::Render => self.renders += 1,
                ConversationAction::Send(Outbound { ticket, envelope }) => {
                    let outcome = match self.rejections.pop_front() {
                        Some(reason) => {
                            tracing::info!(%ticket, kind = %envelope.kind, %reason, "send refused");
                            SendOutcome::Rejected { reason }
                        },
                        None => {
                            tracing::info!(%ticket, kind = %envelope.kind, "send accepted");
                            accepted.push(envelope);
                            SendOutcome::Accepted
                        },
                    };
                    let completed = ConversationEvent::SendCompleted { ticket, outcome };
                    pending.extend(self.conversation.handle(completed));
                },
            }
        }

        self.sent.extend(accepted.iter().cloned());
        accepted
    }

    /// Every envelope accepted so far.
    pub fn sent(&self) -> &[Envelope] {
        &self.sent
    }

    /// Number of render requests so far.
    pub fn renders(&self) -> usize {
        self.renders
    }

    /// The replayed conversation.
    pub fn conversation(&self) -> &Conversation<SimEnv> {
        &self.conversation
    }

    /// Rendered state.
    pub fn view(&self) -> ConversationView {
        self.conversation.view()
    }
}
