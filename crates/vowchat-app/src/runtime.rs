//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`Inbox`]: conversation list and open session
//! - [`Driver`]: Platform-specific I/O

use std::{collections::VecDeque, time::Duration};

use vowchat_client::{
    ClientIdentity, ConversationAction, ConversationConfig, ConversationEvent, Outbound,
    SendOutcome,
};
use vowchat_core::env::Environment;

use crate::{Driver, Inbox, UserInput};

/// Pause between loop cycles that found nothing to do.
const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(20);

/// Generic runtime that orchestrates the Inbox and a Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for clocks
pub struct Runtime<D, E>
where
    D: Driver,
    E: Environment,
{
    driver: D,
    env: E,
    inbox: Inbox<E>,
    idle_interval: Duration,
}

impl<D, E> Runtime<D, E>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
{
    /// Create a new runtime with the given driver and environment.
    pub fn new(driver: D, env: E, identity: ClientIdentity, config: ConversationConfig) -> Self {
        let inbox = Inbox::new(env.clone(), identity, config);
        Self { driver, env, inbox, idle_interval: DEFAULT_IDLE_INTERVAL }
    }

    /// Override the pause between idle cycles.
    #[must_use]
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Run the main event loop until the user quits.
    ///
    /// This is the core orchestration loop that:
    /// 1. Polls for user input from the driver
    /// 2. Tracks Channel status changes
    /// 3. Receives envelopes from the Channel
    /// 4. Ticks timeouts
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll input or render. Failed
    /// sends are reported to the conversation, not returned: a send that
    /// fails while the driver reports no connection is
    /// [`SendOutcome::Unavailable`], any other failure is a rejection.
    pub async fn run(mut self) -> Result<(), D::Error> {
        self.driver.render(&self.inbox.view())?;

        loop {
            if self.process_cycle().await? {
                break;
            }
        }

        let actions = self.inbox.close();
        self.execute(actions).await?;
        self.driver.stop();
        Ok(())
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll input or render.
    pub async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let mut busy = false;

        if let Some(input) = self.driver.poll_input().await? {
            busy = true;
            let actions = match input {
                UserInput::Quit => return Ok(true),
                UserInput::Open { conversation_id } => self.inbox.open(&conversation_id),
                UserInput::Close => self.inbox.handle(ConversationEvent::Close),
                UserInput::InputChanged { draft } => {
                    self.inbox.handle(ConversationEvent::InputChanged { draft })
                },
                UserInput::Submit { content, attachments } => {
                    self.inbox.handle(ConversationEvent::Submit { content, attachments })
                },
                UserInput::Visible { ids } => {
                    self.inbox.handle(ConversationEvent::MessagesVisible { ids })
                },
            };
            self.execute(actions).await?;
        }

        let status = self.driver.status();
        if status != self.inbox.channel_status() {
            busy = true;
            tracing::debug!(?status, "channel status changed");
            let actions = self.inbox.handle(ConversationEvent::ChannelStatusChanged(status));
            self.execute(actions).await?;
        }

        if status.is_connected()
            && let Some(envelope) = self.driver.recv_envelope().await
        {
            busy = true;
            let actions = self.inbox.handle(ConversationEvent::EnvelopeReceived(envelope));
            self.execute(actions).await?;
        }

        let now = self.driver.now();
        let actions = self.inbox.handle(ConversationEvent::Tick { now });
        self.execute(actions).await?;

        if !busy {
            self.env.sleep(self.idle_interval).await;
        }
        Ok(false)
    }

    /// Execute actions, feeding send outcomes back until none remain.
    async fn execute(&mut self, actions: Vec<ConversationAction>) -> Result<(), D::Error> {
        let mut pending: VecDeque<_> = actions.into();
        let mut render = false;

        while let Some(action) = pending.pop_front() {
            match action {
                ConversationAction::Render => render = true,
                ConversationAction::Send(Outbound { ticket, envelope }) => {
                    let outcome = match self.driver.send_envelope(envelope).await {
                        Ok(()) => SendOutcome::Accepted,
                        Err(e) if !self.driver.status().is_connected() => {
                            tracing::debug!(%ticket, error = %e, "channel unavailable");
                            SendOutcome::Unavailable
                        },
                        Err(e) => {
                            tracing::warn!(%ticket, error = %e, "send failed");
                            SendOutcome::Rejected { reason: e.to_string() }
                        },
                    };
                    let completed = ConversationEvent::SendCompleted { ticket, outcome };
                    pending.extend(self.inbox.handle(completed));
                },
            }
        }

        if render {
            self.driver.render(&self.inbox.view())?;
        }
        Ok(())
    }

    /// Get a reference to the Inbox
    pub fn inbox(&self) -> &Inbox<E> {
        &self.inbox
    }

    /// Get a mutable reference to the Inbox
    pub fn inbox_mut(&mut self) -> &mut Inbox<E> {
        &mut self.inbox
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Get a mutable reference to the Driver
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}
