//! vowchat transcript replay.
//!
//! # Usage
//!
//! ```bash
//! # Replay a bug report and print the final conversation view
//! vowchat-replay report.jsonl --conversation conv-1 --participant vendor-7
//!
//! # Also print every envelope the client sent, one per line
//! vowchat-replay report.jsonl --conversation conv-1 --participant vendor-7 --sends
//! ```

use std::{
    fs::File,
    io::{BufReader, Write},
    path::PathBuf,
    time::Duration,
};

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use vowchat_client::{ClientIdentity, ConversationConfig};
use vowchat_replay::{Replay, ReplayError, parse};

/// vowchat transcript replay
#[derive(Parser, Debug)]
#[command(name = "vowchat-replay")]
#[command(about = "Replay a JSON-lines Channel transcript through a conversation")]
#[command(version)]
struct Args {
    /// Transcript file (one step per line)
    transcript: PathBuf,

    /// Signed-in user id
    #[arg(short, long, default_value = "user-1")]
    user: String,

    /// Conversation id
    #[arg(short, long)]
    conversation: String,

    /// The other participant's id
    #[arg(short, long)]
    participant: String,

    /// Wall-clock time of the first step (RFC 3339)
    #[arg(long, default_value = "2026-01-18T09:00:00Z")]
    start: String,

    /// Local typing inactivity timeout in milliseconds
    #[arg(long, default_value = "3000")]
    local_typing_ms: u64,

    /// Peer typing indicator lifetime in milliseconds
    #[arg(long, default_value = "5000")]
    peer_typing_ms: u64,

    /// Bounded wait for queued or in-flight messages in milliseconds
    #[arg(long, default_value = "10000")]
    send_timeout_ms: u64,

    /// Capacity of the parked status transition buffer
    #[arg(long, default_value = "256")]
    max_parked: usize,

    /// Print accepted envelopes before the view
    #[arg(long)]
    sends: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

impl Args {
    fn config(&self) -> ConversationConfig {
        ConversationConfig {
            local_typing_timeout: Duration::from_millis(self.local_typing_ms),
            peer_typing_timeout: Duration::from_millis(self.peer_typing_ms),
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            max_parked_transitions: self.max_parked,
        }
    }

    fn start(&self) -> Result<DateTime<Utc>, ReplayError> {
        DateTime::parse_from_rfc3339(&self.start)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|source| ReplayError::StartTime { value: self.start.clone(), source })
    }
}

fn main() -> Result<(), ReplayError> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let file = File::open(&args.transcript)
        .map_err(|source| ReplayError::Read { path: args.transcript.clone(), source })?;
    let steps = parse(BufReader::new(file))?;
    tracing::info!(steps = steps.len(), path = %args.transcript.display(), "transcript loaded");

    let mut replay = Replay::new(
        ClientIdentity::new(args.user.as_str()),
        &args.conversation,
        &args.participant,
        args.config(),
        args.start()?,
    );
    replay.run(steps);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if args.sends {
        for envelope in replay.sent() {
            serde_json::to_writer(&mut out, envelope)?;
            writeln!(out)?;
        }
    }
    serde_json::to_writer_pretty(&mut out, &replay.view())?;
    writeln!(out)?;

    Ok(())
}
