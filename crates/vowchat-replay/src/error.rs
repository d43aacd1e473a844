//! Replay error types.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that stop a replay.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// The transcript could not be read.
    #[error("cannot read transcript {path}: {source}")]
    Read {
        /// Transcript path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A transcript line is not a valid step.
    #[error("line {line}: {source}")]
    Step {
        /// One-based line number.
        line: usize,
        /// Decoder error.
        source: serde_json::Error,
    },

    /// The start time is not RFC 3339.
    #[error("invalid start time {value:?}: {source}")]
    StartTime {
        /// Value given on the command line.
        value: String,
        /// Parser error.
        source: chrono::ParseError,
    },

    /// Reading the transcript or writing the view failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The view could not be serialized.
    #[error("cannot serialize view: {0}")]
    Serialize(#[from] serde_json::Error),
}
