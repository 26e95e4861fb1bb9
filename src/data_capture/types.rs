//! Common data types used across the data_capture subsystem.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the two well-known process output channels.
///
/// The declaration order is the merge priority: when two channels hold a
/// record with the same timestamp, `Output` sorts before `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Ordinary output (stdout).
    Output,
    /// Error output (stderr).
    Error,
}

impl Channel {
    pub const ALL: [Channel; 2] = [Channel::Output, Channel::Error];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Output => "stdout",
            Channel::Error => "stderr",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single captured write.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Record {
    /// Nanoseconds since the process capture epoch, unique per session.
    pub timestamp: u64,
    pub text: String,
}

/// One fragment of a merged capture, tagged with the channel it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub timestamp: u64,
    pub channel: Channel,
    pub text: String,
}

/// Chronological, channel-tagged dump of a capture session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub session_id: Uuid,
    pub entries: Vec<TranscriptEntry>,
}

/// Aggregated figures about a capture session.
#[derive(Debug, Clone)]
pub struct CaptureSummary {
    /// The related session identifier
    pub session_id: Uuid,
    /// Wall-clock time the session started capturing
    pub started_at: Option<DateTime<Utc>>,
    /// Time spent capturing (up to now while the session is still active)
    pub duration: Duration,
    /// Number of recorded fragments on the output channel
    pub output_fragments: usize,
    /// Number of recorded fragments on the error channel
    pub error_fragments: usize,
    /// Total number of bytes recorded across channels
    pub total_bytes: u64,
    /// Number of writer references that were substituted
    pub redirections: usize,
}
