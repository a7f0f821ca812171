// MinerPanel Type Definitions
//
// Shared data structures used throughout the application: the status values
// surfaced to the presentation layer, styled output lines produced by the
// output pipeline, and the display-sink interface the supervisor writes to.

use serde::Serialize;
use std::fmt;

/// Status of one miner identity as shown to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MinerStatus {
    Idle,
    Running,
    Paused,
    Error,
}

impl fmt::Display for MinerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MinerStatus::Idle => "Idle",
            MinerStatus::Running => "Running",
            MinerStatus::Paused => "Paused",
            MinerStatus::Error => "Error",
        };
        write!(f, "{}", s)
    }
}

/// One run of text with an optional foreground color (hex, e.g. "#44ff44")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyledSpan {
    pub text: String,
    pub color: Option<String>,
}

/// One output line rendered by the pipeline
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    pub fn plain(text: impl Into<String>) -> Self {
        StyledLine {
            spans: vec![StyledSpan { text: text.into(), color: None }],
        }
    }

    pub fn colored(text: impl Into<String>, color: impl Into<String>) -> Self {
        StyledLine {
            spans: vec![StyledSpan { text: text.into(), color: Some(color.into()) }],
        }
    }

    /// Concatenated text with all styling removed
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Last-known hashrate reading for one miner (no TTL; overwritten on match)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HashrateSample {
    pub value: String,
    pub unit: String,
}

impl fmt::Display for HashrateSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Interface the core uses to talk to the presentation layer.
///
/// Implementations must never fail loudly; rendering problems are the
/// frontend's business and must not interrupt process supervision.
pub trait DisplaySink: Send + Sync {
    /// Append one styled line to the given miner's output view
    fn append_styled_line(&self, miner_id: &str, line: &StyledLine);

    /// Append one plain, identity-prefixed line to the global output view
    fn append_global_line(&self, line: &str);

    /// Reflect a supervisor state change for one miner
    fn set_status(&self, miner_id: &str, status: MinerStatus, detail: &str);
}
