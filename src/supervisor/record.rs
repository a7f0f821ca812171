// Supervisor Records
//
// Per-miner bookkeeping owned exclusively by the supervisor thread.

use std::collections::HashMap;
use std::fmt;
use std::process::Child;

use crate::types::MinerStatus;

/// Lifecycle state of one miner identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinerState {
    Idle,
    Starting,
    Running,
    Paused,
    Stopping,
    Exited,
    Errored,
}

impl MinerState {
    /// Whether this state owns a live child process
    pub fn is_active(self) -> bool {
        matches!(
            self,
            MinerState::Starting | MinerState::Running | MinerState::Paused | MinerState::Stopping
        )
    }

    /// The coarser status surfaced to the presentation layer
    pub fn status(self) -> MinerStatus {
        match self {
            MinerState::Idle | MinerState::Exited => MinerStatus::Idle,
            MinerState::Starting | MinerState::Running | MinerState::Stopping => {
                MinerStatus::Running
            }
            MinerState::Paused => MinerStatus::Paused,
            MinerState::Errored => MinerStatus::Error,
        }
    }
}

impl fmt::Display for MinerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MinerState::Idle => "Idle",
            MinerState::Starting => "Starting",
            MinerState::Running => "Running",
            MinerState::Paused => "Paused",
            MinerState::Stopping => "Stopping",
            MinerState::Exited => "Exited",
            MinerState::Errored => "Errored",
        };
        write!(f, "{}", s)
    }
}

/// Supervisor-side record for one miner identity
pub struct ProcessRecord {
    pub state: MinerState,
    pub child: Option<Child>,
    pub pid: Option<u32>,
    /// Launch counter; stamped into async events so stale timer and EOF
    /// events from an earlier run are recognized and dropped
    pub generation: u64,
    pub last_error: Option<String>,
}

impl ProcessRecord {
    pub fn new() -> Self {
        ProcessRecord {
            state: MinerState::Idle,
            child: None,
            pid: None,
            generation: 0,
            last_error: None,
        }
    }
}

impl Default for ProcessRecord {
    fn default() -> Self {
        ProcessRecord::new()
    }
}

/// Fetch-or-create a record for a miner id
pub fn record_for<'a>(
    records: &'a mut HashMap<String, ProcessRecord>,
    miner_id: &str,
) -> &'a mut ProcessRecord {
    records
        .entry(miner_id.to_string())
        .or_insert_with(ProcessRecord::new)
}
