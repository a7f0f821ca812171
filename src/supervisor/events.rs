// Supervisor Events
//
// Everything the supervisor thread reacts to arrives as one of these
// messages on a single channel: frontend commands, output-reader data,
// stream-closed notices and escalation timer ticks.

use std::sync::mpsc::Sender;
use thiserror::Error;

use crate::resolver::ResolveError;
use crate::supervisor::record::MinerState;
use crate::types::HashrateSample;
use crate::xmrig::ConfigError;

/// Why a start request was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StartError {
    #[error("unknown miner: {0}")]
    UnknownMiner(String),
    #[error("already running")]
    AlreadyRunning,
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("launch failed: {0}")]
    Launch(String),
    #[error("supervisor is not running")]
    Unavailable,
}

/// One miner's row in a status snapshot
#[derive(Debug, Clone)]
pub struct MinerSnapshot {
    pub id: String,
    pub name: String,
    pub state: MinerState,
    pub pid: Option<u32>,
    pub last_error: Option<String>,
    pub hashrate: Option<HashrateSample>,
}

/// Frontend requests, synchronous where a reply matters
pub enum SupervisorCommand {
    Start {
        miner_id: String,
        script_choice: Option<String>,
        reply: Sender<Result<(), StartError>>,
    },
    Stop { miner_id: String },
    Kill { miner_id: String },
    Pause { miner_id: String },
    Resume { miner_id: String },
    Status { reply: Sender<Vec<MinerSnapshot>> },
    Hashrate {
        miner_id: String,
        reply: Sender<Option<HashrateSample>>,
    },
    Shutdown,
}

/// Messages on the supervisor's single event channel
pub enum SupervisorEvent {
    Command(SupervisorCommand),
    /// One read's worth of merged child output
    Output { miner_id: String, bytes: Vec<u8> },
    /// The child's stdout reached EOF; the process is gone or going
    StreamClosed { miner_id: String, generation: u64 },
    /// The graceful-stop grace period elapsed
    Escalation { miner_id: String, generation: u64 },
    /// A waiter thread reaped a child that had outlived its output
    ProcessExited {
        miner_id: String,
        generation: u64,
        status: Option<std::process::ExitStatus>,
    },
}
