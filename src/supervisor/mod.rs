// Supervisor Module - Miner process lifecycle
//
// One dispatcher thread owns every child process; everything else talks
// to it through the event channel via SupervisorHandle.

pub mod core;
pub mod events;
pub mod record;

pub use self::core::{start_supervisor, SupervisorConfig, SupervisorHandle};
pub use events::{MinerSnapshot, StartError};
pub use record::MinerState;
