// Durable Log File
//
// Append-only text log using singleton pattern for the resolved path.
// Logging must never interrupt process supervision: every error in here
// is swallowed at the point of occurrence.

use chrono::Local;
use once_cell::sync::Lazy;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::settings::portable_dir;

const LOG_FILE_NAME: &str = "miner-panel.log";

/// Resolved log path, computed once at first use
static LOG_PATH: Lazy<PathBuf> = Lazy::new(resolve_log_path);

fn resolve_log_path() -> PathBuf {
    // Portable mode keeps the log beside the executable (useful for zipping
    // and sharing a whole folder)
    if let Some(dir) = portable_dir() {
        return dir.join(LOG_FILE_NAME);
    }

    match dirs::data_dir() {
        Some(base) => {
            let dir = base.join("miner-panel");
            let _ = std::fs::create_dir_all(&dir);
            dir.join(LOG_FILE_NAME)
        }
        None => PathBuf::from(LOG_FILE_NAME),
    }
}

/// Path of the durable log file
pub fn log_path() -> &'static Path {
    &LOG_PATH
}

/// Append one timestamped line to the durable log (best-effort)
pub fn log_to_file(msg: &str) {
    append_line(log_path(), msg);
}

fn append_line(path: &Path, msg: &str) {
    let ts = Local::now().format("%Y-%m-%d %H:%M:%S");
    let result = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| writeln!(f, "{} {}", ts, msg));
    // Never let logging crash supervision
    let _ = result;
}
