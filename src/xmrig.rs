// Generated XMRig Config
//
// Synthesizes config.generated.json beside the XMRig executable from the
// pool/wallet/worker/password fields, overwriting any prior file.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::settings::XmrigSettings;

pub const GENERATED_CONFIG_NAME: &str = "config.generated.json";

/// Identity of the designated auto-config miner
pub const DESIGNATED_MINER_ID: &str = "xmrig";

/// Whether a miner id names the designated auto-config miner
pub fn is_designated(miner_id: &str) -> bool {
    miner_id.eq_ignore_ascii_case(DESIGNATED_MINER_ID)
}

/// Validation failures reported back for user-facing correction
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("pool address is required")]
    MissingPool,
    #[error("wallet/user is required")]
    MissingWallet,
    #[error("failed to write {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },
}

#[derive(Debug, Serialize)]
struct GeneratedConfig {
    autosave: bool,
    cpu: bool,
    opencl: bool,
    cuda: bool,
    pools: Vec<PoolEntry>,
}

#[derive(Debug, Serialize)]
struct PoolEntry {
    url: String,
    user: String,
    pass: String,
    keepalive: bool,
    tls: bool,
}

/// Path where the generated config lands for a given executable
pub fn generated_config_path(exe_dir: &Path) -> PathBuf {
    exe_dir.join(GENERATED_CONFIG_NAME)
}

/// Write the generated config beside the executable.
///
/// Worker name, when present, is appended to the wallet with a dot; a blank
/// password falls back to "x". CPU mining is enabled, GPU backends are not.
pub fn write_generated_config(
    settings: &XmrigSettings,
    exe_dir: &Path,
) -> Result<PathBuf, ConfigError> {
    let pool = settings.pool.trim();
    let wallet = settings.wallet.trim();
    let worker = settings.worker.trim();
    let password = match settings.password.trim() {
        "" => "x",
        p => p,
    };

    if pool.is_empty() {
        return Err(ConfigError::MissingPool);
    }
    if wallet.is_empty() {
        return Err(ConfigError::MissingWallet);
    }

    let user = if worker.is_empty() {
        wallet.to_string()
    } else {
        format!("{}.{}", wallet, worker)
    };

    let config = GeneratedConfig {
        autosave: true,
        cpu: true,
        opencl: false,
        cuda: false,
        pools: vec![PoolEntry {
            url: pool.to_string(),
            user,
            pass: password.to_string(),
            keepalive: true,
            tls: false,
        }],
    };

    let path = generated_config_path(exe_dir);
    let json = serde_json::to_string_pretty(&config).map_err(|e| ConfigError::WriteFailed {
        path: path.clone(),
        message: e.to_string(),
    })?;
    std::fs::write(&path, json).map_err(|e| ConfigError::WriteFailed {
        path: path.clone(),
        message: e.to_string(),
    })?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(pool: &str, wallet: &str, worker: &str, password: &str) -> XmrigSettings {
        XmrigSettings {
            auto_config: true,
            pool: pool.to_string(),
            wallet: wallet.to_string(),
            worker: worker.to_string(),
            password: password.to_string(),
            extra: String::new(),
        }
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_worker_appended_to_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings("pool.example:3333", "WALLET1", "rig1", "x");

        let path = write_generated_config(&s, dir.path()).unwrap();
        assert_eq!(path, dir.path().join(GENERATED_CONFIG_NAME));

        let doc = read_json(&path);
        let pool = &doc["pools"][0];
        assert_eq!(pool["url"], "pool.example:3333");
        assert_eq!(pool["user"], "WALLET1.rig1");
        assert_eq!(pool["keepalive"], true);
        assert_eq!(pool["tls"], false);
    }

    #[test]
    fn test_no_worker_keeps_bare_wallet() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings("pool.example:3333", "WALLET1", "", "secret");

        let path = write_generated_config(&s, dir.path()).unwrap();
        let doc = read_json(&path);
        assert_eq!(doc["pools"][0]["user"], "WALLET1");
        assert_eq!(doc["pools"][0]["pass"], "secret");
    }

    #[test]
    fn test_blank_password_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings("pool.example:3333", "WALLET1", "", "  ");

        let path = write_generated_config(&s, dir.path()).unwrap();
        let doc = read_json(&path);
        assert_eq!(doc["pools"][0]["pass"], "x");
    }

    #[test]
    fn test_backend_flags() {
        let dir = tempfile::tempdir().unwrap();
        let s = settings("pool.example:3333", "W", "", "x");

        let path = write_generated_config(&s, dir.path()).unwrap();
        let doc = read_json(&path);
        assert_eq!(doc["autosave"], true);
        assert_eq!(doc["cpu"], true);
        assert_eq!(doc["opencl"], false);
        assert_eq!(doc["cuda"], false);
    }

    #[test]
    fn test_missing_fields_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            write_generated_config(&settings("", "W", "", "x"), dir.path()),
            Err(ConfigError::MissingPool)
        );
        assert_eq!(
            write_generated_config(&settings("pool:1", "", "", "x"), dir.path()),
            Err(ConfigError::MissingWallet)
        );
    }

    #[test]
    fn test_prior_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let path = generated_config_path(dir.path());
        std::fs::write(&path, "{\"stale\": true}").unwrap();

        write_generated_config(&settings("pool:1", "W", "", "x"), dir.path()).unwrap();
        let doc = read_json(&path);
        assert!(doc.get("stale").is_none());
        assert_eq!(doc["cpu"], true);
    }

    #[test]
    fn test_is_designated_case_insensitive() {
        assert!(is_designated("xmrig"));
        assert!(is_designated("XMRig"));
        assert!(!is_designated("wildrig"));
    }
}
