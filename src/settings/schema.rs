// Settings Schema
//
// Strongly-typed settings document. All fields carry serde defaults so that
// older or hand-edited files load cleanly; the store module fills in the
// rest and enforces the miner-id invariants.

use serde::{Deserialize, Serialize};

/// Current settings document version. Bump together with a migration step
/// in `store::migrate_settings`.
pub const SETTINGS_VERSION: u32 = 2;

/// How a miner definition is launched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinerKind {
    /// A directly runnable executable file
    #[serde(rename = "EXE")]
    Executable,
    /// A folder of scripts run through the platform command interpreter
    #[serde(rename = "BAT")]
    ScriptFolder,
}

impl Default for MinerKind {
    fn default() -> Self {
        MinerKind::Executable
    }
}

/// One configured external miner program
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MinerDefinition {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: MinerKind,
    /// Executable file for `Executable`, scripts folder for `ScriptFolder`
    #[serde(rename = "path")]
    pub entry_path: String,
    /// Argument template; may contain placeholder tokens
    pub args: String,
    /// Working directory override; empty means "entry's containing folder"
    pub workdir: String,
    /// Executable base-names used by the kill-by-name fallback sweep
    pub kill_names: Vec<String>,
    pub enabled: bool,
    /// Script filenames marked as selectable run targets (ScriptFolder only)
    pub active_scripts: Vec<String>,
}

impl Default for MinerDefinition {
    fn default() -> Self {
        MinerDefinition {
            id: String::new(),
            name: String::new(),
            kind: MinerKind::Executable,
            entry_path: String::new(),
            args: String::new(),
            workdir: String::new(),
            kill_names: Vec::new(),
            enabled: true,
            active_scripts: Vec::new(),
        }
    }
}

/// UI-facing options the core consumes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    /// When set, starting one miner stops every other running miner first
    pub single_active: bool,
    pub tray_enabled: bool,
    pub tray_show_hashrate: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        UiSettings {
            single_active: false,
            tray_enabled: true,
            tray_show_hashrate: true,
        }
    }
}

/// Pool fields for the designated auto-config miner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct XmrigSettings {
    pub auto_config: bool,
    pub pool: String,
    pub wallet: String,
    pub worker: String,
    #[serde(rename = "pass")]
    pub password: String,
    /// Extra argument tail appended to the template before expansion
    pub extra: String,
}

impl Default for XmrigSettings {
    fn default() -> Self {
        XmrigSettings {
            auto_config: true,
            pool: String::new(),
            wallet: String::new(),
            worker: String::new(),
            password: "x".to_string(),
            extra: String::new(),
        }
    }
}

/// Root settings document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: u32,
    pub ui: UiSettings,
    pub miners: Vec<MinerDefinition>,
    pub xmrig: XmrigSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            version: SETTINGS_VERSION,
            ui: UiSettings::default(),
            miners: default_miners(),
            xmrig: XmrigSettings::default(),
        }
    }
}

impl Settings {
    /// Look up an enabled miner definition by id
    pub fn find_miner(&self, miner_id: &str) -> Option<&MinerDefinition> {
        self.miners
            .iter()
            .find(|m| m.enabled && m.id == miner_id)
    }

    pub fn find_miner_mut(&mut self, miner_id: &str) -> Option<&mut MinerDefinition> {
        self.miners
            .iter_mut()
            .find(|m| m.enabled && m.id == miner_id)
    }
}

#[cfg(windows)]
const DEFAULT_XMRIG_PATH: &str = "miners/xmrig/xmrig.exe";
#[cfg(not(windows))]
const DEFAULT_XMRIG_PATH: &str = "miners/xmrig/xmrig";

/// Stock miner definitions shipped with a fresh settings file
pub fn default_miners() -> Vec<MinerDefinition> {
    vec![
        MinerDefinition {
            id: "xmrig".to_string(),
            name: "XMRig".to_string(),
            kind: MinerKind::Executable,
            entry_path: DEFAULT_XMRIG_PATH.to_string(),
            args: "--config {XMRIG_CONFIG_NAME}".to_string(),
            kill_names: vec!["xmrig.exe".to_string()],
            ..MinerDefinition::default()
        },
        MinerDefinition {
            id: "wildrig".to_string(),
            name: "WildRig".to_string(),
            kind: MinerKind::ScriptFolder,
            kill_names: vec!["wildrig.exe".to_string()],
            ..MinerDefinition::default()
        },
        MinerDefinition {
            id: "rigel".to_string(),
            name: "Rigel".to_string(),
            kind: MinerKind::ScriptFolder,
            kill_names: vec!["rigel.exe".to_string()],
            ..MinerDefinition::default()
        },
    ]
}
