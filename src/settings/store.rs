// Settings Store
//
// On-disk settings document: path resolution (portable mode aware), load
// with versioned migration, validation of the miner-id invariants, save.

use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::schema::{Settings, SETTINGS_VERSION};

const SETTINGS_FILE_NAME: &str = "miner-panel.settings.json";
const PORTABLE_MARKERS: [&str; 3] = ["portable.flag", "portable.txt", "portable_mode"];

/// Folder containing the running executable
pub fn app_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the executable's folder when portable mode is active.
///
/// Portable mode stores settings and logs next to the executable. Enabled by
/// a marker file beside the executable, the MINER_PANEL_PORTABLE environment
/// variable, or a settings file that already lives there.
pub fn portable_dir() -> Option<PathBuf> {
    let dir = app_dir();

    if let Ok(env) = std::env::var("MINER_PANEL_PORTABLE") {
        if matches!(env.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "y" | "on") {
            return Some(dir);
        }
    }

    for marker in PORTABLE_MARKERS {
        if dir.join(marker).exists() {
            return Some(dir);
        }
    }

    if dir.join(SETTINGS_FILE_NAME).exists() {
        return Some(dir);
    }

    None
}

/// Path of the settings document
pub fn settings_path() -> PathBuf {
    if let Some(dir) = portable_dir() {
        return dir.join(SETTINGS_FILE_NAME);
    }

    match dirs::data_dir() {
        Some(base) => {
            let dir = base.join("miner-panel");
            let _ = std::fs::create_dir_all(&dir);
            dir.join(SETTINGS_FILE_NAME)
        }
        None => PathBuf::from(SETTINGS_FILE_NAME),
    }
}

/// Load settings from disk, migrating older documents.
///
/// Unreadable or corrupt files fall back to the defaults instead of failing;
/// the configuration surface must always come up.
pub fn load_settings(path: &Path) -> Settings {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => return validate(Settings::default()),
    };

    let value: Value = match serde_json::from_str(&raw) {
        Ok(v) => v,
        Err(e) => {
            println!("[Settings] Unparseable settings file, using defaults: {}", e);
            return validate(Settings::default());
        }
    };

    let migrated = migrate_settings(value);

    match serde_json::from_value::<Settings>(migrated) {
        Ok(settings) => validate(settings),
        Err(e) => {
            println!("[Settings] Invalid settings document, using defaults: {}", e);
            validate(Settings::default())
        }
    }
}

/// Write the settings document as pretty JSON
pub fn save_settings(path: &Path, settings: &Settings) -> std::io::Result<()> {
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)
}

/// Bring an older settings document up to the current version.
///
/// v1 -> v2: ScriptFolder ("BAT") miners used to point `path` at either a
/// script file or a folder; fold a file path into its containing folder and
/// mark the file active.
fn migrate_settings(mut value: Value) -> Value {
    let version = value.get("version").and_then(Value::as_u64).unwrap_or(1) as u32;

    if version < 2 {
        migrate_v1_to_v2(&mut value);
    }

    if let Some(obj) = value.as_object_mut() {
        obj.insert("version".to_string(), Value::from(SETTINGS_VERSION));
    }
    value
}

fn migrate_v1_to_v2(value: &mut Value) {
    let miners = match value.get_mut("miners").and_then(Value::as_array_mut) {
        Some(miners) => miners,
        None => return,
    };

    for miner in miners {
        let kind = miner
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("EXE")
            .trim()
            .to_uppercase();
        if kind != "BAT" {
            continue;
        }

        // Legacy documents kept the folder in either "scripts_dir" or "path"
        let raw_path = miner
            .get("scripts_dir")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .or_else(|| miner.get("path").and_then(Value::as_str))
            .unwrap_or("")
            .trim()
            .to_string();

        let mut folder = raw_path.clone();
        let mut active: Vec<String> = miner
            .get("active_scripts")
            .and_then(Value::as_array)
            .map(|a| {
                a.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let p = Path::new(&raw_path);
        if !raw_path.is_empty() && p.is_file() {
            if let (Some(parent), Some(name)) = (p.parent(), p.file_name()) {
                folder = parent.to_string_lossy().into_owned();
                if active.is_empty() {
                    active.push(name.to_string_lossy().into_owned());
                }
            }
        }

        if let Some(obj) = miner.as_object_mut() {
            obj.insert("path".to_string(), Value::from(folder));
            obj.insert(
                "active_scripts".to_string(),
                Value::from(active),
            );
            obj.remove("scripts_dir");
        }
    }
}

/// Drop definitions that violate the id invariants (empty or duplicate ids)
fn validate(mut settings: Settings) -> Settings {
    let mut seen: HashSet<String> = HashSet::new();
    settings.miners.retain(|m| {
        let id = m.id.trim();
        if id.is_empty() {
            println!("[Settings] Dropping miner definition with empty id");
            return false;
        }
        if !seen.insert(id.to_string()) {
            println!("[Settings] Dropping duplicate miner definition: {}", id);
            return false;
        }
        true
    });
    settings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::schema::MinerKind;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings(&dir.path().join("nope.json"));
        assert_eq!(settings.version, SETTINGS_VERSION);
        assert!(settings.find_miner("xmrig").is_some());
    }

    #[test]
    fn test_load_corrupt_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "s.json", "{not json");
        let settings = load_settings(&path);
        assert_eq!(settings.miners.len(), 3);
    }

    #[test]
    fn test_save_and_reload_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s.json");

        let mut settings = Settings::default();
        settings.ui.single_active = true;
        settings.xmrig.pool = "pool.example:3333".to_string();
        save_settings(&path, &settings).unwrap();

        let reloaded = load_settings(&path);
        assert!(reloaded.ui.single_active);
        assert_eq!(reloaded.xmrig.pool, "pool.example:3333");
    }

    #[test]
    fn test_migration_folds_script_file_into_folder() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_file(dir.path(), "run.bat", "echo hi");

        let doc = format!(
            r#"{{
                "miners": [{{
                    "id": "wildrig",
                    "name": "WildRig",
                    "type": "BAT",
                    "path": {script:?},
                    "args": "",
                    "workdir": "",
                    "kill_names": ["wildrig.exe"],
                    "enabled": true
                }}]
            }}"#,
            script = script.to_string_lossy()
        );
        let path = write_file(dir.path(), "s.json", &doc);

        let settings = load_settings(&path);
        let m = settings.find_miner("wildrig").unwrap();
        assert_eq!(m.kind, MinerKind::ScriptFolder);
        assert_eq!(m.entry_path, dir.path().to_string_lossy());
        assert_eq!(m.active_scripts, vec!["run.bat".to_string()]);
    }

    #[test]
    fn test_validation_drops_duplicate_and_empty_ids() {
        let doc = r#"{
            "version": 2,
            "miners": [
                {"id": "a", "name": "A"},
                {"id": "a", "name": "A again"},
                {"id": "", "name": "anonymous"},
                {"id": "b", "name": "B"}
            ]
        }"#;
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(dir.path(), "s.json", doc);

        let settings = load_settings(&path);
        let ids: Vec<&str> = settings.miners.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
