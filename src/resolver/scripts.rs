// Script Selection
//
// Resolves which script file a ScriptFolder miner should run

use std::path::{Path, PathBuf};

use super::ResolveError;

#[cfg(windows)]
pub const SCRIPT_EXTENSION: &str = "bat";
#[cfg(not(windows))]
pub const SCRIPT_EXTENSION: &str = "sh";

/// Outcome of script selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSelection {
    pub path: PathBuf,
    /// Script that was auto-marked active and should be persisted
    pub newly_activated: Option<String>,
}

/// List the runnable scripts in a folder, sorted by filename
pub fn list_scripts(folder: &Path) -> Vec<PathBuf> {
    let mut scripts: Vec<PathBuf> = match std::fs::read_dir(folder) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .map(|ext| ext.eq_ignore_ascii_case(SCRIPT_EXTENSION))
                        .unwrap_or(false)
            })
            .collect(),
        Err(_) => Vec::new(),
    };
    scripts.sort();
    scripts
}

/// Pick the script to run.
///
/// Rules:
///   - exactly one active script: use it
///   - several active: `choice` must name one of them
///   - none active: a folder with exactly one script auto-selects it
///     (reported for persistence), otherwise `choice` picks from all
/// Active entries naming files that no longer exist are dropped silently.
pub fn choose_script(
    folder: &Path,
    active: &[String],
    choice: Option<&str>,
) -> Result<ScriptSelection, ResolveError> {
    let scripts = list_scripts(folder);
    if scripts.is_empty() {
        return Err(ResolveError::NoScripts(folder.to_path_buf()));
    }

    let names: Vec<String> = scripts
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();

    let active: Vec<&String> = active
        .iter()
        .filter(|a| names.iter().any(|n| n == *a))
        .collect();

    let by_name = |name: &str| -> Option<PathBuf> {
        names
            .iter()
            .position(|n| n == name)
            .map(|i| scripts[i].clone())
    };

    match active.len() {
        1 => match by_name(active[0]) {
            Some(path) => Ok(ScriptSelection { path, newly_activated: None }),
            None => Err(ResolveError::ScriptChoiceRequired(names)),
        },
        n if n > 1 => {
            let candidates: Vec<String> = active.iter().map(|a| a.to_string()).collect();
            match choice.and_then(|c| candidates.iter().any(|a| a == c).then(|| by_name(c)).flatten()) {
                Some(path) => Ok(ScriptSelection { path, newly_activated: None }),
                None => Err(ResolveError::ScriptChoiceRequired(candidates)),
            }
        }
        _ => {
            // Nothing active yet
            if scripts.len() == 1 {
                return Ok(ScriptSelection {
                    path: scripts[0].clone(),
                    newly_activated: Some(names[0].clone()),
                });
            }
            match choice.and_then(|c| by_name(c).map(|p| (c.to_string(), p))) {
                Some((name, path)) => Ok(ScriptSelection { path, newly_activated: Some(name) }),
                None => Err(ResolveError::ScriptChoiceRequired(names)),
            }
        }
    }
}
