// Argument & Path Resolver
//
// Turns a miner definition plus placeholder values into a concrete
// executable path, an ordered argument list and a working directory.
// No side effects beyond filesystem existence checks.

pub mod placeholder;
pub mod scripts;

pub use placeholder::{expand_env_vars, expand_placeholders};
pub use scripts::{choose_script, list_scripts, ScriptSelection, SCRIPT_EXTENSION};

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::settings::{MinerDefinition, MinerKind};

/// Why a definition could not be resolved into a launch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("no path configured")]
    NotConfigured,
    #[error("entry not found: {0}")]
    NotFound(PathBuf),
    #[error("no runnable scripts in {0}")]
    NoScripts(PathBuf),
    #[error("a script choice is required (candidates: {0:?})")]
    ScriptChoiceRequired(Vec<String>),
    #[error("command interpreter not found")]
    NoInterpreter,
    #[error("bad argument quoting: {0}")]
    BadArguments(String),
}

/// Everything needed to spawn a child process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLaunch {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub workdir: PathBuf,
    /// Script that was auto-marked active and should be persisted
    pub newly_activated: Option<String>,
}

/// Inputs for placeholder substitution
#[derive(Debug, Clone, Default)]
pub struct PlaceholderContext {
    pub app_dir: PathBuf,
    /// Path of the just-written generated config, for the designated miner
    pub generated_config: Option<PathBuf>,
    /// Extra argument tail appended to the template before expansion
    pub extra_args: Option<String>,
}

/// Resolve a definition into a concrete launch.
///
/// `script_choice` disambiguates ScriptFolder definitions with several
/// candidate scripts; it is ignored for Executable definitions.
pub fn resolve(
    definition: &MinerDefinition,
    ctx: &PlaceholderContext,
    script_choice: Option<&str>,
) -> Result<ResolvedLaunch, ResolveError> {
    if definition.entry_path.trim().is_empty() {
        return Err(ResolveError::NotConfigured);
    }

    match definition.kind {
        MinerKind::Executable => resolve_executable(definition, ctx),
        MinerKind::ScriptFolder => resolve_script(definition, ctx, script_choice),
    }
}

/// Absolute path of an Executable definition's entry, resolved against the
/// application base directory; checked for existence.
pub fn locate_executable(
    definition: &MinerDefinition,
    app_dir: &Path,
) -> Result<PathBuf, ResolveError> {
    let raw = definition.entry_path.trim();
    if raw.is_empty() {
        return Err(ResolveError::NotConfigured);
    }

    let mut path = PathBuf::from(raw);
    if path.is_relative() {
        path = app_dir.join(path);
    }
    if !path.exists() {
        return Err(ResolveError::NotFound(path));
    }
    Ok(path)
}

fn resolve_executable(
    definition: &MinerDefinition,
    ctx: &PlaceholderContext,
) -> Result<ResolvedLaunch, ResolveError> {
    let program = locate_executable(definition, &ctx.app_dir)?;

    let mut template = definition.args.trim().to_string();
    if let Some(extra) = ctx.extra_args.as_deref() {
        let extra = extra.trim();
        if !extra.is_empty() {
            if !template.is_empty() {
                template.push(' ');
            }
            template.push_str(extra);
        }
    }

    let expanded = expand_placeholders(&template, &ctx.app_dir, ctx.generated_config.as_deref());
    let args = split_args(&expanded)?;
    let workdir = resolve_workdir(&definition.workdir, &program);

    Ok(ResolvedLaunch { program, args, workdir, newly_activated: None })
}

fn resolve_script(
    definition: &MinerDefinition,
    ctx: &PlaceholderContext,
    script_choice: Option<&str>,
) -> Result<ResolvedLaunch, ResolveError> {
    let folder = PathBuf::from(definition.entry_path.trim());
    if !folder.is_dir() {
        return Err(ResolveError::NotFound(folder));
    }

    let selection = choose_script(&folder, &definition.active_scripts, script_choice)?;
    let interpreter = command_interpreter().ok_or(ResolveError::NoInterpreter)?;

    let script = selection.path.to_string_lossy().into_owned();
    #[cfg(windows)]
    let args = vec!["/c".to_string(), script];
    #[cfg(not(windows))]
    let args = vec![script];

    let workdir = resolve_workdir(&definition.workdir, &selection.path);

    Ok(ResolvedLaunch {
        program: interpreter,
        args,
        workdir,
        newly_activated: selection.newly_activated,
    })
}

/// Working directory: definition override (env-expanded) or the entry's
/// containing folder
fn resolve_workdir(override_dir: &str, entry: &Path) -> PathBuf {
    let override_dir = override_dir.trim();
    if !override_dir.is_empty() {
        return PathBuf::from(expand_env_vars(override_dir));
    }
    entry
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Platform command interpreter for script files
fn command_interpreter() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        if let Ok(comspec) = std::env::var("ComSpec") {
            let p = PathBuf::from(comspec);
            if p.exists() {
                return Some(p);
            }
        }
        let windir = std::env::var("WINDIR").unwrap_or_else(|_| r"C:\Windows".to_string());
        Some(PathBuf::from(windir).join("System32").join("cmd.exe"))
    }
    #[cfg(not(windows))]
    {
        Some(PathBuf::from("/bin/sh"))
    }
}

/// Split an expanded argument string with shell-like quoting rules.
///
/// This is a splitting function, not a shell invocation: no redirection or
/// piping semantics apply.
pub fn split_args(arg_str: &str) -> Result<Vec<String>, ResolveError> {
    let arg_str = arg_str.trim();
    if arg_str.is_empty() {
        return Ok(Vec::new());
    }
    shell_words::split(arg_str).map_err(|e| ResolveError::BadArguments(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::MinerDefinition;

    fn exe_definition(path: &str, args: &str) -> MinerDefinition {
        MinerDefinition {
            id: "xmrig".to_string(),
            name: "XMRig".to_string(),
            kind: MinerKind::Executable,
            entry_path: path.to_string(),
            args: args.to_string(),
            ..MinerDefinition::default()
        }
    }

    #[test]
    fn test_empty_path_is_not_configured() {
        let def = exe_definition("", "--help");
        let ctx = PlaceholderContext::default();
        assert_eq!(resolve(&def, &ctx, None), Err(ResolveError::NotConfigured));
    }

    #[test]
    fn test_missing_executable_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let def = exe_definition("does-not-exist", "");
        let ctx = PlaceholderContext { app_dir: dir.path().to_path_buf(), ..Default::default() };
        assert!(matches!(resolve(&def, &ctx, None), Err(ResolveError::NotFound(_))));
    }

    #[test]
    fn test_config_placeholder_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("xmrig");
        std::fs::write(&exe, "").unwrap();

        let def = exe_definition(&exe.to_string_lossy(), "--config {XMRIG_CONFIG_NAME}");
        let ctx = PlaceholderContext {
            app_dir: dir.path().to_path_buf(),
            generated_config: Some(dir.path().join("config.generated.json")),
            extra_args: None,
        };

        let launch = resolve(&def, &ctx, None).unwrap();
        assert_eq!(launch.program, exe);
        assert_eq!(launch.args, vec!["--config", "config.generated.json"]);
        assert_eq!(launch.workdir, dir.path());
    }

    #[test]
    fn test_quoted_path_stays_one_argument() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("miner");
        std::fs::write(&exe, "").unwrap();

        let def = exe_definition(&exe.to_string_lossy(), r#"--log "C:\My Logs\out.txt" -v"#);
        let ctx = PlaceholderContext { app_dir: dir.path().to_path_buf(), ..Default::default() };

        let launch = resolve(&def, &ctx, None).unwrap();
        assert_eq!(launch.args, vec!["--log", r"C:\My Logs\out.txt", "-v"]);
    }

    #[test]
    fn test_relative_path_resolves_against_app_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bin")).unwrap();
        let exe = dir.path().join("bin").join("miner");
        std::fs::write(&exe, "").unwrap();

        let def = exe_definition("bin/miner", "");
        let ctx = PlaceholderContext { app_dir: dir.path().to_path_buf(), ..Default::default() };

        let launch = resolve(&def, &ctx, None).unwrap();
        assert_eq!(launch.program, exe);
    }

    #[test]
    fn test_extra_args_appended() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("xmrig");
        std::fs::write(&exe, "").unwrap();

        let def = exe_definition(&exe.to_string_lossy(), "--config c.json");
        let ctx = PlaceholderContext {
            app_dir: dir.path().to_path_buf(),
            generated_config: None,
            extra_args: Some("--threads 4".to_string()),
        };

        let launch = resolve(&def, &ctx, None).unwrap();
        assert_eq!(launch.args, vec!["--config", "c.json", "--threads", "4"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_script_folder_resolves_through_interpreter() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        std::fs::write(&script, "echo hi").unwrap();

        let def = MinerDefinition {
            id: "wildrig".to_string(),
            name: "WildRig".to_string(),
            kind: MinerKind::ScriptFolder,
            entry_path: dir.path().to_string_lossy().into_owned(),
            ..MinerDefinition::default()
        };
        let ctx = PlaceholderContext { app_dir: dir.path().to_path_buf(), ..Default::default() };

        let launch = resolve(&def, &ctx, None).unwrap();
        assert_eq!(launch.program, PathBuf::from("/bin/sh"));
        assert_eq!(launch.args, vec![script.to_string_lossy().into_owned()]);
        assert_eq!(launch.workdir, dir.path());
        assert_eq!(launch.newly_activated, Some("run.sh".to_string()));
    }

    #[test]
    fn test_split_args_empty() {
        assert!(split_args("   ").unwrap().is_empty());
    }
}
