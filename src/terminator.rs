// Process-Tree Terminator
//
// Best-effort kill of a child process and everything it spawned, plus the
// name-based sweep used as a safety net for script-launched miners that
// re-parent their real workers.

use once_cell::sync::Lazy;
use regex::Regex;
use sysinfo::{Pid, System};

// Strict executable-name shape; rejects anything with a path separator
#[cfg(windows)]
static SAFE_EXE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+\.exe$").unwrap());
#[cfg(not(windows))]
static SAFE_EXE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+(\.exe)?$").unwrap());

/// True when a configured kill-name is safe to act on
pub fn is_safe_kill_name(name: &str) -> bool {
    SAFE_EXE_NAME_RE.is_match(name)
}

/// Collect `root` plus every transitive descendant, children ordered
/// before their parents so the kill walk takes workers down first.
fn collect_tree(sys: &System, root: Pid) -> Vec<Pid> {
    let mut tree = vec![root];
    let mut cursor = 0;
    while cursor < tree.len() {
        let parent = tree[cursor];
        for (pid, process) in sys.processes() {
            if process.parent() == Some(parent) && !tree.contains(pid) {
                tree.push(*pid);
            }
        }
        cursor += 1;
    }
    tree.reverse();
    tree
}

/// Forcefully kill a process and its whole descendant tree.
///
/// Every step is best-effort: a vanished process is not an error, and a
/// failed kill on one member never stops the walk.
pub fn kill_process_tree(root_pid: u32) {
    let sys = System::new_all();
    let root = Pid::from_u32(root_pid);

    if !sys.processes().contains_key(&root) {
        println!("[Terminator] PID {} already gone", root_pid);
        return;
    }

    for pid in collect_tree(&sys, root) {
        if let Some(process) = sys.process(pid) {
            if process.kill() {
                println!("[Terminator] 💀 Killed PID {}", pid.as_u32());
            } else {
                println!("[Terminator] Failed to kill PID {}", pid.as_u32());
            }
        }
    }
}

/// Kill every process whose executable name matches `name` exactly
/// (case-insensitive). Returns how many kills succeeded; an unsafe name
/// is refused and counts as zero.
pub fn kill_by_name(name: &str) -> usize {
    if !is_safe_kill_name(name) {
        println!("[Terminator] Refusing unsafe kill name: {:?}", name);
        return 0;
    }

    let sys = System::new_all();
    let mut killed = 0;
    for process in sys.processes().values() {
        if process.name().eq_ignore_ascii_case(name) && process.kill() {
            println!("[Terminator] 💀 Killed {} (PID {})", name, process.pid().as_u32());
            killed += 1;
        }
    }
    killed
}

/// Ask a process to exit cleanly; the caller arms the escalation timer
#[cfg(unix)]
pub fn terminate_gracefully(pid: u32) -> Result<(), String> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid as NixPid;

    kill(NixPid::from_raw(pid as i32), Signal::SIGTERM)
        .map_err(|e| format!("SIGTERM to PID {} failed: {}", pid, e))
}

#[cfg(windows)]
pub fn terminate_gracefully(pid: u32) -> Result<(), String> {
    use std::process::Command;

    // Without /F taskkill sends WM_CLOSE / CTRL_CLOSE, the closest thing
    // Windows has to a polite terminate
    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T"])
        .status()
        .map_err(|e| format!("taskkill for PID {} failed: {}", pid, e))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("taskkill for PID {} exited with {}", pid, status))
    }
}

#[cfg(unix)]
pub fn suspend_process(pid: u32) -> Result<(), String> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid as NixPid;

    kill(NixPid::from_raw(pid as i32), Signal::SIGSTOP)
        .map_err(|e| format!("SIGSTOP to PID {} failed: {}", pid, e))
}

#[cfg(unix)]
pub fn resume_process(pid: u32) -> Result<(), String> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid as NixPid;

    kill(NixPid::from_raw(pid as i32), Signal::SIGCONT)
        .map_err(|e| format!("SIGCONT to PID {} failed: {}", pid, e))
}

#[cfg(windows)]
mod nt {
    pub type Handle = *mut core::ffi::c_void;

    pub const PROCESS_SUSPEND_RESUME: u32 = 0x0800;

    #[link(name = "kernel32")]
    extern "system" {
        pub fn OpenProcess(access: u32, inherit: i32, pid: u32) -> Handle;
        pub fn CloseHandle(handle: Handle) -> i32;
    }

    // Undocumented but stable since NT 3.51; what every process explorer uses
    #[link(name = "ntdll")]
    extern "system" {
        pub fn NtSuspendProcess(handle: Handle) -> i32;
        pub fn NtResumeProcess(handle: Handle) -> i32;
    }
}

#[cfg(windows)]
fn with_suspend_handle(pid: u32, op: unsafe extern "system" fn(nt::Handle) -> i32, what: &str) -> Result<(), String> {
    unsafe {
        let handle = nt::OpenProcess(nt::PROCESS_SUSPEND_RESUME, 0, pid);
        if handle.is_null() {
            return Err(format!("OpenProcess for PID {} failed", pid));
        }
        let status = op(handle);
        nt::CloseHandle(handle);
        if status == 0 {
            Ok(())
        } else {
            Err(format!("{} for PID {} returned 0x{:08x}", what, pid, status))
        }
    }
}

#[cfg(windows)]
pub fn suspend_process(pid: u32) -> Result<(), String> {
    with_suspend_handle(pid, nt::NtSuspendProcess, "NtSuspendProcess")
}

#[cfg(windows)]
pub fn resume_process(pid: u32) -> Result<(), String> {
    with_suspend_handle(pid, nt::NtResumeProcess, "NtResumeProcess")
}
