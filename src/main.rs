// MinerPanel - Console control panel for external miner processes
//
// Loads settings, starts the supervisor thread and drives it from a
// line-oriented command loop on stdin. Miner output is rendered inline
// with truecolor escapes where the pipeline attached colors.

mod logging;
mod pipeline;
mod resolver;
mod settings;
mod supervisor;
mod terminator;
mod types;
mod xmrig;

use std::io::{BufRead, Write};
use std::sync::Arc;

use resolver::ResolveError;
use supervisor::{start_supervisor, MinerSnapshot, StartError, SupervisorConfig, SupervisorHandle};
use types::{DisplaySink, MinerStatus, StyledLine};

/// Renders styled spans straight to stdout with 24-bit color escapes.
///
/// The console stands in for the tray surface, so the tray settings apply
/// here: `tray_enabled` gates the status announcements.
struct ConsoleSink {
    announce_status: bool,
}

fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

impl DisplaySink for ConsoleSink {
    fn append_styled_line(&self, miner_id: &str, line: &StyledLine) {
        let mut out = String::new();
        for span in &line.spans {
            match span.color.as_deref().and_then(parse_hex_color) {
                Some((r, g, b)) => {
                    out.push_str(&format!("\x1b[38;2;{};{};{}m{}\x1b[0m", r, g, b, span.text));
                }
                None => out.push_str(&span.text),
            }
        }
        println!("[{}] {}", miner_id, out);
    }

    fn append_global_line(&self, _line: &str) {
        // Per-miner lines already reach the console; the global feed is
        // only persisted through the file log
    }

    fn set_status(&self, miner_id: &str, status: MinerStatus, detail: &str) {
        if self.announce_status {
            println!("[Status] {} -> {} ({})", miner_id, status, detail);
        }
    }
}

fn main() {
    let settings_path = settings::settings_path();
    let settings = settings::load_settings(&settings_path);
    println!("[Main] Settings loaded from {}", settings_path.display());
    logging::log_to_file("[Main] MinerPanel starting");

    let ui = settings.ui.clone();
    let sink = Arc::new(ConsoleSink { announce_status: ui.tray_enabled });
    let (handle, join) = start_supervisor(settings, SupervisorConfig::default(), sink);

    print_help();
    run_command_loop(&handle, ui.tray_show_hashrate);

    handle.shutdown();
    if join.join().is_err() {
        println!("[Main] Supervisor thread panicked");
    }
    logging::log_to_file("[Main] MinerPanel exiting");
}

fn print_help() {
    println!("Commands:");
    println!("  start <id> [script]   launch a miner (script name disambiguates)");
    println!("  stop <id>             graceful stop, escalates after the grace period");
    println!("  kill <id>             immediate process-tree kill");
    println!("  pause <id> / resume <id>");
    println!("  status                all miners");
    println!("  hashrate              last reading of the designated miner");
    println!("  quit");
}

fn run_command_loop(handle: &SupervisorHandle, show_hashrate: bool) {
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break, // EOF
            Ok(_) => {}
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        match parts.as_slice() {
            [] => {}
            ["quit"] | ["exit"] => break,
            ["help"] => print_help(),
            ["start", id] => run_start(handle, id, None),
            ["start", id, script] => run_start(handle, id, Some(script)),
            ["stop", id] => handle.stop(id),
            ["kill", id] => handle.kill(id),
            ["pause", id] => handle.pause(id),
            ["resume", id] => handle.resume(id),
            ["status"] => print_status(handle, show_hashrate),
            ["hashrate"] => match handle.hashrate(xmrig::DESIGNATED_MINER_ID) {
                Some(sample) => println!("{}", sample),
                None => println!("no hashrate reading yet"),
            },
            _ => println!("unrecognized command (try 'help')"),
        }
    }
}

fn run_start(handle: &SupervisorHandle, miner_id: &str, script: Option<&str>) {
    match handle.start(miner_id, script) {
        Ok(()) => {}
        Err(StartError::Resolve(ResolveError::ScriptChoiceRequired(candidates))) => {
            println!("several scripts available, pick one with 'start {} <script>':", miner_id);
            for name in candidates {
                println!("  {}", name);
            }
        }
        Err(e) => println!("start failed: {}", e),
    }
}

fn print_status(handle: &SupervisorHandle, show_hashrate: bool) {
    let snapshot = handle.status();
    if snapshot.is_empty() {
        println!("no miners configured");
        return;
    }
    for miner in snapshot {
        println!("{}", format_status_line(&miner, show_hashrate));
    }
}

fn format_status_line(miner: &MinerSnapshot, show_hashrate: bool) -> String {
    let pid = miner
        .pid
        .map(|p| format!(" PID {}", p))
        .unwrap_or_default();
    let rate = if show_hashrate {
        miner
            .hashrate
            .as_ref()
            .map(|h| format!(" @ {}", h))
            .unwrap_or_default()
    } else {
        String::new()
    };
    let error = miner
        .last_error
        .as_ref()
        .map(|e| format!(" [{}]", e))
        .unwrap_or_default();
    format!("  {:10} {} - {}{}{}{}", miner.id, miner.name, miner.state, pid, rate, error)
}
