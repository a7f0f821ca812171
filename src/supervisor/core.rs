// Supervisor Thread
//
// Single dispatcher thread that owns every child process record and reacts
// to commands, output reads, stream EOFs and escalation ticks from one
// event channel. Nothing else mutates miner state.

use std::collections::HashMap;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::logging::log_to_file;
use crate::pipeline::OutputPipeline;
use crate::resolver::{self, PlaceholderContext};
use crate::settings::{app_dir, save_settings, settings_path, Settings};
use crate::supervisor::events::{MinerSnapshot, StartError, SupervisorCommand, SupervisorEvent};
use crate::supervisor::record::{record_for, MinerState, ProcessRecord};
use crate::terminator;
use crate::types::{DisplaySink, HashrateSample, MinerStatus};
use crate::xmrig;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Tunables for the supervisor thread
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Grace period between a stop request and the forced tree kill
    pub escalation_timeout: Duration,
    /// Where auto-activated script selections are persisted; None disables
    pub settings_path: Option<PathBuf>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        SupervisorConfig {
            escalation_timeout: Duration::from_secs(5),
            settings_path: Some(settings_path()),
        }
    }
}

/// Cloneable frontend handle onto the supervisor's event channel
#[derive(Clone)]
pub struct SupervisorHandle {
    tx: Sender<SupervisorEvent>,
}

impl SupervisorHandle {
    /// Start a miner and wait for the launch verdict
    pub fn start(&self, miner_id: &str, script_choice: Option<&str>) -> Result<(), StartError> {
        let (reply_tx, reply_rx) = channel();
        self.send_command(SupervisorCommand::Start {
            miner_id: miner_id.to_string(),
            script_choice: script_choice.map(str::to_string),
            reply: reply_tx,
        })
        .ok_or(StartError::Unavailable)?;
        reply_rx.recv().map_err(|_| StartError::Unavailable)?
    }

    pub fn stop(&self, miner_id: &str) {
        self.send_command(SupervisorCommand::Stop { miner_id: miner_id.to_string() });
    }

    pub fn kill(&self, miner_id: &str) {
        self.send_command(SupervisorCommand::Kill { miner_id: miner_id.to_string() });
    }

    pub fn pause(&self, miner_id: &str) {
        self.send_command(SupervisorCommand::Pause { miner_id: miner_id.to_string() });
    }

    pub fn resume(&self, miner_id: &str) {
        self.send_command(SupervisorCommand::Resume { miner_id: miner_id.to_string() });
    }

    /// Snapshot of every configured miner; empty when the supervisor is gone
    pub fn status(&self) -> Vec<MinerSnapshot> {
        let (reply_tx, reply_rx) = channel();
        if self
            .send_command(SupervisorCommand::Status { reply: reply_tx })
            .is_none()
        {
            return Vec::new();
        }
        reply_rx.recv().unwrap_or_default()
    }

    pub fn hashrate(&self, miner_id: &str) -> Option<HashrateSample> {
        let (reply_tx, reply_rx) = channel();
        self.send_command(SupervisorCommand::Hashrate {
            miner_id: miner_id.to_string(),
            reply: reply_tx,
        })?;
        reply_rx.recv().ok().flatten()
    }

    /// Kill everything still active and end the supervisor thread
    pub fn shutdown(&self) {
        self.send_command(SupervisorCommand::Shutdown);
    }

    fn send_command(&self, command: SupervisorCommand) -> Option<()> {
        self.tx.send(SupervisorEvent::Command(command)).ok()
    }
}

/// Start the supervisor thread
pub fn start_supervisor(
    settings: Settings,
    config: SupervisorConfig,
    sink: Arc<dyn DisplaySink>,
) -> (SupervisorHandle, thread::JoinHandle<()>) {
    let (tx, rx) = channel();
    let handle = SupervisorHandle { tx: tx.clone() };
    let join = thread::spawn(move || {
        run_supervisor(rx, tx, settings, config, sink);
    });
    (handle, join)
}

struct Supervisor {
    settings: Settings,
    config: SupervisorConfig,
    sink: Arc<dyn DisplaySink>,
    pipeline: OutputPipeline,
    records: HashMap<String, ProcessRecord>,
    tx: Sender<SupervisorEvent>,
}

fn run_supervisor(
    rx: Receiver<SupervisorEvent>,
    tx: Sender<SupervisorEvent>,
    settings: Settings,
    config: SupervisorConfig,
    sink: Arc<dyn DisplaySink>,
) {
    let mut sup = Supervisor {
        pipeline: OutputPipeline::new(sink.clone()),
        records: HashMap::new(),
        settings,
        config,
        sink,
        tx,
    };

    for miner in sup.settings.miners.iter().filter(|m| m.enabled) {
        sup.records.insert(miner.id.clone(), ProcessRecord::new());
    }

    println!("[Supervisor] Started with {} miner(s)", sup.records.len());

    loop {
        match rx.recv() {
            Ok(SupervisorEvent::Command(command)) => {
                if !sup.handle_command(command) {
                    break;
                }
            }
            Ok(SupervisorEvent::Output { miner_id, bytes }) => {
                sup.pipeline.on_bytes(&miner_id, &bytes);
            }
            Ok(SupervisorEvent::StreamClosed { miner_id, generation }) => {
                sup.handle_stream_closed(&miner_id, generation);
            }
            Ok(SupervisorEvent::Escalation { miner_id, generation }) => {
                sup.handle_escalation(&miner_id, generation);
            }
            Ok(SupervisorEvent::ProcessExited { miner_id, generation, status }) => {
                sup.handle_process_exited(&miner_id, generation, status);
            }
            Err(_) => {
                println!("[Supervisor] Channel disconnected, shutting down");
                break;
            }
        }
    }

    sup.kill_all_active();
    println!("[Supervisor] Stopped");
}

impl Supervisor {
    /// Returns false when the loop should end
    fn handle_command(&mut self, command: SupervisorCommand) -> bool {
        match command {
            SupervisorCommand::Start { miner_id, script_choice, reply } => {
                let result = self.handle_start(&miner_id, script_choice.as_deref());
                if let Err(e) = &result {
                    println!("[Supervisor] Start {} refused: {}", miner_id, e);
                    self.sink.set_status(&miner_id, MinerStatus::Error, &e.to_string());
                }
                let _ = reply.send(result);
            }
            SupervisorCommand::Stop { miner_id } => self.handle_stop(&miner_id),
            SupervisorCommand::Kill { miner_id } => self.handle_kill(&miner_id),
            SupervisorCommand::Pause { miner_id } => self.handle_pause(&miner_id),
            SupervisorCommand::Resume { miner_id } => self.handle_resume(&miner_id),
            SupervisorCommand::Status { reply } => {
                let _ = reply.send(self.snapshot());
            }
            SupervisorCommand::Hashrate { miner_id, reply } => {
                let _ = reply.send(self.pipeline.hashrate(&miner_id).cloned());
            }
            SupervisorCommand::Shutdown => return false,
        }
        true
    }

    fn handle_start(
        &mut self,
        miner_id: &str,
        script_choice: Option<&str>,
    ) -> Result<(), StartError> {
        let definition = self
            .settings
            .find_miner(miner_id)
            .cloned()
            .ok_or_else(|| StartError::UnknownMiner(miner_id.to_string()))?;

        if let Some(record) = self.records.get(miner_id) {
            if record.state.is_active() {
                return Err(StartError::AlreadyRunning);
            }
        }
        if self.settings.ui.single_active {
            // Exclusive mode: ask every other active identity to stop, then
            // proceed without waiting for them to finish
            let others: Vec<String> = self
                .records
                .iter()
                .filter(|(id, r)| id.as_str() != miner_id && r.state.is_active())
                .map(|(id, _)| id.clone())
                .collect();
            for other in others {
                println!("[Supervisor] Stopping {} before starting {}", other, miner_id);
                self.handle_stop(&other);
            }
        }

        let base = app_dir();
        let mut ctx = PlaceholderContext {
            app_dir: base.clone(),
            generated_config: None,
            extra_args: None,
        };

        if xmrig::is_designated(&definition.id) {
            let extra = self.settings.xmrig.extra.trim();
            if !extra.is_empty() {
                ctx.extra_args = Some(extra.to_string());
            }
            if self.settings.xmrig.auto_config {
                let exe = resolver::locate_executable(&definition, &base)?;
                let exe_dir = exe.parent().map(Path::to_path_buf).unwrap_or_else(|| base.clone());
                let path = xmrig::write_generated_config(&self.settings.xmrig, &exe_dir)?;
                println!("[Supervisor] Wrote {}", path.display());
                ctx.generated_config = Some(path);
            }
        }

        let launch = resolver::resolve(&definition, &ctx, script_choice)?;
        if let Some(script) = &launch.newly_activated {
            self.persist_activation(miner_id, script);
        }

        let mut cmd = Command::new(&launch.program);
        cmd.args(&launch.args)
            .current_dir(&launch.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        let mut child = cmd.spawn().map_err(|e| StartError::Launch(e.to_string()))?;
        let pid = child.id();

        let record = record_for(&mut self.records, miner_id);
        record.generation += 1;
        spawn_readers(miner_id, record.generation, &mut child, self.tx.clone());
        record.child = Some(child);
        record.pid = Some(pid);
        record.state = MinerState::Running;
        record.last_error = None;

        let line = format!("[Supervisor] Started {} (PID {})", miner_id, pid);
        println!("{}", line);
        log_to_file(&line);
        self.sink
            .set_status(miner_id, MinerStatus::Running, &format!("PID {}", pid));
        Ok(())
    }

    fn handle_stop(&mut self, miner_id: &str) {
        let Some(record) = self.records.get_mut(miner_id) else {
            return;
        };
        if !matches!(record.state, MinerState::Running | MinerState::Paused) {
            // Stop on an idle or already-stopping miner is a silent no-op
            return;
        }
        let Some(pid) = record.pid else { return };

        if record.state == MinerState::Paused {
            // A suspended process cannot act on the terminate request
            if let Err(e) = terminator::resume_process(pid) {
                println!("[Supervisor] {}", e);
            }
        }
        record.state = MinerState::Stopping;
        match terminator::terminate_gracefully(pid) {
            Ok(()) => println!("[Supervisor] Asked {} (PID {}) to stop", miner_id, pid),
            Err(e) => println!("[Supervisor] {}", e),
        }

        let generation = record.generation;
        let timeout = self.config.escalation_timeout;
        let tx = self.tx.clone();
        let id = miner_id.to_string();
        thread::spawn(move || {
            thread::sleep(timeout);
            let _ = tx.send(SupervisorEvent::Escalation { miner_id: id, generation });
        });

        self.sink.set_status(miner_id, MinerStatus::Running, "stopping");
    }

    fn handle_kill(&mut self, miner_id: &str) {
        let kill_names = self
            .settings
            .find_miner(miner_id)
            .map(|d| d.kill_names.clone())
            .unwrap_or_default();

        let Some(record) = self.records.get_mut(miner_id) else {
            return;
        };
        if record.state == MinerState::Idle {
            return;
        }

        // The tracked process may already be gone (Exited/Errored); the
        // kill-names sweep still runs for detached workers
        if let Some(pid) = record.pid {
            terminator::kill_process_tree(pid);
        }
        for name in &kill_names {
            terminator::kill_by_name(name);
        }
        if let Some(mut child) = record.child.take() {
            let _ = child.wait();
        }
        record.state = MinerState::Idle;
        record.pid = None;

        let line = format!("[Supervisor] Killed {}", miner_id);
        println!("{}", line);
        log_to_file(&line);
        self.sink.set_status(miner_id, MinerStatus::Idle, "killed");
    }

    fn handle_pause(&mut self, miner_id: &str) {
        let Some(record) = self.records.get_mut(miner_id) else {
            return;
        };
        if record.state != MinerState::Running {
            println!("[Supervisor] Pause {} refused: not running ({})", miner_id, record.state);
            return;
        }
        let Some(pid) = record.pid else { return };

        match terminator::suspend_process(pid) {
            Ok(()) => {
                record.state = MinerState::Paused;
                println!("[Supervisor] Paused {} (PID {})", miner_id, pid);
                self.sink.set_status(miner_id, MinerStatus::Paused, "paused");
            }
            Err(e) => println!("[Supervisor] Pause {} failed: {}", miner_id, e),
        }
    }

    fn handle_resume(&mut self, miner_id: &str) {
        let Some(record) = self.records.get_mut(miner_id) else {
            return;
        };
        if record.state != MinerState::Paused {
            println!("[Supervisor] Resume {} refused: not paused ({})", miner_id, record.state);
            return;
        }
        let Some(pid) = record.pid else { return };

        match terminator::resume_process(pid) {
            Ok(()) => {
                record.state = MinerState::Running;
                println!("[Supervisor] Resumed {} (PID {})", miner_id, pid);
                self.sink
                    .set_status(miner_id, MinerStatus::Running, &format!("PID {}", pid));
            }
            Err(e) => println!("[Supervisor] Resume {} failed: {}", miner_id, e),
        }
    }

    fn handle_stream_closed(&mut self, miner_id: &str, generation: u64) {
        let Some(record) = self.records.get_mut(miner_id) else {
            return;
        };
        if record.generation != generation {
            return; // stale notice from an earlier launch
        }
        let Some(mut child) = record.child.take() else {
            return; // already reaped by a kill path
        };

        match child.try_wait() {
            Ok(Some(status)) => self.settle_exit(miner_id, Ok(status)),
            Ok(None) => {
                // Output is gone but the process lives on (daemonizing
                // miners close their stdio). Park the handle on a waiter
                // thread; the dispatcher never blocks on a live child.
                println!(
                    "[Supervisor] {} closed its output but is still running",
                    miner_id
                );
                let tx = self.tx.clone();
                let id = miner_id.to_string();
                thread::spawn(move || {
                    let status = child.wait().ok();
                    let _ = tx.send(SupervisorEvent::ProcessExited {
                        miner_id: id,
                        generation,
                        status,
                    });
                });
            }
            Err(e) => self.settle_exit(miner_id, Err(e)),
        }
    }

    fn handle_process_exited(
        &mut self,
        miner_id: &str,
        generation: u64,
        status: Option<ExitStatus>,
    ) {
        let Some(record) = self.records.get(miner_id) else {
            return;
        };
        if record.generation != generation || !record.state.is_active() {
            return; // a kill path already settled this launch
        }
        match status {
            Some(st) => self.settle_exit(miner_id, Ok(st)),
            None => self.settle_exit(
                miner_id,
                Err(io::Error::new(io::ErrorKind::Other, "wait failed")),
            ),
        }
    }

    /// Record the outcome of a finished child
    fn settle_exit(&mut self, miner_id: &str, status: io::Result<ExitStatus>) {
        let Some(record) = self.records.get_mut(miner_id) else {
            return;
        };
        record.pid = None;
        let was_stopping = record.state == MinerState::Stopping;

        match status {
            Ok(st) if st.success() || was_stopping => {
                record.state = if was_stopping { MinerState::Idle } else { MinerState::Exited };
                record.last_error = None;
                let detail = if was_stopping { "stopped" } else { "exited" };
                let line = format!("[Supervisor] {} {}", miner_id, detail);
                println!("{}", line);
                log_to_file(&line);
                self.sink.set_status(miner_id, MinerStatus::Idle, detail);
            }
            Ok(st) => {
                let msg = format!("exited abnormally: {}", st);
                record.state = MinerState::Errored;
                record.last_error = Some(msg.clone());
                let line = format!("[Supervisor] {} {}", miner_id, msg);
                println!("{}", line);
                log_to_file(&line);
                self.sink.set_status(miner_id, MinerStatus::Error, &msg);
            }
            Err(e) => {
                let msg = format!("wait failed: {}", e);
                record.state = MinerState::Errored;
                record.last_error = Some(msg.clone());
                println!("[Supervisor] {} {}", miner_id, msg);
                self.sink.set_status(miner_id, MinerStatus::Error, &msg);
            }
        }
    }

    fn handle_escalation(&mut self, miner_id: &str, generation: u64) {
        let kill_names = self
            .settings
            .find_miner(miner_id)
            .map(|d| d.kill_names.clone())
            .unwrap_or_default();

        let Some(record) = self.records.get_mut(miner_id) else {
            return;
        };
        if record.generation != generation || record.state != MinerState::Stopping {
            return; // the stop already completed, or a newer launch took over
        }

        println!("[Supervisor] {} ignored the stop request, escalating", miner_id);
        if let Some(pid) = record.pid {
            terminator::kill_process_tree(pid);
        }
        for name in &kill_names {
            terminator::kill_by_name(name);
        }
        if let Some(mut child) = record.child.take() {
            let _ = child.wait();
        }
        record.state = MinerState::Idle;
        record.pid = None;

        log_to_file(&format!("[Supervisor] Killed {} after stop timeout", miner_id));
        self.sink
            .set_status(miner_id, MinerStatus::Idle, "killed after timeout");
    }

    fn snapshot(&self) -> Vec<MinerSnapshot> {
        self.settings
            .miners
            .iter()
            .filter(|m| m.enabled)
            .map(|m| {
                let record = self.records.get(&m.id);
                MinerSnapshot {
                    id: m.id.clone(),
                    name: m.name.clone(),
                    state: record.map(|r| r.state).unwrap_or(MinerState::Idle),
                    pid: record.and_then(|r| r.pid),
                    last_error: record.and_then(|r| r.last_error.clone()),
                    hashrate: self.pipeline.hashrate(&m.id).cloned(),
                }
            })
            .collect()
    }

    /// Record an auto-activated script and persist it, best-effort
    fn persist_activation(&mut self, miner_id: &str, script: &str) {
        if let Some(def) = self.settings.find_miner_mut(miner_id) {
            if !def.active_scripts.iter().any(|s| s == script) {
                def.active_scripts.push(script.to_string());
                println!("[Supervisor] Activated script {} for {}", script, miner_id);
            }
        }
        if let Some(path) = self.config.settings_path.clone() {
            if let Err(e) = save_settings(&path, &self.settings) {
                println!("[Supervisor] Could not persist script activation: {}", e);
            }
        }
    }

    fn kill_all_active(&mut self) {
        for (id, record) in self.records.iter_mut() {
            if !record.state.is_active() {
                continue;
            }
            if let Some(pid) = record.pid {
                terminator::kill_process_tree(pid);
            }
            if let Some(mut child) = record.child.take() {
                let _ = child.wait();
            }
            record.state = MinerState::Idle;
            record.pid = None;
            println!("[Supervisor] Killed {} on shutdown", id);
        }
    }
}

/// Drain both pipes into Output events; the stdout reader additionally
/// reports EOF, which stands in for process exit.
fn spawn_readers(
    miner_id: &str,
    generation: u64,
    child: &mut Child,
    tx: Sender<SupervisorEvent>,
) {
    if let Some(stdout) = child.stdout.take() {
        let id = miner_id.to_string();
        let tx = tx.clone();
        thread::spawn(move || {
            read_stream(stdout, &id, &tx);
            let _ = tx.send(SupervisorEvent::StreamClosed { miner_id: id, generation });
        });
    }
    if let Some(stderr) = child.stderr.take() {
        let id = miner_id.to_string();
        thread::spawn(move || read_stream(stderr, &id, &tx));
    }
}

fn read_stream(mut stream: impl Read, miner_id: &str, tx: &Sender<SupervisorEvent>) {
    let mut buf = [0u8; 4096];
    loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let event = SupervisorEvent::Output {
                    miner_id: miner_id.to_string(),
                    bytes: buf[..n].to_vec(),
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
        }
    }
}
