//! Tracker service - owns the log source and the aggregation engine
//!
//! Architecture:
//! - TrackerService: background task that tails the newest log, feeds the
//!   engine and fans row events out to the notification, sink and auto-reset
//!   queues
//! - TrackerHandle: command side, cloned into whatever front end drives it
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::auto_reset::{AutoResetSignal, AutoResetTimer};
use crate::combat_log::ReadOutcome;
use crate::context::watcher::{DirectoryEvent, DirectoryWatcher};
use crate::context::{
    AppConfig, BackgroundTasks, Flag, LogFile, LogSource, SinkSettings, TrackingFlags,
};
use crate::notification::Notification;
use crate::sink::{RowSink, SinkTask};
use crate::tracker::{AggregationEngine, RowEvent, RowKind, TrackerState};

#[cfg(test)]
mod tests;

/// Directory poll interval while nothing is being tailed, and the rotation
/// check interval while something is.
const POLL_INTERVAL: Duration = Duration::from_secs(2);
/// Backoff after a read that found no new bytes.
const TAIL_BACKOFF: Duration = Duration::from_millis(100);

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCommand {
    ResetTracking,
    ClearTable,
    /// `None` returns to auto-detection
    SetIdentity(Option<String>),
    /// Re-scan the directory and restart consumption at the current position
    ReloadLog,
    RequestDiagnostics,
    Stop,
}

/// Local clock in seconds.
fn wall_clock() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

// ─────────────────────────────────────────────────────────────────────────────
// Outputs
// ─────────────────────────────────────────────────────────────────────────────

/// Queues the engine's output is fanned out to. None of them ever block.
pub struct TrackerOutputs {
    pub notifications: mpsc::UnboundedSender<Notification>,
    pub sink: Option<mpsc::UnboundedSender<SinkTask>>,
    pub auto_reset: Option<mpsc::UnboundedSender<AutoResetSignal>>,
}

impl TrackerOutputs {
    fn emit(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            if let Notification::Row(event) = &notification {
                self.forward_row(event);
            }
            let _ = self.notifications.send(notification);
        }
    }

    fn forward_row(&self, event: &RowEvent) {
        if let Some(sink) = &self.sink {
            let _ = sink.send(SinkTask::Row(event.clone()));
        }
        if let Some(auto_reset) = &self.auto_reset
            && let RowEvent::Append(row) = event
        {
            let signal = match row.kind {
                RowKind::Data => AutoResetSignal::Activity,
                RowKind::Reset | RowKind::End => AutoResetSignal::ResetObserved,
            };
            let _ = auto_reset.send(signal);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service
// ─────────────────────────────────────────────────────────────────────────────

enum Step {
    /// More lines may be ready right away
    Continue,
    Wait(Duration),
}

enum Wake {
    Command(Option<TrackerCommand>),
    Directory(Option<DirectoryEvent>),
    Timeout,
}

pub struct TrackerService {
    source: LogSource,
    engine: AggregationEngine,
    flags: watch::Receiver<TrackingFlags>,
    cmd_rx: mpsc::Receiver<TrackerCommand>,
    outputs: TrackerOutputs,
    watcher: Option<DirectoryWatcher>,
    last_scan: Option<Instant>,
}

impl TrackerService {
    pub fn new(
        config: &AppConfig,
        flags: watch::Receiver<TrackingFlags>,
        cmd_rx: mpsc::Receiver<TrackerCommand>,
        outputs: TrackerOutputs,
    ) -> Self {
        let grace = Duration::from_millis(config.hidden_combat_grace_ms);
        Self {
            source: LogSource::new(config.log_directory.clone().into()),
            engine: AggregationEngine::new(config.tracked_identity.clone(), grace),
            flags,
            cmd_rx,
            outputs,
            watcher: None,
            last_scan: None,
        }
    }

    /// Spawn the tracker, the sink and the auto-reset timer for `config`.
    pub fn spawn(
        config: &AppConfig,
    ) -> (
        TrackerHandle,
        mpsc::UnboundedReceiver<Notification>,
        BackgroundTasks,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (flags_tx, flags_rx) = watch::channel(config.tracking);
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        let (sink_tx, sink_rx) = mpsc::unbounded_channel();
        let (auto_reset_tx, auto_reset_rx) = mpsc::unbounded_channel();

        let sink = RowSink::new(config.sink.clone(), sink_rx).with_status(notify_tx.clone());
        let auto_reset = AutoResetTimer::new(
            config.auto_reset_secs.map(Duration::from_secs),
            auto_reset_rx,
            cmd_tx.clone(),
        );
        let service = TrackerService::new(
            config,
            flags_rx,
            cmd_rx,
            TrackerOutputs {
                notifications: notify_tx,
                sink: Some(sink_tx.clone()),
                auto_reset: Some(auto_reset_tx.clone()),
            },
        );

        let tasks = BackgroundTasks {
            tracker: Some(tokio::spawn(service.run())),
            sink: Some(tokio::spawn(sink.run())),
            auto_reset: Some(tokio::spawn(auto_reset.run())),
        };
        let handle = TrackerHandle {
            cmd_tx,
            flags_tx: Arc::new(flags_tx),
            sink_tx: Some(sink_tx),
            auto_reset_tx: Some(auto_reset_tx),
        };
        (handle, notify_rx, tasks)
    }

    pub fn engine(&self) -> &AggregationEngine {
        &self.engine
    }

    /// Run the service event loop until `Stop` or until every handle is gone.
    pub async fn run(mut self) {
        tracing::info!(dir = %self.source.directory().display(), "Tracker starting");
        self.start_watcher();

        loop {
            while let Ok(cmd) = self.cmd_rx.try_recv() {
                if !self.handle_command(cmd).await {
                    return self.shutdown();
                }
            }

            let delay = match self.step().await {
                Step::Continue => continue,
                Step::Wait(delay) => delay,
            };

            let wake = tokio::select! {
                cmd = self.cmd_rx.recv() => Wake::Command(cmd),
                event = next_directory_event(&mut self.watcher) => Wake::Directory(event),
                _ = tokio::time::sleep(delay) => Wake::Timeout,
            };

            match wake {
                Wake::Command(Some(cmd)) => {
                    if !self.handle_command(cmd).await {
                        return self.shutdown();
                    }
                }
                Wake::Command(None) => return self.shutdown(),
                Wake::Directory(Some(event)) => self.handle_directory_event(event),
                Wake::Directory(None) => {
                    tracing::warn!("Directory watcher closed, falling back to polling");
                    self.watcher = None;
                }
                Wake::Timeout => {}
            }
        }
    }

    fn shutdown(&mut self) {
        self.source.detach();
        tracing::info!("Tracker stopped");
    }

    fn start_watcher(&mut self) {
        match DirectoryWatcher::new(self.source.directory()) {
            Ok(watcher) => self.watcher = Some(watcher),
            Err(e) => {
                tracing::debug!(error = %e, "Directory watcher unavailable, polling only");
            }
        }
    }

    fn handle_directory_event(&mut self, event: DirectoryEvent) {
        match event {
            DirectoryEvent::NewFile(path) => {
                tracing::debug!(path = %path.display(), "New combat log detected");
                self.last_scan = None;
            }
            DirectoryEvent::FileRemoved(path) => {
                tracing::debug!(path = %path.display(), "Combat log removed");
            }
            DirectoryEvent::FileModified(_) => {}
            DirectoryEvent::Error(e) => tracing::warn!(error = %e, "Directory watcher error"),
        }
    }

    /// One unit of work: a rotation check when due, then at most one line.
    async fn step(&mut self) -> Step {
        let scan_due = self
            .last_scan
            .is_none_or(|at| at.elapsed() >= POLL_INTERVAL);
        if scan_due {
            self.rescan().await;
        }

        if self.engine.state() != TrackerState::Tracking || !self.source.is_attached() {
            return Step::Wait(POLL_INTERVAL);
        }

        match self.source.next_line().await {
            ReadOutcome::Line { line_number, text } => {
                self.process_line(line_number, &text);
                if self.engine.state() == TrackerState::Exhausted {
                    tracing::info!(line_number, "Combat log ended, waiting for a newer one");
                    self.release_log();
                }
                Step::Continue
            }
            ReadOutcome::NoData => {
                let settled = self.engine.settle(wall_clock());
                self.outputs.emit(settled);
                Step::Wait(TAIL_BACKOFF)
            }
            ReadOutcome::Lost => {
                tracing::info!("Combat log lost, waiting for a newer one");
                let ended = self.engine.end_of_log();
                self.outputs.emit(ended);
                self.release_log();
                Step::Wait(POLL_INTERVAL)
            }
        }
    }

    fn process_line(&mut self, line_number: u64, text: &str) {
        match self.source.parser().parse_line(line_number, text) {
            Ok(event) => {
                let flags = *self.flags.borrow();
                let out = self.engine.process_event(&event, &flags, wall_clock());
                self.outputs.emit(out);
            }
            Err(e) => self.engine.record_malformed(&e),
        }
    }

    async fn rescan(&mut self) {
        self.last_scan = Some(Instant::now());
        if let Some(file) = self.source.newer_candidate() {
            self.attach(file).await;
        }
    }

    async fn attach(&mut self, file: LogFile) {
        let name = file.file_name();
        let catch_up = match self.source.attach(file).await {
            Ok(catch_up) => catch_up,
            Err(e) => {
                tracing::warn!(file = %name, error = %e, "Failed to attach combat log");
                return;
            }
        };

        self.outputs
            .emit(vec![Notification::LogFileChanged(Some(name))]);
        let attached = self.engine.attach();
        self.outputs.emit(attached);

        let now = wall_clock();
        for event in catch_up.events {
            match event {
                Ok(event) => {
                    let flags = *self.flags.borrow();
                    let out = self.engine.process_event(&event, &flags, now);
                    self.outputs.emit(out);
                }
                Err(e) => self.engine.record_malformed(&e),
            }
        }

        if self.engine.state() == TrackerState::Exhausted {
            self.release_log();
        }
    }

    /// Stop tailing the current file and report that no log is being read.
    fn release_log(&mut self) {
        self.source.detach();
        self.outputs
            .emit(vec![Notification::LogFileChanged(None)]);
    }

    /// Pick up a newer log if there is one, otherwise restart on the current
    /// file where reading stopped.
    async fn reload(&mut self) {
        if let Some(file) = self.source.newer_candidate() {
            self.last_scan = Some(Instant::now());
            self.attach(file).await;
            return;
        }

        self.source.detach();
        match self.source.resume().await {
            Ok(true) => {
                let attached = self.engine.attach();
                self.outputs.emit(attached);
            }
            Ok(false) => {
                self.outputs.emit(vec![Notification::LogFileChanged(None)]);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to reopen combat log"),
        }
    }

    /// Returns false when the service should stop.
    async fn handle_command(&mut self, cmd: TrackerCommand) -> bool {
        tracing::debug!(command = ?cmd, "Tracker command");
        match cmd {
            TrackerCommand::ResetTracking => {
                let out = self.engine.reset_tracking(wall_clock());
                self.outputs.emit(out);
            }
            TrackerCommand::ClearTable => {
                let out = self.engine.clear_table();
                self.outputs.emit(out);
            }
            TrackerCommand::SetIdentity(identity) => {
                self.engine.update_tracked_identity(identity);
                self.reload().await;
            }
            TrackerCommand::ReloadLog => self.reload().await,
            TrackerCommand::RequestDiagnostics => {
                let diagnostics = self.engine.diagnostics();
                self.outputs
                    .emit(vec![Notification::Diagnostics(diagnostics)]);
            }
            TrackerCommand::Stop => return false,
        }
        true
    }
}

async fn next_directory_event(watcher: &mut Option<DirectoryWatcher>) -> Option<DirectoryEvent> {
    match watcher {
        Some(watcher) => watcher.next_event().await,
        None => std::future::pending().await,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to drive the tracker and its companion tasks
#[derive(Clone)]
pub struct TrackerHandle {
    cmd_tx: mpsc::Sender<TrackerCommand>,
    flags_tx: Arc<watch::Sender<TrackingFlags>>,
    sink_tx: Option<mpsc::UnboundedSender<SinkTask>>,
    auto_reset_tx: Option<mpsc::UnboundedSender<AutoResetSignal>>,
}

impl TrackerHandle {
    /// Handle for a service built by hand, without sink or timer.
    pub fn new(cmd_tx: mpsc::Sender<TrackerCommand>, flags_tx: watch::Sender<TrackingFlags>) -> Self {
        Self {
            cmd_tx,
            flags_tx: Arc::new(flags_tx),
            sink_tx: None,
            auto_reset_tx: None,
        }
    }

    async fn send(&self, cmd: TrackerCommand) -> Result<(), String> {
        self.cmd_tx.send(cmd).await.map_err(|e| e.to_string())
    }

    pub async fn reset_tracking(&self) -> Result<(), String> {
        self.send(TrackerCommand::ResetTracking).await
    }

    pub async fn clear_table(&self) -> Result<(), String> {
        self.send(TrackerCommand::ClearTable).await
    }

    pub async fn set_identity(&self, identity: Option<String>) -> Result<(), String> {
        self.send(TrackerCommand::SetIdentity(identity)).await
    }

    pub async fn reload_log(&self) -> Result<(), String> {
        self.send(TrackerCommand::ReloadLog).await
    }

    pub async fn request_diagnostics(&self) -> Result<(), String> {
        self.send(TrackerCommand::RequestDiagnostics).await
    }

    /// Takes effect from the next event the tracker processes.
    pub fn set_flag(&self, flag: Flag, value: bool) {
        self.flags_tx.send_modify(|flags| flags.set(flag, value));
    }

    pub fn flags(&self) -> TrackingFlags {
        *self.flags_tx.borrow()
    }

    pub fn update_sink_settings(&self, settings: SinkSettings) -> Result<(), String> {
        self.send_sink(SinkTask::UpdateSettings(settings))
    }

    pub fn set_sink_enabled(&self, enabled: bool) -> Result<(), String> {
        self.send_sink(if enabled { SinkTask::Enable } else { SinkTask::Disable })
    }

    fn send_sink(&self, task: SinkTask) -> Result<(), String> {
        let Some(tx) = &self.sink_tx else {
            return Err("sink not running".to_string());
        };
        tx.send(task).map_err(|e| e.to_string())
    }

    pub fn set_auto_reset(&self, delay: Option<Duration>) -> Result<(), String> {
        let Some(tx) = &self.auto_reset_tx else {
            return Err("auto reset not running".to_string());
        };
        tx.send(AutoResetSignal::SetDelay(delay))
            .map_err(|e| e.to_string())
    }

    /// Ask every task to stop. Tasks that already exited are ignored.
    pub async fn stop(&self) {
        let _ = self.send(TrackerCommand::Stop).await;
        if let Some(tx) = &self.sink_tx {
            let _ = tx.send(SinkTask::Stop);
        }
        if let Some(tx) = &self.auto_reset_tx {
            let _ = tx.send(AutoResetSignal::Stop);
        }
    }
}
