//! RowSink: mirrors the row buffer into a bounded, column-formatted text file
//! read by a broadcast overlay.
mod error;
mod render;

pub use error::SinkError;
pub use render::{fit, render};

use crate::notification::Notification;
use crate::tracker::{RowBuffer, RowEvent};
use std::path::{Path, PathBuf};
use tally_types::SinkSettings;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};


/// Work queued for the sink task. Every batch ends with one rewrite.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkTask {
    Row(RowEvent),
    Enable,
    Disable,
    /// Rewrite the file without changing anything
    Rewrite,
    UpdateSettings(SinkSettings),
    /// Drain the queue, leave an empty file behind and exit
    Stop,
}

impl From<RowEvent> for SinkTask {
    fn from(event: RowEvent) -> Self {
        SinkTask::Row(event)
    }
}

pub struct RowSink {
    settings: SinkSettings,
    rows: RowBuffer,
    rx: UnboundedReceiver<SinkTask>,
    status_tx: Option<UnboundedSender<Notification>>,
}

impl RowSink {
    pub fn new(settings: SinkSettings, rx: UnboundedReceiver<SinkTask>) -> Self {
        Self {
            settings,
            rows: RowBuffer::default(),
            rx,
            status_tx: None,
        }
    }

    /// Report write failures as `Notification::SinkStatus` on `tx`.
    pub fn with_status(mut self, tx: UnboundedSender<Notification>) -> Self {
        self.status_tx = Some(tx);
        self
    }

    pub fn settings(&self) -> &SinkSettings {
        &self.settings
    }

    pub fn rows(&self) -> &RowBuffer {
        &self.rows
    }

    pub async fn run(mut self) {
        tracing::debug!(path = %self.settings.output_path, "Row sink started");

        while let Some(task) = self.rx.recv().await {
            let mut stop = self.apply(task);
            while !stop {
                match self.rx.try_recv() {
                    Ok(task) => stop = self.apply(task),
                    Err(_) => break,
                }
            }
            if stop {
                break;
            }
            self.flush().await;
        }

        while let Ok(task) = self.rx.try_recv() {
            self.apply(task);
        }
        self.clear_output().await;
        tracing::debug!("Row sink stopped");
    }

    /// Apply one task to the in-memory state. Returns true on `Stop`.
    fn apply(&mut self, task: SinkTask) -> bool {
        match task {
            SinkTask::Row(event) => {
                self.rows.apply(&event);
            }
            SinkTask::Enable => self.settings.enabled = true,
            SinkTask::Disable => self.settings.enabled = false,
            SinkTask::Rewrite => {}
            SinkTask::UpdateSettings(settings) => {
                if settings.output_path != self.settings.output_path {
                    tracing::info!(path = %settings.output_path, "Sink output path changed");
                }
                self.settings = settings;
            }
            SinkTask::Stop => return true,
        }
        false
    }

    async fn flush(&self) {
        let content = render(&self.rows, &self.settings);
        self.write(&content).await;
    }

    async fn clear_output(&self) {
        self.write("").await;
    }

    async fn write(&self, content: &str) {
        if self.settings.output_path.is_empty() {
            return;
        }
        let path = PathBuf::from(&self.settings.output_path);
        if let Err(e) = write_output(&path, content).await {
            tracing::warn!(path = %path.display(), error = %e, "Sink write failed");
            if let Some(tx) = &self.status_tx {
                let _ = tx.send(Notification::SinkStatus(e.to_string()));
            }
        }
    }
}

async fn write_output(path: &Path, content: &str) -> Result<(), SinkError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|source| SinkError::Write {
            path: path.to_path_buf(),
            source,
        })
}
