use std::sync::Arc;
use tally_core::context::{AppConfig, BackgroundTasks};
use tally_core::{Notification, TrackerHandle, TrackerService};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::{Mutex, RwLock};

/// Holds all shared state for the CLI application.
#[derive(Clone)]
pub struct CliContext {
    pub config: Arc<RwLock<AppConfig>>,
    pub tracker: TrackerHandle,
    pub tasks: Arc<Mutex<BackgroundTasks>>,
}

impl CliContext {
    /// Spawn the background tasks for `config`. The notification stream is
    /// returned separately so one consumer can own it.
    pub fn start(config: AppConfig) -> (Self, UnboundedReceiver<Notification>) {
        let (tracker, notifications, tasks) = TrackerService::spawn(&config);
        let ctx = Self {
            config: Arc::new(RwLock::new(config)),
            tracker,
            tasks: Arc::new(Mutex::new(tasks)),
        };
        (ctx, notifications)
    }

    /// Stop every task and wait for them to finish.
    pub async fn shutdown(&self) {
        self.tracker.stop().await;
        self.tasks.lock().await.join_all().await;
    }
}
