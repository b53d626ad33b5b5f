use tokio::task::JoinHandle;

/// Handles of the long-running tasks spawned for one tracking run.
#[derive(Default)]
pub struct BackgroundTasks {
    pub tracker: Option<JoinHandle<()>>,
    pub sink: Option<JoinHandle<()>>,
    pub auto_reset: Option<JoinHandle<()>>,
}

impl BackgroundTasks {
    /// Wait for every task to finish after a stop request.
    pub async fn join_all(&mut self) {
        for (name, handle) in [
            ("tracker", self.tracker.take()),
            ("sink", self.sink.take()),
            ("auto_reset", self.auto_reset.take()),
        ] {
            if let Some(handle) = handle
                && let Err(e) = handle.await
            {
                tracing::warn!(task = name, error = %e, "Background task ended abnormally");
            }
        }
    }

    pub fn abort_all(&mut self) {
        for handle in [
            self.tracker.take(),
            self.sink.take(),
            self.auto_reset.take(),
        ]
        .into_iter()
        .flatten()
        {
            handle.abort();
        }
    }
}
