//! Optional timer that requests a reset after a quiet period.

use crate::tracker::TrackerCommand;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoResetSignal {
    /// A qualifying row was appended
    Activity,
    /// A Reset marker was appended, by command or by this timer
    ResetObserved,
    /// `None` or a zero delay disables the timer
    SetDelay(Option<Duration>),
    Stop,
}

/// Fires `ResetTracking` when `delay` passes without activity after combat.
///
/// The timer stays armed until a Reset marker is observed, so a reset the
/// engine refused (hidden combat still unresolved) is retried one delay later.
pub struct AutoResetTimer {
    delay: Option<Duration>,
    armed: bool,
    rx: UnboundedReceiver<AutoResetSignal>,
    cmd_tx: mpsc::Sender<TrackerCommand>,
}

impl AutoResetTimer {
    pub fn new(
        delay: Option<Duration>,
        rx: UnboundedReceiver<AutoResetSignal>,
        cmd_tx: mpsc::Sender<TrackerCommand>,
    ) -> Self {
        Self {
            delay: usable(delay),
            armed: false,
            rx,
            cmd_tx,
        }
    }

    pub async fn run(mut self) {
        loop {
            let signal = match (self.delay, self.armed) {
                (Some(delay), true) => match tokio::time::timeout(delay, self.rx.recv()).await {
                    Ok(signal) => signal,
                    Err(_) => {
                        tracing::debug!(delay_secs = delay.as_secs_f64(), "Auto reset fired");
                        if self.cmd_tx.send(TrackerCommand::ResetTracking).await.is_err() {
                            break;
                        }
                        continue;
                    }
                },
                _ => self.rx.recv().await,
            };

            match signal {
                Some(AutoResetSignal::Activity) => self.armed = true,
                Some(AutoResetSignal::ResetObserved) => self.armed = false,
                Some(AutoResetSignal::SetDelay(delay)) => {
                    tracing::info!(delay = ?delay, "Auto reset delay updated");
                    self.delay = usable(delay);
                }
                Some(AutoResetSignal::Stop) | None => break,
            }
        }
    }
}

/// A zero delay would fire on every loop turn, so it counts as disabled.
fn usable(delay: Option<Duration>) -> Option<Duration> {
    delay.filter(|d| !d.is_zero())
}
