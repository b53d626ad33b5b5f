//! Messages from the background tasks to whatever front end is listening.

use crate::tracker::{Diagnostics, RowEvent, TrackerState};

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Row(RowEvent),
    /// The tracked identity was adopted from a live damage source
    IdentityDetected(String),
    /// File name of the log now being tailed, `None` when nothing is attached
    LogFileChanged(Option<String>),
    StateChanged(TrackerState),
    Diagnostics(Diagnostics),
    /// Non-fatal problem writing the overlay text file
    SinkStatus(String),
}
