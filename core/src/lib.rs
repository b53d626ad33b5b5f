pub mod auto_reset;
pub mod combat_log;
pub mod context;
pub mod notification;
pub mod sink;
pub mod tracker;

// Re-exports for convenience
pub use auto_reset::{AutoResetSignal, AutoResetTimer};
pub use combat_log::*;
pub use context::watcher as directory_watcher;
pub use notification::Notification;
pub use sink::{RowSink, SinkError, SinkTask};
pub use tracker::{
    AggregationEngine, Diagnostics, Row, RowBuffer, RowEvent, RowKind, TrackerCommand,
    TrackerHandle, TrackerService, TrackerState,
};
