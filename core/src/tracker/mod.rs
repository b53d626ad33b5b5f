//! Aggregation of tracked-player events into a resettable ledger of rows.
mod denylist;
mod engine;
mod rows;
mod service;

pub use denylist::{EXEMPT_HEAL_REASON, is_non_player};
pub use engine::{AggregationEngine, Diagnostics, Epoch, TrackerState};
pub use rows::{
    Contribution, HIDDEN_COMBAT_MARKER, MAX_BUFFERED_ROWS, Row, RowBuffer, RowEvent, RowKind,
    Totals,
};
pub use service::{TrackerCommand, TrackerHandle, TrackerService, TrackerOutputs};
