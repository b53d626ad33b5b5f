//! Shared configuration types for tally
//!
//! This crate contains the serializable settings that are shared between the
//! tracking engine (tally-core) and whatever front end drives it.

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Tracking Flags
// ─────────────────────────────────────────────────────────────────────────────

/// Qualification switches read by the aggregation engine.
///
/// The engine takes a copy of this struct at the start of every event so a
/// flag flipped mid-batch never splits one event across two flag sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingFlags {
    #[serde(default = "default_true")]
    pub track_damage: bool,
    #[serde(default = "default_true")]
    pub track_heal_received: bool,
    #[serde(default = "default_true")]
    pub track_heal_applied: bool,
    /// Ignore damage and healing that involves non-player entities
    #[serde(default)]
    pub gods_only: bool,
}

impl Default for TrackingFlags {
    fn default() -> Self {
        Self {
            track_damage: true,
            track_heal_received: true,
            track_heal_applied: true,
            gods_only: false,
        }
    }
}

/// A single toggleable tracking switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Flag {
    TrackDamage,
    TrackHealReceived,
    TrackHealApplied,
    GodsOnly,
}

impl TrackingFlags {
    pub fn set(&mut self, flag: Flag, value: bool) {
        match flag {
            Flag::TrackDamage => self.track_damage = value,
            Flag::TrackHealReceived => self.track_heal_received = value,
            Flag::TrackHealApplied => self.track_heal_applied = value,
            Flag::GodsOnly => self.gods_only = value,
        }
    }

    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::TrackDamage => self.track_damage,
            Flag::TrackHealReceived => self.track_heal_received,
            Flag::TrackHealApplied => self.track_heal_applied,
            Flag::GodsOnly => self.gods_only,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row Columns
// ─────────────────────────────────────────────────────────────────────────────

/// Display columns of a ledger row, in row order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Column {
    Time,
    Dps,
    Damage,
    TotalDamage,
    Mitigated,
    TotalMitigated,
    HealReceived,
    TotalHealReceived,
    HealApplied,
    TotalHealApplied,
    Reason,
}

impl Column {
    pub const ALL: [Column; 11] = [
        Column::Time,
        Column::Dps,
        Column::Damage,
        Column::TotalDamage,
        Column::Mitigated,
        Column::TotalMitigated,
        Column::HealReceived,
        Column::TotalHealReceived,
        Column::HealApplied,
        Column::TotalHealApplied,
        Column::Reason,
    ];

    /// Header label used by the text sink
    pub fn label(&self) -> &'static str {
        match self {
            Column::Time => "Time",
            Column::Dps => "DPS",
            Column::Damage => "Damage",
            Column::TotalDamage => "Total Dmg",
            Column::Mitigated => "Mitigated",
            Column::TotalMitigated => "Total Mit",
            Column::HealReceived => "Heal In",
            Column::TotalHealReceived => "Total In",
            Column::HealApplied => "Heal Out",
            Column::TotalHealApplied => "Total Out",
            Column::Reason => "Reason",
        }
    }

    /// Position of this column inside a rendered row
    pub fn index(&self) -> usize {
        *self as usize
    }

    /// The running-total column that carries the final value in a totals row.
    pub fn is_total(&self) -> bool {
        matches!(
            self,
            Column::TotalDamage
                | Column::TotalMitigated
                | Column::TotalHealReceived
                | Column::TotalHealApplied
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sink Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Settings for the column-formatted text file mirrored to the stream overlay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinkSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_output_path")]
    pub output_path: String,
    #[serde(default = "default_true")]
    pub show_header: bool,
    #[serde(default = "default_true")]
    pub show_totals: bool,
    #[serde(default = "default_column_width")]
    pub column_width: usize,
    #[serde(default = "default_reason_width")]
    pub reason_width: usize,
    /// Spaces written after every column except the reason column
    #[serde(default = "default_column_gap")]
    pub column_gap: usize,
    /// Total line budget of the output file, header and totals included
    #[serde(default = "default_max_lines")]
    pub max_lines: usize,
    #[serde(default = "default_columns")]
    pub columns: Vec<Column>,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            output_path: default_output_path(),
            show_header: true,
            show_totals: true,
            column_width: default_column_width(),
            reason_width: default_reason_width(),
            column_gap: default_column_gap(),
            max_lines: default_max_lines(),
            columns: default_columns(),
        }
    }
}

fn default_output_path() -> String {
    "tally_obs.txt".to_string()
}

fn default_column_width() -> usize {
    10
}

fn default_reason_width() -> usize {
    24
}

fn default_column_gap() -> usize {
    1
}

fn default_max_lines() -> usize {
    12
}

fn default_columns() -> Vec<Column> {
    Column::ALL.to_vec()
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Config
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub log_directory: String,
    /// Player to aggregate. `None` adopts the first live damage source.
    #[serde(default)]
    pub tracked_identity: Option<String>,
    #[serde(default)]
    pub tracking: TrackingFlags,
    #[serde(default)]
    pub sink: SinkSettings,
    /// Seconds without qualifying combat before an automatic reset
    #[serde(default)]
    pub auto_reset_secs: Option<u64>,
    #[serde(default = "default_hidden_combat_grace_ms")]
    pub hidden_combat_grace_ms: u64,
}

fn default_hidden_combat_grace_ms() -> u64 {
    1000
}

impl AppConfig {
    /// Create a new AppConfig with the specified log directory.
    /// Other fields use their default values.
    pub fn with_log_directory(log_directory: String) -> Self {
        Self {
            log_directory,
            tracked_identity: None,
            tracking: TrackingFlags::default(),
            sink: SinkSettings::default(),
            auto_reset_secs: None,
            hidden_combat_grace_ms: default_hidden_combat_grace_ms(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::with_log_directory(String::new())
    }
}

fn default_true() -> bool {
    true
}
