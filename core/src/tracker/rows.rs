use std::collections::VecDeque;
use tally_types::Column;

/// Appended to every non-empty field of a row that may still be followed by
/// unprocessed combat.
pub const HIDDEN_COMBAT_MARKER: char = '*';

/// Oldest rows are dropped once a buffer holds this many.
pub const MAX_BUFFERED_ROWS: usize = 10_000;

const RESET_LABEL: &str = "Reset";
const END_LABEL: &str = "End";

/// Running totals of one epoch. Never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Totals {
    pub damage: i64,
    pub mitigated: i64,
    pub heal_received: i64,
    pub heal_applied: i64,
}

impl Totals {
    pub fn add(&mut self, contribution: &Contribution) {
        self.damage += contribution.damage.unwrap_or_default();
        self.mitigated += contribution.mitigated.unwrap_or_default();
        self.heal_received += contribution.heal_received.unwrap_or_default();
        self.heal_applied += contribution.heal_applied.unwrap_or_default();
    }
}

/// What a single qualifying event adds. `None` columns render blank.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Contribution {
    pub damage: Option<i64>,
    pub mitigated: Option<i64>,
    pub heal_received: Option<i64>,
    pub heal_applied: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Data,
    Reset,
    End,
}

/// One display line of the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub kind: RowKind,
    /// Seconds since the start of the row's epoch
    pub time: f64,
    pub dps: f64,
    pub contribution: Contribution,
    pub totals: Totals,
    pub reason: String,
    pub hidden_combat: bool,
}

impl Row {
    pub fn data(time: f64, contribution: Contribution, totals: Totals, reason: &str) -> Self {
        let dps = if time > 0.0 {
            totals.damage as f64 / time
        } else {
            0.0
        };
        Self {
            kind: RowKind::Data,
            time,
            dps,
            contribution,
            totals,
            reason: reason.to_string(),
            hidden_combat: false,
        }
    }

    pub fn reset() -> Self {
        Self::marker(RowKind::Reset)
    }

    pub fn end() -> Self {
        Self::marker(RowKind::End)
    }

    fn marker(kind: RowKind) -> Self {
        Self {
            kind,
            time: 0.0,
            dps: 0.0,
            contribution: Contribution::default(),
            totals: Totals::default(),
            reason: String::new(),
            hidden_combat: false,
        }
    }

    pub fn is_data(&self) -> bool {
        self.kind == RowKind::Data
    }

    pub fn is_marker(&self) -> bool {
        !self.is_data()
    }

    pub fn with_hidden_combat(mut self, hidden: bool) -> Self {
        self.hidden_combat = hidden;
        self
    }

    /// Formatted value of one column, hidden-combat marker included.
    pub fn field(&self, column: Column) -> String {
        let mut value = match self.kind {
            RowKind::Reset => return RESET_LABEL.to_string(),
            RowKind::End => return END_LABEL.to_string(),
            RowKind::Data => self.raw_field(column),
        };
        if self.hidden_combat && !value.is_empty() {
            value.push(HIDDEN_COMBAT_MARKER);
        }
        value
    }

    pub fn fields(&self) -> Vec<String> {
        Column::ALL.iter().map(|c| self.field(*c)).collect()
    }

    fn raw_field(&self, column: Column) -> String {
        let amount = |v: Option<i64>| v.map(|v| v.to_string()).unwrap_or_default();
        match column {
            Column::Time => format!("{:.2}s", self.time),
            Column::Dps => format!("{:.2}", self.dps),
            Column::Damage => amount(self.contribution.damage),
            Column::TotalDamage => self.totals.damage.to_string(),
            Column::Mitigated => amount(self.contribution.mitigated),
            Column::TotalMitigated => self.totals.mitigated.to_string(),
            Column::HealReceived => amount(self.contribution.heal_received),
            Column::TotalHealReceived => self.totals.heal_received.to_string(),
            Column::HealApplied => amount(self.contribution.heal_applied),
            Column::TotalHealApplied => self.totals.heal_applied.to_string(),
            Column::Reason => self.reason.clone(),
        }
    }
}

/// Ordered change to a row buffer, applied identically by every consumer.
#[derive(Debug, Clone, PartialEq)]
pub enum RowEvent {
    Append(Row),
    ReplaceLast(Row),
    /// Place the row immediately before the most recent Reset marker
    InsertBeforeReset(Row),
    Clear,
}

/// Bounded FIFO of rows.
#[derive(Debug, Clone)]
pub struct RowBuffer {
    rows: VecDeque<Row>,
    capacity: usize,
}

impl Default for RowBuffer {
    fn default() -> Self {
        Self::with_capacity(MAX_BUFFERED_ROWS)
    }
}

impl RowBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Apply one row event. Returns false when the event had nothing to act on.
    pub fn apply(&mut self, event: &RowEvent) -> bool {
        match event {
            RowEvent::Append(row) => {
                self.push(row.clone());
                true
            }
            RowEvent::ReplaceLast(row) => match self.rows.back_mut() {
                Some(last) => {
                    *last = row.clone();
                    true
                }
                None => false,
            },
            RowEvent::InsertBeforeReset(row) => match self.last_reset_index() {
                Some(idx) => {
                    self.rows.insert(idx, row.clone());
                    self.trim();
                    true
                }
                None => false,
            },
            RowEvent::Clear => {
                self.rows.clear();
                true
            }
        }
    }

    fn push(&mut self, row: Row) {
        self.rows.push_back(row);
        self.trim();
    }

    fn trim(&mut self) {
        while self.rows.len() > self.capacity {
            self.rows.pop_front();
        }
    }

    pub fn last(&self) -> Option<&Row> {
        self.rows.back()
    }

    pub fn last_reset_index(&self) -> Option<usize> {
        self.rows.iter().rposition(|r| r.kind == RowKind::Reset)
    }

    /// Most recent data row, the source of the final cumulative totals
    pub fn last_data(&self) -> Option<&Row> {
        self.rows.iter().rev().find(|r| r.is_data())
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Row> + ExactSizeIterator {
        self.rows.iter()
    }
}
