use std::time::Duration;

use crate::combat_log::{CombatEvent, Hit, ParseError};
use crate::notification::Notification;
use crate::tracker::denylist::{EXEMPT_HEAL_REASON, is_non_player};
use crate::tracker::{Contribution, Row, RowBuffer, RowEvent, RowKind, Totals};
use tally_types::TrackingFlags;


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    /// No log attached
    Idle,
    Tracking,
    /// Current log ended; waiting for a newer one
    Exhausted,
}

/// Aggregation span between two resets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Epoch {
    /// Log clock of the event that opened the epoch
    pub start_game_time: f64,
    /// Local clock when that event was processed
    pub start_wall_time: f64,
    pub totals: Totals,
}

impl Epoch {
    fn elapsed(&self, timestamp: f64) -> f64 {
        timestamp - self.start_game_time
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub malformed_lines: u64,
    pub unrecognized_events: u64,
    /// Late events dropped because no Reset marker was left to insert before
    pub stale_corrections: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HitKind {
    Damage,
    Heal,
}

/// Reset/epoch state machine turning classified events into ledger rows.
///
/// Wall-clock values are passed in by the caller in seconds, which keeps the
/// retroactive-correction heuristic deterministic under test.
pub struct AggregationEngine {
    state: TrackerState,
    identity: Option<String>,
    caught_up: bool,
    epoch: Option<Epoch>,
    /// Epoch closed by the most recent reset, kept for late events
    previous: Option<Epoch>,
    reset_wall_time: Option<f64>,
    reset_pending: bool,
    hidden_combat: bool,
    hidden_since: f64,
    hidden_grace: f64,
    rows: RowBuffer,
    diagnostics: Diagnostics,
}

impl AggregationEngine {
    pub fn new(identity: Option<String>, hidden_grace: Duration) -> Self {
        Self {
            state: TrackerState::Idle,
            identity,
            caught_up: false,
            epoch: None,
            previous: None,
            reset_wall_time: None,
            reset_pending: true,
            hidden_combat: false,
            hidden_since: 0.0,
            hidden_grace: hidden_grace.as_secs_f64(),
            rows: RowBuffer::default(),
            diagnostics: Diagnostics::default(),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn state(&self) -> TrackerState {
        self.state
    }

    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    pub fn epoch(&self) -> Option<&Epoch> {
        self.epoch.as_ref()
    }

    pub fn previous_epoch(&self) -> Option<&Epoch> {
        self.previous.as_ref()
    }

    pub fn totals(&self) -> Totals {
        self.epoch.map(|e| e.totals).unwrap_or_default()
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    pub fn hidden_combat(&self) -> bool {
        self.hidden_combat
    }

    pub fn rows(&self) -> &RowBuffer {
        &self.rows
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Log lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// A log file was attached; consumption starts over in `Tracking`.
    pub fn attach(&mut self) -> Vec<Notification> {
        self.caught_up = false;
        self.transition(TrackerState::Tracking)
    }

    /// Restart consumption at the current file position.
    pub fn restart(&mut self) {
        self.caught_up = false;
    }

    /// The tailer reached the live end of the file.
    pub fn settle(&mut self, now: f64) -> Vec<Notification> {
        self.caught_up = true;
        let mut out = Vec::new();
        if self.hidden_combat && now - self.hidden_since >= self.hidden_grace {
            self.clear_hidden_combat(&mut out);
        }
        out
    }

    pub fn is_caught_up(&self) -> bool {
        self.caught_up
    }

    /// End sentinel or loss of the file: close the epoch with an End marker.
    pub fn end_of_log(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        self.clear_hidden_combat(&mut out);

        if !matches!(self.rows.last(), Some(row) if row.kind == RowKind::End) {
            self.emit(RowEvent::Append(Row::end()), &mut out);
        }
        self.epoch = None;
        self.previous = None;
        self.reset_wall_time = None;
        self.reset_pending = true;

        out.extend(self.transition(TrackerState::Exhausted));
        out
    }

    fn transition(&mut self, state: TrackerState) -> Vec<Notification> {
        if self.state == state {
            return Vec::new();
        }
        tracing::debug!(from = ?self.state, to = ?state, "Tracker state changed");
        self.state = state;
        vec![Notification::StateChanged(state)]
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Commands
    // ─────────────────────────────────────────────────────────────────────────

    /// Commit a reset. No-op while hidden combat is unresolved or a reset is
    /// already pending.
    pub fn reset_tracking(&mut self, now: f64) -> Vec<Notification> {
        if self.hidden_combat {
            tracing::debug!("Reset ignored: hidden combat unresolved");
            return Vec::new();
        }
        if self.reset_pending {
            tracing::debug!("Reset ignored: already pending");
            return Vec::new();
        }

        self.previous = self.epoch.take();
        self.reset_wall_time = Some(now);
        self.reset_pending = true;

        let mut out = Vec::new();
        self.emit(RowEvent::Append(Row::reset()), &mut out);
        out
    }

    pub fn clear_table(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        self.emit(RowEvent::Clear, &mut out);
        out
    }

    /// Replace the tracked identity. `None` re-enables auto-detection.
    /// Totals carry on until the next epoch starts.
    pub fn update_tracked_identity(&mut self, identity: Option<String>) {
        tracing::info!(identity = ?identity, "Tracked identity updated");
        self.identity = identity;
        self.restart();
    }

    pub fn record_malformed(&mut self, error: &ParseError) {
        self.diagnostics.malformed_lines += 1;
        tracing::debug!(error = %error, "Skipping malformed line");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Event processing
    // ─────────────────────────────────────────────────────────────────────────

    /// Process one classified event against a snapshot of the tracking flags.
    pub fn process_event(
        &mut self,
        event: &CombatEvent,
        flags: &TrackingFlags,
        now: f64,
    ) -> Vec<Notification> {
        match event {
            CombatEvent::Damage(hit) => self.process_hit(HitKind::Damage, hit, flags, now),
            CombatEvent::Heal(hit) => self.process_hit(HitKind::Heal, hit, flags, now),
            CombatEvent::CrowdControl(cc) => {
                let mut out = Vec::new();
                if self.identity.as_deref() == Some(cc.source.as_str()) {
                    self.raise_hidden_combat(now, &mut out);
                }
                out
            }
            CombatEvent::EndOfLog => self.end_of_log(),
            CombatEvent::Unrecognized => {
                self.diagnostics.unrecognized_events += 1;
                Vec::new()
            }
        }
    }

    fn process_hit(
        &mut self,
        kind: HitKind,
        hit: &Hit,
        flags: &TrackingFlags,
        now: f64,
    ) -> Vec<Notification> {
        let mut out = Vec::new();

        if self.identity.is_none()
            && self.caught_up
            && kind == HitKind::Damage
            && !is_non_player(&hit.source)
        {
            tracing::info!(identity = %hit.source, "Tracked identity detected");
            self.identity = Some(hit.source.clone());
            out.push(Notification::IdentityDetected(hit.source.clone()));
        }

        let Some(identity) = self.identity.as_deref() else {
            return out;
        };
        let Some(contribution) = qualify(kind, hit, identity, flags) else {
            return out;
        };

        if self.precedes_reset(hit.timestamp) {
            self.apply_late_event(hit, &contribution, &mut out);
            return out;
        }

        let row = if self.reset_pending {
            let mut totals = Totals::default();
            totals.add(&contribution);
            self.epoch = Some(Epoch {
                start_game_time: hit.timestamp,
                start_wall_time: now,
                totals,
            });
            self.reset_pending = false;
            Row::data(0.0, contribution, totals, &hit.reason)
        } else {
            let Some(epoch) = self.epoch.as_mut() else {
                return out;
            };
            epoch.totals.add(&contribution);
            Row::data(epoch.elapsed(hit.timestamp), contribution, epoch.totals, &hit.reason)
        };

        self.clear_hidden_combat(&mut out);
        self.emit(RowEvent::Append(row.with_hidden_combat(true)), &mut out);
        self.hidden_combat = true;
        self.hidden_since = now;
        out
    }

    // Game-clock time of the last reset, estimated from the offset between
    // the local clock and the log clock when the closed epoch began.
    fn reset_anchor_game_time(&self) -> Option<f64> {
        let previous = self.previous.as_ref()?;
        let reset_wall_time = self.reset_wall_time?;
        Some(reset_wall_time - (previous.start_wall_time - previous.start_game_time))
    }

    fn precedes_reset(&self, timestamp: f64) -> bool {
        self.reset_anchor_game_time()
            .is_some_and(|anchor| timestamp < anchor)
    }

    /// Fold an event that happened before the last reset into the closed epoch
    /// and slot its row in ahead of the Reset marker.
    fn apply_late_event(&mut self, hit: &Hit, contribution: &Contribution, out: &mut Vec<Notification>) {
        if self.rows.last_reset_index().is_none() {
            self.diagnostics.stale_corrections += 1;
            tracing::debug!(
                line_number = hit.line_number,
                "Dropping late event: no Reset marker to anchor before"
            );
            return;
        }
        let Some(previous) = self.previous.as_mut() else {
            return;
        };

        previous.totals.add(contribution);
        let row = Row::data(
            previous.elapsed(hit.timestamp),
            *contribution,
            previous.totals,
            &hit.reason,
        );
        tracing::debug!(line_number = hit.line_number, "Late event moved before reset");
        self.emit(RowEvent::InsertBeforeReset(row), out);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Hidden combat
    // ─────────────────────────────────────────────────────────────────────────

    fn raise_hidden_combat(&mut self, now: f64, out: &mut Vec<Notification>) {
        self.hidden_combat = true;
        self.hidden_since = now;
        if let Some(last) = self.rows.last()
            && last.is_data()
            && !last.hidden_combat
        {
            let flagged = last.clone().with_hidden_combat(true);
            self.emit(RowEvent::ReplaceLast(flagged), out);
        }
    }

    fn clear_hidden_combat(&mut self, out: &mut Vec<Notification>) {
        if !self.hidden_combat {
            return;
        }
        self.hidden_combat = false;
        if let Some(last) = self.rows.last()
            && last.is_data()
            && last.hidden_combat
        {
            let cleared = last.clone().with_hidden_combat(false);
            self.emit(RowEvent::ReplaceLast(cleared), out);
        }
    }

    fn emit(&mut self, event: RowEvent, out: &mut Vec<Notification>) {
        self.rows.apply(&event);
        out.push(Notification::Row(event));
    }
}

/// The share of `hit` that counts for `identity`, if any.
fn qualify(kind: HitKind, hit: &Hit, identity: &str, flags: &TrackingFlags) -> Option<Contribution> {
    match kind {
        HitKind::Damage => {
            if hit.source == identity
                && flags.track_damage
                && (!flags.gods_only || !is_non_player(&hit.target))
            {
                return Some(Contribution {
                    damage: Some(hit.amount.max(0)),
                    mitigated: Some(hit.secondary.max(0)),
                    ..Default::default()
                });
            }
            None
        }
        HitKind::Heal if hit.target == identity => {
            if flags.track_heal_received && (!flags.gods_only || hit.reason != EXEMPT_HEAL_REASON) {
                return Some(Contribution {
                    heal_received: Some(hit.amount.max(0)),
                    ..Default::default()
                });
            }
            None
        }
        HitKind::Heal => {
            if hit.source == identity
                && flags.track_heal_applied
                && (!flags.gods_only || !is_non_player(&hit.target))
            {
                return Some(Contribution {
                    heal_applied: Some(hit.amount.max(0)),
                    ..Default::default()
                });
            }
            None
        }
    }
}
