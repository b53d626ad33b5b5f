/// Damage or heal payload extracted from the fixed field positions.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub line_number: u64,
    /// Seconds on the log's own clock
    pub timestamp: f64,
    pub source: String,
    pub target: String,
    pub reason: String,
    pub amount: i64,
    /// Mitigated amount for damage, zero when the line has none
    pub secondary: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrowdControl {
    pub line_number: u64,
    pub timestamp: f64,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    Damage(Hit),
    Heal(Hit),
    CrowdControl(CrowdControl),
    EndOfLog,
    Unrecognized,
}

impl CombatEvent {
    pub fn source(&self) -> Option<&str> {
        match self {
            CombatEvent::Damage(hit) | CombatEvent::Heal(hit) => Some(&hit.source),
            CombatEvent::CrowdControl(cc) => Some(&cc.source),
            _ => None,
        }
    }

    pub fn timestamp(&self) -> Option<f64> {
        match self {
            CombatEvent::Damage(hit) | CombatEvent::Heal(hit) => Some(hit.timestamp),
            CombatEvent::CrowdControl(cc) => Some(cc.timestamp),
            _ => None,
        }
    }
}

/// Fixed field positions shared by both line dialects.
pub mod field {
    pub const EVENT_TYPE: usize = 1;
    pub const REASON: usize = 7;
    pub const TIMESTAMP: usize = 8;
    pub const SOURCE: usize = 9;
    pub const TARGET: usize = 11;
    pub const AMOUNT: usize = 12;
    pub const SECONDARY: usize = 13;
}
