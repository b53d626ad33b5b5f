use super::*;
use chrono::NaiveDateTime;

#[cfg(test)]
mod tests;

macro_rules! parse_i64 {
    ($s:expr) => {
        $s.parse::<i64>().unwrap_or_default()
    };
}

const DAMAGE_KINDS: [&str; 4] = ["Damage", "CritDamage", "Backstab", "HolyCrit"];
const HEAL_KIND: &str = "Healing";
const CROWD_CONTROL_KINDS: [&str; 2] = ["Status", "CrowdControl"];

const GAME_TIME_FORMATS: [&str; 2] = ["%Y.%m.%d-%H.%M.%S%.f", "%Y.%m.%d-%H.%M.%S"];

enum Kind {
    Damage,
    Heal,
    CrowdControl,
}

/// Turns decoded log lines into typed combat events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogParser;

impl LogParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_line(&self, line_number: u64, line: &str) -> Result<CombatEvent, ParseError> {
        if is_end_sentinel(line) {
            return Ok(CombatEvent::EndOfLog);
        }

        let fields = decode_line(line);
        if fields.len() <= field::EVENT_TYPE {
            return Err(ParseError::MalformedLine {
                line_number,
                fields: fields.len(),
                needed: field::EVENT_TYPE + 1,
            });
        }

        let Some(kind) = LogParser::classify(fields[field::EVENT_TYPE]) else {
            return Ok(CombatEvent::Unrecognized);
        };

        match kind {
            Kind::Damage => {
                LogParser::require(&fields, line_number, field::SECONDARY + 1)?;
                Ok(CombatEvent::Damage(LogParser::parse_hit(line_number, &fields)?))
            }
            Kind::Heal => {
                LogParser::require(&fields, line_number, field::AMOUNT + 1)?;
                Ok(CombatEvent::Heal(LogParser::parse_hit(line_number, &fields)?))
            }
            Kind::CrowdControl => {
                LogParser::require(&fields, line_number, field::SOURCE + 1)?;
                Ok(CombatEvent::CrowdControl(CrowdControl {
                    line_number,
                    timestamp: LogParser::parse_timestamp(line_number, fields[field::TIMESTAMP])?,
                    source: fields[field::SOURCE].to_string(),
                    target: fields
                        .get(field::TARGET)
                        .map(|s| s.to_string())
                        .unwrap_or_default(),
                }))
            }
        }
    }

    fn classify(event_type: &str) -> Option<Kind> {
        let mut parts = event_type.split('_');
        let (Some(_), Some(kind), None) = (parts.next(), parts.next(), parts.next()) else {
            return None;
        };

        if DAMAGE_KINDS.contains(&kind) {
            Some(Kind::Damage)
        } else if kind == HEAL_KIND {
            Some(Kind::Heal)
        } else if CROWD_CONTROL_KINDS.contains(&kind) {
            Some(Kind::CrowdControl)
        } else {
            None
        }
    }

    fn require(fields: &[&str], line_number: u64, needed: usize) -> Result<(), ParseError> {
        if fields.len() < needed {
            return Err(ParseError::MalformedLine {
                line_number,
                fields: fields.len(),
                needed,
            });
        }
        Ok(())
    }

    fn parse_hit(line_number: u64, fields: &[&str]) -> Result<Hit, ParseError> {
        Ok(Hit {
            line_number,
            timestamp: LogParser::parse_timestamp(line_number, fields[field::TIMESTAMP])?,
            source: fields[field::SOURCE].to_string(),
            target: fields[field::TARGET].to_string(),
            reason: fields[field::REASON].to_string(),
            amount: parse_i64!(fields[field::AMOUNT]),
            secondary: fields
                .get(field::SECONDARY)
                .map(|s| parse_i64!(s))
                .unwrap_or_default(),
        })
    }

    // seconds (`12.75`) or game date-time (`2024.03.01-18.22.05.250`)
    fn parse_timestamp(line_number: u64, value: &str) -> Result<f64, ParseError> {
        if let Ok(seconds) = value.parse::<f64>()
            && seconds.is_finite()
        {
            return Ok(seconds);
        }

        GAME_TIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
            .map(|dt| dt.and_utc().timestamp_millis() as f64 / 1000.0)
            .ok_or_else(|| ParseError::InvalidTimestamp {
                line_number,
                value: value.to_string(),
            })
    }
}
