//! Fixed-width text layout of the row buffer.

use crate::tracker::RowBuffer;
use tally_types::{Column, SinkSettings};

const ELLIPSIS: char = '…';

/// Render the whole output file. A disabled sink renders nothing.
pub fn render(rows: &RowBuffer, settings: &SinkSettings) -> String {
    if !settings.enabled {
        return String::new();
    }

    let columns = enabled_columns(settings);
    let mut budget = settings.max_lines;
    let show_header = settings.show_header && budget > 0;
    if show_header {
        budget -= 1;
    }
    let show_totals = settings.show_totals && budget > 0;
    if show_totals {
        budget -= 1;
    }

    let mut out = String::new();
    if show_header {
        let labels: Vec<String> = columns.iter().map(|c| c.label().to_string()).collect();
        push_line(&mut out, &columns, &labels, settings);
    }

    let shown = rows.len().min(budget);
    for _ in shown..budget {
        out.push('\n');
    }
    for row in rows.iter().skip(rows.len() - shown) {
        let fields: Vec<String> = columns.iter().map(|c| row.field(*c)).collect();
        push_line(&mut out, &columns, &fields, settings);
    }

    if show_totals {
        let last = rows.last_data().map(|row| row.clone().with_hidden_combat(false));
        let fields: Vec<String> = columns
            .iter()
            .map(|c| match &last {
                Some(row) if c.is_total() => row.field(*c),
                _ => String::new(),
            })
            .collect();
        push_line(&mut out, &columns, &fields, settings);
    }

    out
}

/// Enabled columns in row order, each at most once.
fn enabled_columns(settings: &SinkSettings) -> Vec<Column> {
    Column::ALL
        .iter()
        .copied()
        .filter(|c| settings.columns.contains(c))
        .collect()
}

fn push_line(out: &mut String, columns: &[Column], fields: &[String], settings: &SinkSettings) {
    for (column, value) in columns.iter().zip(fields) {
        if *column == Column::Reason {
            out.push_str(&fit(value, settings.reason_width));
        } else {
            out.push_str(&fit(value, settings.column_width));
            out.extend(std::iter::repeat_n(' ', settings.column_gap));
        }
    }
    out.push('\n');
}

/// Truncate to `width` chars with a trailing ellipsis, or right-pad with spaces.
pub fn fit(value: &str, width: usize) -> String {
    let len = value.chars().count();
    if len > width {
        if width == 0 {
            return String::new();
        }
        let mut s: String = value.chars().take(width - 1).collect();
        s.push(ELLIPSIS);
        s
    } else {
        format!("{value:<width$}")
    }
}
