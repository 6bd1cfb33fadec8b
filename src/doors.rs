//! Parser for the door-cutoff sheet ("puertas").
//!
//! The export is a loose grid, not a clean table: the report date floats
//! somewhere in the first few lines, banner rows with operator warnings are
//! interleaved, and each shift row carries the primary-range and
//! secondary-range cutoffs at fixed column offsets. Parsed fresh on every
//! query; never persisted.

use chrono::NaiveDate;

use crate::model::{DoorCutoff, ShiftCode};
use crate::schedule::parse_source_date;

/// Column offsets in a shift row.
const SHIFT_COL: usize = 2;
const PRIMARY_COL: usize = 3;
const SECONDARY_COL: usize = 4;
/// Shift rows have at least this many columns; anything narrower is layout
/// chrome around the grid.
const MIN_DOOR_COLUMNS: usize = 7;
/// Lines to scan for the report date.
const DATE_SCAN_LINES: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DoorReport {
    pub date: Option<NaiveDate>,
    /// One entry per shift code, in the fixed shift order, including shifts
    /// with no cutoff reported yet.
    pub cutoffs: Vec<DoorCutoff>,
}

fn split_plain(line: &str) -> Vec<String> {
    line.split(',')
        .map(|c| c.trim().trim_matches('"').trim().to_string())
        .collect()
}

fn positive_int(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|n| *n > 0)
}

fn find_report_date(lines: &[&str]) -> Option<NaiveDate> {
    for line in lines.iter().take(DATE_SCAN_LINES) {
        for col in split_plain(line) {
            if let Some(date) = parse_source_date(&col) {
                return Some(date);
            }
        }
    }
    None
}

/// Parse the raw door CSV into per-shift cutoffs. For each shift the first
/// non-empty value per door column wins; later duplicates are ignored.
pub fn parse_doors(raw: &str) -> DoorReport {
    let lines: Vec<&str> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    let date = find_report_date(&lines);

    let mut cutoffs: Vec<DoorCutoff> = ShiftCode::ALL
        .iter()
        .map(|shift| DoorCutoff {
            shift: *shift,
            primary: None,
            secondary: None,
        })
        .collect();

    for line in &lines {
        // Operator warning banners share the grid; skip them.
        if line.contains("No se admiten") || line.contains("!!") {
            continue;
        }
        let columns = split_plain(line);
        if columns.len() < MIN_DOOR_COLUMNS {
            continue;
        }

        // The shift label may carry a trailing note ("Festivo 2"); only the
        // first whitespace token identifies it.
        let label = columns[SHIFT_COL]
            .split_whitespace()
            .next()
            .unwrap_or("");
        let Some(shift) = ShiftCode::from_raw(label) else {
            continue;
        };
        let Some(entry) = cutoffs.iter_mut().find(|c| c.shift == shift) else {
            continue;
        };

        if entry.primary.is_none() {
            entry.primary = positive_int(&columns[PRIMARY_COL]);
        }
        if entry.secondary.is_none() {
            entry.secondary = positive_int(&columns[SECONDARY_COL]);
        }
    }

    DoorReport { date, cutoffs }
}
