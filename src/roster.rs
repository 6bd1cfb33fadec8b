//! Normalizer for the census grid export.
//!
//! The sheet lays the rotation queue out visually: data rows 6..=55 split
//! into 11 side-by-side column triples of (position, worker id, color code).
//! The traversal order here — triple by triple left to right, rows top to
//! bottom within each triple — IS the queue order; the position column in
//! the sheet is hand-maintained and known-unreliable, so it is discarded and
//! a fresh sequential index is assigned instead.

use thiserror::Error;
use tracing::debug;

use crate::csv::Csv;
use crate::model::{RosterEntry, StatusColor};

/// First data row of the grid, 0-based index into the parsed rows.
pub const DATA_ROW_START: usize = 5;
/// One past the last data row.
pub const DATA_ROW_END: usize = 55;
/// Number of side-by-side (position, worker, color) column triples.
pub const GROUP_COUNT: usize = 11;

#[derive(Debug, Error)]
pub enum RosterError {
    /// The export is truncated; replacing the snapshot from it would wipe
    /// most of the roster.
    #[error("census export truncated: {rows} rows, expected at least {DATA_ROW_END}")]
    Truncated { rows: usize },
}

#[derive(Debug, Default)]
pub struct RosterOutcome {
    pub entries: Vec<RosterEntry>,
    /// Cells skipped for failing validation (empty, non-numeric worker,
    /// color outside 0..=4).
    pub skipped_cells: usize,
}

/// Flatten the grid into one ordered roster. Positions are `1..=N` in
/// traversal order, contiguous, with no gaps.
pub fn flatten(csv: &Csv) -> Result<RosterOutcome, RosterError> {
    if csv.rows.len() < DATA_ROW_END {
        return Err(RosterError::Truncated {
            rows: csv.rows.len(),
        });
    }

    let data_rows = &csv.rows[DATA_ROW_START..DATA_ROW_END];
    let mut out = RosterOutcome::default();
    let mut position = 1i64;

    for group in 0..GROUP_COUNT {
        let worker_col = group * 3 + 1;
        let color_col = group * 3 + 2;

        for row in data_rows {
            let worker_raw = row.get(worker_col).map(String::as_str).unwrap_or("").trim();
            let color_raw = row.get(color_col).map(String::as_str).unwrap_or("").trim();
            if worker_raw.is_empty() || color_raw.is_empty() {
                out.skipped_cells += 1;
                continue;
            }

            let worker_ok = worker_raw.parse::<u64>().map(|n| n > 0).unwrap_or(false);
            let color = color_raw.parse::<i64>().ok().and_then(StatusColor::from_code);
            let (true, Some(color)) = (worker_ok, color) else {
                out.skipped_cells += 1;
                continue;
            };

            out.entries.push(RosterEntry {
                position,
                worker_id: worker_raw.to_string(),
                color,
            });
            position += 1;
        }
    }

    debug!(
        entries = out.entries.len(),
        skipped = out.skipped_cells,
        "census flattened"
    );
    Ok(out)
}
