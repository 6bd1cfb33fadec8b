//! Normalizer for the pivoted schedule export.
//!
//! The source is a wide, human-maintained table: one row per
//! (date, shift, company, vessel, batch) with one column per job-role code,
//! each cell holding at most one worker id. [`despivot`] turns each wide row
//! into zero or more [`ScheduleAssignment`] records, one per occupied role
//! cell. Malformed rows are counted and skipped, never fatal; the sheet is
//! known to contain stray header rows, blanks and typos.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::csv::Csv;
use crate::model::{Origin, Role, ScheduleAssignment, ShiftCode};

/// Rows with fewer fields than this are skipped outright.
pub const MIN_ROW_FIELDS: usize = 5;

static SOURCE_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{2,4}$").expect("valid date regex"));

/// Accepted header spellings per semantic field. Export generations disagree
/// on naming, so matching goes through this table instead of ad hoc string
/// checks.
const HEADER_SYNONYMS: &[(Field, &[&str])] = &[
    (Field::Date, &["fecha", "fc", "date"]),
    (Field::Shift, &["jornada", "cshorario", "horario", "turno"]),
    (Field::Company, &["empresa", "nomcliabr", "cliente", "client"]),
    (Field::Batch, &["parte", "part"]),
    (Field::Vessel, &["buque", "ship", "vessel"]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Date,
    Shift,
    Company,
    Batch,
    Vessel,
}

#[derive(Debug, Clone, Copy, Default)]
struct Columns {
    date: Option<usize>,
    shift: Option<usize>,
    company: Option<usize>,
    batch: Option<usize>,
    vessel: Option<usize>,
}

/// Why a source row yielded no assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    TooShort,
    BadDate,
    BadShift,
    BadBatch,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    /// 0-based index into the parsed data rows.
    pub row: usize,
    pub reason: RejectReason,
}

#[derive(Debug, Default)]
pub struct DespivotOutcome {
    pub assignments: Vec<ScheduleAssignment>,
    pub processed: usize,
    pub rejected: usize,
    pub rejections: Vec<RowRejection>,
}

fn map_columns(headers: &[String]) -> (Columns, Vec<(Role, usize)>) {
    let mut cols = Columns::default();
    let mut roles = Vec::new();

    for (idx, header) in headers.iter().enumerate() {
        let lower = header.trim().to_lowercase();
        for (field, spellings) in HEADER_SYNONYMS {
            if spellings.contains(&lower.as_str()) {
                let slot = match field {
                    Field::Date => &mut cols.date,
                    Field::Shift => &mut cols.shift,
                    Field::Company => &mut cols.company,
                    Field::Batch => &mut cols.batch,
                    Field::Vessel => &mut cols.vessel,
                };
                if slot.is_none() {
                    *slot = Some(idx);
                }
            }
        }
        if let Some(role) = Role::from_code(header.trim().to_uppercase().as_str()) {
            roles.push((role, idx));
        }
    }
    (cols, roles)
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i))
        .map(String::as_str)
        .unwrap_or("")
}

/// Parse a `D/M/YY` or `D/M/YYYY` source date into a calendar-checked
/// [`NaiveDate`]. Two-digit years are expanded into the 2000s. Anything else
/// (ISO dates included) is rejected.
pub fn parse_source_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if !SOURCE_DATE_RE.is_match(trimmed) {
        return None;
    }
    let mut parts = trimmed.split('/');
    let day: u32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let year_raw = parts.next()?;
    let year: i32 = if year_raw.len() == 2 {
        format!("20{year_raw}").parse().ok()?
    } else {
        year_raw.parse().ok()?
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Admit a role cell as a worker id: trimmed, fully numeric and positive.
/// The id is kept as the trimmed string so leading zeros survive.
fn worker_id(cellv: &str) -> Option<String> {
    let trimmed = cellv.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<u64>() {
        Ok(n) if n > 0 => Some(trimmed.to_string()),
        _ => None,
    }
}

/// The despivot: one wide row with N role columns becomes 0..N narrow
/// assignment records sharing the row's date/shift/company/vessel/batch.
pub fn despivot(csv: &Csv) -> DespivotOutcome {
    let (cols, roles) = map_columns(&csv.headers);
    let mut out = DespivotOutcome::default();

    for (row_idx, row) in csv.rows.iter().enumerate() {
        out.processed += 1;

        let reject = |out: &mut DespivotOutcome, reason| {
            out.rejected += 1;
            out.rejections.push(RowRejection {
                row: row_idx,
                reason,
            });
        };

        if row.len() < MIN_ROW_FIELDS {
            reject(&mut out, RejectReason::TooShort);
            continue;
        }

        let Some(date) = parse_source_date(cell(row, cols.date)) else {
            reject(&mut out, RejectReason::BadDate);
            continue;
        };

        let Some(shift) = ShiftCode::from_raw(cell(row, cols.shift)) else {
            reject(&mut out, RejectReason::BadShift);
            continue;
        };

        let batch_raw = cell(row, cols.batch).trim();
        let batch_ok = batch_raw.parse::<u64>().map(|n| n > 0).unwrap_or(false);
        if !batch_ok {
            reject(&mut out, RejectReason::BadBatch);
            continue;
        }

        let company = cell(row, cols.company).trim().to_string();
        let vessel = {
            let v = cell(row, cols.vessel).trim();
            if v.is_empty() { "--".to_string() } else { v.to_string() }
        };

        for (role, idx) in &roles {
            let Some(id) = worker_id(cell(row, Some(*idx))) else {
                continue;
            };
            out.assignments.push(ScheduleAssignment {
                date,
                worker_id: id,
                role: *role,
                shift,
                company: company.clone(),
                vessel: vessel.clone(),
                batch_number: batch_raw.to_string(),
                origin: Origin::Csv,
            });
        }
    }

    debug!(
        processed = out.processed,
        rejected = out.rejected,
        assignments = out.assignments.len(),
        "despivot finished"
    );
    out
}
