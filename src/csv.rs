//! Line-oriented CSV parsing tuned for published spreadsheet exports.
//!
//! Two parsers live here. [`parse`] is the common one: one record per line,
//! quote-aware field splitting. [`parse_records`] is the stricter
//! character-walking variant for sources whose free-text columns legitimately
//! contain line breaks inside quoted fields (the message board export).

/// Parsed CSV: the first non-blank line as headers, every later line as a
/// row of string fields. Rows shorter than the header are passed through;
/// rejecting them is the normalizers' call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Csv {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Split raw CSV text into headers and rows. Blank lines are dropped, header
/// names are trimmed and stripped of surrounding quotes.
pub fn parse(raw: &str) -> Csv {
    let mut lines = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty());

    let Some(header_line) = lines.next() else {
        return Csv::default();
    };
    let headers = split_line(header_line)
        .into_iter()
        .map(|h| h.trim_matches('"').trim().to_string())
        .collect();
    let rows = lines.map(split_line).collect();

    Csv { headers, rows }
}

/// Split one line on commas outside quotes. A doubled quote inside a quoted
/// field is a literal quote. Fields come back trimmed.
fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Parse full records honoring newlines embedded in quoted fields. Returns
/// every record including the header row; `\r\n` and bare `\r` both
/// terminate a record outside quotes.
pub fn parse_records(raw: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if in_quotes && chars.peek() == Some(&'"') {
                    field.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => {
                row.push(field.trim().to_string());
                field.clear();
            }
            '\r' | '\n' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                if !field.is_empty() || !row.is_empty() {
                    row.push(field.trim().to_string());
                    field.clear();
                    records.push(std::mem::take(&mut row));
                }
            }
            _ => field.push(c),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field.trim().to_string());
        records.push(row);
    }
    records
}

/// Parse a number that may use the European decimal comma ("12,5").
pub fn parse_decimal_eu(value: &str) -> Option<f64> {
    let normalized = value.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }
    normalized.parse().ok()
}
