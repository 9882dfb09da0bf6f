//! CSV parser - raw statement text to a RawTable plus a column guess

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::domain::result::{ParseError, Result};
use crate::domain::{ColumnMapping, ParsedCsv, RawTable};
use crate::services::normalizer::parse_amount;

/// Candidate delimiters, in tie-break preference order
pub const DELIMITERS: [u8; 3] = [b',', b';', b'\t'];

/// Lines inspected when choosing a delimiter
const DELIMITER_SAMPLE_LINES: usize = 20;

/// Data rows inspected when guessing column roles
const DETECTION_SAMPLE_ROWS: usize = 20;

/// Default number of rows returned in `sample_data`
pub const DEFAULT_PREVIEW_ROWS: usize = 10;

/// Header keywords per role, most specific first
const DATE_KEYWORDS: &[&str] = &["data", "date", "dt."];
const DESCRIPTION_KEYWORDS: &[&str] = &[
    "histórico",
    "historico",
    "descrição",
    "descricao",
    "description",
    "estabelecimento",
    "detalhe",
    "memo",
    "payee",
];
const VALUE_KEYWORDS: &[&str] = &["valor", "value", "amount", "quantia"];

/// Parse statement text into a table
///
/// The first non-blank line is the header row. Fully blank lines are
/// skipped and every cell is trimmed.
pub fn parse(text: &str) -> Result<RawTable> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(ParseError::EmptyOrMalformedInput.into());
    }

    let delimiter = detect_delimiter(text).ok_or(ParseError::EmptyOrMalformedInput)?;
    let mut records = read_records(text, delimiter);

    let headers = records.next().ok_or(ParseError::EmptyOrMalformedInput)?;
    let mut table = RawTable::new(headers);
    for record in records {
        table.push_row(record);
    }

    Ok(table)
}

/// Pick the delimiter giving the most consistent column count
///
/// Each candidate splits the first lines of the file; the score is how many
/// of those lines share the modal field count, which must be at least 2.
/// Ties keep the earlier candidate in [`DELIMITERS`].
pub fn detect_delimiter(text: &str) -> Option<u8> {
    let mut best: Option<(u8, usize)> = None;

    for delimiter in DELIMITERS {
        let widths: Vec<usize> = read_records(text, delimiter)
            .take(DELIMITER_SAMPLE_LINES)
            .map(|r| r.len())
            .collect();

        let Some((modal_width, score)) = modal(&widths) else {
            continue;
        };
        if modal_width < 2 {
            continue;
        }

        match best {
            Some((_, best_score)) if best_score >= score => {}
            _ => best = Some((delimiter, score)),
        }
    }

    best.map(|(delimiter, _)| delimiter)
}

/// Most frequent width and its frequency; equal frequencies favour the wider
fn modal(widths: &[usize]) -> Option<(usize, usize)> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for w in widths {
        *counts.entry(*w).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(wa, ca), (wb, cb)| ca.cmp(cb).then(wa.cmp(wb)))
}

/// Non-blank records of `text` split on `delimiter`
fn read_records(text: &str, delimiter: u8) -> impl Iterator<Item = Vec<String>> + '_ {
    let reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    reader
        .into_records()
        .filter_map(|r| r.ok())
        .map(|record| record.iter().map(|s| s.to_string()).collect::<Vec<_>>())
        .filter(|cells| cells.iter().any(|c| !c.is_empty()))
}

/// Best-effort guess of the date, value and description columns
///
/// Purely advisory: callers merge it under whatever the user picked. A
/// header keyword claims a date or value column only when its cells agree;
/// otherwise the roles come from the cell contents alone.
pub fn detect_columns(table: &RawTable) -> ColumnMapping {
    let width = table.width();
    let headers = table.headers();

    let date = header_match(headers, DATE_KEYWORDS, &[])
        .filter(|&i| column_majority(table, i, is_date_like))
        .or_else(|| (0..width).find(|&i| column_majority(table, i, is_date_like)));

    let is_amount = |cell: &str| parse_amount(cell).is_some();
    let value = header_match(headers, VALUE_KEYWORDS, &[date])
        .filter(|&i| column_majority(table, i, is_amount))
        .or_else(|| {
            (0..width)
                .filter(|&i| Some(i) != date)
                .find(|&i| column_majority(table, i, is_amount))
        });

    let description = header_match(headers, DESCRIPTION_KEYWORDS, &[date, value])
        .or_else(|| longest_text_column(table, &[date, value]));

    ColumnMapping {
        date,
        description,
        value,
    }
}

/// First header containing one of `keywords`, trying keywords in order
fn header_match(headers: &[String], keywords: &[&str], taken: &[Option<usize>]) -> Option<usize> {
    let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
    keywords.iter().find_map(|keyword| {
        lowered
            .iter()
            .enumerate()
            .filter(|(i, _)| !taken.contains(&Some(*i)))
            .find(|(_, header)| header.contains(keyword))
            .map(|(i, _)| i)
    })
}

/// Column with the highest average cell length; the first wins ties
fn longest_text_column(table: &RawTable, taken: &[Option<usize>]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for i in (0..table.width()).filter(|i| !taken.contains(&Some(*i))) {
        let lengths: Vec<usize> = table
            .column_sample(i, DETECTION_SAMPLE_ROWS)
            .map(|cell| cell.chars().count())
            .collect();
        if lengths.is_empty() {
            continue;
        }
        let average = lengths.iter().sum::<usize>() as f64 / lengths.len() as f64;
        if average <= 0.0 {
            continue;
        }
        match best {
            Some((_, longest)) if longest >= average => {}
            _ => best = Some((i, average)),
        }
    }
    best.map(|(i, _)| i)
}

/// Whether a strict majority of the column's non-empty sampled cells match
fn column_majority(table: &RawTable, index: usize, predicate: impl Fn(&str) -> bool) -> bool {
    let mut total = 0;
    let mut matching = 0;
    for cell in table.column_sample(index, DETECTION_SAMPLE_ROWS) {
        if cell.is_empty() {
            continue;
        }
        total += 1;
        if predicate(cell) {
            matching += 1;
        }
    }
    total > 0 && matching * 2 > total
}

fn date_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\d{1,4}[/.\-]\d{1,2}[/.\-]\d{1,4}$").unwrap())
}

/// Date-looking cell: digits split by the same separator twice
/// (`01/05/2024`, `2024-05-01`, `01.05.24`). A trailing time is ignored.
pub fn is_date_like(cell: &str) -> bool {
    let token = cell.split_whitespace().next().unwrap_or("");
    if !(6..=10).contains(&token.len()) || !date_regex().is_match(token) {
        return false;
    }

    let separators: Vec<char> = token.chars().filter(|c| !c.is_ascii_digit()).collect();
    let digits = token.chars().filter(|c| c.is_ascii_digit()).count();
    separators.len() == 2 && separators[0] == separators[1] && digits >= 4
}

/// Build the upload response for a parsed table
pub fn summarize(table: &RawTable, preview_rows: usize) -> ParsedCsv {
    ParsedCsv {
        headers: table.headers().to_vec(),
        sample_data: table.rows().iter().take(preview_rows).cloned().collect(),
        total_rows: table.len(),
        detected_columns: detect_columns(table),
    }
}
