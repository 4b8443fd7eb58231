// src/process/classify.rs
//
// Decides whether a scraped `<table>` is a cause listing, a calendar widget,
// or something else, and pulls the usable rows out of the listings.

use once_cell::sync::Lazy;
use regex::Regex;

use super::raw_table::TableVerdict;
use super::utils::{is_day_number, is_short_number};

const MONTHS: &[&str] = &[
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "sept", "oct", "nov", "dec",
    "january", "february", "march", "april", "june", "july", "august", "september", "october",
    "november", "december",
];

const HEADER_KEYWORDS: &[&str] = &[
    "serial",
    "case",
    "party",
    "advocate",
    "petitioner",
    "respondent",
];

/// Share of day-number cells above which a first data row reads as a calendar week.
const CALENDAR_DAY_RATIO: f64 = 0.7;

/// Minimum `td` cells for a data row to be considered at all.
const MIN_ROW_CELLS: usize = 3;
/// Minimum non-empty cells for a data row to be kept.
const MIN_FILLED_CELLS: usize = 2;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]+").expect("word regex"));

/// One `<tr>` as seen by the classifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlRow {
    /// Text of every `th`/`td`, used when this row is the header.
    pub header_cells: Vec<String>,
    /// Text of every `td`, used when this row is data.
    pub data_cells: Vec<String>,
}

impl HtmlRow {
    /// A row whose cells are all `td`.
    pub fn data<S: AsRef<str>>(cells: &[S]) -> Self {
        let cells: Vec<String> = cells.iter().map(|c| c.as_ref().to_string()).collect();
        Self {
            header_cells: cells.clone(),
            data_cells: cells,
        }
    }

    /// A row whose cells are all `th`.
    pub fn header<S: AsRef<str>>(cells: &[S]) -> Self {
        Self {
            header_cells: cells.iter().map(|c| c.as_ref().to_string()).collect(),
            data_cells: Vec::new(),
        }
    }

    fn header_text(&self) -> String {
        self.header_cells.join(" ")
    }
}

/// Calendar check on the header row and the first data row.
/// Returns the reason when the table looks like a date picker.
pub fn calendar_reason(rows: &[HtmlRow]) -> Option<String> {
    let header = rows.first()?;
    let header_lc = header.header_text().to_lowercase();
    if let Some(m) = WORD
        .find_iter(&header_lc)
        .map(|w| w.as_str())
        .find(|w| MONTHS.contains(w))
    {
        return Some(format!("header names month `{}`", m));
    }

    let first = rows.get(1)?;
    if first.data_cells.is_empty() {
        return None;
    }
    let days = first
        .data_cells
        .iter()
        .filter(|c| is_day_number(c))
        .count();
    if days as f64 > first.data_cells.len() as f64 * CALENDAR_DAY_RATIO {
        return Some(format!(
            "{} of {} cells in the first row are day numbers",
            days,
            first.data_cells.len()
        ));
    }
    None
}

/// Keyword check on the header, with the case-identifier punctuation
/// fallback on the first data row.
pub fn is_relevant(rows: &[HtmlRow]) -> bool {
    let Some(header) = rows.first() else {
        return false;
    };
    if !header.header_cells.is_empty() {
        let text = header.header_text().to_lowercase();
        if HEADER_KEYWORDS.iter().any(|k| text.contains(k)) {
            return true;
        }
    }

    match rows.get(1) {
        Some(first) => looks_like_case_row(&first.data_cells.join(" ")),
        None => false,
    }
}

fn looks_like_case_row(sample: &str) -> bool {
    if sample.contains('/') || sample.contains('(') || sample.contains(')') {
        return true;
    }
    let lc = sample.to_lowercase();
    lc.contains("vs") || lc.contains("v/s")
}

/// Data rows worth keeping: at least three cells, at least two of them
/// filled, and not just a run of day numbers.
pub fn retained_rows(rows: &[HtmlRow]) -> Vec<Vec<String>> {
    rows.iter()
        .skip(1)
        .filter(|r| r.data_cells.len() >= MIN_ROW_CELLS)
        .filter_map(|r| {
            let filled: Vec<&String> = r.data_cells.iter().filter(|c| !c.is_empty()).collect();
            if filled.len() < MIN_FILLED_CELLS {
                return None;
            }
            if filled.iter().all(|c| is_short_number(c)) {
                return None;
            }
            Some(r.data_cells.clone())
        })
        .collect()
}

/// Full verdict for one table. `section` is the label already resolved
/// for it; accepted rows are returned alongside.
pub fn classify(rows: &[HtmlRow], section: &str) -> (TableVerdict, Vec<Vec<String>>) {
    if rows.len() < 2 {
        return (TableVerdict::TooFewRows, Vec::new());
    }
    if let Some(reason) = calendar_reason(rows) {
        return (TableVerdict::Calendar { reason }, Vec::new());
    }
    if !is_relevant(rows) {
        return (TableVerdict::NotRelevant, Vec::new());
    }
    let kept = retained_rows(rows);
    (
        TableVerdict::Accepted {
            section: section.to_string(),
            rows: kept.len(),
        },
        kept,
    )
}
