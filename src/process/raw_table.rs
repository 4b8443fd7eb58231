use serde::Serialize;

/// Section label used when no usable heading precedes a table.
pub const DEFAULT_SECTION: &str = "Cases";

/// Placeholder for case-status fields the page does not carry.
pub const NOT_FOUND: &str = "Not Found";

/// Headers emitted for an extracted cause list. The first column always
/// carries the section label.
pub const CAUSE_LIST_HEADERS: [&str; 5] = [
    "Section",
    "Serial Number",
    "Case Type/Case Number/Case Year",
    "Party Name",
    "Advocate",
];

/// One retained cause-list row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CauseListRow {
    /// Heading text found before the row's table, or [`DEFAULT_SECTION`].
    pub section: String,
    /// Cell texts in page order (serial, case identifier, party, advocate, …).
    pub fields: Vec<String>,
}

impl CauseListRow {
    /// Section label followed by the field values.
    pub fn to_record(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.fields.len() + 1);
        out.push(self.section.clone());
        out.extend(self.fields.iter().cloned());
        out
    }
}

/// Why a `<table>` was kept or skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TableVerdict {
    TooFewRows,
    Calendar { reason: String },
    NotRelevant,
    Accepted { section: String, rows: usize },
}

impl TableVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, TableVerdict::Accepted { .. })
    }
}

/// The outcome of running the classifier over a page.
#[derive(Debug, Clone, Serialize)]
pub struct CauseList {
    pub headers: Vec<String>,
    pub rows: Vec<CauseListRow>,
    /// One entry per `<table>` on the page, in document order.
    pub verdicts: Vec<TableVerdict>,
}

impl CauseList {
    /// Rows flattened to `[section, fields...]`.
    pub fn records(&self) -> Vec<Vec<String>> {
        self.rows.iter().map(CauseListRow::to_record).collect()
    }

    /// Row counts per section, in order of first appearance.
    pub fn section_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = Vec::new();
        for row in &self.rows {
            match counts.iter_mut().find(|(s, _)| *s == row.section) {
                Some((_, n)) => *n += 1,
                None => counts.push((row.section.clone(), 1)),
            }
        }
        counts
    }
}

/// The parsed subset of a case-status result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaseDetails {
    pub parties: String,
    pub filing_date: String,
    pub status: String,
}

impl CaseDetails {
    /// `(field name, value)` pairs in export order.
    pub fn fields(&self) -> [(&'static str, &str); 3] {
        [
            ("parties", self.parties.as_str()),
            ("filing_date", self.filing_date.as_str()),
            ("status", self.status.as_str()),
        ]
    }
}
