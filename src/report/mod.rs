// src/report/mod.rs
//
// Turning fetched results into CSV and PDF exports.

pub mod csv;
pub mod layout;
pub mod pdf;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::process::raw_table::CAUSE_LIST_HEADERS;
use crate::process::utils::file_safe;
use crate::process::{normalize_columns, CaseDetails, CauseList};
use layout::PageSpec;

const GENERATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Headers plus rows, all the same width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// What follows the metadata block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    /// The exported table itself, grouped into one table per section when
    /// `section_column` is set.
    Records { section_column: Option<usize> },
    /// A two-column table of the exported row's values.
    KeyValues {
        heading: String,
        pairs: Vec<(String, String)>,
    },
}

#[derive(Debug, Clone)]
pub struct Report {
    pub title: String,
    pub title_size: f32,
    pub page: PageSpec,
    pub metadata: Vec<(String, String)>,
    /// Key and value column widths, in inches.
    pub metadata_widths: [f32; 2],
    pub metadata_size: f32,
    pub body: Body,
    /// What goes into the CSV file.
    pub export: Table,
}

/// How a cause list was asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CauseListMeta {
    pub court_complex: String,
    pub date: String,
    pub list_type: String,
}

/// Which case a case-status report is about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseMeta {
    pub case_type: String,
    pub case_number: String,
    pub case_year: i32,
}

/// `filing_date` -> `Filing Date`.
fn title_case(field: &str) -> String {
    field
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

impl Report {
    pub fn cause_list(list: &CauseList, meta: &CauseListMeta, generated_on: NaiveDateTime) -> Self {
        let normalized = normalize_columns(&list.headers, &list.records());
        let section_column = normalized
            .headers
            .iter()
            .position(|h| h == CAUSE_LIST_HEADERS[0]);

        Self {
            title: format!("{} Cause List Report", meta.list_type),
            title_size: 16.0,
            page: PageSpec::A4,
            metadata: vec![
                ("Court Complex".into(), meta.court_complex.clone()),
                ("Date".into(), meta.date.clone()),
                ("List Type".into(), meta.list_type.clone()),
                ("Total Cases".into(), normalized.rows.len().to_string()),
                (
                    "Generated On".into(),
                    generated_on.format(GENERATED_FORMAT).to_string(),
                ),
            ],
            metadata_widths: [1.5, 4.5],
            metadata_size: 8.0,
            body: Body::Records { section_column },
            export: Table {
                headers: normalized.headers,
                rows: normalized.rows,
            },
        }
    }

    pub fn case_details(details: &CaseDetails, case: &CaseMeta, generated_on: NaiveDateTime) -> Self {
        let fields = details.fields();
        Self {
            title: "Case Details Report".into(),
            title_size: 24.0,
            page: PageSpec::LETTER,
            metadata: vec![
                ("Case Type".into(), case.case_type.clone()),
                ("Case Number".into(), case.case_number.clone()),
                ("Case Year".into(), case.case_year.to_string()),
                (
                    "Generated On".into(),
                    generated_on.format(GENERATED_FORMAT).to_string(),
                ),
            ],
            metadata_widths: [2.0, 4.0],
            metadata_size: 10.0,
            body: Body::KeyValues {
                heading: "Fetched Information".into(),
                pairs: fields
                    .iter()
                    .map(|(k, v)| (title_case(k), v.to_string()))
                    .collect(),
            },
            export: Table {
                headers: fields.iter().map(|(k, _)| k.to_string()).collect(),
                rows: vec![fields.iter().map(|(_, v)| v.to_string()).collect()],
            },
        }
    }
}

pub fn case_file_stem(case_type: &str, case_number: &str, case_year: i32) -> String {
    format!(
        "case_{}_{}_{}",
        file_safe(case_type),
        file_safe(case_number),
        case_year
    )
}

pub fn cause_list_file_stem(court_complex: &str, date: &str, list_type: &str) -> String {
    format!(
        "cause_list_{}_{}_{}",
        file_safe(court_complex),
        file_safe(date),
        file_safe(list_type)
    )
}

/// Paths of one report's CSV and PDF files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exported {
    pub csv: PathBuf,
    pub pdf: PathBuf,
}

/// Write `<dir>/<stem>.csv` and `<dir>/<stem>.pdf`.
#[tracing::instrument(level = "info", skip(report), fields(title = %report.title))]
pub fn export(report: &Report, dir: &Path, stem: &str) -> Result<Exported> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let csv = dir.join(format!("{}.csv", stem));
    csv::write_csv(&report.export, &csv)?;

    let pdf = dir.join(format!("{}.pdf", stem));
    let pages = layout::lay_out(report);
    pdf::write_pdf(&pages, &report.page, &pdf)?;

    info!(csv = %csv.display(), pdf = %pdf.display(), pages = pages.len(), "report exported");
    Ok(Exported { csv, pdf })
}
