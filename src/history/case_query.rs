use anyhow::Result;
use arrow::{
    array::{ArrayRef, Int32Array, StringArray, TimestampMicrosecondArray},
    datatypes::{DataType as ArrowDataType, Field, Schema as ArrowSchema, TimeUnit},
    record_batch::RecordBatch,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};

use crate::history::table_history::{i32_at, string_at, timestamp_at, HistoryRow, TableHistory};
use crate::process::{utils::file_safe, CaseDetails};

/// One completed case-status lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseQueryRow {
    pub query_key: String,
    pub case_type: String,
    pub case_number: String,
    pub case_year: i32,
    pub parties: String,
    pub filing_date: String,
    pub case_status: String,
    #[serde(skip_serializing)]
    pub raw_html: String,
    pub recorded_at: DateTime<Utc>,
}

impl CaseQueryRow {
    pub fn new(
        case_type: &str,
        case_number: &str,
        case_year: i32,
        details: &CaseDetails,
        raw_html: String,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let query_key = format!(
            "{}_{}_{}_{}",
            file_safe(case_type),
            file_safe(case_number),
            case_year,
            recorded_at.timestamp_micros()
        );
        Self {
            query_key,
            case_type: case_type.to_string(),
            case_number: case_number.to_string(),
            case_year,
            parties: details.parties.clone(),
            filing_date: details.filing_date.clone(),
            case_status: details.status.clone(),
            raw_html,
            recorded_at,
        }
    }
}

impl HistoryRow for CaseQueryRow {
    const KEY_COLUMN: usize = 0;

    fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    fn schema() -> ArrowSchema {
        ArrowSchema::new(vec![
            Field::new("query_key", ArrowDataType::Utf8, false),
            Field::new("case_type", ArrowDataType::Utf8, false),
            Field::new("case_number", ArrowDataType::Utf8, false),
            Field::new("case_year", ArrowDataType::Int32, false),
            Field::new("parties", ArrowDataType::Utf8, false),
            Field::new("filing_date", ArrowDataType::Utf8, false),
            Field::new("case_status", ArrowDataType::Utf8, false),
            Field::new("raw_html", ArrowDataType::Utf8, false),
            Field::new(
                "recorded_at",
                ArrowDataType::Timestamp(TimeUnit::Microsecond, None),
                false,
            ),
        ])
    }

    fn to_arrays(&self) -> Vec<ArrayRef> {
        vec![
            Arc::new(StringArray::from(vec![self.query_key.clone()])),
            Arc::new(StringArray::from(vec![self.case_type.clone()])),
            Arc::new(StringArray::from(vec![self.case_number.clone()])),
            Arc::new(Int32Array::from(vec![self.case_year])),
            Arc::new(StringArray::from(vec![self.parties.clone()])),
            Arc::new(StringArray::from(vec![self.filing_date.clone()])),
            Arc::new(StringArray::from(vec![self.case_status.clone()])),
            Arc::new(StringArray::from(vec![self.raw_html.clone()])),
            Arc::new(TimestampMicrosecondArray::from(vec![self
                .recorded_at
                .timestamp_micros()])),
        ]
    }

    fn unique_key(&self) -> String {
        self.query_key.clone()
    }

    fn from_batch(batch: &RecordBatch, row: usize) -> Result<Self> {
        Ok(Self {
            query_key: string_at(batch, 0, row)?,
            case_type: string_at(batch, 1, row)?,
            case_number: string_at(batch, 2, row)?,
            case_year: i32_at(batch, 3, row)?,
            parties: string_at(batch, 4, row)?,
            filing_date: string_at(batch, 5, row)?,
            case_status: string_at(batch, 6, row)?,
            raw_html: string_at(batch, 7, row)?,
            recorded_at: timestamp_at(batch, 8, row)?,
        })
    }
}

impl TableHistory<CaseQueryRow> {
    pub fn new_case_queries(base: impl Into<PathBuf>) -> Result<Self> {
        TableHistory::new(base, "case_queries")
    }
}
