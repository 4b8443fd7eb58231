use anyhow::Result;
use arrow::{
    array::{ArrayRef, StringArray, TimestampMicrosecondArray, UInt64Array},
    datatypes::{DataType as ArrowDataType, Field, Schema as ArrowSchema, TimeUnit},
    record_batch::RecordBatch,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::{path::PathBuf, sync::Arc};

use crate::history::table_history::{string_at, timestamp_at, u64_at, HistoryRow, TableHistory};
use crate::process::utils::file_safe;

/// Stored in place of a court/judge when the query covered the whole complex.
pub const ALL_COURTS: &str = "All Courts";

/// One completed cause-list lookup. Only the row count is kept, not the rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CauseListQueryRow {
    pub query_key: String,
    pub court_complex: String,
    pub court_number: String,
    pub list_date: String,
    pub list_type: String,
    pub total_cases: u64,
    pub recorded_at: DateTime<Utc>,
}

impl CauseListQueryRow {
    pub fn new(
        court_complex: &str,
        court_number: Option<&str>,
        list_date: &str,
        list_type: &str,
        total_cases: u64,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let court_number = court_number
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(ALL_COURTS);
        let query_key = format!(
            "{}_{}_{}_{}",
            file_safe(court_complex),
            file_safe(list_date),
            file_safe(list_type),
            recorded_at.timestamp_micros()
        );
        Self {
            query_key,
            court_complex: court_complex.to_string(),
            court_number: court_number.to_string(),
            list_date: list_date.to_string(),
            list_type: list_type.to_string(),
            total_cases,
            recorded_at,
        }
    }
}

impl HistoryRow for CauseListQueryRow {
    const KEY_COLUMN: usize = 0;

    fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    fn schema() -> ArrowSchema {
        ArrowSchema::new(vec![
            Field::new("query_key", ArrowDataType::Utf8, false),
            Field::new("court_complex", ArrowDataType::Utf8, false),
            Field::new("court_number", ArrowDataType::Utf8, false),
            Field::new("list_date", ArrowDataType::Utf8, false),
            Field::new("list_type", ArrowDataType::Utf8, false),
            Field::new("total_cases", ArrowDataType::UInt64, false),
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
            Arc::new(StringArray::from(vec![self.court_complex.clone()])),
            Arc::new(StringArray::from(vec![self.court_number.clone()])),
            Arc::new(StringArray::from(vec![self.list_date.clone()])),
            Arc::new(StringArray::from(vec![self.list_type.clone()])),
            Arc::new(UInt64Array::from(vec![self.total_cases])),
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
            court_complex: string_at(batch, 1, row)?,
            court_number: string_at(batch, 2, row)?,
            list_date: string_at(batch, 3, row)?,
            list_type: string_at(batch, 4, row)?,
            total_cases: u64_at(batch, 5, row)?,
            recorded_at: timestamp_at(batch, 6, row)?,
        })
    }
}

impl TableHistory<CauseListQueryRow> {
    pub fn new_cause_list_queries(base: impl Into<PathBuf>) -> Result<Self> {
        TableHistory::new(base, "cause_list_queries")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_missing_court_is_all_courts() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let row = CauseListQueryRow::new("Saket Courts Complex", Some("  "), "10/16/2026", "Civil", 12, at);
        assert_eq!(row.court_number, ALL_COURTS);
        assert_eq!(
            row.query_key,
            format!("Saket_Courts_Complex_10-16-2026_Civil_{}", at.timestamp_micros())
        );
    }

    #[test]
    fn test_round_trip_through_store() {
        let tmp = tempdir().unwrap();
        let hist = TableHistory::<CauseListQueryRow>::new_cause_list_queries(tmp.path()).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 9, 30, 0).unwrap();
        let row = CauseListQueryRow::new(
            "Rohini Courts Complex",
            Some("12 Sh. A K Verma - ASJ"),
            "10/16/2026",
            "Criminal",
            37,
            at,
        );
        hist.add(&row).unwrap();
        assert_eq!(hist.list().unwrap(), vec![row]);
    }
}
