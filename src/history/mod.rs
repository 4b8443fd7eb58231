// src/history/mod.rs

pub mod case_query;
pub mod cause_list_query;
pub mod table_history;

use anyhow::{Context, Result};
use std::{fs, path::PathBuf};
use tracing::info;

pub use case_query::CaseQueryRow;
pub use cause_list_query::{CauseListQueryRow, ALL_COURTS};
pub use table_history::{HistoryRow, TableHistory};

/// Both query logs, rooted at one data directory.
pub struct History {
    pub case_queries: TableHistory<CaseQueryRow>,
    pub cause_list_queries: TableHistory<CauseListQueryRow>,
}

impl History {
    pub fn open(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("creating data directory {:?}", &data_dir))?;
        Ok(Self {
            case_queries: TableHistory::new_case_queries(&data_dir)?,
            cause_list_queries: TableHistory::new_cause_list_queries(&data_dir)?,
        })
    }

    pub fn save_case_query(&self, row: &CaseQueryRow) -> Result<()> {
        self.case_queries
            .add(row)
            .with_context(|| format!("saving case query {}", row.query_key))?;
        info!(key = %row.query_key, "case query recorded");
        Ok(())
    }

    pub fn save_cause_list_query(&self, row: &CauseListQueryRow) -> Result<()> {
        self.cause_list_queries
            .add(row)
            .with_context(|| format!("saving cause list query {}", row.query_key))?;
        info!(key = %row.query_key, total = row.total_cases, "cause list query recorded");
        Ok(())
    }

    /// Merge loose single-row files in both tables; returns files merged.
    pub fn vacuum(&self) -> Result<usize> {
        let merged = self.case_queries.vacuum()? + self.cause_list_queries.vacuum()?;
        info!(merged, "history vacuumed");
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CaseDetails;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    #[test]
    fn test_tables_are_independent() {
        let tmp = tempdir().unwrap();
        let data_dir = tmp.path().join("data");
        let history = History::open(&data_dir).unwrap();
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 10, 0, 0).unwrap();

        let details = CaseDetails {
            parties: "A Vs B".into(),
            filing_date: "01-01-2024".into(),
            status: "Disposed".into(),
        };
        history
            .save_case_query(&CaseQueryRow::new("CS", "7", 2024, &details, String::new(), at))
            .unwrap();
        history
            .save_cause_list_query(&CauseListQueryRow::new("Saket", None, "10/16/2026", "Civil", 3, at))
            .unwrap();

        assert_eq!(history.case_queries.list().unwrap().len(), 1);
        assert_eq!(history.cause_list_queries.list().unwrap().len(), 1);
        assert!(data_dir.join("case_queries").join("date=20261016").is_dir());
        assert!(data_dir.join("cause_list_queries").join("date=20261016").is_dir());
        assert_eq!(history.vacuum().unwrap(), 2);
    }
}
