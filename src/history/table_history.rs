use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Int32Array, StringArray, TimestampMicrosecondArray, UInt64Array},
    datatypes::Schema as ArrowSchema,
    record_batch::RecordBatch,
};
use chrono::{DateTime, NaiveDate, Utc};
use glob::glob;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::{
    collections::HashSet,
    fs::{self, File},
    io::BufWriter,
    marker::PhantomData,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::debug;

const CONSOLIDATED: &str = "consolidated.parquet";

/// Trait representing a row in a history table.
/// - Defines schema, to_arrays, unique_key for writes.
/// - Defines from_batch and recorded_at for reading rows back.
pub trait HistoryRow: Sized {
    /// Column index for the dedupe key in schema
    const KEY_COLUMN: usize;
    /// Partition date (UTC naive) for hive partitioning
    fn partition_date(&self) -> NaiveDate {
        self.recorded_at().date_naive()
    }
    /// When the query this row describes completed
    fn recorded_at(&self) -> DateTime<Utc>;
    /// Arrow schema for this row type
    fn schema() -> ArrowSchema;
    /// Convert this row into column arrays matching the schema
    fn to_arrays(&self) -> Vec<ArrayRef>;
    /// Unique dedupe key for this row, also used in its file name
    fn unique_key(&self) -> String;
    /// Rebuild row `row` of a batch written with `schema()`
    fn from_batch(batch: &RecordBatch, row: usize) -> Result<Self>;
    /// Extract unique key from an existing batch row (for scanning)
    fn extract_key(batch: &RecordBatch, row: usize) -> Result<String> {
        Ok(string_column(batch, Self::KEY_COLUMN)?.value(row).to_string())
    }
}

/// Generic hive-partitioned, append-only history table:
/// `<base_dir>/<table>/date=YYYYMMDD/<key>---<ts>.parquet`.
pub struct TableHistory<R: HistoryRow> {
    base_dir: PathBuf,
    table: String,
    schema: Arc<ArrowSchema>,
    seen: Mutex<HashSet<String>>,
    _marker: PhantomData<R>,
}

impl<R: HistoryRow> TableHistory<R> {
    /// Create the table directory if needed and scan existing keys into `seen`.
    pub fn new(base_dir: impl Into<PathBuf>, table: &str) -> Result<Self> {
        let base_dir = base_dir.into();
        let table_dir = base_dir.join(table);
        fs::create_dir_all(&table_dir)
            .with_context(|| format!("could not create `{}`", table_dir.display()))?;

        let mut seen_set = HashSet::new();
        for path in parquet_files(&table_dir)? {
            for_each_batch(&path, |batch| {
                for i in 0..batch.num_rows() {
                    seen_set.insert(R::extract_key(batch, i)?);
                }
                Ok(())
            })?;
        }
        debug!(table, rows = seen_set.len(), "history table opened");

        Ok(Self {
            base_dir,
            table: table.to_string(),
            schema: Arc::new(R::schema()),
            seen: Mutex::new(seen_set),
            _marker: PhantomData,
        })
    }

    fn table_dir(&self) -> PathBuf {
        self.base_dir.join(&self.table)
    }

    /// Append a row. A row whose key is already stored is a no-op.
    pub fn add(&self, row: &R) -> Result<()> {
        let key = row.unique_key();
        {
            let mut seen = self
                .seen
                .lock()
                .map_err(|_| anyhow!("history `{}` lock poisoned", self.table))?;
            if !seen.insert(key.clone()) {
                return Ok(());
            }
        }

        if let Err(e) = self.write_row(row, &key) {
            // forget the key so the row can be added again
            if let Ok(mut seen) = self.seen.lock() {
                seen.remove(&key);
            }
            return Err(e);
        }
        Ok(())
    }

    fn write_row(&self, row: &R, key: &str) -> Result<()> {
        let partition = format!("date={}", row.partition_date().format("%Y%m%d"));
        let dir = self.table_dir().join(partition);
        fs::create_dir_all(&dir)
            .with_context(|| format!("could not create `{}`", dir.display()))?;

        let ts = Utc::now().timestamp_micros();
        let fname = format!("{}---{}.parquet", key, ts);
        let tmp = dir.join(format!("{}.tmp", fname));
        let final_path = dir.join(&fname);

        let written = (|| {
            let file = File::create(&tmp)
                .with_context(|| format!("could not create temporary file `{}`", tmp.display()))?;
            let mut writer = ArrowWriter::try_new(BufWriter::new(file), self.schema.clone(), None)
                .context("creating ArrowWriter for history row")?;
            let batch = RecordBatch::try_new(self.schema.clone(), row.to_arrays())
                .context("building RecordBatch for history row")?;
            writer.write(&batch).context("writing history row")?;
            writer.close().context("closing history writer")?;
            anyhow::Ok(())
        })();
        if written.is_err() && tmp.exists() {
            let _ = fs::remove_file(&tmp);
        }
        written?;
        fs::rename(&tmp, &final_path).with_context(|| {
            format!(
                "failed to rename `{}` to `{}`",
                tmp.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }

    /// Check if a row exists by its dedupe key
    pub fn get(&self, key: &str) -> bool {
        self.seen
            .lock()
            .map(|seen| seen.contains(key))
            .unwrap_or(false)
    }

    /// Every stored row, newest first.
    pub fn list(&self) -> Result<Vec<R>> {
        let mut rows = Vec::new();
        for path in parquet_files(&self.table_dir())? {
            for_each_batch(&path, |batch| {
                for i in 0..batch.num_rows() {
                    rows.push(R::from_batch(batch, i)?);
                }
                Ok(())
            })?;
        }
        rows.sort_by(|a, b| b.recorded_at().cmp(&a.recorded_at()));
        Ok(rows)
    }

    /// Vacuum each partition into one consolidated file
    pub fn vacuum(&self) -> Result<usize> {
        let table_dir = self.table_dir();
        let mut merged = 0;
        for part in fs::read_dir(&table_dir)? {
            let part = part?;
            if !part.file_type()?.is_dir() {
                continue;
            }
            let dir = part.path();

            let files = glob(&format!("{}/*.parquet", dir.display()))?
                .filter_map(Result::ok)
                .collect::<Vec<_>>();
            let loose = files
                .iter()
                .filter(|p| p.file_name().and_then(|n| n.to_str()) != Some(CONSOLIDATED))
                .count();
            if loose == 0 {
                continue;
            }

            let tmp = dir.join(format!("{}.tmp", CONSOLIDATED));
            let file = File::create(&tmp)
                .with_context(|| format!("could not create `{}`", tmp.display()))?;
            let mut writer =
                ArrowWriter::try_new(BufWriter::new(file), self.schema.clone(), None)
                    .context("creating ArrowWriter for consolidated Parquet")?;
            for p in &files {
                for_each_batch(p, |batch| {
                    writer.write(batch).with_context(|| {
                        format!("writing batch from `{}` to consolidated file", p.display())
                    })
                })?;
            }
            writer
                .close()
                .context("closing ArrowWriter for consolidated Parquet")?;

            let cons = dir.join(CONSOLIDATED);
            fs::rename(&tmp, &cons)
                .with_context(|| format!("renaming `{}` → `{}`", tmp.display(), cons.display()))?;

            for p in files {
                if p.file_name().and_then(|n| n.to_str()) != Some(CONSOLIDATED) {
                    fs::remove_file(&p)
                        .with_context(|| format!("failed to delete file `{}`", p.display()))?;
                }
            }
            merged += loose;
        }
        Ok(merged)
    }
}

/// All `*.parquet` files under the `date=` partitions of `table_dir`.
fn parquet_files(table_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = format!("{}/*/*.parquet", table_dir.display());
    let mut out = Vec::new();
    for entry in glob(&pattern).context("invalid glob pattern for history scan")? {
        out.push(entry?);
    }
    Ok(out)
}

fn for_each_batch(
    path: &Path,
    mut f: impl FnMut(&RecordBatch) -> Result<()>,
) -> Result<()> {
    let file = File::open(path).with_context(|| format!("failed to open `{}`", path.display()))?;
    let mut reader = ParquetRecordBatchReaderBuilder::try_new(file)
        .with_context(|| format!("failed to read `{}`", path.display()))?
        .with_batch_size(1024)
        .build()?;
    while let Some(batch) = reader
        .next()
        .transpose()
        .with_context(|| format!("error reading RecordBatch from `{}`", path.display()))?
    {
        f(&batch)?;
    }
    Ok(())
}

fn column<'a, A: Array + 'static>(batch: &'a RecordBatch, idx: usize, kind: &str) -> Result<&'a A> {
    batch
        .column(idx)
        .as_any()
        .downcast_ref::<A>()
        .ok_or_else(|| anyhow!("history column {} is not {}", idx, kind))
}

pub(crate) fn string_column(batch: &RecordBatch, idx: usize) -> Result<&StringArray> {
    column(batch, idx, "Utf8")
}

pub(crate) fn string_at(batch: &RecordBatch, idx: usize, row: usize) -> Result<String> {
    Ok(string_column(batch, idx)?.value(row).to_string())
}

pub(crate) fn i32_at(batch: &RecordBatch, idx: usize, row: usize) -> Result<i32> {
    Ok(column::<Int32Array>(batch, idx, "Int32")?.value(row))
}

pub(crate) fn u64_at(batch: &RecordBatch, idx: usize, row: usize) -> Result<u64> {
    Ok(column::<UInt64Array>(batch, idx, "UInt64")?.value(row))
}

pub(crate) fn timestamp_at(batch: &RecordBatch, idx: usize, row: usize) -> Result<DateTime<Utc>> {
    let micros = column::<TimestampMicrosecondArray>(batch, idx, "Timestamp(µs)")?.value(row);
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| anyhow!("timestamp {} out of range", micros))
}

// ----- Tests -----
#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::case_query::CaseQueryRow;
    use crate::process::CaseDetails;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    fn details() -> CaseDetails {
        CaseDetails {
            parties: "Ramesh Vs State".into(),
            filing_date: "12-03-2024".into(),
            status: "Pending".into(),
        }
    }

    fn row_at(number: &str, at: DateTime<Utc>) -> CaseQueryRow {
        CaseQueryRow::new("CS - CIVIL SUIT", number, 2024, &details(), "<html/>".into(), at)
    }

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        glob(&format!("{}/**/*.parquet", dir.display()))
            .unwrap()
            .filter_map(Result::ok)
            .collect()
    }

    #[test]
    fn test_add_and_get() {
        let tmp = tempdir().unwrap();
        let hist = TableHistory::<CaseQueryRow>::new_case_queries(tmp.path()).unwrap();

        let now = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();
        let row = row_at("101", now);

        assert!(!hist.get(&row.unique_key()));
        hist.add(&row).unwrap();
        assert!(hist.get(&row.unique_key()));

        let part_dir = tmp.path().join("case_queries").join("date=20261016");
        assert_eq!(files_in(&part_dir).len(), 1);
    }

    #[test]
    fn test_failed_write_can_be_retried() {
        let tmp = tempdir().unwrap();
        let hist = TableHistory::<CaseQueryRow>::new_case_queries(tmp.path()).unwrap();
        let row = row_at("303", Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap());

        // a plain file where the partition directory should go
        let part_dir = tmp.path().join("case_queries").join("date=20261016");
        fs::write(&part_dir, b"not a directory").unwrap();
        assert!(hist.add(&row).is_err());
        assert!(!hist.get(&row.unique_key()));

        fs::remove_file(&part_dir).unwrap();
        hist.add(&row).unwrap();
        assert!(hist.get(&row.unique_key()));
        assert_eq!(hist.list().unwrap().len(), 1);
    }

    #[test]
    fn test_deduplication() {
        let tmp = tempdir().unwrap();
        let hist = TableHistory::<CaseQueryRow>::new_case_queries(tmp.path()).unwrap();
        let row = row_at("202", Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap());

        hist.add(&row).unwrap();
        hist.add(&row).unwrap();
        assert_eq!(files_in(tmp.path()).len(), 1);
        assert_eq!(hist.list().unwrap().len(), 1);
    }

    #[test]
    fn test_list_is_newest_first() {
        let tmp = tempdir().unwrap();
        let hist = TableHistory::<CaseQueryRow>::new_case_queries(tmp.path()).unwrap();
        let base = Utc.with_ymd_and_hms(2026, 10, 14, 23, 59, 0).unwrap();

        let older = row_at("1", base);
        let newest = row_at("3", base + Duration::days(2));
        let middle = row_at("2", base + Duration::hours(1));
        for r in [&older, &newest, &middle] {
            hist.add(r).unwrap();
        }

        let numbers: Vec<String> = hist
            .list()
            .unwrap()
            .into_iter()
            .map(|r| r.case_number)
            .collect();
        assert_eq!(numbers, vec!["3", "2", "1"]);
    }

    #[test]
    fn test_vacuum_consolidates_without_losing_rows() {
        let tmp = tempdir().unwrap();
        let hist = TableHistory::<CaseQueryRow>::new_case_queries(tmp.path()).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap();

        hist.add(&row_at("1", now)).unwrap();
        hist.add(&row_at("2", now + Duration::microseconds(1))).unwrap();
        let part_dir = tmp.path().join("case_queries").join("date=20261016");
        assert_eq!(files_in(&part_dir).len(), 2);

        assert_eq!(hist.vacuum().unwrap(), 2);

        let after = files_in(&part_dir);
        assert_eq!(after.len(), 1);
        assert_eq!(
            after[0].file_name().unwrap().to_string_lossy(),
            CONSOLIDATED
        );
        assert_eq!(hist.list().unwrap().len(), 2);

        // a second vacuum has nothing loose to merge
        assert_eq!(hist.vacuum().unwrap(), 0);

        hist.add(&row_at("3", now + Duration::seconds(5))).unwrap();
        assert_eq!(hist.vacuum().unwrap(), 1);
        assert_eq!(hist.list().unwrap().len(), 3);
    }

    #[test]
    fn test_persistence_across_restarts() {
        let tmp = tempdir().unwrap();
        let row = row_at("505", Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap());
        {
            let hist = TableHistory::<CaseQueryRow>::new_case_queries(tmp.path()).unwrap();
            hist.add(&row).unwrap();
        }

        let hist2 = TableHistory::<CaseQueryRow>::new_case_queries(tmp.path()).unwrap();
        assert!(hist2.get(&row.unique_key()));
        let listed = hist2.list().unwrap();
        assert_eq!(listed, vec![row]);
        assert_eq!(listed[0].raw_html, "<html/>");
    }
}
