use anyhow::{Context, Result};
use csv::WriterBuilder;
use std::path::Path;

use super::Table;

/// Write `table` as a headed CSV file.
pub fn write_csv(table: &Table, path: &Path) -> Result<()> {
    let mut wtr = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;

    wtr.write_record(&table.headers)
        .context("writing CSV header")?;
    for (i, row) in table.rows.iter().enumerate() {
        wtr.write_record(row)
            .with_context(|| format!("writing CSV row {}", i))?;
    }
    wtr.flush()
        .with_context(|| format!("flushing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use csv::ReaderBuilder;
    use tempfile::tempdir;

    #[test]
    fn test_quotes_survive() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("out.csv");
        let table = Table {
            headers: vec!["Party Name".into(), "Advocate".into()],
            rows: vec![vec!["A, B \"Jr\" Vs State".into(), "".into()]],
        };
        write_csv(&table, &path).unwrap();

        let mut rdr = ReaderBuilder::new().from_path(&path).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, table.headers);
        let rows: Vec<Vec<String>> = rdr
            .records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect();
        assert_eq!(rows, table.rows);
    }
}
