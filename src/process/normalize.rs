use tracing::warn;

/// Headers and rows squared up to one column count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Square `rows` off to the widest row, then fit `headers` to that width:
/// missing headers become `Column_<n>`, surplus ones are dropped. Short rows
/// are padded with empty cells.
pub fn normalize_columns(headers: &[String], rows: &[Vec<String>]) -> Normalized {
    let Some(max_cols) = rows.iter().map(Vec::len).max() else {
        return Normalized {
            headers: headers.to_vec(),
            rows: Vec::new(),
        };
    };

    let mut headers = headers.to_vec();
    if headers.len() != max_cols {
        warn!(
            headers = headers.len(),
            columns = max_cols,
            "header count doesn't match data columns; using generic column names"
        );
        if headers.len() < max_cols {
            let start = headers.len();
            headers.extend((start..max_cols).map(|i| format!("Column_{}", i + 1)));
        } else {
            headers.truncate(max_cols);
        }
    }

    let rows = rows
        .iter()
        .map(|row| {
            let mut row = row.clone();
            row.resize(max_cols, String::new());
            row
        })
        .collect();

    Normalized { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_headers_padded_to_widest_row() {
        let headers = strings(&["Section", "Serial Number"]);
        let rows = vec![strings(&["A", "1", "CS/1/2024", "X"]), strings(&["A", "2"])];
        let n = normalize_columns(&headers, &rows);
        assert_eq!(
            n.headers,
            strings(&["Section", "Serial Number", "Column_3", "Column_4"])
        );
        assert!(n.rows.iter().all(|r| r.len() == 4));
        assert_eq!(n.rows[1], strings(&["A", "2", "", ""]));
    }

    #[test]
    fn test_headers_truncated_to_widest_row() {
        let headers = strings(&["Section", "Serial Number", "Case", "Party Name", "Advocate"]);
        let rows = vec![strings(&["A", "1", "CS/1/2024"])];
        let n = normalize_columns(&headers, &rows);
        assert_eq!(n.headers, strings(&["Section", "Serial Number", "Case"]));
        assert_eq!(n.rows, rows);
    }

    #[test]
    fn test_matching_widths_untouched() {
        let headers = strings(&["a", "b"]);
        let rows = vec![strings(&["1", "2"])];
        assert_eq!(
            normalize_columns(&headers, &rows),
            Normalized {
                headers: headers.clone(),
                rows: rows.clone()
            }
        );
    }

    #[test]
    fn test_no_rows() {
        let headers = strings(&["a"]);
        let n = normalize_columns(&headers, &[]);
        assert_eq!(n.headers, headers);
        assert!(n.rows.is_empty());
    }
}
