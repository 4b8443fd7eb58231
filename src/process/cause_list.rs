// src/process/cause_list.rs

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info};

use super::classify::{classify, HtmlRow};
use super::raw_table::{CauseList, CauseListRow, TableVerdict, CAUSE_LIST_HEADERS, DEFAULT_SECTION};
use super::utils::element_text;

static TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("tr selector"));
static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("td selector"));
static TH_TD: Lazy<Selector> = Lazy::new(|| Selector::parse("th, td").expect("cell selector"));

/// Elements whose text may name the section of the table that follows.
const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "strong", "b", "p"];

/// Headings this long are page prose, not section names.
const MAX_SECTION_LEN: usize = 100;

/// Classify every `<table>` in `html` and collect the cause-list rows.
///
/// Calendar widgets and unrelated tables are skipped; each kept row is
/// labelled with the nearest heading before its table. Errors when the page
/// has no tables or none of them yields a row.
#[tracing::instrument(level = "info", skip(html), fields(bytes = html.len()))]
pub fn extract_cause_list(html: &str) -> Result<CauseList> {
    let document = Html::parse_document(html);

    let mut verdicts = Vec::new();
    let mut rows = Vec::new();
    let mut last_heading: Option<ElementRef<'_>> = None;

    // Document order matters: a table's section label is whichever heading
    // element was opened most recently before it.
    for node in document.root_element().descendants() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        let name = el.value().name();
        if HEADING_TAGS.contains(&name) {
            last_heading = Some(el);
            continue;
        }
        if name != "table" {
            continue;
        }

        let table_rows = read_rows(&el);
        let section = section_label(last_heading.as_ref());
        let (verdict, kept) = classify(&table_rows, &section);

        match &verdict {
            TableVerdict::Accepted { section, rows } => {
                info!(section = %section, rows, "processing cause list table")
            }
            TableVerdict::Calendar { reason } => debug!(%reason, "skipping calendar table"),
            other => debug!(verdict = ?other, "skipping table"),
        }

        rows.extend(kept.into_iter().map(|fields| CauseListRow {
            section: section.clone(),
            fields,
        }));
        verdicts.push(verdict);
    }

    if verdicts.is_empty() {
        bail!("No tables found on the page");
    }
    info!("found {} table(s) on the page", verdicts.len());
    if rows.is_empty() {
        bail!("No valid cause list data found in tables");
    }

    Ok(CauseList {
        headers: CAUSE_LIST_HEADERS.iter().map(|h| h.to_string()).collect(),
        rows,
        verdicts,
    })
}

fn read_rows(table: &ElementRef<'_>) -> Vec<HtmlRow> {
    table
        .select(&TR)
        .map(|tr| HtmlRow {
            header_cells: tr.select(&TH_TD).map(|c| element_text(&c)).collect(),
            data_cells: tr.select(&TD).map(|c| element_text(&c)).collect(),
        })
        .collect()
}

fn section_label(heading: Option<&ElementRef<'_>>) -> String {
    heading
        .map(element_text)
        .filter(|t| !t.is_empty() && t.chars().count() < MAX_SECTION_LEN)
        .unwrap_or_else(|| DEFAULT_SECTION.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,courtscraper::process=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    const CALENDAR: &str = r#"
        <table class="ui-datepicker-calendar">
          <tr><th>Su</th><th>Mo</th><th>Tu</th><th>We</th><th>Th</th><th>Fr</th><th>Sa</th></tr>
          <tr><td>1</td><td>2</td><td>3</td><td>4</td><td>5</td><td>6</td><td>7</td></tr>
          <tr><td>8</td><td>9</td><td>10</td><td>11</td><td>12</td><td>13</td><td>14</td></tr>
          <tr><td>15</td><td>16</td><td>17</td><td>18</td><td>19</td><td>20</td><td>21</td></tr>
        </table>"#;

    #[test]
    fn test_calendar_and_case_tables() {
        init_test_logging();
        let html = format!(
            r#"<html><body>
            <h3>Select date</h3>
            {CALENDAR}
            <h4>Fresh Matters</h4>
            <table>
              <tr><th>#</th><th>Matter</th><th>Parties</th><th>Counsel</th></tr>
              <tr><td>1</td><td>T P (CRL)/19/2025</td><td>State Vs Ramesh</td><td>Adv. Sharma</td></tr>
              <tr><td>2</td><td>CS/44/2024</td><td>Gupta Vs Mehra</td><td>Adv. Rao</td></tr>
            </table>
            </body></html>"#
        );

        let list = extract_cause_list(&html).unwrap();
        assert_eq!(list.verdicts.len(), 2);
        assert!(matches!(list.verdicts[0], TableVerdict::Calendar { .. }));
        assert!(list.verdicts[1].is_accepted());

        assert_eq!(list.rows.len(), 2);
        assert!(list.rows.iter().all(|r| r.section == "Fresh Matters"));
        assert_eq!(list.rows[0].fields[1], "T P (CRL)/19/2025");
        assert_eq!(list.headers[0], "Section");
        assert_eq!(list.headers.len(), 5);
    }

    #[test]
    fn test_every_row_has_three_filled_cells() {
        let html = r#"
            <p>Court No. 4</p>
            <table>
              <tr><th>Serial Number</th><th>Case</th><th>Party Name</th><th>Advocate</th></tr>
              <tr><td>1</td><td>CS/1/2024</td><td></td><td></td></tr>
              <tr><td></td><td></td><td>A Vs B</td><td></td></tr>
              <tr><td>3</td><td>CS/3/2024</td><td>C Vs D</td><td>X</td></tr>
            </table>"#;
        let list = extract_cause_list(html).unwrap();
        assert_eq!(list.rows.len(), 2);
        for record in list.records() {
            let filled = record.iter().filter(|c| !c.is_empty()).count();
            assert!(filled >= 3, "{:?}", record);
        }
    }

    #[test]
    fn test_sections_and_default_label() {
        let long = "x".repeat(150);
        let html = format!(
            r#"
            <table>
              <tr><th>Sr</th><th>Case</th><th>Party</th></tr>
              <tr><td>1</td><td>CS/1/2024</td><td>A Vs B</td></tr>
            </table>
            <h2>Evidence</h2>
            <table>
              <tr><th>Sr</th><th>Case</th><th>Party</th></tr>
              <tr><td>1</td><td>SC/9/2023</td><td>State Vs C</td></tr>
              <tr><td>2</td><td>SC/10/2023</td><td>State Vs D</td></tr>
            </table>
            <p>{long}</p>
            <table>
              <tr><th>Sr</th><th>Case</th><th>Party</th></tr>
              <tr><td>1</td><td>EX/2/2022</td><td>E Vs F</td></tr>
            </table>"#
        );
        let list = extract_cause_list(&html).unwrap();
        let sections: Vec<&str> = list.rows.iter().map(|r| r.section.as_str()).collect();
        assert_eq!(sections, vec!["Cases", "Evidence", "Evidence", "Cases"]);
        assert_eq!(
            list.section_counts(),
            vec![("Cases".to_string(), 2), ("Evidence".to_string(), 2)]
        );
    }

    #[test]
    fn test_whitespace_in_cells_is_collapsed() {
        let html = r#"
            <table>
              <tr><th>Case</th><th>Party</th><th>Advocate</th></tr>
              <tr><td> CS/1/2024 </td><td>Ram
                    <br/>Vs<br/>   Shyam</td><td>X</td></tr>
            </table>"#;
        let list = extract_cause_list(html).unwrap();
        assert_eq!(list.rows[0].fields, vec!["CS/1/2024", "Ram Vs Shyam", "X"]);
    }

    #[test]
    fn test_no_tables_is_an_error() {
        let err = extract_cause_list("<html><body><p>Nothing listed</p></body></html>")
            .unwrap_err();
        assert_eq!(err.to_string(), "No tables found on the page");
    }

    #[test]
    fn test_only_noise_tables_is_an_error() {
        let html = format!(
            r#"{CALENDAR}
            <table><tr><th>Name</th><th>Phone</th></tr><tr><td>Registry</td><td>011</td></tr></table>"#
        );
        let err = extract_cause_list(&html).unwrap_err();
        assert_eq!(err.to_string(), "No valid cause list data found in tables");
    }
}
