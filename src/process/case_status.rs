// src/process/case_status.rs

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::warn;

use super::raw_table::{CaseDetails, NOT_FOUND};
use super::utils::element_text;

static PARTIES: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".petitioner_advocate_tr td:nth-of-type(2)").expect("parties selector")
});
static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("td selector"));

const FILING_DATE_LABEL: &str = "Filing Date:";
const STATUS_LABEL: &str = "Case Status:";

/// Pull parties, filing date and status out of a case-status result page.
/// Fields the page lacks come back as "Not Found".
#[tracing::instrument(level = "info", skip(html), fields(bytes = html.len()))]
pub fn parse_case_details(html: &str) -> CaseDetails {
    let document = Html::parse_document(html);

    let parties = document.select(&PARTIES).next().map(|el| element_text(&el));
    let filing_date = labelled_value(&document, FILING_DATE_LABEL);
    let status = labelled_value(&document, STATUS_LABEL);

    let or_missing = |field: &str, value: Option<String>| {
        value.filter(|v| !v.is_empty()).unwrap_or_else(|| {
            warn!(field, "not present on the result page");
            NOT_FOUND.to_string()
        })
    };

    CaseDetails {
        parties: or_missing("parties", parties),
        filing_date: or_missing("filing_date", filing_date),
        status: or_missing("status", status),
    }
}

/// Text of the `td` that follows the `td` labelled `label`.
fn labelled_value(document: &Html, label: &str) -> Option<String> {
    let label_cell = document
        .select(&TD)
        .find(|td| element_text(td) == label)?;
    label_cell
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "td")
        .map(|el| element_text(&el))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_PAGE: &str = r#"
        <div id="case_no_res">
          <table class="case_details_table">
            <tr><td>Case Type</td><td>CS - CIVIL SUIT</td></tr>
            <tr><td>Filing Date:</td><td> 12-03-2024 </td></tr>
          </table>
          <table class="case_status_table">
            <tr><td>First Hearing Date</td><td>01st April 2024</td></tr>
            <tr><td>Case Status:</td><td>Case disposed</td></tr>
          </table>
          <table class="Petitioner_Advocate_table">
            <tr class="petitioner_advocate_tr"><td>1)</td><td>Ramesh Kumar
               Advocate- S K Jain</td></tr>
          </table>
        </div>"#;

    #[test]
    fn test_parse_result_page() {
        let details = parse_case_details(RESULT_PAGE);
        assert_eq!(details.parties, "Ramesh Kumar Advocate- S K Jain");
        assert_eq!(details.filing_date, "12-03-2024");
        assert_eq!(details.status, "Case disposed");
    }

    #[test]
    fn test_missing_fields_are_not_found() {
        let details = parse_case_details("<html><body><p>Invalid Captcha</p></body></html>");
        assert_eq!(details.parties, NOT_FOUND);
        assert_eq!(details.filing_date, NOT_FOUND);
        assert_eq!(details.status, NOT_FOUND);
    }

    #[test]
    fn test_label_without_value_cell() {
        let html = "<table><tr><td>Case Status:</td></tr></table>";
        assert_eq!(parse_case_details(html).status, NOT_FOUND);
    }
}
