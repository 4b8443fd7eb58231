// src/fetch/case_status.rs
//
// Case lookup on the eCourts services portal. The flow fills the court
// hierarchy and case fields, then waits for the user to solve the CAPTCHA and
// submit; the result block appearing is the signal to scrape.

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};
use url::Url;

use super::select::{match_case_type, match_option};
use super::{pause, preview, FormDriver, Locator, StepLog, Timings};
use crate::process::{parse_case_details, CaseDetails};

pub const ECOURTS_URL: &str = "https://services.ecourts.gov.in/ecourtindia_v6/";

const CASE_STATUS_MENU: &str = "leftPaneMenuCS";
const STATE_SELECT: &str = "sess_state_code";
const DISTRICT_SELECT: &str = "sess_dist_code";
const COMPLEX_SELECT: &str = "court_complex_code";
const VALIDATION_MODAL: &str = "#validateError";
const MODAL_CLOSE: &str =
    "#validateError .btn-close, #validateError button.close, #validateError .modal-footer button";
const CASE_NUMBER_TAB: &str = "casenumber-tabMenu";
const CASE_TYPE_SELECT: &str = "case_type";
const CASE_NUMBER_INPUT: &str = "search_case_no";
const YEAR_SELECT: &str = "search_case_year";
const RESULT_BLOCK: &str = "#case_no_res";

/// Ids tried, in order, when the year is not a dropdown.
const YEAR_FIELDS: &[&str] = &["rgyear", "search_case_year", "case_year", "year"];

/// Common case-type labels on Delhi district courts.
pub const COMMON_CASE_TYPES: &[&str] = &[
    "CS (COMM) - CIVIL SUIT (COMMERCIAL)",
    "OMP (COMM) - COMMERCIAL ARBITRATION U/S 34",
    "CA - CRIMINAL APPEAL",
    "CC - CORRUPTION CASES",
    "CR Cases - CRIMINAL CASE",
    "Cr Rev - CRIMINAL REVISION",
    "CS - CIVIL SUIT FOR DJ ADJ",
    "CT Cases - COMPLAINT CASES",
    "EX - EXECUTION",
    "HMA - HINDU MARRIAGE ACT",
    "MACT - M.A.C.T.",
    "MISC CRL - MISC. CASES",
    "MISC DJ - MISC. CASES FOR DJ ADJ",
    "SC - SESSIONS CASE",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseStatusQuery {
    pub state: String,
    pub district: String,
    pub court_complex: String,
    pub case_type: String,
    pub case_number: String,
    pub case_year: i32,
}

#[derive(Debug, Clone)]
pub struct CaseStatusFetch {
    pub details: CaseDetails,
    pub raw_html: String,
}

/// Run the lookup and close the browser whatever the outcome. Advisory
/// notes land in `steps`, also when the lookup fails.
#[tracing::instrument(
    level = "info",
    skip(driver, portal, timings, steps),
    fields(case_type = %query.case_type, number = %query.case_number, year = query.case_year)
)]
pub async fn fetch_case_status<D: FormDriver + ?Sized>(
    driver: &mut D,
    portal: &Url,
    query: &CaseStatusQuery,
    timings: &Timings,
    steps: &mut StepLog,
) -> Result<CaseStatusFetch> {
    let result = run(driver, portal, query, timings, steps).await;
    if let Err(e) = driver.quit().await {
        warn!(error = %e, "failed to close browser");
    }
    result
}

async fn run<D: FormDriver + ?Sized>(
    driver: &mut D,
    portal: &Url,
    query: &CaseStatusQuery,
    timings: &Timings,
    steps: &mut StepLog,
) -> Result<CaseStatusFetch> {
    // 1) open the case-status search
    driver.goto(portal.as_str()).await?;
    driver
        .wait_for(&format!("#{}", CASE_STATUS_MENU), timings.step_timeout)
        .await
        .context("case status menu did not load")?;
    driver.click(&Locator::id(CASE_STATUS_MENU)).await?;

    // 2) court hierarchy; each choice reloads the next dropdown
    pick_hierarchy(driver, STATE_SELECT, "state", "states", &query.state, timings).await?;
    pause(timings.settle).await;
    pick_hierarchy(driver, DISTRICT_SELECT, "district", "districts", &query.district, timings)
        .await?;
    pause(timings.settle).await;
    pick_hierarchy(
        driver,
        COMPLEX_SELECT,
        "court complex",
        "court complexes",
        &query.court_complex,
        timings,
    )
    .await?;
    pause(timings.settle / 2).await;

    // 3) the portal sometimes raises a validation modal over the form
    dismiss_validation_modal(driver, steps, timings).await;

    // 4) case number tab
    driver
        .click(&Locator::id(CASE_NUMBER_TAB))
        .await
        .context("case number tab not found")?;
    pause(timings.settle).await;

    // 5) case type
    driver
        .wait_for(&format!("#{}", CASE_TYPE_SELECT), timings.step_timeout)
        .await
        .context("case type dropdown did not load")?;
    let case_types = driver.options(&Locator::id(CASE_TYPE_SELECT)).await?;
    info!(available = %preview(&case_types, 10), "case types");
    let Some(case_type) = match_case_type(&case_types, &query.case_type) else {
        bail!(
            "Could not find case type '{}'. Available case types: {}",
            query.case_type,
            preview(&case_types, usize::MAX)
        );
    };
    let case_type = case_type.to_string();
    driver
        .choose(&Locator::id(CASE_TYPE_SELECT), &case_type)
        .await?;
    info!(%case_type, "case type selected");
    pause(timings.settle / 2).await;

    // 6) case number
    let number_field = async {
        driver
            .wait_for(&format!("#{}", CASE_NUMBER_INPUT), timings.step_timeout)
            .await?;
        driver
            .type_text(&Locator::id(CASE_NUMBER_INPUT), &query.case_number)
            .await
    }
    .await;
    if let Err(e) = number_field {
        bail!("Could not find case number field: {:#}", e);
    }

    // 7) year
    set_year(driver, query.case_year, steps, timings).await?;

    // 8) the user solves the CAPTCHA and presses Go
    info!(
        timeout = ?timings.result_timeout,
        "check the form, solve the CAPTCHA and press Go in the browser"
    );
    driver
        .wait_for(RESULT_BLOCK, timings.result_timeout)
        .await
        .with_context(|| {
            format!(
                "case result did not appear within {:?}",
                timings.result_timeout
            )
        })?;

    // 9) scrape
    let raw_html = driver.source().await?;
    let details = parse_case_details(&raw_html);
    info!(status = %details.status, "case details parsed");

    Ok(CaseStatusFetch { details, raw_html })
}

/// Choose `wanted` in a court hierarchy dropdown, or fail listing what the
/// portal offers.
async fn pick_hierarchy<D: FormDriver + ?Sized>(
    driver: &mut D,
    select_id: &str,
    what: &str,
    what_plural: &str,
    wanted: &str,
    timings: &Timings,
) -> Result<()> {
    driver
        .wait_for(&format!("#{}", select_id), timings.step_timeout)
        .await
        .with_context(|| format!("{} dropdown did not load", what))?;
    let select = Locator::id(select_id);
    let available = driver.options(&select).await?;
    info!(available = %preview(&available, 5), "{}", what_plural);

    let Some(option) = match_option(&available, wanted) else {
        bail!(
            "Could not find {} '{}'. Available {}: {}",
            what,
            wanted,
            what_plural,
            preview(&available, usize::MAX)
        );
    };
    let option = option.to_string();
    driver.choose(&select, &option).await?;
    info!(selected = %option, "{} selected", what);
    Ok(())
}

async fn dismiss_validation_modal<D: FormDriver + ?Sized>(
    driver: &mut D,
    steps: &mut StepLog,
    timings: &Timings,
) {
    let shown = match driver.fields(VALIDATION_MODAL).await {
        Ok(found) => found.iter().any(|f| f.displayed),
        Err(e) => {
            debug!(error = %e, "could not look for validation modal");
            false
        }
    };
    if !shown {
        return;
    }

    steps.warn("Validation error modal detected; closing it");
    if driver.click(&Locator::css(MODAL_CLOSE)).await.is_err() {
        if let Err(e) = driver.press_escape().await {
            steps.warn(format!("Could not close the validation modal: {:#}", e));
        }
    }
    pause(timings.settle / 2).await;
}

async fn set_year<D: FormDriver + ?Sized>(
    driver: &mut D,
    year: i32,
    steps: &mut StepLog,
    timings: &Timings,
) -> Result<()> {
    let year = year.to_string();
    let css = format!("#{}", YEAR_SELECT);

    let is_dropdown = match driver.wait_for(&css, timings.step_timeout).await {
        Ok(()) => driver
            .fields(&css)
            .await?
            .first()
            .is_some_and(|f| f.tag == "select"),
        Err(_) => false,
    };

    if is_dropdown {
        let select = Locator::id(YEAR_SELECT);
        let years = driver.options(&select).await?;
        info!(available = %preview(&years, 20), "years");
        if !years.iter().any(|y| y.trim() == year) {
            bail!(
                "Could not find year '{}'. Available years: {}",
                year,
                preview(&years, usize::MAX)
            );
        }
        driver.choose(&select, &year).await?;
        info!(%year, "year selected");
        return Ok(());
    }

    steps.warn("Standard year dropdown not found; trying other year fields");
    log_visible_fields(driver).await;

    for id in YEAR_FIELDS {
        let css = format!("#{}", id);
        let Some(field) = driver.fields(&css).await?.into_iter().next() else {
            continue;
        };
        info!(field = id, "found year field");
        let target = Locator::id(id);

        if field.displayed && field.enabled && driver.type_text(&target, &year).await.is_ok() {
            info!(%year, "year typed");
            return Ok(());
        }
        match driver.set_value(&target, &year).await {
            Ok(()) => {
                info!(%year, "year set by script");
                return Ok(());
            }
            Err(e) => debug!(field = id, error = %e, "could not set year"),
        }
    }

    steps.warn(format!(
        "Could not set the year automatically. Please enter {} in the 'Registration Year' field in the browser",
        year
    ));
    Ok(())
}

/// Visible selects and inputs, to help spot a renamed year field.
async fn log_visible_fields<D: FormDriver + ?Sized>(driver: &mut D) {
    for css in ["select", "input"] {
        if let Ok(found) = driver.fields(css).await {
            let names: Vec<String> = found
                .iter()
                .filter(|f| f.displayed)
                .map(|f| {
                    [&f.id, &f.name]
                        .into_iter()
                        .find(|s| !s.is_empty())
                        .cloned()
                        .unwrap_or_else(|| "unnamed".to_string())
                })
                .collect();
            debug!(kind = css, count = names.len(), fields = %preview(&names, 10), "visible fields");
        }
    }
}
