// src/fetch/cause_list.rs
//
// Daily cause list on the New Delhi district courts site. Every form step is
// best effort: a step that fails leaves a warning and the user finishes it by
// hand during the manual window.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use super::select::{date_accepted, date_variants, lists_courts, match_option};
use super::{pause, preview, Field, FormDriver, Locator, StepLog, Timings};
use crate::process::{extract_cause_list, CauseList};

pub const DELHI_CAUSE_LIST_URL: &str =
    "https://newdelhi.dcourts.gov.in/cause-list-%E2%81%84-daily-board/";

/// Court complexes offered on the Delhi cause-list page.
pub const DELHI_COURT_COMPLEXES: &[&str] = &[
    "Patiala House Court Complex",
    "Tis Hazari Courts Complex",
    "Karkardooma Courts Complex",
    "Rohini Courts Complex",
    "Dwarka Courts Complex",
    "Saket Courts Complex",
    "Rouse Avenue Courts Complex",
];

const RADIOS: &str = "input[type='radio']";
const LABELS: &str = "label";
const COMPLEX_SELECT: &str = "select[name*='complex'], select[id*='complex'], select";
const COURT_SELECTS: &[&str] = &[
    "select[id*='court']",
    "select[name*='court']",
    "select.form-control",
    "select",
];
const DATE_INPUTS: &[&str] = &[
    "input[type='date']",
    "input[id*='date']",
    "input[name*='date']",
    "input[placeholder*='date']",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CauseListQuery {
    pub court_complex: String,
    /// Court number / judge; `None` leaves the choice to the user.
    pub court: Option<String>,
    /// As the site expects it, `MM/DD/YYYY`.
    pub date: String,
    /// `Civil` or `Criminal`.
    pub list_type: String,
}

#[derive(Debug, Clone)]
pub struct CauseListFetch {
    pub cause_list: CauseList,
    pub raw_html: String,
}

/// Fill what can be filled, give the user the manual window, then scrape.
/// The browser stays open for `timings.linger` and is always closed.
/// Advisory notes land in `steps`, also when scraping fails.
#[tracing::instrument(
    level = "info",
    skip(driver, portal, timings, steps),
    fields(complex = %query.court_complex, date = %query.date, list_type = %query.list_type)
)]
pub async fn fetch_cause_list<D: FormDriver + ?Sized>(
    driver: &mut D,
    portal: &Url,
    query: &CauseListQuery,
    timings: &Timings,
    steps: &mut StepLog,
) -> Result<CauseListFetch> {
    let result = run(driver, portal, query, timings, steps).await;
    pause(timings.linger).await;
    if let Err(e) = driver.quit().await {
        warn!(error = %e, "failed to close browser");
    }
    result
}

async fn run<D: FormDriver + ?Sized>(
    driver: &mut D,
    portal: &Url,
    query: &CauseListQuery,
    timings: &Timings,
    steps: &mut StepLog,
) -> Result<CauseListFetch> {
    driver.goto(portal.as_str()).await?;
    info!("cause list page opened");
    pause(timings.settle).await;

    // 1) search by court complex
    if let Err(e) = pick_complex_mode(driver, steps, timings).await {
        steps.warn(format!("Could not find the Court Complex radio button: {:#}", e));
    }

    // 2) court complex
    pause(timings.settle).await;
    if let Err(e) = pick_complex(driver, &query.court_complex, steps, timings).await {
        steps.warn(format!("Court complex selection issue: {:#}", e));
    }

    // 3) court / judge
    pause(timings.settle * 2).await;
    if let Err(e) = pick_court(driver, query.court.as_deref(), steps).await {
        steps.warn(format!(
            "Court selection issue: {:#}. Please select manually",
            e
        ));
    }

    // 4) date
    pause(timings.settle / 2).await;
    match set_date(driver, &query.date, timings).await {
        Ok(true) => {}
        Ok(false) => steps.warn(format!(
            "Could not set the date to {} automatically. Please pick it from the calendar",
            query.date
        )),
        Err(e) => steps.warn(format!("Date setting issue: {:#}. Please set the date manually", e)),
    }

    // 5) civil / criminal
    pause(timings.settle / 2).await;
    match pick_list_type(driver, &query.list_type).await {
        Ok(true) => {}
        Ok(false) => steps.warn(format!(
            "Could not auto-select '{}'. Please select it manually",
            query.list_type
        )),
        Err(e) => steps.warn(format!("List type selection issue: {:#}", e)),
    }

    // 6) the user checks the form, enters the CAPTCHA and submits
    info!(
        window = ?timings.manual_window,
        "check the selections, enter the CAPTCHA and press Submit in the browser"
    );
    countdown(timings.manual_window).await;

    // 7) scrape whatever the page shows now
    let raw_html = driver.source().await?;
    let cause_list = extract_cause_list(&raw_html)?;
    info!(rows = cause_list.rows.len(), "cause list extracted");

    Ok(CauseListFetch {
        cause_list,
        raw_html,
    })
}

/// Label text for each radio, matched through `label[for=<id>]`.
fn radio_labels(radios: &[Field], labels: &[Field]) -> Vec<String> {
    radios
        .iter()
        .map(|r| {
            if r.id.is_empty() {
                return String::new();
            }
            labels
                .iter()
                .find(|l| l.label_for == r.id)
                .map(|l| l.text.clone())
                .unwrap_or_default()
        })
        .collect()
}

async fn pick_complex_mode<D: FormDriver + ?Sized>(
    driver: &mut D,
    steps: &mut StepLog,
    timings: &Timings,
) -> Result<()> {
    let radios = driver.fields(RADIOS).await?;
    let labels = driver.fields(LABELS).await?;
    let names = radio_labels(&radios, &labels);

    let found = radios.iter().zip(&names).position(|(radio, label)| {
        label.to_lowercase().contains("court complex") || radio.value == "court_complex"
    });
    match found {
        Some(n) => {
            driver.click(&Locator::nth(RADIOS, n)).await?;
            info!("searching by court complex");
            pause(timings.settle / 2).await;
        }
        None => steps.warn("Could not find the Court Complex radio button"),
    }
    Ok(())
}

async fn pick_complex<D: FormDriver + ?Sized>(
    driver: &mut D,
    wanted: &str,
    steps: &mut StepLog,
    timings: &Timings,
) -> Result<()> {
    driver.wait_for(COMPLEX_SELECT, timings.step_timeout).await?;
    let select = Locator::css(COMPLEX_SELECT);
    let available = driver.options(&select).await?;
    info!(available = %preview(&available, usize::MAX), "court complexes");

    match match_option(&available, wanted) {
        Some(option) => {
            let option = option.to_string();
            driver.choose(&select, &option).await?;
            info!(selected = %option, "court complex selected");
        }
        None => steps.warn(format!(
            "Could not auto-select '{}'. Please select it manually",
            wanted
        )),
    }
    Ok(())
}

fn is_complex_select(f: &Field) -> bool {
    f.id.to_lowercase().contains("complex") || f.name.to_lowercase().contains("complex")
}

/// First select, in selector priority order, whose options name courts or judges.
async fn find_court_select<D: FormDriver + ?Sized>(
    driver: &mut D,
) -> Result<Option<(Locator, Vec<String>)>> {
    for css in COURT_SELECTS {
        let found = driver.fields(css).await?;
        for (n, field) in found.iter().enumerate() {
            if is_complex_select(field) {
                continue;
            }
            let loc = Locator::nth(*css, n);
            let options = driver.options(&loc).await?;
            if lists_courts(&options) {
                return Ok(Some((loc, options)));
            }
        }
    }
    Ok(None)
}

async fn pick_court<D: FormDriver + ?Sized>(
    driver: &mut D,
    wanted: Option<&str>,
    steps: &mut StepLog,
) -> Result<()> {
    let Some((select, options)) = find_court_select(driver).await? else {
        steps.warn("Could not find the court dropdown. Please select the court manually");
        return Ok(());
    };
    info!(count = options.len(), available = %preview(&options, 3), "court dropdown found");

    let Some(wanted) = wanted.map(str::trim).filter(|w| !w.is_empty()) else {
        info!("no court given; pick one from the dropdown in the browser");
        return Ok(());
    };
    match match_option(&options, wanted) {
        Some(option) => {
            let option = option.to_string();
            driver.choose(&select, &option).await?;
            info!(selected = %option, "court selected");
        }
        None => steps.warn(format!(
            "Could not auto-select court '{}'. Please select it manually",
            wanted
        )),
    }
    Ok(())
}

/// Returns whether some date field accepted the date.
async fn set_date<D: FormDriver + ?Sized>(
    driver: &mut D,
    date: &str,
    timings: &Timings,
) -> Result<bool> {
    for css in DATE_INPUTS {
        let found = driver.fields(css).await?;
        for (n, field) in found.iter().enumerate() {
            if !field.displayed || !field.enabled {
                continue;
            }
            let target = Locator::nth(*css, n);
            if let Err(e) = driver.click(&target).await {
                debug!(error = %e, "could not focus date field");
            }
            for candidate in date_variants(date) {
                if let Err(e) = driver.set_value(&target, &candidate).await {
                    debug!(error = %e, value = %candidate, "date rejected");
                    continue;
                }
                pause(timings.settle / 4).await;
                if date_accepted(&driver.value(&target).await?) {
                    info!(date = %candidate, "date set");
                    return Ok(true);
                }
            }
        }
    }
    Ok(false)
}

/// Radio by value first, then a label naming the list type.
async fn pick_list_type<D: FormDriver + ?Sized>(driver: &mut D, list_type: &str) -> Result<bool> {
    let wanted = list_type.to_lowercase();
    let radios = driver.fields(RADIOS).await?;
    for (n, radio) in radios.iter().enumerate() {
        if radio.value.is_empty() || !radio.value.to_lowercase().contains(&wanted) {
            continue;
        }
        driver.click(&Locator::nth(RADIOS, n)).await?;
        let checked = driver
            .fields(RADIOS)
            .await?
            .get(n)
            .is_some_and(|r| r.checked);
        if checked {
            info!(%list_type, "list type selected");
            return Ok(true);
        }
    }

    let labels = driver.fields(LABELS).await?;
    if let Some(n) = labels
        .iter()
        .position(|l| l.text.to_lowercase().contains(&wanted))
    {
        driver.click(&Locator::nth(LABELS, n)).await?;
        info!(%list_type, "list type selected via label");
        return Ok(true);
    }
    Ok(false)
}

/// Count the manual window down on the terminal.
async fn countdown(window: Duration) {
    let secs = window.as_secs();
    if secs == 0 {
        return;
    }
    let bar = ProgressBar::new(secs);
    bar.set_style(
        ProgressStyle::with_template("  {bar:30.cyan/blue} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    for left in (1..=secs).rev() {
        bar.set_message(format!("{}s left to submit the form", left));
        sleep(Duration::from_secs(1)).await;
        bar.inc(1);
    }
    bar.finish_and_clear();
}
