// src/fetch/mod.rs
//
// Driving the court portals' search forms through a browser.

pub mod case_status;
pub mod cause_list;
pub mod select;
pub mod webdriver;

#[cfg(test)]
pub(crate) mod fake;

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// The `nth` element matching a CSS selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub css: String,
    pub nth: usize,
}

impl Locator {
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            nth: 0,
        }
    }

    pub fn id(id: &str) -> Self {
        Self::css(format!("#{}", id))
    }

    pub fn nth(css: impl Into<String>, nth: usize) -> Self {
        Self {
            css: css.into(),
            nth,
        }
    }
}

/// A snapshot of one form element's state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Field {
    /// Lower-case tag name.
    pub tag: String,
    pub id: String,
    pub name: String,
    pub value: String,
    /// Visible text (labels, options).
    pub text: String,
    /// The `for` attribute of a `<label>`.
    pub label_for: String,
    pub displayed: bool,
    pub enabled: bool,
    pub checked: bool,
}

/// The browser operations the portal flows need.
///
/// Clicks and value changes go through script so that overlays on the live
/// portals cannot intercept them; every change fires the usual
/// `input`/`change` events.
#[async_trait]
pub trait FormDriver: Send {
    async fn goto(&mut self, url: &str) -> Result<()>;
    /// Wait until an element matching `css` is present.
    async fn wait_for(&mut self, css: &str, timeout: Duration) -> Result<()>;
    /// Every element matching `css`, in document order.
    async fn fields(&mut self, css: &str) -> Result<Vec<Field>>;
    /// Visible texts of a `<select>`'s options.
    async fn options(&mut self, select: &Locator) -> Result<Vec<String>>;
    /// Select the option whose visible text is exactly `text`.
    async fn choose(&mut self, select: &Locator, text: &str) -> Result<()>;
    async fn type_text(&mut self, field: &Locator, text: &str) -> Result<()>;
    async fn set_value(&mut self, field: &Locator, value: &str) -> Result<()>;
    async fn value(&mut self, field: &Locator) -> Result<String>;
    async fn click(&mut self, target: &Locator) -> Result<()>;
    async fn press_escape(&mut self) -> Result<()>;
    async fn source(&mut self) -> Result<String>;
    async fn quit(&mut self) -> Result<()>;
}

/// Pauses and deadlines for one browser session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timings {
    /// How long to wait for a form element to appear.
    pub step_timeout: Duration,
    /// How long the user has to solve the CAPTCHA before the result must show.
    pub result_timeout: Duration,
    /// Fixed window for manual entry on the cause-list page.
    pub manual_window: Duration,
    /// Pause after a change that reloads dependent fields.
    pub settle: Duration,
    /// Pause before closing the browser after a cause-list run.
    pub linger: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            step_timeout: Duration::from_secs(10),
            result_timeout: Duration::from_secs(120),
            manual_window: Duration::from_secs(45),
            settle: Duration::from_secs(2),
            linger: Duration::from_secs(5),
        }
    }
}

impl Timings {
    /// No pauses at all; deadlines stay as configured.
    pub fn immediate() -> Self {
        Self {
            manual_window: Duration::ZERO,
            settle: Duration::ZERO,
            linger: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Advisory notes collected while filling a form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepLog {
    warnings: Vec<String>,
}

impl StepLog {
    pub fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!("{}", msg);
        self.warnings.push(msg);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// `items` joined for a message, cut after `limit` entries.
pub(crate) fn preview(items: &[String], limit: usize) -> String {
    let shown: Vec<&str> = items
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .take(limit)
        .collect();
    let total = items.iter().filter(|s| !s.trim().is_empty()).count();
    if total > shown.len() {
        format!("{}... ({} total)", shown.join(", "), total)
    } else {
        shown.join(", ")
    }
}

/// Sleep unless the pause is zero.
pub(crate) async fn pause(d: Duration) {
    if !d.is_zero() {
        tokio::time::sleep(d).await;
    }
}
