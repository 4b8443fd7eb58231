// In-memory stand-in for a browser page, for flow tests.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::{Field, FormDriver, Locator};

#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    pub field: Field,
    pub options: Vec<String>,
}

impl FakeElement {
    pub fn select(id: &str, options: &[&str]) -> Self {
        Self {
            field: Field {
                tag: "select".into(),
                id: id.into(),
                displayed: true,
                enabled: true,
                ..Field::default()
            },
            options: options.iter().map(|o| o.to_string()).collect(),
        }
    }

    pub fn input(id: &str) -> Self {
        Self {
            field: Field {
                tag: "input".into(),
                id: id.into(),
                displayed: true,
                enabled: true,
                ..Field::default()
            },
            options: Vec::new(),
        }
    }

    pub fn radio(id: &str, value: &str) -> Self {
        let mut el = Self::input(id);
        el.field.value = value.into();
        el
    }

    pub fn label(label_for: &str, text: &str) -> Self {
        Self {
            field: Field {
                tag: "label".into(),
                text: text.into(),
                label_for: label_for.into(),
                displayed: true,
                enabled: true,
                ..Field::default()
            },
            options: Vec::new(),
        }
    }

    pub fn hidden(mut self) -> Self {
        self.field.displayed = false;
        self
    }
}

/// Elements are registered under the exact CSS strings the flows query.
#[derive(Debug, Default)]
pub struct FakePage {
    pub elements: HashMap<String, Vec<FakeElement>>,
    /// Values a field silently refuses, like a date picker rejecting a format.
    pub rejected_values: HashSet<String>,
    pub html: String,
    /// Every state-changing call, e.g. `choose #case_type=CS`.
    pub actions: Vec<String>,
    pub quit: bool,
}

impl FakePage {
    pub fn with(mut self, css: &str, el: FakeElement) -> Self {
        self.elements.entry(css.to_string()).or_default().push(el);
        self
    }

    pub fn with_html(mut self, html: &str) -> Self {
        self.html = html.to_string();
        self
    }

    pub fn did(&self, action: &str) -> bool {
        self.actions.iter().any(|a| a == action)
    }

    fn element(&mut self, loc: &Locator) -> Result<&mut FakeElement> {
        self.elements
            .get_mut(&loc.css)
            .and_then(|found| found.get_mut(loc.nth))
            .ok_or_else(|| anyhow!("no element #{} for `{}`", loc.nth, loc.css))
    }

    fn ensure_open(&self) -> Result<()> {
        if self.quit {
            bail!("browser session already closed");
        }
        Ok(())
    }
}

#[async_trait]
impl FormDriver for FakePage {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.ensure_open()?;
        self.actions.push(format!("goto {}", url));
        Ok(())
    }

    async fn wait_for(&mut self, css: &str, _timeout: Duration) -> Result<()> {
        self.ensure_open()?;
        match self.elements.get(css) {
            Some(found) if !found.is_empty() => Ok(()),
            _ => bail!("timed out waiting for `{}`", css),
        }
    }

    async fn fields(&mut self, css: &str) -> Result<Vec<Field>> {
        self.ensure_open()?;
        Ok(self
            .elements
            .get(css)
            .map(|found| found.iter().map(|e| e.field.clone()).collect())
            .unwrap_or_default())
    }

    async fn options(&mut self, select: &Locator) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.element(select)?.options.clone())
    }

    async fn choose(&mut self, select: &Locator, text: &str) -> Result<()> {
        self.ensure_open()?;
        let el = self.element(select)?;
        if !el.options.iter().any(|o| o == text) {
            bail!("`{}` has no option `{}`", select.css, text);
        }
        el.field.value = text.to_string();
        self.actions.push(format!("choose {}={}", select.css, text));
        Ok(())
    }

    async fn type_text(&mut self, field: &Locator, text: &str) -> Result<()> {
        self.ensure_open()?;
        let el = self.element(field)?;
        if !el.field.displayed || !el.field.enabled {
            bail!("`{}` is not interactable", field.css);
        }
        el.field.value = text.to_string();
        self.actions.push(format!("type {}={}", field.css, text));
        Ok(())
    }

    async fn set_value(&mut self, field: &Locator, value: &str) -> Result<()> {
        self.ensure_open()?;
        let rejected = self.rejected_values.contains(value);
        let el = self.element(field)?;
        el.field.value = if rejected {
            String::new()
        } else {
            value.to_string()
        };
        self.actions.push(format!("set {}={}", field.css, value));
        Ok(())
    }

    async fn value(&mut self, field: &Locator) -> Result<String> {
        self.ensure_open()?;
        Ok(self.element(field)?.field.value.clone())
    }

    async fn click(&mut self, target: &Locator) -> Result<()> {
        self.ensure_open()?;
        let el = self.element(target)?;
        if el.field.tag == "input" {
            el.field.checked = true;
        }
        self.actions.push(format!("click {}#{}", target.css, target.nth));
        Ok(())
    }

    async fn press_escape(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.actions.push("escape".into());
        Ok(())
    }

    async fn source(&mut self) -> Result<String> {
        self.ensure_open()?;
        Ok(self.html.clone())
    }

    async fn quit(&mut self) -> Result<()> {
        self.quit = true;
        Ok(())
    }
}
