// src/fetch/webdriver.rs

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thirtyfour::prelude::*;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use super::{Field, FormDriver, Locator};

const MAX_RETRIES: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const JS_CLICK: &str = "arguments[0].click();";
const JS_SET_VALUE: &str = r#"
    const el = arguments[0];
    el.value = '';
    el.value = arguments[1];
    for (const kind of ['input', 'change', 'blur']) {
        el.dispatchEvent(new Event(kind, { bubbles: true }));
    }
"#;

#[derive(Debug, Deserialize)]
struct StatusReply {
    value: StatusValue,
}

#[derive(Debug, Deserialize)]
struct StatusValue {
    #[serde(default)]
    ready: bool,
    #[serde(default)]
    message: String,
}

/// The `/status` endpoint under `server`, keeping any base path such as `/wd/hub`.
fn status_url(server: &Url) -> Result<Url> {
    let mut base = server.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("status")
        .with_context(|| format!("building status URL from {}", server))
}

/// Ask the WebDriver server whether it can open a session.
pub async fn probe_server(client: &Client, server: &Url) -> Result<()> {
    let status_url = status_url(server)?;
    let mut attempt = 0;

    // retry loop
    loop {
        attempt += 1;
        let res = async {
            let reply: StatusReply = client
                .get(status_url.clone())
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            anyhow::Ok(reply)
        }
        .await;

        match res {
            Ok(reply) if reply.value.ready => {
                debug!(%status_url, "webdriver server ready");
                return Ok(());
            }
            Ok(reply) if attempt < MAX_RETRIES => {
                warn!(attempt, message = %reply.value.message, "webdriver server not ready; retrying");
            }
            Ok(reply) => {
                bail!(
                    "no driver available: {} is not ready ({})",
                    server,
                    reply.value.message
                );
            }
            Err(e) if attempt < MAX_RETRIES => {
                warn!(attempt, error = %e, "webdriver status probe failed; retrying");
            }
            Err(e) => {
                return Err(e).with_context(|| {
                    format!(
                        "no driver available: {} did not answer after {} attempts",
                        server, MAX_RETRIES
                    )
                });
            }
        }
        sleep(RETRY_DELAY).await;
    }
}

/// A Chrome session behind a WebDriver server.
pub struct WebDriverSession {
    driver: Option<WebDriver>,
}

impl WebDriverSession {
    #[tracing::instrument(level = "info", skip(client), fields(server = %server))]
    pub async fn connect(client: &Client, server: &Url) -> Result<Self> {
        probe_server(client, server).await?;

        let caps = DesiredCapabilities::chrome();
        let driver = WebDriver::new(server.as_str(), caps)
            .await
            .with_context(|| format!("opening browser session on {}", server))?;
        if let Err(e) = driver.maximize_window().await {
            debug!(error = %e, "could not maximise browser window");
        }
        info!("browser session opened");
        Ok(Self {
            driver: Some(driver),
        })
    }

    fn driver(&self) -> Result<&WebDriver> {
        self.driver
            .as_ref()
            .ok_or_else(|| anyhow!("browser session already closed"))
    }

    async fn element(&self, loc: &Locator) -> Result<WebElement> {
        let mut found = self
            .driver()?
            .find_all(By::Css(loc.css.as_str()))
            .await
            .with_context(|| format!("looking up `{}`", loc.css))?;
        if loc.nth >= found.len() {
            bail!(
                "no element #{} for `{}` ({} found)",
                loc.nth,
                loc.css,
                found.len()
            );
        }
        Ok(found.swap_remove(loc.nth))
    }

    async fn script(&self, js: &str, args: Vec<serde_json::Value>) -> Result<()> {
        self.driver()?
            .execute(js, args)
            .await
            .context("running page script")?;
        Ok(())
    }

    async fn describe(&self, el: &WebElement) -> Result<Field> {
        Ok(Field {
            tag: el.tag_name().await?.to_lowercase(),
            id: el.attr("id").await?.unwrap_or_default(),
            name: el.attr("name").await?.unwrap_or_default(),
            value: el.prop("value").await?.unwrap_or_default(),
            text: el.text().await?.trim().to_string(),
            label_for: el.attr("for").await?.unwrap_or_default(),
            displayed: el.is_displayed().await?,
            enabled: el.is_enabled().await?,
            checked: el.is_selected().await?,
        })
    }
}

#[async_trait]
impl FormDriver for WebDriverSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        self.driver()?
            .goto(url)
            .await
            .with_context(|| format!("navigating to {}", url))
    }

    async fn wait_for(&mut self, css: &str, timeout: Duration) -> Result<()> {
        self.driver()?
            .query(By::Css(css))
            .wait(timeout, POLL_INTERVAL)
            .first()
            .await
            .with_context(|| format!("waiting {:?} for `{}`", timeout, css))?;
        Ok(())
    }

    async fn fields(&mut self, css: &str) -> Result<Vec<Field>> {
        let found = self
            .driver()?
            .find_all(By::Css(css))
            .await
            .with_context(|| format!("looking up `{}`", css))?;
        let mut out = Vec::with_capacity(found.len());
        for el in &found {
            out.push(self.describe(el).await?);
        }
        Ok(out)
    }

    async fn options(&mut self, select: &Locator) -> Result<Vec<String>> {
        let el = self.element(select).await?;
        let mut out = Vec::new();
        for opt in el.find_all(By::Tag("option")).await? {
            out.push(opt.text().await?.trim().to_string());
        }
        Ok(out)
    }

    async fn choose(&mut self, select: &Locator, text: &str) -> Result<()> {
        let el = self.element(select).await?;
        for opt in el.find_all(By::Tag("option")).await? {
            if opt.text().await?.trim() != text {
                continue;
            }
            if opt.click().await.is_err() {
                // hidden behind a styled dropdown
                self.script(
                    "arguments[0].selected = true; \
                     arguments[0].parentElement.dispatchEvent(new Event('change', { bubbles: true }));",
                    vec![opt.to_json()?],
                )
                .await?;
            }
            return Ok(());
        }
        bail!("`{}` has no option `{}`", select.css, text)
    }

    async fn type_text(&mut self, field: &Locator, text: &str) -> Result<()> {
        let el = self.element(field).await?;
        el.clear().await?;
        el.send_keys(text)
            .await
            .with_context(|| format!("typing into `{}`", field.css))
    }

    async fn set_value(&mut self, field: &Locator, value: &str) -> Result<()> {
        let el = self.element(field).await?;
        self.script(JS_SET_VALUE, vec![el.to_json()?, serde_json::json!(value)])
            .await
    }

    async fn value(&mut self, field: &Locator) -> Result<String> {
        let el = self.element(field).await?;
        Ok(el.prop("value").await?.unwrap_or_default())
    }

    async fn click(&mut self, target: &Locator) -> Result<()> {
        let el = self.element(target).await?;
        self.script(JS_CLICK, vec![el.to_json()?]).await
    }

    async fn press_escape(&mut self) -> Result<()> {
        let body = self.driver()?.find(By::Tag("body")).await?;
        body.send_keys(Key::Escape).await?;
        Ok(())
    }

    async fn source(&mut self) -> Result<String> {
        self.driver()?
            .source()
            .await
            .context("reading page source")
    }

    async fn quit(&mut self) -> Result<()> {
        if let Some(driver) = self.driver.take() {
            driver.quit().await.context("closing browser session")?;
            info!("browser session closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(server: &str) -> String {
        status_url(&Url::parse(server).unwrap()).unwrap().to_string()
    }

    #[test]
    fn test_status_url_keeps_base_path() {
        assert_eq!(status_of("http://grid:4444/wd/hub"), "http://grid:4444/wd/hub/status");
        assert_eq!(status_of("http://grid:4444/wd/hub/"), "http://grid:4444/wd/hub/status");
        assert_eq!(status_of("http://localhost:9515"), "http://localhost:9515/status");
        assert_eq!(status_of("http://localhost:9515/"), "http://localhost:9515/status");
    }
}
