// src/config.rs
//
// Settings: built-in defaults, then an optional YAML file, then environment
// variables and command-line flags (both through `Overrides`).

use anyhow::{bail, Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

use crate::fetch::case_status::ECOURTS_URL;
use crate::fetch::cause_list::DELHI_CAUSE_LIST_URL;
use crate::fetch::Timings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the query history store.
    pub data_dir: PathBuf,
    /// Where CSV and PDF reports are written.
    pub export_dir: PathBuf,
    pub webdriver_url: String,
    pub ecourts_url: String,
    pub cause_list_url: String,
    pub step_timeout_secs: u64,
    pub result_timeout_secs: u64,
    pub manual_window_secs: u64,
    pub settle_secs: u64,
    pub linger_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let t = Timings::default();
        Self {
            data_dir: PathBuf::from("data"),
            export_dir: PathBuf::from("exports"),
            webdriver_url: "http://localhost:9515".into(),
            ecourts_url: ECOURTS_URL.into(),
            cause_list_url: DELHI_CAUSE_LIST_URL.into(),
            step_timeout_secs: t.step_timeout.as_secs(),
            result_timeout_secs: t.result_timeout.as_secs(),
            manual_window_secs: t.manual_window.as_secs(),
            settle_secs: t.settle.as_secs(),
            linger_secs: t.linger.as_secs(),
        }
    }
}

/// Values from the environment or the command line; anything set here wins
/// over the file.
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// YAML settings file
    #[arg(long, global = true, env = "COURTSCRAPER_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, env = "COURTSCRAPER_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, env = "COURTSCRAPER_EXPORT_DIR")]
    pub export_dir: Option<PathBuf>,

    /// WebDriver server, e.g. a running chromedriver
    #[arg(long, global = true, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Seconds to wait for the case result after the CAPTCHA prompt
    #[arg(long, global = true, env = "COURTSCRAPER_RESULT_TIMEOUT")]
    pub result_timeout: Option<u64>,

    /// Seconds given for manual entry on the cause-list page
    #[arg(long, global = true, env = "COURTSCRAPER_MANUAL_WINDOW")]
    pub manual_window: Option<u64>,
}

/// Parsed endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub webdriver: Url,
    pub ecourts: Url,
    pub cause_list: Url,
}

fn parse_url(what: &str, raw: &str) -> Result<Url> {
    let url = Url::parse(raw).with_context(|| format!("invalid {} URL `{}`", what, raw))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("{} URL `{}` must be http or https", what, raw);
    }
    Ok(url)
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Defaults, then the file named in `overrides` (if any), then the
    /// remaining overrides.
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let mut cfg = match &overrides.config {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        cfg.apply(overrides);
        Ok(cfg)
    }

    pub fn apply(&mut self, o: &Overrides) {
        if let Some(d) = &o.data_dir {
            self.data_dir = d.clone();
        }
        if let Some(d) = &o.export_dir {
            self.export_dir = d.clone();
        }
        if let Some(u) = &o.webdriver_url {
            self.webdriver_url = u.clone();
        }
        if let Some(s) = o.result_timeout {
            self.result_timeout_secs = s;
        }
        if let Some(s) = o.manual_window {
            self.manual_window_secs = s;
        }
    }

    pub fn endpoints(&self) -> Result<Endpoints> {
        Ok(Endpoints {
            webdriver: parse_url("WebDriver", &self.webdriver_url)?,
            ecourts: parse_url("eCourts portal", &self.ecourts_url)?,
            cause_list: parse_url("cause list", &self.cause_list_url)?,
        })
    }

    pub fn timings(&self) -> Timings {
        Timings {
            step_timeout: Duration::from_secs(self.step_timeout_secs),
            result_timeout: Duration::from_secs(self.result_timeout_secs),
            manual_window: Duration::from_secs(self.manual_window_secs),
            settle: Duration::from_secs(self.settle_secs),
            linger: Duration::from_secs(self.linger_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_session_timings() {
        let cfg = Config::default();
        assert_eq!(cfg.timings(), Timings::default());
        let ep = cfg.endpoints().unwrap();
        assert_eq!(ep.webdriver.port(), Some(9515));
        assert_eq!(ep.ecourts.host_str(), Some("services.ecourts.gov.in"));
    }

    #[test]
    fn test_file_then_overrides() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("courtscraper.yaml");
        fs::write(
            &path,
            "data_dir: /var/lib/courts\nmanual_window_secs: 90\nwebdriver_url: http://grid:4444\n",
        )
        .unwrap();

        let overrides = Overrides {
            config: Some(path),
            webdriver_url: Some("http://localhost:4444".into()),
            ..Overrides::default()
        };
        let cfg = Config::load(&overrides).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/var/lib/courts"));
        assert_eq!(cfg.manual_window_secs, 90);
        assert_eq!(cfg.webdriver_url, "http://localhost:4444");
        // untouched keys keep their defaults
        assert_eq!(cfg.result_timeout_secs, 120);
        assert_eq!(cfg.export_dir, PathBuf::from("exports"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("bad.yaml");
        fs::write(&path, "manual_windw_secs: 90\n").unwrap();
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_bad_urls_rejected() {
        let mut cfg = Config::default();
        cfg.cause_list_url = "not a url".into();
        assert!(cfg.endpoints().is_err());

        let mut cfg = Config::default();
        cfg.webdriver_url = "file:///tmp/driver".into();
        let err = cfg.endpoints().unwrap_err().to_string();
        assert!(err.contains("http or https"), "{}", err);
    }
}
