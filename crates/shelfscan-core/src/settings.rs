//! YAML settings file schema.
//!
//! Every field is optional; absent values fall back to the defaults baked
//! into [`SearchSession`]. The CLI layers its flags on top of whatever the
//! file provides, so precedence is flags > file > defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::session::{Region, SearchSession};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// On-disk settings, mirroring the sections of `config/settings.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub region: Option<Region>,
    pub search_keyword: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Per-region origin overrides, e.g. a mirror or a test server.
    pub base_urls: BTreeMap<Region, String>,
    pub optional_filters: FilterSettings,
    pub scraping: ScrapingSettings,
    pub output: OutputSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub brand: Option<String>,
    pub minimum_rating: Option<f64>,
    pub in_stock_only: Option<bool>,
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ScrapingSettings {
    /// Seconds between consecutive requests.
    pub delay_between_requests: Option<f64>,
    /// Seconds between page navigations.
    pub delay_between_pages: Option<f64>,
    /// Navigation timeout in seconds.
    pub timeout: Option<u64>,
    pub max_retries: Option<u32>,
    pub backoff_factor: Option<f64>,
    pub headless: Option<bool>,
    /// User-Agent pool; one is drawn per page session. Empty means the
    /// built-in pool.
    pub user_agents: Vec<String>,
    pub ten_point_rating_correction: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub format: Option<OutputFormat>,
    pub output_dir: Option<PathBuf>,
    pub deduplicate: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default tracing filter directive when `RUST_LOG` is unset.
    pub level: Option<String>,
}

/// Output file format(s) written at the end of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
    Both,
}

impl OutputFormat {
    #[must_use]
    pub fn writes_csv(self) -> bool {
        matches!(self, OutputFormat::Csv | OutputFormat::Both)
    }

    #[must_use]
    pub fn writes_json(self) -> bool {
        matches!(self, OutputFormat::Json | OutputFormat::Both)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Both => "both",
        })
    }
}

#[derive(Debug, Error)]
#[error("unknown output format \"{0}\" (expected csv, json, or both)")]
pub struct UnknownOutputFormat(String);

impl FromStr for OutputFormat {
    type Err = UnknownOutputFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            "both" => Ok(OutputFormat::Both),
            other => Err(UnknownOutputFormat(other.to_owned())),
        }
    }
}

impl Settings {
    /// Parses a YAML document. An empty document yields all defaults.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Parse`] when the document is not valid YAML
    /// or a field has the wrong shape.
    pub fn from_yaml(text: &str) -> Result<Self, SettingsError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Origin to use for `region`: the file override when present, else the
    /// region's default storefront.
    #[must_use]
    pub fn origin_for(&self, region: Region) -> String {
        self.base_urls
            .get(&region)
            .cloned()
            .unwrap_or_else(|| region.base_url().to_owned())
    }

    /// Builds a [`SearchSession`] from these settings for the given keyword
    /// and region. Absent fields keep the session defaults; CLI flags are
    /// layered on by the caller afterwards.
    #[must_use]
    pub fn to_search_session(&self, keyword: impl Into<String>, region: Region) -> SearchSession {
        let mut session = SearchSession::new(keyword, region);
        session.origin = self.origin_for(region);
        session.min_price = self.min_price;
        session.max_price = self.max_price;

        session.filters.brand = self.optional_filters.brand.clone();
        session.filters.min_rating = self.optional_filters.minimum_rating;
        if let Some(in_stock_only) = self.optional_filters.in_stock_only {
            session.filters.in_stock_only = in_stock_only;
        }
        session.filters.max_pages = self.optional_filters.max_pages;

        if let Some(secs) = self.scraping.delay_between_requests {
            session.pacing.request_gap = duration_from_secs(secs);
        }
        if let Some(secs) = self.scraping.delay_between_pages {
            session.pacing.page_delay = duration_from_secs(secs);
        }
        if let Some(secs) = self.scraping.timeout {
            session.pacing.nav_timeout = Duration::from_secs(secs);
        }
        if let Some(max_retries) = self.scraping.max_retries {
            session.retry.max_attempts = max_retries;
        }
        if let Some(factor) = self.scraping.backoff_factor {
            session.retry.backoff_factor = factor;
        }
        if let Some(headless) = self.scraping.headless {
            session.headless = headless;
        }
        if let Some(correct) = self.scraping.ten_point_rating_correction {
            session.ten_point_rating_correction = correct;
        }

        session
    }
}

/// Converts a user-supplied seconds value into a `Duration`, treating
/// negative or non-finite input as zero instead of panicking.
#[must_use]
pub fn duration_from_secs(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::from_secs_f64(secs)
    } else {
        Duration::ZERO
    }
}
