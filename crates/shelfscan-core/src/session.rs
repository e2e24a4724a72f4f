use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Marketplace region. Selects the default base origin for search URLs and
/// the currency token set stripped during price parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    India,
    Us,
    Uk,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::India, Region::Us, Region::Uk];

    /// Default storefront origin for this region.
    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Region::India => "https://www.amazon.in",
            Region::Us => "https://www.amazon.com",
            Region::Uk => "https://www.amazon.co.uk",
        }
    }

    /// Regex fragments for currency tokens seen in this region's price text:
    /// symbol, ISO code, and spelled-out forms. Applied case-insensitively.
    #[must_use]
    pub fn currency_token_patterns(self) -> &'static [&'static str] {
        match self {
            Region::India => &["₹", r"Rs\.?", "INR", "rupees?"],
            Region::Us => &[r"\$", "USD", "dollars?"],
            Region::Uk => &["£", "GBP", "pounds?"],
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Region::India => "india",
            Region::Us => "us",
            Region::Uk => "uk",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown region \"{0}\" (expected india, us, or uk)")]
pub struct UnknownRegion(String);

impl FromStr for Region {
    type Err = UnknownRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "india" => Ok(Region::India),
            "us" => Ok(Region::Us),
            "uk" => Ok(Region::Uk),
            other => Err(UnknownRegion(other.to_owned())),
        }
    }
}

/// Delays enforced between outbound requests and page navigations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PacingConfig {
    /// Minimum gap between consecutive requests.
    pub request_gap: Duration,
    /// Delay before navigating to the next results page; zero disables
    /// the wait.
    pub page_delay: Duration,
    /// Upper bound for a single page navigation.
    pub nav_timeout: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            request_gap: Duration::from_secs(2),
            page_delay: Duration::from_secs(3),
            nav_timeout: Duration::from_secs(30),
        }
    }
}

/// Bounded-retry policy for page fetches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempt budget, first try included. Values below 1 behave as 1.
    pub max_attempts: u32,
    /// Backoff between attempts is `backoff_factor^attempt_index` seconds,
    /// attempt index zero-based.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_factor: 2.0,
        }
    }
}

/// Result-level filters applied to each page's captures before accumulation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultFilters {
    /// Brand refinement forwarded into the search URL; not re-checked on
    /// extracted records.
    pub brand: Option<String>,
    /// Drops records whose rating is absent or below this value.
    pub min_rating: Option<f64>,
    /// Drops records whose stock text marks them unavailable.
    pub in_stock_only: bool,
    /// Hard page-count ceiling for the pagination loop.
    pub max_pages: Option<u32>,
}

/// Immutable configuration for one scrape run. Created once, read-only
/// thereafter; concurrent runs each build their own.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSession {
    pub keyword: String,
    pub region: Region,
    /// Base origin for search URLs. Defaults from the region; overridable
    /// through settings (and pointed at a local server in tests).
    pub origin: String,
    /// Inclusive price bounds, major currency units. Applied both as URL
    /// refinements and as hard cutoffs on extracted records; a record with
    /// no parsed price passes the cutoff.
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub filters: ResultFilters,
    pub pacing: PacingConfig,
    pub retry: RetryPolicy,
    /// Forwarded opaquely to the page-session implementation.
    pub headless: bool,
    /// Heuristic: rating text above 5 is assumed to be on a 10-point scale
    /// and halved. Unconfirmed against any marketplace contract; keep the
    /// toggle until product sign-off.
    pub ten_point_rating_correction: bool,
}

impl SearchSession {
    /// Session with the given keyword and region, everything else default.
    #[must_use]
    pub fn new(keyword: impl Into<String>, region: Region) -> Self {
        Self {
            keyword: keyword.into(),
            region,
            origin: region.base_url().to_owned(),
            min_price: None,
            max_price: None,
            filters: ResultFilters::default(),
            pacing: PacingConfig::default(),
            retry: RetryPolicy::default(),
            headless: true,
            ten_point_rating_correction: true,
        }
    }
}
