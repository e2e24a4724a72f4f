mod output;
mod search;

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use clap::Parser;
use shelfscan_core::settings::duration_from_secs;
use shelfscan_core::{OutputFormat, Region, SearchSession, Settings};
use shelfscan_scraper::session::pick_user_agent;
use shelfscan_scraper::SessionConfig;
use tracing_subscriber::EnvFilter;

use crate::output::OutputPlan;

#[derive(Debug, Parser)]
#[command(name = "shelfscan")]
#[command(about = "Scrape storefront search results into CSV/JSON exports")]
struct Cli {
    /// Keyword to search for (falls back to the settings file)
    #[arg(long)]
    search_keyword: Option<String>,

    /// Storefront region: india, us, or uk
    #[arg(long)]
    region: Option<Region>,

    /// Lower price bound in whole currency units
    #[arg(long)]
    min_price: Option<f64>,

    /// Upper price bound in whole currency units
    #[arg(long)]
    max_price: Option<f64>,

    /// Brand refinement applied in the search query
    #[arg(long)]
    brand: Option<String>,

    /// Drop results rated below this value
    #[arg(long)]
    minimum_rating: Option<f64>,

    /// Drop results whose stock text marks them unavailable
    #[arg(long)]
    in_stock_only: bool,

    /// Stop after this many result pages (0 means unlimited)
    #[arg(long)]
    max_pages: Option<u32>,

    /// Seconds to wait between consecutive requests
    #[arg(long)]
    delay: Option<f64>,

    /// Run the page session headless
    #[arg(long, overrides_with = "no_headless")]
    headless: bool,

    /// Run the page session with a visible window
    #[arg(long, overrides_with = "headless")]
    no_headless: bool,

    /// File format(s) to write: csv, json, or both
    #[arg(long)]
    output_format: Option<OutputFormat>,

    /// Directory the export files are written into
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Path to the YAML settings file
    #[arg(long, default_value = "config/settings.yaml")]
    config: PathBuf,
}

impl Cli {
    /// Tri-state headless choice: either flag beats the settings file,
    /// absence keeps whatever the file says.
    fn headless_override(&self) -> Option<bool> {
        if self.headless {
            Some(true)
        } else if self.no_headless {
            Some(false)
        } else {
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let (settings, settings_found) = load_settings(&cli.config)?;
    init_tracing(&settings)?;
    if !settings_found {
        tracing::warn!(
            path = %cli.config.display(),
            "settings file not found, running on built-in defaults"
        );
    }

    let Some(keyword) = cli
        .search_keyword
        .clone()
        .or_else(|| settings.search_keyword.clone())
    else {
        anyhow::bail!(
            "no search keyword given; pass --search-keyword or set search_keyword in {}",
            cli.config.display()
        );
    };
    let region = cli.region.or(settings.region).unwrap_or(Region::India);

    let mut search = settings.to_search_session(keyword.clone(), region);
    apply_cli_overrides(&mut search, &cli);

    if search.min_price.is_none() && search.max_price.is_none() {
        tracing::warn!("no price bounds configured, results are not price filtered");
    }

    let session = SessionConfig {
        nav_timeout: search.pacing.nav_timeout,
        user_agent: pick_user_agent(&settings.scraping.user_agents),
        headless: search.headless,
    };
    let plan = OutputPlan {
        format: cli
            .output_format
            .or(settings.output.format)
            .unwrap_or(OutputFormat::Csv),
        directory: cli
            .output_dir
            .clone()
            .or_else(|| settings.output.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from("outputs")),
        keyword,
    };
    let deduplicate = settings.output.deduplicate.unwrap_or(true);

    search::run_search(search, session, deduplicate, plan).await
}

/// Reads and parses the settings file, tolerating a missing file.
///
/// Returns the settings plus whether the file existed, so the caller can
/// log the miss once tracing is up.
fn load_settings(path: &Path) -> anyhow::Result<(Settings, bool)> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            let settings = Settings::from_yaml(&text)
                .map_err(|e| anyhow::anyhow!("failed to load {}: {e}", path.display()))?;
            Ok((settings, true))
        }
        Err(err) if err.kind() == ErrorKind::NotFound => Ok((Settings::default(), false)),
        Err(err) => Err(anyhow::anyhow!("failed to read {}: {err}", path.display())),
    }
}

/// Installs the global tracing subscriber. `RUST_LOG` wins when set;
/// otherwise the settings file's logging level applies, defaulting to
/// `info`.
fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let default_level = settings
        .logging
        .level
        .clone()
        .unwrap_or_else(|| "info".to_owned());
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

/// Layers explicit CLI flags over the session built from the settings
/// file. Absent flags leave the file's values in place.
fn apply_cli_overrides(search: &mut SearchSession, cli: &Cli) {
    if cli.min_price.is_some() {
        search.min_price = cli.min_price;
    }
    if cli.max_price.is_some() {
        search.max_price = cli.max_price;
    }
    if let Some(brand) = &cli.brand {
        search.filters.brand = Some(brand.clone());
    }
    if cli.minimum_rating.is_some() {
        search.filters.min_rating = cli.minimum_rating;
    }
    if cli.in_stock_only {
        search.filters.in_stock_only = true;
    }
    if cli.max_pages.is_some() {
        search.filters.max_pages = cli.max_pages;
    }
    if let Some(secs) = cli.delay {
        search.pacing.request_gap = duration_from_secs(secs);
    }
    if let Some(headless) = cli.headless_override() {
        search.headless = headless;
    }
}
