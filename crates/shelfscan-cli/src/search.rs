//! Search command handler.
//!
//! Called from `main` once the settings file and CLI flags have been
//! merged into a session. A ctrl-c during the run raises the stop flag
//! instead of aborting, so pages already captured still reach disk.

use shelfscan_core::SearchSession;
use shelfscan_scraper::{
    normalize, HttpSession, SearchScraper, SessionConfig, StopFlag, StopReason,
};

use crate::output::{self, OutputPlan};

/// Runs one search end to end: scrape, process, export.
///
/// # Errors
///
/// Returns an error if the page session cannot be built, a page's retry
/// budget is exhausted, or an export file cannot be written.
pub(crate) async fn run_search(
    search: SearchSession,
    session: SessionConfig,
    deduplicate: bool,
    plan: OutputPlan,
) -> anyhow::Result<()> {
    let stop = StopFlag::new();
    spawn_interrupt_handler(stop.clone());

    let page = HttpSession::new(&session)
        .map_err(|e| anyhow::anyhow!("failed to build page session: {e}"))?;
    let outcome = SearchScraper::with_stop(page, search, stop).run().await?;

    tracing::info!(
        pages = outcome.pages_fetched,
        captures = outcome.captures.len(),
        stop = ?outcome.stop,
        "scrape finished"
    );
    if outcome.stop == StopReason::Stopped {
        println!(
            "run interrupted after {} pages, keeping what was captured",
            outcome.pages_fetched
        );
    }

    if outcome.captures.is_empty() {
        println!("no products found for \"{}\"", plan.keyword);
        return Ok(());
    }

    let captured = outcome.captures.len();
    let report = normalize::process(outcome.captures, deduplicate);
    if report.records.is_empty() {
        println!("all {captured} captures were dropped during processing, nothing to write");
        return Ok(());
    }

    let paths = output::write_records(&report.records, &plan)?;

    println!(
        "kept {} of {captured} products across {} pages",
        report.records.len(),
        outcome.pages_fetched
    );
    for path in paths {
        println!("wrote {}", path.display());
    }

    Ok(())
}

/// First ctrl-c ends the run between pages instead of killing the
/// process.
fn spawn_interrupt_handler(stop: StopFlag) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::warn!("interrupt received, finishing the current page before stopping");
                stop.trigger();
            }
            Err(err) => tracing::warn!(error = %err, "failed to listen for ctrl-c"),
        }
    });
}
