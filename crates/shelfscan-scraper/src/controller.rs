//! Pagination controller.
//!
//! [`SearchScraper`] drives one search session across result pages:
//! build the page URL, fetch and extract under retry, filter, accumulate,
//! then decide whether to continue. Pages are strictly sequential; the
//! next-page decision depends on the page just rendered.

use std::time::Duration;

use shelfscan_core::{RawCapture, SearchSession};

use crate::error::ScrapeError;
use crate::extract::Extractor;
use crate::pace::Pacer;
use crate::query::build_search_url;
use crate::retry::retry_with_backoff;
use crate::selectors::{BLOCK_PAGE_TITLE_MARKERS, CONTENT_READY_SELECTORS};
use crate::session::PageSession;
use crate::stop::StopFlag;

/// Per-selector wait when probing for the results pane.
const CONTENT_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Why a run stopped paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page yielded zero product cards.
    EmptyPage,
    /// The configured page ceiling was reached.
    MaxPages,
    /// No enabled next-page control was found.
    NoNextPage,
    /// The external stop signal was raised.
    Stopped,
}

/// Result of a completed (or cleanly stopped) run.
#[derive(Debug)]
pub struct SearchOutcome {
    /// Filtered captures in discovery order, across all fetched pages.
    pub captures: Vec<RawCapture>,
    pub pages_fetched: u32,
    pub stop: StopReason,
}

struct FetchedPage {
    captures: Vec<RawCapture>,
    html: String,
}

/// Scrape controller for one search session.
///
/// Owns the page session for the duration of the run and closes it on
/// every exit path, including fetch errors.
pub struct SearchScraper<P: PageSession> {
    page: P,
    search: SearchSession,
    pacer: Pacer,
    extractor: Extractor,
    stop: StopFlag,
}

impl<P: PageSession> SearchScraper<P> {
    pub fn new(page: P, search: SearchSession) -> Self {
        Self::with_stop(page, search, StopFlag::new())
    }

    /// Like [`SearchScraper::new`] with an externally owned stop signal,
    /// so a signal handler can end the run between pages.
    pub fn with_stop(page: P, search: SearchSession, stop: StopFlag) -> Self {
        let pacer = Pacer::new(search.pacing);
        let extractor = Extractor::for_search(&search);
        Self {
            page,
            search,
            pacer,
            extractor,
            stop,
        }
    }

    /// Handle for triggering a stop from another task.
    #[must_use]
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Runs the pagination loop to completion.
    ///
    /// A raised stop signal ends the run cleanly with the captures
    /// collected so far; only exhausted retries surface as an error.
    ///
    /// # Errors
    ///
    /// Returns the last fetch error once the retry budget for a page is
    /// spent. The page session is closed before returning.
    pub async fn run(self) -> Result<SearchOutcome, ScrapeError> {
        let outcome = self.run_inner().await;
        if let Err(err) = self.page.close().await {
            tracing::warn!(error = %err, "failed to close page session");
        }
        outcome
    }

    async fn run_inner(&self) -> Result<SearchOutcome, ScrapeError> {
        let mut captures: Vec<RawCapture> = Vec::new();
        let mut pages_fetched = 0u32;
        let mut page_number = 1u32;
        let max_pages = self.search.filters.max_pages.filter(|limit| *limit > 0);

        tracing::info!(
            keyword = %self.search.keyword,
            region = %self.search.region,
            "starting search scrape"
        );

        let stop = loop {
            if self.stop.is_triggered() {
                tracing::info!(page_number, "stop requested, ending scrape early");
                break StopReason::Stopped;
            }

            let url = build_search_url(&self.search, page_number);
            tracing::info!(page_number, url = %url, "fetching results page");

            let page = &self.page;
            let pacer = &self.pacer;
            let extractor = &self.extractor;
            let target = url.as_str();
            let nav_timeout = self.search.pacing.nav_timeout;
            let fetched = match retry_with_backoff(
                self.search.retry,
                &self.stop,
                "results page fetch",
                move || fetch_page(page, pacer, extractor, target, nav_timeout),
            )
            .await
            {
                Ok(fetched) => fetched,
                Err(ScrapeError::Cancelled) => {
                    tracing::info!(page_number, "stop requested mid-fetch, ending scrape early");
                    break StopReason::Stopped;
                }
                Err(err) => return Err(err),
            };
            pages_fetched += 1;

            if fetched.captures.is_empty() {
                tracing::warn!(page_number, "no products found, stopping");
                break StopReason::EmptyPage;
            }

            let kept = apply_filters(&self.search, fetched.captures);
            tracing::info!(
                page_number,
                kept = kept.len(),
                total = captures.len() + kept.len(),
                "page processed"
            );
            captures.extend(kept);

            if max_pages.is_some_and(|limit| page_number >= limit) {
                tracing::info!(max_pages = max_pages.unwrap_or_default(), "reached page limit");
                break StopReason::MaxPages;
            }

            if !self.extractor.has_next_page(&fetched.html) {
                tracing::info!(page_number, "no next page control found");
                break StopReason::NoNextPage;
            }

            page_number += 1;
            self.pacer.wait_before_navigation().await;
        };

        tracing::info!(
            pages_fetched,
            captures = captures.len(),
            stop = ?stop,
            "scrape finished"
        );
        Ok(SearchOutcome {
            captures,
            pages_fetched,
            stop,
        })
    }
}

/// Fetches and extracts one results page. Pure read, safe to retry.
async fn fetch_page<P: PageSession>(
    page: &P,
    pacer: &Pacer,
    extractor: &Extractor,
    url: &str,
    nav_timeout: Duration,
) -> Result<FetchedPage, ScrapeError> {
    pacer.wait_before_request().await;

    tracing::debug!(url, "navigating to results page");
    page.navigate(url, nav_timeout).await?;

    let mut content_ready = false;
    for selector in CONTENT_READY_SELECTORS {
        if page.wait_for_selector(selector, CONTENT_READY_TIMEOUT).await {
            content_ready = true;
            break;
        }
    }
    if !content_ready {
        tracing::warn!(url, "results pane did not announce itself, parsing anyway");
    }

    if let Some(title) = page.page_title().await {
        let lower = title.to_lowercase();
        if BLOCK_PAGE_TITLE_MARKERS
            .iter()
            .any(|marker| lower.contains(marker))
        {
            tracing::warn!(title = %title, "page title suggests a block interstitial");
        }
    }

    let html = page.html().await?;
    Ok(FetchedPage {
        captures: extractor.extract_listing(&html),
        html,
    })
}

/// Result-level filters: price bounds (zero or absent means unbounded,
/// unpriced records pass), minimum rating (unrated records are dropped),
/// and the in-stock gate.
fn apply_filters(search: &SearchSession, captures: Vec<RawCapture>) -> Vec<RawCapture> {
    let min_price = price_bound(search.min_price);
    let max_price = price_bound(search.max_price);
    let min_rating = search.filters.min_rating.filter(|threshold| *threshold > 0.0);

    captures
        .into_iter()
        .filter(|capture| {
            if let Some(price) = capture.current_price {
                if min_price.is_some_and(|min| price < min) {
                    return false;
                }
                if max_price.is_some_and(|max| price > max) {
                    return false;
                }
            }
            if let Some(threshold) = min_rating {
                match capture.rating {
                    Some(rating) if rating >= threshold => {}
                    _ => return false,
                }
            }
            if search.filters.in_stock_only && capture.is_marked_unavailable() {
                return false;
            }
            true
        })
        .collect()
}

fn price_bound(bound: Option<f64>) -> Option<f64> {
    bound.filter(|value| *value > 0.0)
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Utc;

    use shelfscan_core::{PacingConfig, Region, RetryPolicy};

    use super::*;

    struct StubSession {
        pages: Mutex<VecDeque<String>>,
        current: Mutex<Option<String>>,
        navigations: Mutex<Vec<String>>,
        failures_remaining: AtomicU32,
        closed: AtomicBool,
    }

    impl StubSession {
        fn serving(pages: Vec<String>) -> Arc<Self> {
            Arc::new(Self {
                pages: Mutex::new(pages.into()),
                current: Mutex::new(None),
                navigations: Mutex::new(Vec::new()),
                failures_remaining: AtomicU32::new(0),
                closed: AtomicBool::new(false),
            })
        }

        fn failing_first(failures: u32, pages: Vec<String>) -> Arc<Self> {
            let stub = Self::serving(pages);
            stub.failures_remaining.store(failures, Ordering::SeqCst);
            stub
        }
    }

    #[async_trait]
    impl PageSession for Arc<StubSession> {
        async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), ScrapeError> {
            self.navigations.lock().unwrap().push(url.to_owned());
            if self.failures_remaining.load(Ordering::SeqCst) > 0 {
                self.failures_remaining.fetch_sub(1, Ordering::SeqCst);
                return Err(ScrapeError::UnexpectedStatus {
                    status: 503,
                    url: url.to_owned(),
                });
            }
            let html = self
                .pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "<html><body></body></html>".to_owned());
            *self.current.lock().unwrap() = Some(html);
            Ok(())
        }

        async fn wait_for_selector(&self, _selector: &str, _timeout: Duration) -> bool {
            self.current.lock().unwrap().is_some()
        }

        async fn page_title(&self) -> Option<String> {
            Some("search results".to_owned())
        }

        async fn html(&self) -> Result<String, ScrapeError> {
            self.current
                .lock()
                .unwrap()
                .clone()
                .ok_or(ScrapeError::NoDocument)
        }

        async fn close(&self) -> Result<(), ScrapeError> {
            self.closed.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn quick_search() -> SearchSession {
        let mut search = SearchSession::new("laptop", Region::India);
        search.pacing = PacingConfig {
            request_gap: Duration::ZERO,
            page_delay: Duration::ZERO,
            nav_timeout: Duration::from_secs(5),
        };
        search.retry = RetryPolicy {
            max_attempts: 2,
            backoff_factor: 2.0,
        };
        search
    }

    fn card(id: &str, title: &str, price: &str) -> String {
        format!(
            r#"<div data-component-type="s-search-result" data-asin="{id}">
                 <h2><a href="/dp/{id}"><span>{title}</span></a></h2>
                 <span class="a-price-whole">{price}</span>
               </div>"#
        )
    }

    /// Pane snapshot served by the stub session: the cards plus an
    /// optional next control.
    fn results_page(cards: &[String], has_next: bool) -> String {
        let mut body = cards.concat();
        if has_next {
            body.push_str(r#"<a class="s-pagination-next">Next</a>"#);
        }
        format!("<div class=\"s-main-slot\">{body}</div>")
    }

    #[tokio::test]
    async fn single_page_run_collects_and_closes() {
        let page = results_page(
            &[
                card("B0AAAAAAA1", "First laptop", "45,999"),
                card("B0AAAAAAA2", "Second laptop", "52,999"),
            ],
            false,
        );
        let stub = StubSession::serving(vec![page]);
        let outcome = SearchScraper::new(Arc::clone(&stub), quick_search()).run().await.unwrap();

        assert_eq!(outcome.captures.len(), 2);
        assert_eq!(outcome.pages_fetched, 1);
        assert_eq!(outcome.stop, StopReason::NoNextPage);
        assert!(stub.closed.load(Ordering::SeqCst));

        let navigations = stub.navigations.lock().unwrap();
        assert_eq!(navigations.as_slice(), ["https://www.amazon.in/s?k=laptop"]);
    }

    #[tokio::test]
    async fn pagination_follows_the_next_control() {
        let first = results_page(&[card("B0AAAAAAA1", "Page one laptop", "30,000")], true);
        let second = results_page(&[card("B0AAAAAAA2", "Page two laptop", "31,000")], false);
        let stub = StubSession::serving(vec![first, second]);
        let outcome = SearchScraper::new(Arc::clone(&stub), quick_search()).run().await.unwrap();

        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.captures.len(), 2);
        assert_eq!(outcome.stop, StopReason::NoNextPage);

        let navigations = stub.navigations.lock().unwrap();
        assert_eq!(
            navigations.as_slice(),
            [
                "https://www.amazon.in/s?k=laptop",
                "https://www.amazon.in/s?k=laptop&page=2",
            ]
        );
    }

    #[tokio::test]
    async fn empty_page_stops_before_the_pagination_probe() {
        // The page advertises a next control, but zero products wins.
        let empty_with_next = results_page(&[], true);
        let stub = StubSession::serving(vec![empty_with_next]);
        let outcome = SearchScraper::new(Arc::clone(&stub), quick_search()).run().await.unwrap();

        assert_eq!(outcome.stop, StopReason::EmptyPage);
        assert!(outcome.captures.is_empty());
        assert_eq!(outcome.pages_fetched, 1);
    }

    #[tokio::test]
    async fn max_pages_caps_the_run() {
        let pages = vec![
            results_page(&[card("B0AAAAAAA1", "One", "10,000")], true),
            results_page(&[card("B0AAAAAAA2", "Two", "11,000")], true),
            results_page(&[card("B0AAAAAAA3", "Three", "12,000")], true),
        ];
        let stub = StubSession::serving(pages);
        let mut search = quick_search();
        search.filters.max_pages = Some(2);
        let outcome = SearchScraper::new(Arc::clone(&stub), search).run().await.unwrap();

        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.stop, StopReason::MaxPages);
        assert_eq!(outcome.captures.len(), 2);
    }

    #[tokio::test]
    async fn max_pages_of_zero_means_unlimited() {
        let pages = vec![
            results_page(&[card("B0AAAAAAA1", "One", "10,000")], true),
            results_page(&[card("B0AAAAAAA2", "Two", "11,000")], false),
        ];
        let stub = StubSession::serving(pages);
        let mut search = quick_search();
        search.filters.max_pages = Some(0);
        let outcome = SearchScraper::new(Arc::clone(&stub), search).run().await.unwrap();

        assert_eq!(outcome.pages_fetched, 2);
        assert_eq!(outcome.stop, StopReason::NoNextPage);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_navigations_are_retried() {
        let page = results_page(&[card("B0AAAAAAA1", "Recovered", "20,000")], false);
        let stub = StubSession::failing_first(1, vec![page]);
        let outcome = SearchScraper::new(Arc::clone(&stub), quick_search()).run().await.unwrap();

        assert_eq!(outcome.captures.len(), 1);
        assert_eq!(stub.navigations.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn retry_exhaustion_surfaces_the_error_and_closes() {
        let stub = StubSession::failing_first(5, Vec::new());
        let err = SearchScraper::new(Arc::clone(&stub), quick_search())
            .run()
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ScrapeError::UnexpectedStatus { status: 503, .. }
        ));
        assert!(stub.closed.load(Ordering::SeqCst));
        assert_eq!(stub.navigations.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn pre_triggered_stop_returns_an_empty_outcome() {
        let stub = StubSession::serving(vec![results_page(
            &[card("B0AAAAAAA1", "Never fetched", "10,000")],
            false,
        )]);
        let stop = StopFlag::new();
        stop.trigger();
        let outcome = SearchScraper::with_stop(Arc::clone(&stub), quick_search(), stop)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome.stop, StopReason::Stopped);
        assert!(outcome.captures.is_empty());
        assert_eq!(outcome.pages_fetched, 0);
        assert!(stub.navigations.lock().unwrap().is_empty());
        assert!(stub.closed.load(Ordering::SeqCst));
    }

    // ---- apply_filters ----

    fn capture(price: Option<f64>, rating: Option<f64>, stock: Option<&str>) -> RawCapture {
        let mut capture = RawCapture::at(Utc::now());
        capture.title = Some("Filtered".to_owned());
        capture.current_price = price;
        capture.rating = rating;
        capture.stock_status = stock.map(str::to_owned);
        capture
    }

    #[test]
    fn price_bounds_drop_outliers_but_pass_unpriced_records() {
        let mut search = quick_search();
        search.min_price = Some(100.0);
        search.max_price = Some(500.0);

        let kept = apply_filters(
            &search,
            vec![
                capture(Some(50.0), None, None),
                capture(Some(300.0), None, None),
                capture(Some(900.0), None, None),
                capture(None, None, None),
            ],
        );
        let prices: Vec<_> = kept.iter().map(|c| c.current_price).collect();
        assert_eq!(prices, [Some(300.0), None]);
    }

    #[test]
    fn zero_price_bounds_are_ignored() {
        let mut search = quick_search();
        search.min_price = Some(0.0);
        search.max_price = Some(0.0);

        let kept = apply_filters(&search, vec![capture(Some(900.0), None, None)]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn minimum_rating_drops_unrated_records() {
        let mut search = quick_search();
        search.filters.min_rating = Some(4.0);

        let kept = apply_filters(
            &search,
            vec![
                capture(Some(10.0), Some(4.5), None),
                capture(Some(10.0), Some(3.9), None),
                capture(Some(10.0), None, None),
            ],
        );
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].rating, Some(4.5));
    }

    #[test]
    fn in_stock_only_drops_marked_unavailable_text() {
        let mut search = quick_search();
        search.filters.in_stock_only = true;

        let kept = apply_filters(
            &search,
            vec![
                capture(Some(10.0), None, Some("In stock")),
                capture(Some(10.0), None, Some("Currently UNAVAILABLE")),
                capture(Some(10.0), None, Some("Out of Stock soon")),
                capture(Some(10.0), None, None),
            ],
        );
        let stock: Vec<_> = kept.iter().map(|c| c.stock_status.as_deref()).collect();
        assert_eq!(stock, [Some("In stock"), None]);
    }
}
