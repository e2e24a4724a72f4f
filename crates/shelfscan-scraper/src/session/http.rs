//! HTTP-backed page session.
//!
//! Fetches each results page as a plain document and answers selector and
//! title queries against the captured snapshot. `wait_for_selector` is
//! therefore an immediate presence check; there is no dynamic content to
//! wait out.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::sync::Mutex;

use crate::error::ScrapeError;
use crate::extract::text::clean_text;
use crate::session::{PageSession, SessionConfig};

#[derive(Debug)]
struct LoadedPage {
    html: String,
    title: Option<String>,
}

#[derive(Debug, Default)]
struct SessionState {
    page: Option<LoadedPage>,
    closed: bool,
}

/// [`PageSession`] over a shared `reqwest` client.
///
/// Navigations serialize on the internal state lock, matching the
/// one-page-at-a-time behavior of a browser tab.
pub struct HttpSession {
    client: Client,
    state: Mutex<SessionState>,
}

impl HttpSession {
    /// Builds a session with the configured timeout and `User-Agent`.
    ///
    /// A `headless: false` config is accepted but has no effect here;
    /// headful rendering needs a browser-backed session.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &SessionConfig) -> Result<Self, ScrapeError> {
        if !config.headless {
            tracing::debug!("headful mode requested; the HTTP session has no window to show");
        }
        let client = Client::builder()
            .timeout(config.nav_timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&config.user_agent)
            .build()?;
        Ok(Self {
            client,
            state: Mutex::new(SessionState::default()),
        })
    }
}

#[async_trait]
impl PageSession for HttpSession {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScrapeError> {
        let mut state = self.state.lock().await;
        if state.closed {
            return Err(ScrapeError::SessionClosed);
        }

        tracing::debug!(url, "navigating");
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(reqwest::header::CACHE_CONTROL, "max-age=0")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let html = response.text().await?;
        let title = document_title(&html);
        state.page = Some(LoadedPage { html, title });
        Ok(())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> bool {
        let state = self.state.lock().await;
        match &state.page {
            Some(page) => selector_matches(&page.html, selector),
            None => false,
        }
    }

    async fn page_title(&self) -> Option<String> {
        self.state.lock().await.page.as_ref()?.title.clone()
    }

    async fn html(&self) -> Result<String, ScrapeError> {
        let state = self.state.lock().await;
        match &state.page {
            Some(page) => Ok(page.html.clone()),
            None => Err(ScrapeError::NoDocument),
        }
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        let mut state = self.state.lock().await;
        state.closed = true;
        state.page = None;
        Ok(())
    }
}

fn document_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("title").ok()?;
    let element = document.select(&selector).next()?;
    let title = clean_text(&element.text().collect::<String>());
    (!title.is_empty()).then_some(title)
}

fn selector_matches(html: &str, selector: &str) -> bool {
    let Ok(parsed) = Selector::parse(selector) else {
        tracing::debug!(selector, "skipping unparseable selector");
        return false;
    };
    Html::parse_document(html).select(&parsed).next().is_some()
}
