//! Page session abstraction.
//!
//! [`PageSession`] abstracts over the engine that fetches and holds a
//! results page. The default [`HttpSession`] works over plain HTTP; a
//! headful browser engine can slot in behind the same trait without
//! touching the scrape loop.

mod http;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScrapeError;

pub use http::HttpSession;

/// Fallback identity pool; a session draws one agent for its lifetime.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
];

/// Draws a random agent from `pool`, or from [`DEFAULT_USER_AGENTS`] when
/// the pool is empty.
#[must_use]
pub fn pick_user_agent(pool: &[String]) -> String {
    if pool.is_empty() {
        DEFAULT_USER_AGENTS[rand::random_range(0..DEFAULT_USER_AGENTS.len())].to_owned()
    } else {
        pool[rand::random_range(0..pool.len())].clone()
    }
}

/// Connection settings for one page session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Timeout for a single navigation.
    pub nav_timeout: Duration,
    pub user_agent: String,
    /// Only meaningful to browser-backed sessions; the HTTP session
    /// ignores it.
    pub headless: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            nav_timeout: Duration::from_secs(30),
            user_agent: pick_user_agent(&[]),
            headless: true,
        }
    }
}

/// A page-holding session: navigate, inspect the captured document,
/// release.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigates to `url` and captures the resulting document.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScrapeError>;

    /// Whether `selector` matches in the captured document within
    /// `timeout`.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> bool;

    /// Title of the captured document, when one is loaded and has a
    /// title.
    async fn page_title(&self) -> Option<String>;

    /// Full HTML of the captured document.
    async fn html(&self) -> Result<String, ScrapeError>;

    /// Releases the session. Further navigation fails with
    /// [`ScrapeError::SessionClosed`].
    async fn close(&self) -> Result<(), ScrapeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pool_draws_from_the_builtin_agents() {
        let agent = pick_user_agent(&[]);
        assert!(DEFAULT_USER_AGENTS.contains(&agent.as_str()));
    }

    #[test]
    fn configured_pool_is_preferred() {
        let pool = vec!["test-agent/1.0".to_owned()];
        assert_eq!(pick_user_agent(&pool), "test-agent/1.0");
    }
}
