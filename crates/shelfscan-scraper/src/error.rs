use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("no document loaded in session")]
    NoDocument,

    #[error("scrape cancelled by stop signal")]
    Cancelled,

    #[error("session already closed")]
    SessionClosed,
}

impl ScrapeError {
    /// Errors worth another attempt. Cancellation is deliberate and a
    /// closed session cannot recover, so neither is retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ScrapeError::Cancelled | ScrapeError::SessionClosed)
    }
}
