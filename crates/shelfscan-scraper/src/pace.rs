//! Request pacing.

use tokio::sync::Mutex;
use tokio::time::{sleep, Duration, Instant};

use shelfscan_core::PacingConfig;

/// Session-scoped pacer enforcing a minimum gap between requests.
///
/// The last-request instant sits behind an async mutex that is held across
/// the sleep, so concurrent callers line up instead of racing for the same
/// slot.
#[derive(Debug)]
pub struct Pacer {
    config: PacingConfig,
    last_request: Mutex<Option<Instant>>,
}

impl Pacer {
    #[must_use]
    pub fn new(config: PacingConfig) -> Self {
        Self {
            config,
            last_request: Mutex::new(None),
        }
    }

    /// Waits out the remainder of the configured request gap, plus up to
    /// half a second of jitter. The first request of a session never
    /// waits.
    pub async fn wait_before_request(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.request_gap {
                let wait = self
                    .config
                    .request_gap
                    .saturating_sub(elapsed)
                    .saturating_add(jitter(Duration::from_millis(500)));
                sleep(wait).await;
            }
        }
        *last = Some(Instant::now());
    }

    /// Waits the between-pages delay plus up to a second of jitter before
    /// a pagination navigation. A zero delay disables the wait entirely.
    pub async fn wait_before_navigation(&self) {
        if self.config.page_delay.is_zero() {
            return;
        }
        sleep(self.config.page_delay.saturating_add(jitter(Duration::from_secs(1)))).await;
    }
}

fn jitter(max: Duration) -> Duration {
    max.mul_f64(rand::random::<f64>())
}
