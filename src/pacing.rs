use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::trace;

use crate::config::EngineConfig;
use crate::model::PaginationCursor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointClass {
    Geocode,
    TextSearch,
    Details,
}

impl EndpointClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::Geocode => "geocode",
            EndpointClass::TextSearch => "text_search",
            EndpointClass::Details => "details",
        }
    }
}

/// Minimum spacing between consecutive calls sharing one limiter.
pub struct RateLimiter {
    min_interval: Duration,
    last_tick: AsyncMutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_tick: AsyncMutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut guard = self.last_tick.lock().await;
        if let Some(prev) = *guard {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *guard = Some(Instant::now());
    }
}

/// Local pacing policy shared by every cell of one run.
///
/// Holding the lock across the sleep keeps spacing global even when several
/// cells are scanned concurrently.
pub struct Pacer {
    geocode: RateLimiter,
    text_search: RateLimiter,
    details: RateLimiter,
    cursor_activation: Duration,
}

impl Pacer {
    pub fn new(
        search_interval: Duration,
        details_interval: Duration,
        cursor_activation: Duration,
    ) -> Self {
        Self {
            geocode: RateLimiter::new(Duration::ZERO),
            text_search: RateLimiter::new(search_interval),
            details: RateLimiter::new(details_interval),
            cursor_activation,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            config.search_interval(),
            config.details_interval(),
            config.cursor_activation_delay(),
        )
    }

    pub async fn throttle(&self, class: EndpointClass) {
        let limiter = match class {
            EndpointClass::Geocode => &self.geocode,
            EndpointClass::TextSearch => &self.text_search,
            EndpointClass::Details => &self.details,
        };
        trace!(class = class.as_str(), "throttle");
        limiter.wait().await;
    }

    /// Blocks until `cursor` has been out for the provider's activation delay.
    pub async fn activate(&self, cursor: &PaginationCursor) {
        let ready_at = cursor.issued_at + self.cursor_activation;
        if ready_at > Instant::now() {
            trace!(delay = ?self.cursor_activation, "waiting for page token activation");
            sleep_until(ready_at).await;
        }
    }
}
