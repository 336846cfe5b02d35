//! Crawl-delay throttle applied after responses that reached the origin

use crate::transport::Response;
use std::time::Duration;

/// Post-response hook enforcing a site's crawl-delay
///
/// Responses served from cache never touched the origin and are not delayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Throttle {
    delay: Duration,
}

impl Throttle {
    /// Builds a throttle from a crawl-delay in milliseconds; `None` for zero
    pub fn from_crawl_delay(millis: u64) -> Option<Self> {
        (millis > 0).then(|| Self {
            delay: Duration::from_millis(millis),
        })
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Sleeps for the crawl-delay unless the response came from cache
    ///
    /// Returns true if it slept.
    pub async fn after_response(&self, response: &Response) -> bool {
        if response.from_cache {
            return false;
        }
        tracing::debug!(url = %response.url, delay_ms = self.delay.as_millis() as u64, "Honouring crawl-delay");
        tokio::time::sleep(self.delay).await;
        true
    }
}
