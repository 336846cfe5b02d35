//! Bounded retry with exponential backoff
//!
//! Only transient transport failures (connection could not be established,
//! peer dropped the connection) are retried. Everything else, including
//! HTTP error statuses, passes straight through.

use crate::transport::{Request, Response, Transport, TransportError};
use std::time::Duration;

/// Default number of retries after the first attempt
pub const DEFAULT_RETRIES: u32 = 4;

/// Default backoff multiplier
pub const DEFAULT_BACKOFF_STEP: u32 = 2;

/// Sequence of backoff delays: 1s, step s, step² s, ...
#[derive(Debug, Clone)]
pub struct Backoff {
    next_secs: u64,
    step: u64,
}

impl Backoff {
    pub fn new(step: u32) -> Self {
        Self {
            next_secs: 1,
            step: u64::from(step),
        }
    }

    /// Returns the current delay and advances to the next one
    pub fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_secs(self.next_secs);
        self.next_secs = self.next_secs.saturating_mul(self.step);
        delay
    }
}

/// Sends a request, retrying transient failures up to `retries` times
///
/// The transport is called at most `retries + 1` times. Between attempts the
/// task sleeps for the next [`Backoff`] delay. When retries run out the last
/// transport error is returned unchanged.
pub async fn send_with_retry(
    transport: &dyn Transport,
    request: &Request,
    retries: u32,
    backoff_step: u32,
) -> Result<Response, TransportError> {
    let mut backoff = Backoff::new(backoff_step);
    let mut tries = 0;

    loop {
        match transport.send(request).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_transient() && tries < retries => {
                tries += 1;
                let delay = backoff.next_delay();
                tracing::error!(
                    url = %request.url,
                    error = %e,
                    attempt = tries,
                    retries,
                    "Connection error with remote server. Sleeping {} seconds before retrying ...",
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
