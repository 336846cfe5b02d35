//! Freshness rules for cached responses

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, CACHE_CONTROL};
use std::time::Duration;

/// Default lifetime of a cached response (30 days)
pub const DEFAULT_EXPIRE_AFTER: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Expiration settings for a cache partition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// Entries older than this are treated as a miss; `None` never expires
    pub expire_after: Option<Duration>,

    /// Whether Cache-Control headers may override `expire_after`
    pub cache_control: bool,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            expire_after: Some(DEFAULT_EXPIRE_AFTER),
            cache_control: true,
        }
    }
}

impl CachePolicy {
    pub fn new(expire_after: Option<Duration>, cache_control: bool) -> Self {
        Self {
            expire_after,
            cache_control,
        }
    }

    /// Lifetime of a response with the given headers; `None` means forever
    ///
    /// With Cache-Control honoured, `no-cache` gives a zero lifetime and
    /// `max-age` replaces `expire_after`.
    pub fn lifetime(&self, response_headers: &HeaderMap) -> Option<Duration> {
        if self.cache_control {
            let directives = cache_directives(response_headers);
            if has_directive(&directives, "no-cache") {
                return Some(Duration::ZERO);
            }
            if let Some(max_age) = directive_value(&directives, "max-age")
                .and_then(|value| value.parse::<u64>().ok())
            {
                return Some(Duration::from_secs(max_age));
            }
        }
        self.expire_after
    }

    /// Whether an entry stored at `stored_at` is still fresh at `now`
    pub fn is_fresh(
        &self,
        stored_at: DateTime<Utc>,
        response_headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(lifetime) = self.lifetime(response_headers) else {
            return true;
        };

        let age = (now - stored_at).to_std().unwrap_or(Duration::ZERO);
        age < lifetime
    }

    /// Whether a response may be written to the cache
    pub fn is_storable(&self, request_headers: &HeaderMap, response_headers: &HeaderMap) -> bool {
        if !self.cache_control {
            return true;
        }
        !has_directive(&cache_directives(request_headers), "no-store")
            && !has_directive(&cache_directives(response_headers), "no-store")
    }

    /// Whether a request asks to skip the cached copy
    pub fn skips_lookup(&self, request_headers: &HeaderMap) -> bool {
        if !self.cache_control {
            return false;
        }
        let directives = cache_directives(request_headers);
        has_directive(&directives, "no-cache") || has_directive(&directives, "no-store")
    }
}

/// Lowercased Cache-Control directives with their optional values
fn cache_directives(headers: &HeaderMap) -> Vec<(String, Option<String>)> {
    headers
        .get_all(CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|directive| {
            let directive = directive.trim();
            if directive.is_empty() {
                return None;
            }
            Some(match directive.split_once('=') {
                Some((name, value)) => (
                    name.trim().to_lowercase(),
                    Some(value.trim().trim_matches('"').to_string()),
                ),
                None => (directive.to_lowercase(), None),
            })
        })
        .collect()
}

fn has_directive(directives: &[(String, Option<String>)], name: &str) -> bool {
    directives.iter().any(|(n, _)| n == name)
}

fn directive_value<'a>(directives: &'a [(String, Option<String>)], name: &str) -> Option<&'a str> {
    directives
        .iter()
        .find(|(n, _)| n == name)
        .and_then(|(_, value)| value.as_deref())
}
