use crate::client::{
    headers_from_pairs, DEFAULT_BACKOFF_STEP, DEFAULT_CACHE_DIR, DEFAULT_RETRIES,
    DEFAULT_USER_AGENT,
};
use crate::cache::DEFAULT_EXPIRE_AFTER;
use crate::ConfigResult;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Main configuration structure for a Mannerly client
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    /// Domain the client is bound to (may be supplied later, e.g. from a URL)
    #[serde(default)]
    pub netloc: Option<String>,

    /// Whether robots.txt is fetched and enforced
    #[serde(default = "default_true")]
    pub respect_robots_txt: bool,

    /// Headers sent with every request; must include User-Agent
    #[serde(default = "default_header_table")]
    pub headers: BTreeMap<String, String>,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Response cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CacheConfig {
    /// Whether responses are cached at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Whether Cache-Control headers may adjust freshness
    #[serde(default = "default_true")]
    pub cache_control: bool,

    /// Lifetime of cached responses in seconds (0 = never expire)
    #[serde(default = "default_expire_after_secs")]
    pub expire_after_secs: u64,

    /// Root directory for cache partitions
    #[serde(default = "default_cache_dir")]
    pub dir: String,
}

/// Retry configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RetryConfig {
    /// Retries after the first attempt on transient failures
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Multiplier applied to the backoff delay after every failure
    #[serde(default = "default_backoff_step")]
    pub backoff_step: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            netloc: None,
            respect_robots_txt: true,
            headers: default_header_table(),
            cache: CacheConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_control: true,
            expire_after_secs: default_expire_after_secs(),
            dir: default_cache_dir(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            backoff_step: default_backoff_step(),
        }
    }
}

impl ClientConfig {
    /// Builds the header map, rejecting invalid names or values
    pub fn header_map(&self) -> ConfigResult<HeaderMap> {
        headers_from_pairs(&self.headers)
    }
}

impl CacheConfig {
    /// Expiration window; `None` when configured as 0
    pub fn expire_after(&self) -> Option<Duration> {
        (self.expire_after_secs > 0).then(|| Duration::from_secs(self.expire_after_secs))
    }
}

fn default_true() -> bool {
    true
}

fn default_header_table() -> BTreeMap<String, String> {
    BTreeMap::from([("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string())])
}

fn default_expire_after_secs() -> u64 {
    DEFAULT_EXPIRE_AFTER.as_secs()
}

fn default_cache_dir() -> String {
    DEFAULT_CACHE_DIR.to_string()
}

fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

fn default_backoff_step() -> u32 {
    DEFAULT_BACKOFF_STEP
}
