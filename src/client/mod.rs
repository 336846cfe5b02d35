//! Polite HTTP client
//!
//! [`Client`] ties everything together for a single netloc:
//! - Validates the netloc and the caller's User-Agent at construction
//! - Loads robots.txt once and refuses disallowed URIs before any I/O
//! - Routes requests through the response cache unless told not to
//! - Retries transient transport failures with exponential backoff
//! - Sleeps for the site's crawl-delay after every uncached response

mod headers;
mod retry;
mod throttle;

pub use headers::{
    default_headers, extract_user_agent, headers_from_pairs, merge_headers, DEFAULT_USER_AGENT,
};
pub use retry::{send_with_retry, Backoff, DEFAULT_BACKOFF_STEP, DEFAULT_RETRIES};
pub use throttle::Throttle;

use crate::cache::{
    partition_path, CachePolicy, CachedTransport, ResponseCache, SqliteCache, DEFAULT_EXPIRE_AFTER,
};
use crate::config::ClientConfig;
use crate::robots::RobotsRules;
use crate::transport::{ReqwestTransport, Request, Response, Transport};
use crate::url::{is_valid_domain, parse_absolute_url};
use crate::{ConfigError, Error, Result};
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Default cache root
pub const DEFAULT_CACHE_DIR: &str = "data/cache/";

/// Per-request knobs
#[derive(Debug, Clone)]
pub struct RequestOptions {
    /// Headers overlaid onto the client's headers for this request only
    pub additional_headers: Option<HeaderMap>,

    /// Skip the cache and go straight to the origin
    pub bypass_cache: bool,

    /// Retries after the first attempt on transient failures
    pub retries: u32,

    /// Backoff multiplier between retries
    pub backoff_step: u32,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            additional_headers: None,
            bypass_cache: false,
            retries: DEFAULT_RETRIES,
            backoff_step: DEFAULT_BACKOFF_STEP,
        }
    }
}

impl RequestOptions {
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.additional_headers = Some(headers);
        self
    }

    pub fn bypass_cache(mut self, bypass: bool) -> Self {
        self.bypass_cache = bypass;
        self
    }

    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    pub fn backoff_step(mut self, step: u32) -> Self {
        self.backoff_step = step;
        self
    }
}

/// Builder for [`Client`]
pub struct ClientBuilder {
    netloc: String,
    headers: HeaderMap,
    respect_robots_txt: bool,
    cache_enabled: bool,
    cache_policy: CachePolicy,
    cache_dir: PathBuf,
    retries: u32,
    backoff_step: u32,
    transport: Option<Arc<dyn Transport>>,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl ClientBuilder {
    /// Starts a builder with the default headers and policies
    pub fn new(netloc: impl Into<String>) -> Self {
        Self {
            netloc: netloc.into(),
            headers: default_headers(),
            respect_robots_txt: true,
            cache_enabled: true,
            cache_policy: CachePolicy::new(Some(DEFAULT_EXPIRE_AFTER), true),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            retries: DEFAULT_RETRIES,
            backoff_step: DEFAULT_BACKOFF_STEP,
            transport: None,
            cache: None,
        }
    }

    /// Starts a builder from a loaded configuration
    pub fn from_config(config: &ClientConfig) -> std::result::Result<Self, ConfigError> {
        let netloc = config
            .netloc
            .clone()
            .ok_or_else(|| ConfigError::Validation("netloc is required".to_string()))?;

        Ok(Self::new(netloc)
            .headers(config.header_map()?)
            .respect_robots_txt(config.respect_robots_txt)
            .cache_enabled(config.cache.enabled)
            .cache_control(config.cache.cache_control)
            .expire_after(config.cache.expire_after())
            .cache_dir(&config.cache.dir)
            .retry(config.retry.retries, config.retry.backoff_step))
    }

    /// Replaces the base headers (copied; must include a User-Agent)
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn respect_robots_txt(mut self, respect: bool) -> Self {
        self.respect_robots_txt = respect;
        self
    }

    /// Turns the response cache on or off entirely
    pub fn cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Whether Cache-Control headers may adjust freshness
    pub fn cache_control(mut self, cache_control: bool) -> Self {
        self.cache_policy.cache_control = cache_control;
        self
    }

    /// Lifetime of cached responses; `None` never expires
    pub fn expire_after(mut self, expire_after: Option<Duration>) -> Self {
        self.cache_policy.expire_after = expire_after;
        self
    }

    /// Root directory under which the netloc's cache partition lives
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    /// Default retry count and backoff step for requests
    pub fn retry(mut self, retries: u32, backoff_step: u32) -> Self {
        self.retries = retries;
        self.backoff_step = backoff_step;
        self
    }

    /// Uses a custom transport instead of reqwest
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Uses a custom cache instead of the SQLite partition
    pub fn cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Validates the configuration, loads robots.txt and opens the cache
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidDomain`] - bad netloc
    /// * [`Error::Config`] - missing, blank or invalid User-Agent
    /// * [`Error::MalformedRobotsTxt`] / [`Error::AmbiguousCrawlDelay`] - unusable robots.txt
    /// * [`Error::Cache`] - the cache partition cannot be opened
    pub async fn build(self) -> Result<Client> {
        if !is_valid_domain(&self.netloc) {
            return Err(Error::InvalidDomain(self.netloc));
        }

        let user_agent = extract_user_agent(&self.headers)?;
        if user_agent == DEFAULT_USER_AGENT {
            tracing::warn!(
                "Using default HTTP Request header for User-Agent = \"{}\". \
                 We strongly prefer you define your own unique user-agent string \
                 and pass it in the headers at initialization.",
                user_agent
            );
        }

        let direct: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::new()?),
        };

        let robots = if self.respect_robots_txt {
            Some(RobotsRules::fetch(&self.netloc, &self.headers, direct.as_ref()).await?)
        } else {
            None
        };

        let mut cache_path = None;
        let cached: Option<Arc<dyn Transport>> = if self.cache_enabled {
            let cache: Arc<dyn ResponseCache> = match self.cache {
                Some(cache) => cache,
                None => {
                    let cache = SqliteCache::open(&self.cache_dir, &self.netloc, self.cache_policy)?;
                    cache_path = Some(partition_path(&self.cache_dir, &self.netloc));
                    Arc::new(cache)
                }
            };
            Some(Arc::new(CachedTransport::new(direct.clone(), cache)))
        } else {
            None
        };

        let crawl_delay = match &robots {
            Some(robots) => robots.crawl_delay(&user_agent)?,
            None => 0,
        };
        let throttle = Throttle::from_crawl_delay(crawl_delay);

        tracing::debug!(
            netloc = %self.netloc,
            user_agent = %user_agent,
            respect_robots_txt = self.respect_robots_txt,
            cache = ?cache_path,
            crawl_delay_ms = crawl_delay,
            "Client ready"
        );

        Ok(Client {
            netloc: self.netloc,
            headers: self.headers,
            user_agent,
            robots,
            crawl_delay,
            throttle,
            direct,
            cached,
            cache_path,
            default_options: RequestOptions {
                additional_headers: None,
                bypass_cache: false,
                retries: self.retries,
                backoff_step: self.backoff_step,
            },
        })
    }
}

/// A well-behaved HTTP client bound to one netloc
pub struct Client {
    netloc: String,
    headers: HeaderMap,
    user_agent: String,
    robots: Option<RobotsRules>,
    crawl_delay: u64,
    throttle: Option<Throttle>,
    direct: Arc<dyn Transport>,
    cached: Option<Arc<dyn Transport>>,
    cache_path: Option<PathBuf>,
    default_options: RequestOptions,
}

impl Client {
    /// Creates a client with default settings
    ///
    /// Robots.txt is respected and responses are cached for 30 days under
    /// `data/cache/`.
    pub async fn new(netloc: &str, headers: HeaderMap) -> Result<Self> {
        ClientBuilder::new(netloc).headers(headers).build().await
    }

    pub fn builder(netloc: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(netloc)
    }

    pub fn netloc(&self) -> &str {
        &self.netloc
    }

    /// Base headers sent with every request
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The User-Agent value, whitespace normalized
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    pub fn respects_robots_txt(&self) -> bool {
        self.robots.is_some()
    }

    pub fn robots_rules(&self) -> Option<&RobotsRules> {
        self.robots.as_ref()
    }

    /// Crawl-delay in milliseconds applied after uncached responses
    pub fn crawl_delay(&self) -> u64 {
        self.crawl_delay
    }

    /// Location of the SQLite cache partition, if the default cache is used
    pub fn cache_path(&self) -> Option<&PathBuf> {
        self.cache_path.as_ref()
    }

    /// The options `get` and `head` use; a starting point for `*_with`
    pub fn request_options(&self) -> RequestOptions {
        self.default_options.clone()
    }

    /// GETs a URI, observing robots.txt rules and preferring the cache
    pub async fn get(&self, uri: &str) -> Result<Response> {
        self.execute(Method::GET, uri, &self.default_options).await
    }

    /// GET with per-request options
    pub async fn get_with(&self, uri: &str, options: &RequestOptions) -> Result<Response> {
        self.execute(Method::GET, uri, options).await
    }

    /// HEADs a URI, observing robots.txt rules and preferring the cache
    pub async fn head(&self, uri: &str) -> Result<Response> {
        self.execute(Method::HEAD, uri, &self.default_options).await
    }

    /// HEAD with per-request options
    pub async fn head_with(&self, uri: &str, options: &RequestOptions) -> Result<Response> {
        self.execute(Method::HEAD, uri, options).await
    }

    async fn execute(&self, method: Method, uri: &str, options: &RequestOptions) -> Result<Response> {
        let url = parse_absolute_url(uri).ok_or_else(|| Error::InvalidUri(uri.to_string()))?;

        if let Some(robots) = &self.robots {
            if !robots.allowed(&self.user_agent, uri) {
                return Err(Error::RobotsDisallowed {
                    user_agent: self.user_agent.clone(),
                    uri: uri.to_string(),
                });
            }
        }

        let headers = match &options.additional_headers {
            Some(extra) if !extra.is_empty() => merge_headers(&self.headers, extra),
            _ => self.headers.clone(),
        };
        let request = Request {
            method,
            url,
            headers,
        };

        let transport = match (&self.cached, options.bypass_cache) {
            (Some(cached), false) => cached,
            _ => &self.direct,
        };

        let response = send_with_retry(
            transport.as_ref(),
            &request,
            options.retries,
            options.backoff_step,
        )
        .await?;

        if let Some(throttle) = &self.throttle {
            throttle.after_response(&response).await;
        }

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            status = %response.status,
            from_cache = response.from_cache,
            headers = ?response.headers,
            "Response received"
        );

        if !response.status.is_success() {
            return Err(Error::HttpStatus {
                status: response.status,
                response: Box::new(response),
            });
        }

        Ok(response)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("netloc", &self.netloc)
            .field("user_agent", &self.user_agent)
            .field("respect_robots_txt", &self.robots.is_some())
            .field("crawl_delay", &self.crawl_delay)
            .field("cache_path", &self.cache_path)
            .finish()
    }
}
