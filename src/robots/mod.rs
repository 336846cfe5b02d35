//! Robots.txt handling module
//!
//! This module fetches a site's robots.txt once, parses it into a
//! [`RuleSet`] and answers allow/disallow and crawl-delay questions for a
//! given user agent.

mod parser;
mod rules;

pub use parser::{normalize_space, parse, parse_line, split_lines, ParseError};
pub use rules::{normalize_user_agent, Directives, RuleSet, WILDCARD_AGENT};

use crate::transport::{Request, Transport};
use crate::url::{is_valid_domain, request_path};
use crate::Error;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use url::Url;

/// Schemes tried, in order, when fetching robots.txt
const ROBOTS_SCHEMES: [&str; 2] = ["https", "http"];

/// Robots.txt rules for a single netloc
///
/// Constructed once and immutable afterwards.
#[derive(Debug, Clone)]
pub struct RobotsRules {
    netloc: String,
    rules: RuleSet,
}

impl RobotsRules {
    /// Fetches and parses robots.txt for a netloc
    ///
    /// `https://{netloc}/robots.txt` is tried first, then the `http` variant.
    /// Only an HTTP 200 counts as found. Anything else, including transport
    /// failures on both schemes, is logged and treated as an empty file, so
    /// every path is allowed.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidDomain`] - `netloc` is not a bare domain name
    /// * [`Error::MalformedRobotsTxt`] - the file was found but cannot be parsed
    pub async fn fetch(
        netloc: &str,
        headers: &HeaderMap,
        transport: &dyn Transport,
    ) -> Result<Self, Error> {
        if !is_valid_domain(netloc) {
            return Err(Error::InvalidDomain(netloc.to_string()));
        }

        match fetch_robots_txt(netloc, headers, transport).await {
            Some(body) => Self::from_text(netloc, &body),
            None => {
                tracing::warn!(netloc = %netloc, "No robots.txt found; all paths allowed");
                Ok(Self::allow_all(netloc))
            }
        }
    }

    /// Builds rules from robots.txt content that is already in hand
    pub fn from_text(netloc: &str, body: &str) -> Result<Self, Error> {
        let rules = parse(body).map_err(|source| Error::MalformedRobotsTxt {
            netloc: netloc.to_string(),
            source,
        })?;

        if rules.is_empty() {
            tracing::warn!(netloc = %netloc, "Empty robots.txt found; all paths allowed");
        } else {
            tracing::info!(
                netloc = %netloc,
                agents = rules.agents().count(),
                "Loaded robots.txt"
            );
        }

        Ok(Self {
            netloc: netloc.to_string(),
            rules,
        })
    }

    /// Creates permissive rules for a netloc without robots.txt
    pub fn allow_all(netloc: &str) -> Self {
        Self {
            netloc: netloc.to_string(),
            rules: RuleSet::new(),
        }
    }

    /// The netloc these rules belong to
    pub fn netloc(&self) -> &str {
        &self.netloc
    }

    /// The parsed rule table
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Is `uri` allowed for this user agent by robots.txt?
    ///
    /// `uri` may be an absolute URL or a bare path.
    pub fn allowed(&self, user_agent: &str, uri: &str) -> bool {
        let path = request_path(uri);
        let allowed = self.rules.is_allowed(user_agent, &path);
        if !allowed {
            tracing::debug!(netloc = %self.netloc, path = %path, user_agent = %user_agent, "robots.txt disallows path");
        }
        allowed
    }

    /// Crawl-delay in milliseconds for this user agent (0 if none)
    pub fn crawl_delay(&self, user_agent: &str) -> Result<u64, Error> {
        let delay = self.rules.crawl_delay(user_agent)?;
        tracing::debug!(netloc = %self.netloc, user_agent = %user_agent, delay_ms = delay, "Resolved crawl-delay");
        Ok(delay)
    }
}

/// Returns the robots.txt body, or None if neither scheme produced a 200
async fn fetch_robots_txt(
    netloc: &str,
    headers: &HeaderMap,
    transport: &dyn Transport,
) -> Option<String> {
    for scheme in ROBOTS_SCHEMES {
        let Ok(url) = Url::parse(&format!("{}://{}/robots.txt", scheme, netloc)) else {
            continue;
        };

        let request = Request::get(url, headers.clone());
        match transport.send(&request).await {
            Ok(response) if response.status == StatusCode::OK => return Some(response.text()),
            Ok(response) => {
                tracing::debug!(url = %request.url, status = %response.status, "robots.txt not available");
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "Failed to fetch robots.txt");
            }
        }
    }
    None
}
