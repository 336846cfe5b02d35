//! Mannerly: a well-mannered HTTP client for bots and scrapers
//!
//! This crate wraps outbound GET and HEAD requests with the things a polite
//! robot is expected to do: honour robots.txt, keep a local response cache,
//! respect crawl-delay, and back off when the remote end drops connections.

pub mod cache;
pub mod client;
pub mod config;
pub mod robots;
pub mod transport;
pub mod url;

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for Mannerly operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid domain/netloc: '{0}'")]
    InvalidDomain(String),

    #[error("Invalid URI: '{0}'")]
    InvalidUri(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Malformed robots.txt for {netloc}: {source}")]
    MalformedRobotsTxt {
        netloc: String,
        source: robots::ParseError,
    },

    #[error("Unsupported crawl-delay multi-value list for user-agent {user_agent}: {values:?}")]
    AmbiguousCrawlDelay {
        user_agent: String,
        values: Vec<String>,
    },

    #[error("Access to {uri} disallowed for user-agent:{user_agent} by robots.txt")]
    RobotsDisallowed { user_agent: String, uri: String },

    #[error("HTTP status {status} for {}", response.url)]
    HttpStatus {
        status: StatusCode,
        response: Box<transport::Response>,
    },

    #[error("Transport error: {0}")]
    Transport(#[from] transport::TransportError),

    #[error("Cache error: {0}")]
    Cache(#[from] cache::CacheError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Headers did not include User-Agent")]
    MissingUserAgent,

    #[error("Headers contained blank/whitespace-only user-agent string")]
    BlankUserAgent,

    #[error("Invalid header: {0}")]
    InvalidHeader(String),
}

/// Result type alias for Mannerly operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use client::{Client, ClientBuilder, RequestOptions};
pub use config::ClientConfig;
pub use robots::{normalize_user_agent, RobotsRules, RuleSet};
pub use transport::{Request, Response, Transport, TransportError, TransportErrorKind};
