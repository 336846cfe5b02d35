//! Response cache
//!
//! This module decides whether a request can be answered locally and keeps
//! successful responses for later:
//! - Freshness rules driven by an expiration window and Cache-Control
//! - A SQLite partition per netloc under a configurable cache root
//! - A cache-aware [`Transport`] wrapper that marks cache hits

mod policy;
mod schema;
mod sqlite;

pub use policy::{CachePolicy, DEFAULT_EXPIRE_AFTER};
pub use sqlite::{partition_path, SqliteCache};

use crate::transport::{Request, Response, Transport, TransportError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),

    #[error("Cache connection lock poisoned")]
    Poisoned,
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Keyed store of responses with an expiration policy
///
/// Implementations apply their own freshness rules: `lookup` only returns
/// responses that may be served, and `store` may decline to keep one.
pub trait ResponseCache: Send + Sync {
    /// Returns a fresh cached response for the request, if any
    fn lookup(&self, request: &Request) -> CacheResult<Option<Response>>;

    /// Stores a response obtained from the origin
    fn store(&self, request: &Request, response: &Response) -> CacheResult<()>;
}

/// Transport that consults a [`ResponseCache`] before going to the network
///
/// Cache failures are logged and never fail the request; the origin is
/// asked instead.
pub struct CachedTransport {
    inner: Arc<dyn Transport>,
    cache: Arc<dyn ResponseCache>,
}

impl CachedTransport {
    pub fn new(inner: Arc<dyn Transport>, cache: Arc<dyn ResponseCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl Transport for CachedTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        match self.cache.lookup(request) {
            Ok(Some(mut hit)) => {
                tracing::debug!(method = %request.method, url = %request.url, "Cache hit");
                hit.from_cache = true;
                return Ok(hit);
            }
            Ok(None) => {
                tracing::debug!(method = %request.method, url = %request.url, "Cache miss");
            }
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "Cache lookup failed; asking origin");
            }
        }

        let response = self.inner.send(request).await?;

        if let Err(e) = self.cache.store(request, &response) {
            tracing::warn!(url = %request.url, error = %e, "Failed to store response in cache");
        }

        Ok(response)
    }
}
