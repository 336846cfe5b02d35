//! Transport layer for outbound HTTP requests
//!
//! Everything above this module talks to the network through the
//! [`Transport`] trait: the robots.txt fetch, the cache-aware path and
//! direct cache-bypassing calls. The only production implementation is
//! [`ReqwestTransport`]; tests substitute their own.

mod http;

pub use http::{build_http_client, ReqwestTransport};

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use std::fmt;
use thiserror::Error;
use url::Url;

/// An outbound request
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method (GET or HEAD in practice)
    pub method: Method,

    /// Absolute URL to request
    pub url: Url,

    /// Headers to send, including User-Agent
    pub headers: HeaderMap,
}

impl Request {
    /// Creates a GET request
    pub fn get(url: Url, headers: HeaderMap) -> Self {
        Self {
            method: Method::GET,
            url,
            headers,
        }
    }

    /// Creates a HEAD request
    pub fn head(url: Url, headers: HeaderMap) -> Self {
        Self {
            method: Method::HEAD,
            url,
            headers,
        }
    }
}

/// A fully buffered response
#[derive(Debug, Clone)]
pub struct Response {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code
    pub status: StatusCode,

    /// Response headers
    pub headers: HeaderMap,

    /// Response body (empty for HEAD)
    pub body: Vec<u8>,

    /// Whether this response was served from the local cache
    pub from_cache: bool,
}

impl Response {
    /// Returns the body decoded as UTF-8, replacing invalid sequences
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Returns true for 2xx statuses
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Classification of transport failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// Could not establish a connection (refused, DNS, TLS handshake, connect timeout)
    ConnectionFailure,

    /// The peer reset or closed the connection mid-exchange
    Disconnected,

    /// Anything else (read timeouts, invalid responses, body decoding)
    Other,
}

impl TransportErrorKind {
    /// Returns true if a request failing this way may succeed on retry
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionFailure | Self::Disconnected)
    }
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailure => write!(f, "connection failure"),
            Self::Disconnected => write!(f, "remote disconnected"),
            Self::Other => write!(f, "transport failure"),
        }
    }
}

/// A request that never produced an HTTP response
#[derive(Debug, Clone, Error)]
#[error("{kind} for {uri}: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub uri: String,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, uri: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            uri: uri.into(),
            message: message.into(),
        }
    }

    /// Returns true if the failure is worth retrying
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

/// Something that can carry a [`Request`] to an origin and bring back a [`Response`]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, TransportError>;
}
