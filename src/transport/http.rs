//! reqwest-backed transport
//!
//! This module handles the actual HTTP traffic, including:
//! - Building the underlying reqwest client
//! - Buffering responses so they can be cached and replayed
//! - Classifying failures into retryable and non-retryable kinds

use crate::transport::{Request, Response, Transport, TransportError, TransportErrorKind};
use async_trait::async_trait;
use reqwest::Client;
use std::error::Error as StdError;
use std::io::ErrorKind;
use std::time::Duration;

/// Builds the HTTP client used for all outbound traffic
///
/// The User-Agent is not baked into the client; it travels with each
/// request's headers so that per-request overlays can change it.
pub fn build_http_client() -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Transport that sends requests over the network with reqwest
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a transport with a freshly built client
    pub fn new() -> Result<Self, TransportError> {
        let client = build_http_client().map_err(|e| {
            TransportError::new(TransportErrorKind::Other, "", format!("failed to build HTTP client: {}", e))
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let uri = request.url.as_str();

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .send()
            .await
            .map_err(|e| to_transport_error(uri, e))?;

        let url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| to_transport_error(uri, e))?
            .to_vec();

        Ok(Response {
            url,
            status,
            headers,
            body,
            from_cache: false,
        })
    }
}

fn to_transport_error(uri: &str, error: reqwest::Error) -> TransportError {
    let kind = classify_error(&error);
    TransportError::new(kind, uri, error.to_string())
}

/// Classifies a reqwest error
///
/// | Condition | Kind |
/// |-----------|------|
/// | Connect failure (refused, DNS, TLS, connect timeout) | ConnectionFailure |
/// | Reset, aborted, broken pipe, early EOF | Disconnected |
/// | Anything else | Other |
pub(crate) fn classify_error(error: &reqwest::Error) -> TransportErrorKind {
    if error.is_connect() {
        TransportErrorKind::ConnectionFailure
    } else if is_disconnect(error) {
        TransportErrorKind::Disconnected
    } else {
        TransportErrorKind::Other
    }
}

fn is_disconnect(error: &(dyn StdError + 'static)) -> bool {
    let mut source = Some(error);
    while let Some(err) = source {
        if let Some(io) = err.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        // An early close surfaces as a hyper error with no io source
        if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() {
                return true;
            }
        }
        source = err.source();
    }
    false
}
