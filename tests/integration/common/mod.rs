//! Shared test doubles for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use mannerly::transport::{Request, Response, Transport, TransportError, TransportErrorKind};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use tokio::time::Instant;

/// A request the stub saw
#[derive(Debug, Clone)]
pub struct Call {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub at: Instant,
}

#[derive(Debug, Clone)]
struct Route {
    status: u16,
    body: String,
    headers: Vec<(String, String)>,
}

/// Transport that answers from a fixed route table and can fail on demand
///
/// Unknown URLs answer 404. Queued failures are consumed by requests for
/// anything other than robots.txt, so client construction is unaffected.
#[derive(Default)]
pub struct StubTransport {
    routes: HashMap<String, Route>,
    failing_urls: HashMap<String, TransportErrorKind>,
    failures: Mutex<VecDeque<TransportErrorKind>>,
    calls: Mutex<Vec<Call>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                status,
                body: body.to_string(),
                headers: Vec::new(),
            },
        );
        self
    }

    pub fn route_with_header(mut self, url: &str, status: u16, body: &str, name: &str, value: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                status,
                body: body.to_string(),
                headers: vec![(name.to_string(), value.to_string())],
            },
        );
        self
    }

    /// Always fails requests for this URL with the given kind
    pub fn unreachable(mut self, url: &str, kind: TransportErrorKind) -> Self {
        self.failing_urls.insert(url.to_string(), kind);
        self
    }

    /// Fails the next `times` non-robots requests with the given kind
    pub fn fail_times(self, times: usize, kind: TransportErrorKind) -> Self {
        {
            let mut failures = self.failures.lock().unwrap();
            for _ in 0..times {
                failures.push_back(kind);
            }
        }
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|call| call.url == url).collect()
    }

    /// Number of requests for anything but robots.txt
    pub fn page_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| !call.url.ends_with("/robots.txt"))
            .count()
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(Call {
            method: request.method.clone(),
            url: url.clone(),
            headers: request.headers.clone(),
            at: Instant::now(),
        });

        if let Some(kind) = self.failing_urls.get(&url) {
            return Err(TransportError::new(*kind, url, "stub: unreachable"));
        }

        if !url.ends_with("/robots.txt") {
            if let Some(kind) = self.failures.lock().unwrap().pop_front() {
                return Err(TransportError::new(kind, url, "stub: injected failure"));
            }
        }

        let route = self.routes.get(&url).cloned().unwrap_or(Route {
            status: 404,
            body: String::new(),
            headers: Vec::new(),
        });

        let mut headers = HeaderMap::new();
        for (name, value) in &route.headers {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }

        let body = if request.method == Method::HEAD {
            Vec::new()
        } else {
            route.body.into_bytes()
        };

        Ok(Response {
            url: request.url.clone(),
            status: StatusCode::from_u16(route.status).unwrap(),
            headers,
            body,
            from_cache: false,
        })
    }
}

/// robots.txt modelled on pleiades.stoa.org
pub const PLEIADES_ROBOTS: &str = "\
User-agent: *
Disallow: /login_form
Disallow: /search

User-agent: IstellaBot
Disallow: /places/

User-agent: PleiadesIndexerBot
";
