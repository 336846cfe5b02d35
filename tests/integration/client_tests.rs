//! Integration tests for the client
//!
//! Network access goes through a scripted stub transport so the robots
//! check, cache, retry loop and throttle can be observed call by call.
//! Timing-sensitive tests run on a paused tokio clock.

mod common;

use common::{StubTransport, PLEIADES_ROBOTS};
use mannerly::cache::{CachePolicy, SqliteCache};
use mannerly::client::DEFAULT_USER_AGENT;
use mannerly::{Client, ClientBuilder, ConfigError, Error, RequestOptions, TransportErrorKind};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Method, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

const NETLOC: &str = "example.com";
const ROBOTS_URL: &str = "https://example.com/robots.txt";
const PAGE_URL: &str = "https://example.com/places/579885";

/// Headers carrying the given User-Agent
fn headers_with_agent(agent: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_str(agent).expect("valid header"));
    headers
}

/// Builder wired to a stub, with the cache off unless a test turns it on
fn builder(stub: &Arc<StubTransport>) -> ClientBuilder {
    Client::builder(NETLOC)
        .headers(headers_with_agent("CustomBot/7.9 (+https://example.org/bot)"))
        .cache_enabled(false)
        .transport(stub.clone())
}

/// Seconds between consecutive calls the stub recorded
fn gaps(times: &[Instant]) -> Vec<Duration> {
    times.windows(2).map(|pair| pair[1] - pair[0]).collect()
}

#[tokio::test]
async fn test_missing_user_agent_fails_construction() {
    let stub = Arc::new(StubTransport::new());

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("text/html"));

    let result = builder(&stub).headers(headers).build().await;

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::MissingUserAgent))
    ));
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_blank_user_agent_fails_construction() {
    let stub = Arc::new(StubTransport::new());

    let result = builder(&stub)
        .headers(headers_with_agent("   "))
        .build()
        .await;

    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::BlankUserAgent))
    ));
}

#[tokio::test]
async fn test_invalid_netloc_fails_construction() {
    let stub = Arc::new(StubTransport::new());

    let result = ClientBuilder::new("https://example.com/")
        .transport(stub.clone())
        .cache_enabled(false)
        .build()
        .await;

    assert!(matches!(result, Err(Error::InvalidDomain(_))));
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_default_user_agent_is_accepted() {
    let stub = Arc::new(StubTransport::new());

    let client = ClientBuilder::new(NETLOC)
        .transport(stub.clone())
        .cache_enabled(false)
        .build()
        .await
        .expect("default headers are valid");

    assert_eq!(client.user_agent(), DEFAULT_USER_AGENT);
}

#[tokio::test]
async fn test_headers_are_copied() {
    let stub = Arc::new(StubTransport::new());
    let mut headers = headers_with_agent("CustomBot/7.9");

    let client = builder(&stub)
        .headers(headers.clone())
        .build()
        .await
        .expect("client builds");

    // Mutating the caller's map does not reach the client
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    assert!(client.headers().get(ACCEPT).is_none());
    assert_eq!(client.headers().get(USER_AGENT).unwrap(), "CustomBot/7.9");
}

#[tokio::test]
async fn test_robots_fetched_once_at_construction() {
    let stub = Arc::new(
        StubTransport::new()
            .route(ROBOTS_URL, 200, PLEIADES_ROBOTS)
            .route(PAGE_URL, 200, "<html></html>"),
    );

    let client = builder(&stub).build().await.expect("client builds");
    assert!(client.respects_robots_txt());
    assert_eq!(stub.calls_to(ROBOTS_URL).len(), 1);

    client.get(PAGE_URL).await.expect("allowed page");
    client.get(PAGE_URL).await.expect("allowed page");

    // No further robots.txt traffic after construction
    assert_eq!(stub.calls_to(ROBOTS_URL).len(), 1);
    assert_eq!(stub.page_calls(), 2);
}

#[tokio::test]
async fn test_disallowed_uri_sends_nothing() {
    let stub = Arc::new(StubTransport::new().route(ROBOTS_URL, 200, PLEIADES_ROBOTS));

    let client = builder(&stub)
        .headers(headers_with_agent("IstellaBot/1.10.2 (+http://www.tiscali.it/)"))
        .build()
        .await
        .expect("client builds");

    let err = client.get(PAGE_URL).await.unwrap_err();

    match err {
        Error::RobotsDisallowed { user_agent, uri } => {
            assert_eq!(user_agent, "IstellaBot/1.10.2 (+http://www.tiscali.it/)");
            assert_eq!(uri, PAGE_URL);
        }
        other => panic!("expected RobotsDisallowed, got {:?}", other),
    }
    assert_eq!(stub.page_calls(), 0);
}

#[tokio::test]
async fn test_disallowed_head_sends_nothing() {
    let stub = Arc::new(StubTransport::new().route(ROBOTS_URL, 200, PLEIADES_ROBOTS));
    let client = builder(&stub).build().await.expect("client builds");

    let err = client
        .head("https://example.com/search?q=athens")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::RobotsDisallowed { .. }));
    assert_eq!(stub.page_calls(), 0);
}

#[tokio::test]
async fn test_respect_robots_false_skips_robots_fetch() {
    let stub = Arc::new(StubTransport::new().route("https://example.com/search", 200, "results"));

    let client = builder(&stub)
        .respect_robots_txt(false)
        .build()
        .await
        .expect("client builds");

    assert!(!client.respects_robots_txt());
    assert!(client.robots_rules().is_none());

    // Would be disallowed if robots.txt were consulted
    let response = client.get("https://example.com/search").await.expect("fetch");
    assert_eq!(response.text(), "results");
    assert!(stub.calls_to(ROBOTS_URL).is_empty());
}

#[tokio::test]
async fn test_invalid_uri_rejected_before_io() {
    let stub = Arc::new(StubTransport::new());
    let client = builder(&stub).build().await.expect("client builds");
    let before = stub.calls().len();

    for uri in ["not a uri", "/places/579885", "ftp://example.com/file"] {
        let err = client.get(uri).await.unwrap_err();
        assert!(matches!(err, Error::InvalidUri(ref u) if u == uri), "{}", uri);
    }

    assert_eq!(stub.calls().len(), before);
}

#[tokio::test]
async fn test_head_uses_head_method() {
    let stub = Arc::new(StubTransport::new().route(PAGE_URL, 200, "body"));
    let client = builder(&stub).build().await.expect("client builds");

    let response = client.head(PAGE_URL).await.expect("head");
    assert!(response.body.is_empty());

    let options = client.request_options().bypass_cache(true);
    client.head_with(PAGE_URL, &options).await.expect("head bypass");

    let calls = stub.calls_to(PAGE_URL);
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|call| call.method == Method::HEAD));
}

#[tokio::test]
async fn test_additional_headers_overlay_base() {
    let stub = Arc::new(StubTransport::new().route(PAGE_URL, 200, "ok"));
    let client = builder(&stub).build().await.expect("client builds");

    let mut extra = HeaderMap::new();
    extra.insert("user-agent", HeaderValue::from_static("OtherBot/2.0"));
    extra.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let options = client.request_options().with_headers(extra);
    client.get_with(PAGE_URL, &options).await.expect("fetch");
    client.get(PAGE_URL).await.expect("fetch");

    let calls = stub.calls_to(PAGE_URL);
    assert_eq!(calls[0].headers.get(USER_AGENT).unwrap(), "OtherBot/2.0");
    assert_eq!(calls[0].headers.get(ACCEPT).unwrap(), "application/json");

    // The base headers are untouched by the overlay
    assert_eq!(
        calls[1].headers.get(USER_AGENT).unwrap(),
        "CustomBot/7.9 (+https://example.org/bot)"
    );
    assert!(calls[1].headers.get(ACCEPT).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_retried_with_backoff() {
    let stub = Arc::new(
        StubTransport::new()
            .route(PAGE_URL, 200, "finally")
            .fail_times(3, TransportErrorKind::Disconnected),
    );
    let client = builder(&stub).retry(4, 2).build().await.expect("client builds");

    let response = client.get(PAGE_URL).await.expect("eventually succeeds");
    assert_eq!(response.text(), "finally");

    let times: Vec<Instant> = stub.calls_to(PAGE_URL).iter().map(|call| call.at).collect();
    assert_eq!(times.len(), 4);
    assert_eq!(
        gaps(&times),
        vec![
            Duration::from_secs(1),
            Duration::from_secs(2),
            Duration::from_secs(4)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_surface_transport_error() {
    let stub = Arc::new(
        StubTransport::new()
            .route(PAGE_URL, 200, "never")
            .fail_times(10, TransportErrorKind::ConnectionFailure),
    );
    let client = builder(&stub).retry(2, 3).build().await.expect("client builds");

    let started = Instant::now();
    let err = client.get(PAGE_URL).await.unwrap_err();

    match err {
        Error::Transport(e) => assert_eq!(e.kind, TransportErrorKind::ConnectionFailure),
        other => panic!("expected Transport error, got {:?}", other),
    }

    // retries + 1 attempts, sleeping 1s then 3s between them
    assert_eq!(stub.calls_to(PAGE_URL).len(), 3);
    assert_eq!(started.elapsed(), Duration::from_secs(4));
}

#[tokio::test(start_paused = true)]
async fn test_per_request_retry_options() {
    let stub = Arc::new(
        StubTransport::new()
            .route(PAGE_URL, 200, "ok")
            .fail_times(1, TransportErrorKind::Disconnected),
    );
    let client = builder(&stub).build().await.expect("client builds");

    let options = RequestOptions::default().retries(0);
    let err = client.get_with(PAGE_URL, &options).await.unwrap_err();

    assert!(matches!(err, Error::Transport(_)));
    assert_eq!(stub.calls_to(PAGE_URL).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_non_transient_error_not_retried() {
    let stub = Arc::new(
        StubTransport::new()
            .route(PAGE_URL, 200, "ok")
            .fail_times(1, TransportErrorKind::Other),
    );
    let client = builder(&stub).build().await.expect("client builds");

    let started = Instant::now();
    let err = client.get(PAGE_URL).await.unwrap_err();

    match err {
        Error::Transport(e) => assert_eq!(e.kind, TransportErrorKind::Other),
        other => panic!("expected Transport error, got {:?}", other),
    }
    assert_eq!(stub.calls_to(PAGE_URL).len(), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn test_non_success_status_is_error() {
    let stub = Arc::new(StubTransport::new().route(PAGE_URL, 503, "try later"));
    let client = builder(&stub).build().await.expect("client builds");

    let err = client.get(PAGE_URL).await.unwrap_err();

    match err {
        Error::HttpStatus { status, response } => {
            assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
            assert_eq!(response.text(), "try later");
        }
        other => panic!("expected HttpStatus, got {:?}", other),
    }

    // Status codes are not retried
    assert_eq!(stub.calls_to(PAGE_URL).len(), 1);
}

#[tokio::test]
async fn test_cache_hit_skips_transport() {
    let stub = Arc::new(StubTransport::new().route(PAGE_URL, 200, "cached body"));
    let cache = Arc::new(SqliteCache::in_memory(CachePolicy::default()).expect("cache"));

    let client = builder(&stub)
        .cache_enabled(true)
        .cache(cache)
        .build()
        .await
        .expect("client builds");

    let first = client.get(PAGE_URL).await.expect("first fetch");
    let second = client.get(PAGE_URL).await.expect("second fetch");

    assert!(!first.from_cache);
    assert!(second.from_cache);
    assert_eq!(second.text(), "cached body");
    assert_eq!(stub.calls_to(PAGE_URL).len(), 1);
    // Cache-backed client with an injected cache has no partition path
    assert!(client.cache_path().is_none());
}

#[tokio::test]
async fn test_bypass_cache_goes_to_origin() {
    let stub = Arc::new(StubTransport::new().route(PAGE_URL, 200, "fresh"));
    let cache = Arc::new(SqliteCache::in_memory(CachePolicy::default()).expect("cache"));

    let client = builder(&stub)
        .cache_enabled(true)
        .cache(cache)
        .build()
        .await
        .expect("client builds");

    client.get(PAGE_URL).await.expect("prime cache");

    let options = client.request_options().bypass_cache(true);
    let response = client.get_with(PAGE_URL, &options).await.expect("bypass");

    assert!(!response.from_cache);
    assert_eq!(stub.calls_to(PAGE_URL).len(), 2);
}

#[tokio::test]
async fn test_error_responses_not_cached() {
    let stub = Arc::new(StubTransport::new().route(PAGE_URL, 404, "missing"));
    let cache = Arc::new(SqliteCache::in_memory(CachePolicy::default()).expect("cache"));

    let client = builder(&stub)
        .cache_enabled(true)
        .cache(cache.clone())
        .build()
        .await
        .expect("client builds");

    assert!(client.get(PAGE_URL).await.is_err());
    assert!(client.get(PAGE_URL).await.is_err());

    assert_eq!(stub.calls_to(PAGE_URL).len(), 2);
    assert!(cache.is_empty().expect("count"));
}

#[tokio::test]
async fn test_default_cache_partition_per_netloc() {
    let dir = tempfile::tempdir().expect("tempdir");
    let stub = Arc::new(StubTransport::new().route(PAGE_URL, 200, "persisted"));

    let client = builder(&stub)
        .cache_enabled(true)
        .cache_dir(dir.path())
        .build()
        .await
        .expect("client builds");

    let expected = dir.path().join("example_com.sqlite");
    assert_eq!(client.cache_path(), Some(&expected));
    assert!(expected.exists());

    client.get(PAGE_URL).await.expect("fetch");
    drop(client);

    // A second client for the same netloc shares the partition
    let client = builder(&stub)
        .cache_enabled(true)
        .cache_dir(dir.path())
        .build()
        .await
        .expect("client builds");

    let response = client.get(PAGE_URL).await.expect("fetch");
    assert!(response.from_cache);
    assert_eq!(stub.calls_to(PAGE_URL).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_crawl_delay_throttles_uncached_responses() {
    let robots = "User-agent: *\nCrawl-delay: 1500\n";
    let stub = Arc::new(
        StubTransport::new()
            .route(ROBOTS_URL, 200, robots)
            .route(PAGE_URL, 200, "slow down"),
    );
    let cache = Arc::new(SqliteCache::in_memory(CachePolicy::default()).expect("cache"));

    let client = builder(&stub)
        .cache_enabled(true)
        .cache(cache)
        .build()
        .await
        .expect("client builds");
    assert_eq!(client.crawl_delay(), 1500);

    let started = Instant::now();
    client.get(PAGE_URL).await.expect("origin fetch");
    assert_eq!(started.elapsed(), Duration::from_millis(1500));

    // A cache hit never touched the origin, so no delay
    let started = Instant::now();
    let response = client.get(PAGE_URL).await.expect("cached fetch");
    assert!(response.from_cache);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_crawl_delay_applies_to_error_statuses() {
    let robots = "User-agent: custombot\nCrawl-delay: 250\n";
    let stub = Arc::new(StubTransport::new().route(ROBOTS_URL, 200, robots));

    let client = builder(&stub).build().await.expect("client builds");
    assert_eq!(client.crawl_delay(), 250);

    let started = Instant::now();
    let err = client.get(PAGE_URL).await.unwrap_err();

    assert!(matches!(err, Error::HttpStatus { .. }));
    assert_eq!(started.elapsed(), Duration::from_millis(250));
}

#[tokio::test]
async fn test_specific_crawl_delay_overrides_wildcard() {
    let robots = "User-agent: *\nCrawl-delay: 10\n\nUser-agent: CustomBot\nCrawl-delay: 20\n";
    let stub = Arc::new(StubTransport::new().route(ROBOTS_URL, 200, robots));

    let client = builder(&stub).build().await.expect("client builds");

    assert_eq!(client.crawl_delay(), 20);
}

#[tokio::test]
async fn test_ambiguous_crawl_delay_fails_construction() {
    let robots = "User-agent: *\nCrawl-delay: 10\nCrawl-delay: 20\n";
    let stub = Arc::new(StubTransport::new().route(ROBOTS_URL, 200, robots));

    let err = builder(&stub).build().await.unwrap_err();

    match err {
        Error::AmbiguousCrawlDelay { user_agent, values } => {
            assert_eq!(user_agent, "custombot");
            assert_eq!(values, vec!["10".to_string(), "20".to_string()]);
        }
        other => panic!("expected AmbiguousCrawlDelay, got {:?}", other),
    }
}

#[tokio::test]
async fn test_malformed_robots_fails_construction() {
    let robots = "Disallow: /private\nUser-agent: *\n";
    let stub = Arc::new(StubTransport::new().route(ROBOTS_URL, 200, robots));

    let err = builder(&stub).build().await.unwrap_err();

    assert!(matches!(err, Error::MalformedRobotsTxt { ref netloc, .. } if netloc == NETLOC));
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let stub = Arc::new(StubTransport::new().route("https://example.com/search", 200, "ok"));

    let client = builder(&stub).build().await.expect("client builds");

    // Both schemes tried and both 404
    assert_eq!(stub.calls_to(ROBOTS_URL).len(), 1);
    assert_eq!(stub.calls_to("http://example.com/robots.txt").len(), 1);
    assert!(client.robots_rules().expect("rules").rules().is_empty());

    client.get("https://example.com/search").await.expect("allowed");
}

#[tokio::test]
async fn test_no_store_responses_refetched() {
    let stub = Arc::new(StubTransport::new().route_with_header(
        PAGE_URL,
        200,
        "volatile",
        "cache-control",
        "no-store",
    ));
    let cache = Arc::new(SqliteCache::in_memory(CachePolicy::default()).expect("cache"));

    let client = builder(&stub)
        .cache_enabled(true)
        .cache(cache.clone())
        .build()
        .await
        .expect("client builds");

    client.get(PAGE_URL).await.expect("first fetch");
    let second = client.get(PAGE_URL).await.expect("second fetch");

    assert!(!second.from_cache);
    assert_eq!(stub.calls_to(PAGE_URL).len(), 2);
    assert!(cache.is_empty().expect("count"));
}

#[tokio::test]
async fn test_pleiades_with_default_headers() {
    let stub = Arc::new(
        StubTransport::new()
            .route("https://pleiades.stoa.org/robots.txt", 200, PLEIADES_ROBOTS)
            .route("https://pleiades.stoa.org/places/295374", 200, "<html>Roma</html>"),
    );

    let client = Client::builder("pleiades.stoa.org")
        .cache_enabled(false)
        .transport(stub.clone())
        .build()
        .await
        .expect("client builds");
    assert_eq!(client.user_agent(), DEFAULT_USER_AGENT);

    let response = client
        .get("https://pleiades.stoa.org/places/295374")
        .await
        .expect("place page");
    assert_eq!(response.status, StatusCode::OK);

    let err = client
        .get("https://pleiades.stoa.org/login_form")
        .await
        .unwrap_err();
    match err {
        Error::RobotsDisallowed { user_agent, uri } => {
            assert_eq!(user_agent, DEFAULT_USER_AGENT);
            assert_eq!(uri, "https://pleiades.stoa.org/login_form");
        }
        other => panic!("expected RobotsDisallowed, got {:?}", other),
    }
    assert!(stub
        .calls_to("https://pleiades.stoa.org/login_form")
        .is_empty());
}

#[tokio::test]
#[ignore = "requires network access to pleiades.stoa.org"]
async fn test_live_pleiades() {
    let client = Client::builder("pleiades.stoa.org")
        .cache_enabled(false)
        .build()
        .await
        .expect("client builds");

    let response = client
        .get("https://pleiades.stoa.org/places/295374")
        .await
        .expect("place page");
    assert!(response.is_success());

    let err = client
        .get("https://pleiades.stoa.org/login_form")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RobotsDisallowed { .. }));
}
