//! Integration tests for `HttpFetcher`.
//!
//! Each test stands up a local `wiremock` server, so no real network
//! traffic is made.

use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use knitlog_import::{HttpFetcher, ImportError, PageFetcher};

const TEST_UA: &str = "knitlog-test/0.1";

/// 5-second timeout, test UA, no retries.
fn test_fetcher() -> HttpFetcher {
    HttpFetcher::new(5, TEST_UA, 0, 0).expect("failed to build test HttpFetcher")
}

/// Returns a URL on a local port nothing listens on.
fn refused_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let port = listener.local_addr().expect("local addr").port();
    drop(listener);
    format!("http://127.0.0.1:{port}/pattern")
}

// ---------------------------------------------------------------------------
// Success
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_returns_body_status_and_content_type() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/patterns/hat"))
        .and(header("user-agent", TEST_UA))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><h1>Hat</h1></html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/patterns/hat", server.uri());
    let page = test_fetcher().fetch(&url).await.expect("fetch succeeds");

    assert_eq!(page.status, 200);
    assert_eq!(page.url, url);
    assert_eq!(page.html, "<html><h1>Hat</h1></html>");
    assert_eq!(
        page.content_type.as_deref(),
        Some("text/html; charset=utf-8")
    );
}

// ---------------------------------------------------------------------------
// Status handling
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_reports_not_found_as_unexpected_status() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = test_fetcher()
        .fetch(&format!("{}/missing", server.uri()))
        .await
        .expect_err("404 must fail");

    match err {
        ImportError::UnexpectedStatus { status, url } => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/missing"), "url was {url}");
        }
        other => panic!("expected UnexpectedStatus, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_retries_403_once_with_browser_user_agent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(header("user-agent", TEST_UA))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
        .expect(1)
        .mount(&server)
        .await;

    let page = test_fetcher()
        .fetch(&format!("{}/guarded", server.uri()))
        .await
        .expect("browser profile retry succeeds");
    assert_eq!(page.html, "<p>ok</p>");
}

#[tokio::test]
async fn fetch_propagates_rate_limit_with_retry_after() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "30"))
        .mount(&server)
        .await;

    let err = test_fetcher()
        .fetch(&format!("{}/busy", server.uri()))
        .await
        .expect_err("429 must fail");

    match err {
        ImportError::RateLimited {
            domain,
            retry_after_secs,
        } => {
            assert_eq!(domain, "127.0.0.1");
            assert_eq!(retry_after_secs, 30);
        }
        other => panic!("expected RateLimited, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_retries_server_errors_when_configured() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<p>back</p>"))
        .mount(&server)
        .await;

    let fetcher = HttpFetcher::new(5, TEST_UA, 1, 0).expect("build fetcher");
    let page = fetcher
        .fetch(&format!("{}/flaky", server.uri()))
        .await
        .expect("second attempt succeeds");
    assert_eq!(page.html, "<p>back</p>");
}

// ---------------------------------------------------------------------------
// Transport and input errors
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fetch_connection_refused_is_http_error() {
    let url = refused_url();
    let err = test_fetcher().fetch(&url).await.expect_err("nothing listens");

    match err {
        ImportError::Http { url: failed, .. } => assert_eq!(failed, url),
        other => panic!("expected Http, got: {other:?}"),
    }
}

#[tokio::test]
async fn fetch_rejects_non_http_urls_without_a_request() {
    for url in ["ftp://example.com/file", "not a url", "file:///etc/passwd"] {
        let err = test_fetcher().fetch(url).await.expect_err("must reject");
        assert!(
            matches!(err, ImportError::InvalidUrl { .. }),
            "{url}: got {err:?}"
        );
    }
}
