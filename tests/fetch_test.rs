//! End-to-end fetches against a mock site and a mock geckodriver.

// ============================================================================
// Imports
// ============================================================================

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::NamedTempFile;
use webdriver_fetch::{
    DriverService, Error, FetchError, FetcherConfig, PageMetadata, ProtocolError, ProxyConfig,
    RenderedContentFetcher, WebDriverProtocol, WebPage,
};
use wiremock::matchers::{any, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

const SESSION: &str = "session-1";

/// Stands in for the geckodriver executable; only its existence is checked.
fn fake_driver() -> NamedTempFile {
    NamedTempFile::new().unwrap()
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn config(driver_port: u16, exe: &NamedTempFile) -> FetcherConfig {
    FetcherConfig::default()
        .with_gecko_driver(exe.path())
        .with_service_port(driver_port)
        .with_start_timeout(Duration::from_secs(2))
        .with_timeout(Duration::from_secs(5))
        .with_settle(Duration::ZERO)
}

fn ok(value: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
}

fn driver_error(error: &str, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(500).set_body_json(json!({
        "value": { "error": error, "message": message, "stacktrace": "" }
    }))
}

fn stale_session() -> ResponseTemplate {
    driver_error("invalid session id", "Tried to run command without establishing a connection")
}

/// Mounts a driver that renders `html` and expects exactly one delete.
async fn mock_driver(html: &str) -> MockServer {
    let driver = MockServer::start().await;
    mount_session(&driver, ok(Value::Null)).await;
    mount_render(&driver, html).await;
    driver
}

async fn mount_render(driver: &MockServer, html: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/session/{SESSION}/url")))
        .respond_with(ok(Value::Null))
        .mount(driver)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/session/{SESSION}/element")))
        .respond_with(ok(json!({ "element-6066-11e4-a52e-4f735466cecf": "body-1" })))
        .mount(driver)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("/session/{SESSION}/element/body-1/property/innerHTML")))
        .respond_with(ok(json!(html)))
        .mount(driver)
        .await;
}

/// Mounts a driver whose navigation fails.
async fn failing_driver() -> MockServer {
    let driver = MockServer::start().await;
    mount_session(&driver, ok(Value::Null)).await;
    mount_failed_navigation(&driver).await;
    driver
}

async fn mount_failed_navigation(driver: &MockServer) {
    Mock::given(method("POST"))
        .and(path(format!("/session/{SESSION}/url")))
        .respond_with(driver_error("unknown error", "Reached error page: about:neterror"))
        .mount(driver)
        .await;
}

async fn mount_session(driver: &MockServer, delete: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/session"))
        .respond_with(ok(json!({
            "sessionId": SESSION,
            "capabilities": { "browserName": "firefox" }
        })))
        .expect(1)
        .mount(driver)
        .await;
    Mock::given(method("DELETE"))
        .and(path(format!("/session/{SESSION}")))
        .respond_with(delete)
        .expect(1)
        .mount(driver)
        .await;
}

async fn new_session_body(driver: &MockServer) -> Value {
    let requests = driver.received_requests().await.unwrap();
    let request = requests
        .iter()
        .find(|r| r.method.as_str() == "POST" && r.url.path() == "/session")
        .unwrap();
    serde_json::from_slice(&request.body).unwrap()
}

async fn site_requests(site: &MockServer) -> Vec<Request> {
    site.received_requests().await.unwrap()
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_fetch_merges_headers_and_rendered_body() {
    let exe = fake_driver();
    let driver = mock_driver("<h1>Rendered</h1>").await;
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .insert_header("x-served-by", "edge-7")
                .set_body_string("<h1>Static</h1>"),
        )
        .expect(1)
        .mount(&site)
        .await;

    let protocol = WebDriverProtocol::new(config(driver.address().port(), &exe)).unwrap();
    let mut page = WebPage::new();
    page.headers_mut().insert("X-Stale", "yes");

    let url = format!("{}/page", site.uri());
    let response = protocol.fetch(&url, &mut page).await.unwrap();

    assert_eq!(response.url(), url);
    assert_eq!(response.code(), 200);
    assert_eq!(response.content(), b"<h1>Rendered</h1>");
    assert_eq!(response.header("Content-Type"), Some("text/html; charset=utf-8"));
    assert_eq!(response.header("X-Served-By"), Some("edge-7"));

    assert_eq!(page.headers.get("content-type"), Some("text/html; charset=utf-8"));
    assert!(!page.headers.contains("X-Stale"));
    assert_eq!(&page.headers, response.headers());
}

#[tokio::test]
async fn test_redirect_is_reported_not_followed() {
    let exe = fake_driver();
    let driver = mock_driver("<p>landing</p>").await;
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .expect(1)
        .mount(&site)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&site)
        .await;

    let protocol = WebDriverProtocol::new(config(driver.address().port(), &exe)).unwrap();
    let mut page = WebPage::new();
    let response = protocol
        .fetch(&format!("{}/old", site.uri()), &mut page)
        .await
        .unwrap();

    assert_eq!(response.code(), 301);
    assert_eq!(response.header("Location"), Some("/new"));
    assert_eq!(response.content(), b"<p>landing</p>");
}

#[tokio::test]
async fn test_not_modified_is_still_rendered() {
    let exe = fake_driver();
    let driver = mock_driver("<p>fresh</p>").await;
    let site = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(header("if-modified-since", "Tue, 14 Nov 2023 22:13:20 GMT"))
        .respond_with(ResponseTemplate::new(304))
        .expect(1)
        .mount(&site)
        .await;

    let protocol = WebDriverProtocol::new(config(driver.address().port(), &exe)).unwrap();
    let mut page = WebPage::modified_at(1_700_000_000_000);
    let response = protocol
        .fetch(&format!("{}/page", site.uri()), &mut page)
        .await
        .unwrap();

    assert_eq!(response.code(), 304);
    assert_eq!(response.content(), b"<p>fresh</p>");
}

#[tokio::test]
async fn test_never_fetched_page_sends_no_if_modified_since() {
    let exe = fake_driver();
    let driver = mock_driver("<p/>").await;
    let site = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&site)
        .await;

    let protocol = WebDriverProtocol::new(config(driver.address().port(), &exe)).unwrap();
    let mut page = WebPage::new();
    protocol
        .fetch(&format!("{}/page", site.uri()), &mut page)
        .await
        .unwrap();

    let requests = site_requests(&site).await;
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("if-modified-since").is_none());
    assert!(requests[0].headers.get("accept").is_some());
}

#[tokio::test]
async fn test_navigation_failure_still_terminates_session() {
    let exe = fake_driver();
    let driver = failing_driver().await;
    let site = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&site)
        .await;

    let protocol = WebDriverProtocol::new(config(driver.address().port(), &exe)).unwrap();
    let mut page = WebPage::new();
    page.headers_mut().insert("X-Stale", "yes");

    let err = protocol
        .fetch(&format!("{}/page", site.uri()), &mut page)
        .await
        .unwrap_err();

    match err {
        ProtocolError::Rendering(FetchError::RenderingFailed { source, .. }) => {
            assert!(matches!(source, Error::WebDriver { .. }));
        }
        other => panic!("expected rendering failure, got {other:?}"),
    }
    assert_eq!(page.headers.get("X-Stale"), Some("yes"));
}

#[tokio::test]
async fn test_unreachable_site_is_network_error() {
    let exe = fake_driver();
    let driver = mock_driver("<p/>").await;

    let protocol = WebDriverProtocol::new(config(driver.address().port(), &exe)).unwrap();
    let mut page = WebPage::new();
    let err = protocol
        .fetch(&format!("http://127.0.0.1:{}/page", closed_port()), &mut page)
        .await
        .unwrap_err();

    assert!(matches!(err, ProtocolError::Network { .. }));
}

#[tokio::test]
async fn test_both_channels_failing() {
    let exe = fake_driver();
    let driver = failing_driver().await;

    let protocol = WebDriverProtocol::new(config(driver.address().port(), &exe)).unwrap();
    let mut page = WebPage::new();
    let err = protocol
        .fetch(&format!("http://127.0.0.1:{}/page", closed_port()), &mut page)
        .await
        .unwrap_err();

    assert!(matches!(err, ProtocolError::Both { .. }));
}

#[tokio::test]
async fn test_unreachable_driver_is_rendering_error() {
    let exe = fake_driver();
    let site = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .mount(&site)
        .await;

    let config = config(closed_port(), &exe).with_start_timeout(Duration::from_millis(300));
    let protocol = WebDriverProtocol::new(config).unwrap();
    let mut page = WebPage::new();
    let err = protocol
        .fetch(&format!("{}/page", site.uri()), &mut page)
        .await
        .unwrap_err();

    match err {
        ProtocolError::Rendering(e) => {
            assert!(matches!(e.cause(), Error::PortUnreachable { .. }));
            assert!(e.termination_error().is_none());
        }
        other => panic!("expected rendering failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_proxy_reaches_both_channels() {
    let exe = fake_driver();
    let driver = mock_driver("<p>via proxy</p>").await;
    let proxy = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(203).insert_header("via", "1.1 mock-proxy"))
        .expect(1)
        .mount(&proxy)
        .await;

    let proxy_port = proxy.address().port();
    let config = config(driver.address().port(), &exe).with_proxy("127.0.0.1", proxy_port);
    let protocol = WebDriverProtocol::new(config).unwrap();

    let mut page = WebPage::new();
    let response = protocol
        .fetch("http://crawl-target.invalid/page", &mut page)
        .await
        .unwrap();

    assert_eq!(response.code(), 203);
    assert_eq!(response.header("Via"), Some("1.1 mock-proxy"));

    let body = new_session_body(&driver).await;
    let caps = &body["capabilities"]["alwaysMatch"];
    assert_eq!(caps["proxy"]["proxyType"], "manual");
    assert_eq!(caps["proxy"]["httpProxy"], format!("127.0.0.1:{proxy_port}"));
    assert!(caps["moz:firefoxOptions"]["profile"].is_string());
}

#[tokio::test]
async fn test_delete_failure_after_render_is_termination_failure() {
    let exe = fake_driver();
    let mock = MockServer::start().await;
    mount_session(&mock, stale_session()).await;
    mount_render(&mock, "<p>rendered</p>").await;

    let renderer = RenderedContentFetcher::new(&config(mock.address().port(), &exe));
    let driver = Arc::new(renderer.driver_service(mock.address().port()).unwrap());

    let err = renderer
        .fetch_with_driver(driver.clone(), "http://example.com/", &ProxyConfig::disabled())
        .await
        .unwrap_err();

    match &err {
        FetchError::TerminationFailed { url, source } => {
            assert_eq!(url, "http://example.com/");
            assert!(matches!(
                source,
                Error::WebDriver { error, .. } if error == "invalid session id"
            ));
        }
        other => panic!("expected termination failure, got {other:?}"),
    }
    assert!(err.termination_error().is_some());
    assert!(!driver.is_running().await);
}

#[tokio::test]
async fn test_navigation_and_delete_failures_are_both_reported() {
    let exe = fake_driver();
    let mock = MockServer::start().await;
    mount_session(&mock, stale_session()).await;
    mount_failed_navigation(&mock).await;

    let renderer = RenderedContentFetcher::new(&config(mock.address().port(), &exe));
    let driver = Arc::new(renderer.driver_service(mock.address().port()).unwrap());

    let err = renderer
        .fetch_with_driver(driver.clone(), "http://example.com/", &ProxyConfig::disabled())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::RenderingAndTerminationFailed { .. }));
    assert!(matches!(
        err.cause(),
        Error::WebDriver { error, message }
            if error == "unknown error" && message.contains("about:neterror")
    ));
    assert!(matches!(
        err.termination_error(),
        Some(Error::WebDriver { error, .. }) if error == "invalid session id"
    ));
    assert!(!driver.is_running().await);
}
