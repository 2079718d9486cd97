use super::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_config() -> HttpConfig {
    HttpConfig {
        timeout_seconds: 5,
        max_retries: 2,
        retry_delay_millis: 10,
        ..Default::default()
    }
}

#[tokio::test]
async fn renders_page_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw("<html><body><h1>Hi</h1></body></html>", "text/html"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let renderer = HttpRenderer::new(fast_config());
    let url = format!("{}/article", server.uri());
    let page = renderer.render(&url).await.expect("render should succeed");

    assert_eq!(page.url, url);
    assert!(page.html.contains("<h1>Hi</h1>"));
    assert!(page.markdown.is_none());
}

#[tokio::test]
async fn client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let renderer = HttpRenderer::new(fast_config());
    let err = renderer
        .render(&format!("{}/missing", server.uri()))
        .await
        .expect_err("404 should fail");

    assert!(err.to_string().contains("HTTP error 404"));
}

#[tokio::test]
async fn server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("recovered"))
        .expect(1)
        .mount(&server)
        .await;

    let renderer = HttpRenderer::new(fast_config());
    let body = renderer
        .get(&format!("{}/flaky", server.uri()))
        .await
        .expect("second attempt should succeed");

    assert_eq!(body, "recovered");
}

#[tokio::test]
async fn retries_stop_after_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let renderer = HttpRenderer::new(fast_config());
    let err = renderer
        .get(&format!("{}/down", server.uri()))
        .await
        .expect_err("should give up");

    assert!(err.to_string().contains("HTTP error 500"));
}

#[test]
fn retryable_error_classification() {
    assert!(is_retryable_error(&anyhow!("HTTP error 503")));
    assert!(is_retryable_error(&anyhow!("HTTP error 429")));
    assert!(is_retryable_error(&anyhow!("connection refused")));
    assert!(!is_retryable_error(&anyhow!("HTTP error 404")));
    assert!(!is_retryable_error(&anyhow!("invalid utf-8")));
}
