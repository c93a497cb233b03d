//! Status page handling over HTTP.

use crate::integration::mock_server::{MockServerFixture, IDLE_STATUS};
use overpass_lib_rust::prelude::*;
use overpass_lib_rust::status::{fetch_status, status_url};
use overpass_lib_rust::{HttpTransport, HttpTransportConfig, StatusState};
use url::Url;

const EMPTY_DOC: &str = r#"{"version":0.6,"generator":"Overpass API","elements":[]}"#;

#[tokio::test]
async fn test_fetch_status_parses_plain_text_page() {
    let fixture = MockServerFixture::new().await;
    let _status = fixture.mock_idle_status().await;
    let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();
    let interpreter = Url::parse(&fixture.interpreter_url()).unwrap();

    let status = fetch_status(&transport, &status_url(&interpreter)).await.unwrap();
    assert_eq!(status.client_id, "2130706433");
    assert_eq!(status.rate_limit, 2);
    assert!(status.slots_limited.is_empty());
    assert!(status.slots_running.is_empty());
}

#[tokio::test]
async fn test_html_status_page_is_unavailable() {
    let fixture = MockServerFixture::new().await;
    let _status = fixture
        .mock_status("text/html", "<html><body>Welcome</body></html>")
        .await;
    let transport = HttpTransport::new(HttpTransportConfig::default()).unwrap();
    let interpreter = Url::parse(&fixture.interpreter_url()).unwrap();

    let err = fetch_status(&transport, &status_url(&interpreter))
        .await
        .unwrap_err();
    assert_eq!(err.class(), "status_unavailable");
    assert!(err.to_string().contains("response type incorrect"));
}

#[tokio::test]
async fn test_queries_still_run_without_a_status_page() {
    let fixture = MockServerFixture::new().await;
    // No status mock: the server answers the GET with 501.
    let mock = fixture
        .mock_query_times(3, 200, "application/json", EMPTY_DOC)
        .await;
    let endpoint = fixture.endpoint();

    for _ in 0..3 {
        endpoint.query_json("node(1);out;").await.unwrap();
    }
    mock.assert_async().await;
    assert!(matches!(endpoint.status(), StatusState::Unavailable));
    assert_eq!(endpoint.signals().status, "unavailable");
}

#[tokio::test]
async fn test_status_is_read_once_before_the_first_query() {
    let fixture = MockServerFixture::new().await;
    let status = {
        let mut server = fixture.server.lock().await;
        server
            .mock("GET", "/api/status")
            .with_status(200)
            .with_header("content-type", "text/plain")
            .with_body(IDLE_STATUS)
            .expect_at_least(1)
            .create_async()
            .await
    };
    let _query = fixture.mock_query(200, "application/json", EMPTY_DOC).await;
    let endpoint = fixture.endpoint();
    assert!(endpoint.is_untouched());

    endpoint.query_json("node(1);out;").await.unwrap();
    status.assert_async().await;
    assert!(!endpoint.is_untouched());
    assert_eq!(endpoint.signals().admitted_total, 1);
}
