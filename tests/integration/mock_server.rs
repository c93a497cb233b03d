//! Mock HTTP server setup for integration tests

use mockito::{Matcher, Mock, Server, ServerGuard};
use overpass_lib_rust::{EndpointConfig, HttpTransportConfig, OverpassEndpoint};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const INTERPRETER_PATH: &str = "/api/interpreter";
pub const STATUS_PATH: &str = "/api/status";

pub const IDLE_STATUS: &str = "Connected as: 2130706433
Current time: 2024-05-01T10:00:00Z
Announced endpoint: none
Rate limit: 2
2 slots available now.
Currently running queries (pid, space limit, time limit, start time):
";

/// Test fixture that manages a mock Overpass server
pub struct MockServerFixture {
    pub server: Arc<Mutex<ServerGuard>>,
    pub base_url: String,
}

impl MockServerFixture {
    pub async fn new() -> Self {
        let server = Server::new_async().await;
        let base_url = server.url();
        Self {
            server: Arc::new(Mutex::new(server)),
            base_url,
        }
    }

    pub fn interpreter_url(&self) -> String {
        format!("{}{}", self.base_url, INTERPRETER_PATH)
    }

    /// Endpoint pointed at the mock server, with fast polling and no env lookups.
    pub fn endpoint(&self) -> OverpassEndpoint {
        self.endpoint_with(EndpointConfig::default().with_poll_interval(std::time::Duration::from_millis(10)))
    }

    pub fn endpoint_with(&self, config: EndpointConfig) -> OverpassEndpoint {
        OverpassEndpoint::builder(self.interpreter_url())
            .config(config)
            .http_config(HttpTransportConfig::default())
            .build()
            .expect("endpoint builds")
    }

    /// Serve `body` as the status page.
    pub async fn mock_status(&self, content_type: &str, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("GET", STATUS_PATH)
            .with_status(200)
            .with_header("content-type", content_type)
            .with_body(body)
            .create_async()
            .await
    }

    pub async fn mock_idle_status(&self) -> Mock {
        self.mock_status("text/plain; charset=utf-8", IDLE_STATUS).await
    }

    /// Create a mock for any interpreter POST, hit at least once
    pub async fn mock_query(&self, status: u16, content_type: &str, body: &str) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", INTERPRETER_PATH)
            .with_status(status.into())
            .with_header("content-type", content_type)
            .with_body(body)
            .expect_at_least(1)
            .create_async()
            .await
    }

    /// Create a mock for interpreter POSTs that must be hit exactly `hits` times
    pub async fn mock_query_times(
        &self,
        hits: usize,
        status: u16,
        content_type: &str,
        body: &str,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", INTERPRETER_PATH)
            .with_status(status.into())
            .with_header("content-type", content_type)
            .with_body(body)
            .expect(hits)
            .create_async()
            .await
    }

    /// Create a mock for a single interpreter POST whose form body matches
    pub async fn mock_query_matching(
        &self,
        body_matcher: Matcher,
        status: u16,
        content_type: &str,
        body: &str,
    ) -> Mock {
        let mut server = self.server.lock().await;
        server
            .mock("POST", INTERPRETER_PATH)
            .match_body(body_matcher)
            .with_status(status.into())
            .with_header("content-type", content_type)
            .with_body(body)
            .expect(1)
            .create_async()
            .await
    }
}
