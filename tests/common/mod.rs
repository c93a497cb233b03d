//! In-process transport double for scheduler tests.
//!
//! Replies are scripted per query text (falling back to an empty JSON document)
//! and the status page is scripted as a sequence whose last entry repeats.
//! Every query call sleeps on the tokio clock, so tests run with paused time.

#![allow(dead_code)]

use async_trait::async_trait;
use overpass_lib_rust::transport::{HttpReply, Transport};
use overpass_lib_rust::{EndpointConfig, OverpassEndpoint, RequestOptions, Result};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const EMPTY_JSON: &str = r#"{"version":0.6,"generator":"Overpass API 0.7.62","osm3s":{"timestamp_osm_base":"2024-05-01T10:00:00Z","copyright":"The data included in this document is from www.openstreetmap.org."},"elements":[]}"#;

pub const TEST_ENDPOINT: &str = "https://overpass.test/api/interpreter";

/// A reply that can be produced any number of times.
#[derive(Debug, Clone)]
pub struct Canned {
    pub status: u16,
    pub content_type: &'static str,
    pub body: String,
}

impl Canned {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.to_string(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/html",
            body: String::new(),
        }
    }

    pub fn status_page(text: String) -> Self {
        Self {
            status: 200,
            content_type: "text/plain; charset=utf-8",
            body: text,
        }
    }

    pub fn html(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "text/html",
            body: body.to_string(),
        }
    }

    fn reply(&self) -> HttpReply {
        HttpReply::new(self.status, self.body.clone()).with_content_type(self.content_type)
    }
}

/// Status page text with `rate_limit` slots and the given limited-slot countdowns.
pub fn status_page(rate_limit: u32, limited_secs: &[u64]) -> String {
    let mut page = format!(
        "Connected as: 1234567\nCurrent time: 2024-05-01T10:00:00Z\nAnnounced endpoint: none\nRate limit: {}\n",
        rate_limit
    );
    if limited_secs.is_empty() {
        page.push_str(&format!("{} slots available now.\n", rate_limit));
    }
    for secs in limited_secs {
        page.push_str(&format!(
            "Slot available after: 2024-05-01T10:00:{:02}Z, in {} seconds.\n",
            secs, secs
        ));
    }
    page.push_str("Currently running queries (pid, space limit, time limit, start time):\n");
    page
}

pub struct FakeTransport {
    query_delay: Duration,
    status_delay: Duration,
    per_query_delay: Mutex<HashMap<String, Duration>>,
    scripts: Mutex<HashMap<String, VecDeque<Canned>>>,
    statuses: Mutex<VecDeque<Canned>>,
    calls: Mutex<Vec<String>>,
    hosts: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    status_calls: AtomicUsize,
}

impl FakeTransport {
    pub fn new(status: Canned) -> Self {
        Self {
            query_delay: Duration::from_millis(500),
            status_delay: Duration::ZERO,
            per_query_delay: Mutex::new(HashMap::new()),
            scripts: Mutex::new(HashMap::new()),
            statuses: Mutex::new(VecDeque::from([status])),
            calls: Mutex::new(Vec::new()),
            hosts: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
        }
    }

    /// Fake whose status page grants `rate_limit` slots and never limits.
    pub fn with_rate_limit(rate_limit: u32) -> Self {
        Self::new(Canned::status_page(status_page(rate_limit, &[])))
    }

    pub fn query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    /// Time every status request takes, on the tokio clock.
    pub fn status_delay(mut self, delay: Duration) -> Self {
        self.status_delay = delay;
        self
    }

    pub fn delay_for(self, query: &str, delay: Duration) -> Self {
        self.per_query_delay
            .lock()
            .unwrap()
            .insert(query.to_string(), delay);
        self
    }

    /// Replies for `query`, consumed in order; afterwards the query succeeds.
    pub fn script(self, query: &str, replies: Vec<Canned>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(query.to_string(), replies.into());
        self
    }

    /// Status pages served in order; the last one repeats.
    pub fn statuses(self, pages: Vec<Canned>) -> Self {
        *self.statuses.lock().unwrap() = pages.into();
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Host of every query call, in call order.
    pub fn hosts(&self) -> Vec<String> {
        self.hosts.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn next_reply(&self, query: &str) -> Canned {
        self.scripts
            .lock()
            .unwrap()
            .get_mut(query)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Canned::json(EMPTY_JSON))
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn post_query(
        &self,
        endpoint: &Url,
        query: &str,
        _options: &RequestOptions,
    ) -> Result<HttpReply> {
        self.calls.lock().unwrap().push(query.to_string());
        self.hosts
            .lock()
            .unwrap()
            .push(endpoint.host_str().unwrap_or_default().to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .per_query_delay
            .lock()
            .unwrap()
            .get(query)
            .copied()
            .unwrap_or(self.query_delay);
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(self.next_reply(query).reply())
    }

    async fn get_status(&self, _status_url: &Url) -> Result<HttpReply> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }
        let mut pages = self.statuses.lock().unwrap();
        let page = if pages.len() > 1 {
            pages.pop_front()
        } else {
            pages.front().cloned()
        };
        Ok(page.unwrap_or_else(|| Canned::status(404)).reply())
    }
}

pub fn endpoint(fake: &Arc<FakeTransport>, config: EndpointConfig) -> OverpassEndpoint {
    OverpassEndpoint::builder(TEST_ENDPOINT)
        .config(config)
        .transport(fake.clone())
        .build()
        .expect("endpoint builds")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
