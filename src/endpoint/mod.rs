//! 端点调度：按服务器公布的容量排队、准入与重试查询。
//!
//! Per-endpoint query scheduler.
//!
//! An [`OverpassEndpoint`] owns a FIFO queue of submitted queries and admits
//! them only while the endpoint's status page leaves a free slot. Rate-limited
//! queries give their slot back and wait for capacity; gateway timeouts keep
//! their slot, pause, and are sent again.
//!
//! | Item | Description |
//! |------|-------------|
//! | [`OverpassEndpoint`] | Cloneable handle; all clones share one queue |
//! | [`EndpointConfig`] | Poll interval, retry switches, local slot ceiling |
//! | [`QueuedQuery`] / [`QueryState`] | Queue entries and their lifecycle |
//! | [`EndpointSignals`] | Facts-only snapshot for observability |
//!
//! Every transition of a query, and every capacity change, happens under one
//! mutex; waiters are woken through a [`Notify`] and also re-check on a timer.

mod builder;
mod config;
mod policy;
mod signals;
mod state;

pub use builder::OverpassEndpointBuilder;
pub use config::EndpointConfig;
pub use signals::EndpointSignals;
pub use state::{QueryState, QueuedQuery};

pub(crate) use builder::parse_endpoint_url;

use crate::query::{QueryOutput, QueryRequest, QueryTarget, RequestExecutor};
use crate::status::{self, SlotCapacity, StatusState};
use crate::transport::Transport;
use crate::{Error, Result};
use async_trait::async_trait;
use policy::{Attempts, Decision, RetryPolicy};
use state::{EndpointState, RefreshTimer};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::{Notify, OnceCell};
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use url::Url;
use uuid::Uuid;

/// Scheduler for a single Overpass interpreter URL.
#[derive(Clone)]
pub struct OverpassEndpoint {
    inner: Arc<Inner>,
}

struct Inner {
    uri: Url,
    status_url: Url,
    config: EndpointConfig,
    policy: RetryPolicy,
    executor: RequestExecutor,
    state: Mutex<EndpointState>,
    changed: Notify,
    init: OnceCell<()>,
}

impl OverpassEndpoint {
    /// Endpoint with environment-derived config and the default HTTP transport.
    pub fn new(uri: &str) -> Result<Self> {
        Self::builder(uri).build()
    }

    pub fn builder(uri: impl Into<String>) -> OverpassEndpointBuilder {
        OverpassEndpointBuilder::new(uri)
    }

    pub(crate) fn from_parts(uri: Url, config: EndpointConfig, transport: Arc<dyn Transport>) -> Self {
        let status_url = status::status_url(&uri);
        Self {
            inner: Arc::new(Inner {
                uri,
                status_url,
                policy: RetryPolicy::new(&config),
                config,
                executor: RequestExecutor::new(transport),
                state: Mutex::new(EndpointState::default()),
                changed: Notify::new(),
                init: OnceCell::new(),
            }),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.inner.uri
    }

    pub fn status_url(&self) -> &Url {
        &self.inner.status_url
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.inner.config
    }

    /// Current capacity knowledge.
    pub fn status(&self) -> StatusState {
        self.inner.lock().snapshot.clone()
    }

    /// Free slots right now, after the local ceiling is applied.
    pub fn available_slots(&self) -> SlotCapacity {
        self.inner
            .lock()
            .available_slots(Instant::now(), self.inner.config.max_slots)
    }

    /// True until the first submission or status read.
    pub fn is_untouched(&self) -> bool {
        self.inner.lock().is_untouched()
    }

    /// Entries still in the queue, in any non-terminal state.
    pub fn pending(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Copy of the queue in submission order.
    pub fn queue(&self) -> Vec<QueuedQuery> {
        self.inner.lock().queue.iter().cloned().collect()
    }

    pub fn signals(&self) -> EndpointSignals {
        let st = self.inner.lock();
        let now = Instant::now();
        EndpointSignals {
            endpoint: self.inner.uri.to_string(),
            status: st.snapshot.label(),
            rate_limit: st.snapshot.snapshot().map(|s| s.status.rate_limit),
            available: st.available_slots(now, self.inner.config.max_slots),
            running: st.running_count,
            admitted_total: st.admitted_count,
            queued: st.count(QueryState::Queued),
            in_flight: st.count(QueryState::Admitted) + st.count(QueryState::InFlight),
            rate_limited_waiting: st.count(QueryState::RateLimitedWait),
            gateway_timeout_waiting: st.count(QueryState::GatewayTimeoutWait),
            refresh_pending: st.refresh_timer.is_some(),
        }
    }

    /// Re-read the status page now. A no-op once the status is known to be unavailable.
    pub async fn refresh_status(&self) {
        self.inner.refresh().await;
    }

    /// Queue a query, wait for a slot, run it, and retry recoverable failures.
    ///
    /// The query is enqueued on the first poll of the returned future, so
    /// futures polled in order keep their order in the queue. Dropping the
    /// future removes the entry and frees any slot it held.
    pub async fn submit(&self, request: QueryRequest) -> Result<QueryOutput> {
        let ticket = Ticket::issue(&self.inner, request.name.clone());
        let span = info_span!(
            "overpass_query",
            endpoint = %self.inner.uri,
            query_id = ticket.id,
            query_name = request.name.as_deref().unwrap_or("-"),
            request_id = %Uuid::new_v4(),
        );
        self.inner
            .drive(ticket.id, &request)
            .instrument(span)
            .await
    }
}

impl std::fmt::Debug for OverpassEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverpassEndpoint")
            .field("uri", &self.inner.uri.as_str())
            .field("config", &self.inner.config)
            .finish()
    }
}

#[async_trait]
impl QueryTarget for OverpassEndpoint {
    async fn submit(&self, request: QueryRequest) -> Result<QueryOutput> {
        OverpassEndpoint::submit(self, request).await
    }
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, EndpointState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn drive(self: &Arc<Self>, id: u64, request: &QueryRequest) -> Result<QueryOutput> {
        let cancel = request.cancel.as_ref();
        debug!(state = %QueryState::Queued, "query queued");

        self.ensure_initialized(cancel).await?;
        self.wait_for_slot(id, cancel).await?;
        debug!(state = %QueryState::Admitted, "query admitted");
        self.set_state(id, QueryState::InFlight);

        let started = Instant::now();
        let mut attempts = Attempts::default();
        loop {
            let outcome = tokio::select! {
                outcome = self.executor.execute(&self.uri, request) => outcome,
                _ = cancelled(cancel) => return Err(Error::Cancelled),
            };
            let kind = outcome.kind();
            let decision = self.policy.decide(kind, &attempts);

            match decision {
                Decision::Complete => {
                    self.finish(id, QueryState::Completed);
                    self.refresh_or_cancel(cancel).await?;
                    info!(
                        state = %QueryState::Completed,
                        attempts = attempts.total() + 1,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "query completed"
                    );
                    return outcome.into_result(&request.query);
                }
                Decision::WaitForCapacity => {
                    attempts.rate_limited += 1;
                    self.set_state(id, QueryState::RateLimitedWait);
                    self.refresh_or_cancel(cancel).await?;
                    let backoff = self.rate_limit_backoff();
                    info!(
                        state = %QueryState::RateLimitedWait,
                        retries = attempts.rate_limited,
                        backoff_ms = backoff.as_millis() as u64,
                        "rate limited, waiting for capacity"
                    );
                    // The server refused even if the snapshot shows room.
                    tokio::select! {
                        _ = sleep(backoff) => {}
                        _ = cancelled(cancel) => return Err(Error::Cancelled),
                    }
                    self.wait_for_slot(id, cancel).await?;
                    debug!(state = %QueryState::InFlight, "capacity regained, resending");
                }
                Decision::Retry { delay } => {
                    attempts.gateway_timeouts += 1;
                    self.set_state(id, QueryState::GatewayTimeoutWait);
                    self.refresh_or_cancel(cancel).await?;
                    info!(
                        state = %QueryState::GatewayTimeoutWait,
                        retries = attempts.gateway_timeouts,
                        pause_ms = delay.as_millis() as u64,
                        "gateway timeout, pausing before resend"
                    );
                    tokio::select! {
                        _ = sleep(delay) => {}
                        _ = cancelled(cancel) => return Err(Error::Cancelled),
                    }
                    self.set_state(id, QueryState::InFlight);
                }
                Decision::Fail => {
                    self.finish(id, QueryState::Failed);
                    self.refresh_or_cancel(cancel).await?;
                    let err = match outcome.into_result(&request.query) {
                        Ok(output) => return Ok(output),
                        Err(Error::RateLimited { .. }) => Error::RateLimited {
                            status: self.current_status().map(Box::new),
                        },
                        Err(e) => e,
                    };
                    warn!(
                        state = %QueryState::Failed,
                        outcome = kind.as_str(),
                        error_class = err.class(),
                        attempts = attempts.total() + 1,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "query failed"
                    );
                    return Err(err);
                }
            }
        }
    }

    /// First caller reads the status page; everyone else waits for that read.
    async fn ensure_initialized(self: &Arc<Self>, cancel: Option<&CancellationToken>) -> Result<()> {
        tokio::select! {
            _ = self.init.get_or_init(|| async {
                debug!(status_url = %self.status_url, "initializing endpoint status");
                self.refresh().await;
            }) => Ok(()),
            _ = cancelled(cancel) => Err(Error::Cancelled),
        }
    }

    async fn wait_for_slot(&self, id: u64, cancel: Option<&CancellationToken>) -> Result<()> {
        let max_slots = self.config.max_slots;
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let admitted = self.lock().try_take_slot(id, Instant::now(), max_slots);
            if admitted {
                // The head of the line moved; the next entry may fit as well.
                self.changed.notify_waiters();
                return Ok(());
            }

            tokio::select! {
                _ = &mut notified => {}
                _ = sleep(self.config.poll_interval) => {}
                _ = cancelled(cancel) => return Err(Error::Cancelled),
            }
        }
    }

    fn set_state(&self, id: u64, state: QueryState) {
        self.lock().set_state(id, state);
        self.changed.notify_waiters();
    }

    fn finish(&self, id: u64, terminal: QueryState) {
        let removed = self.lock().finish(id, terminal);
        if removed.is_some() {
            self.changed.notify_waiters();
        }
    }

    /// Pause before a rate-limited query competes for a slot again. Without a
    /// status page there is no capacity signal, so the gateway-timeout pause
    /// applies instead of the poll interval.
    fn rate_limit_backoff(&self) -> Duration {
        match self.lock().snapshot {
            StatusState::Unavailable => self.config.gateway_timeout_pause,
            _ => self.config.poll_interval,
        }
    }

    async fn refresh_or_cancel(self: &Arc<Self>, cancel: Option<&CancellationToken>) -> Result<()> {
        tokio::select! {
            _ = self.refresh() => Ok(()),
            _ = cancelled(cancel) => Err(Error::Cancelled),
        }
    }

    fn current_status(&self) -> Option<status::ApiStatus> {
        self.lock().snapshot.snapshot().map(|s| s.status.clone())
    }

    /// Re-read capacity and re-arm the deferred refresh.
    ///
    /// `Unavailable` is permanent: once the status page failed, it is never
    /// requested again and capacity stays open-ended.
    async fn refresh(self: &Arc<Self>) {
        let unavailable = matches!(self.lock().snapshot, StatusState::Unavailable);
        if unavailable {
            return;
        }
        let next = status::refresh(self.executor.transport().as_ref(), &self.status_url).await;
        {
            let mut st = self.lock();
            st.snapshot = next;
            self.rearm_refresh_timer(&mut st);
        }
        self.changed.notify_waiters();
    }

    /// Keep at most one deferred refresh, aimed just after the shortest
    /// rate-limit countdown, and only while someone is waiting for a slot.
    fn rearm_refresh_timer(self: &Arc<Self>, st: &mut EndpointState) {
        if let Some(timer) = st.refresh_timer.take() {
            timer.handle.abort();
        }
        let Some(release) = st.snapshot.snapshot().and_then(|s| s.earliest_release()) else {
            return;
        };
        if !st.has_waiting() {
            return;
        }

        let delay = release + self.config.refresh_margin;
        st.timer_generation += 1;
        let generation = st.timer_generation;
        let weak: Weak<Inner> = Arc::downgrade(self);
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            {
                let mut st = inner.lock();
                let current = st.refresh_timer.as_ref().map(|timer| timer.generation);
                if current != Some(generation) {
                    return;
                }
                st.refresh_timer = None;
            }
            debug!(endpoint = %inner.uri, "deferred status refresh");
            inner.refresh().await;
        });
        debug!(
            endpoint = %self.uri,
            delay_ms = delay.as_millis() as u64,
            "status refresh scheduled"
        );
        st.refresh_timer = Some(RefreshTimer { generation, handle });
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let st = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(timer) = st.refresh_timer.take() {
            timer.handle.abort();
        }
    }
}

/// Queue membership of one submission. Dropping it removes the entry and
/// releases its slot; a no-op once the query already finished.
struct Ticket {
    inner: Arc<Inner>,
    id: u64,
}

impl Ticket {
    fn issue(inner: &Arc<Inner>, name: Option<String>) -> Self {
        let id = inner.lock().enqueue(name);
        Self {
            inner: Arc::clone(inner),
            id,
        }
    }
}

impl Drop for Ticket {
    fn drop(&mut self) {
        let abandoned = self.inner.lock().finish(self.id, QueryState::Failed);
        if let Some(entry) = abandoned {
            debug!(
                endpoint = %self.inner.uri,
                query_id = entry.id,
                "query abandoned, entry removed"
            );
            self.inner.changed.notify_waiters();
        }
    }
}

/// Resolves when `token` is cancelled; never resolves without one.
async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}
