//! 多端点管理：在多个 Overpass 实例之间分配查询。
//!
//! Multi-endpoint manager.
//!
//! [`OverpassManager`] holds several [`OverpassEndpoint`]s and routes each
//! query to one of them. Once routed, a query stays on that endpoint for its
//! whole lifetime, retries included.

mod selection;

pub use selection::SelectionPolicy;

use crate::endpoint::{parse_endpoint_url, EndpointConfig, EndpointSignals, OverpassEndpoint};
use crate::endpoints;
use crate::query::{QueryOutput, QueryRequest, QueryTarget};
use crate::transport::{HttpTransport, HttpTransportConfig, Transport};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use futures::future::join_all;
use selection::{pick_best, Candidate};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Routes queries across a fixed set of endpoints.
pub struct OverpassManager {
    endpoints: Vec<OverpassEndpoint>,
    selection: SelectionPolicy,
    cursor: AtomicUsize,
}

impl OverpassManager {
    /// Manager over the given interpreter URLs with default settings.
    pub fn new<I, S>(endpoints: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder().endpoints(endpoints).build()
    }

    pub fn builder() -> OverpassManagerBuilder {
        OverpassManagerBuilder::new()
    }

    pub fn endpoints(&self) -> &[OverpassEndpoint] {
        &self.endpoints
    }

    pub fn selection(&self) -> SelectionPolicy {
        self.selection
    }

    /// Endpoint the default policy would pick right now.
    pub fn select(&self) -> Result<&OverpassEndpoint> {
        self.select_with(self.selection)
    }

    pub fn select_with(&self, policy: SelectionPolicy) -> Result<&OverpassEndpoint> {
        let index = match policy {
            SelectionPolicy::BestAvailable => {
                let candidates: Vec<Candidate> = self
                    .endpoints
                    .iter()
                    .map(|endpoint| Candidate {
                        untouched: endpoint.is_untouched(),
                        available: endpoint.available_slots(),
                        pending: endpoint.pending(),
                    })
                    .collect();
                pick_best(&candidates)
            }
            SelectionPolicy::RoundRobin => {
                self.cursor.fetch_add(1, Ordering::Relaxed) % self.endpoints.len()
            }
            SelectionPolicy::Endpoint(index) => index,
        };
        self.endpoints.get(index).ok_or_else(|| {
            Error::configuration_with_context(
                format!(
                    "endpoint index {} out of range ({} configured)",
                    index,
                    self.endpoints.len()
                ),
                ErrorContext::new()
                    .with_field_path("selection")
                    .with_source("manager"),
            )
        })
    }

    /// Route with the manager's policy and run the query there.
    pub async fn submit(&self, request: QueryRequest) -> Result<QueryOutput> {
        self.submit_with(self.selection, request).await
    }

    pub async fn submit_with(
        &self,
        policy: SelectionPolicy,
        request: QueryRequest,
    ) -> Result<QueryOutput> {
        let endpoint = self.select_with(policy)?;
        debug!(
            endpoint = %endpoint.uri(),
            policy = ?policy,
            query_name = request.name.as_deref().unwrap_or("-"),
            "query routed"
        );
        endpoint.submit(request).await
    }

    /// Submit every request concurrently. Results come back in input order.
    ///
    /// Routing happens one request at a time, so each decision sees the
    /// queue entries of the requests routed before it.
    pub async fn submit_all<I>(&self, requests: I) -> Vec<Result<QueryOutput>>
    where
        I: IntoIterator<Item = QueryRequest>,
    {
        join_all(requests.into_iter().map(|request| self.submit(request))).await
    }

    pub fn signals(&self) -> Vec<EndpointSignals> {
        self.endpoints.iter().map(OverpassEndpoint::signals).collect()
    }
}

impl std::fmt::Debug for OverpassManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverpassManager")
            .field("endpoints", &self.endpoints)
            .field("selection", &self.selection)
            .finish()
    }
}

#[async_trait]
impl QueryTarget for OverpassManager {
    async fn submit(&self, request: QueryRequest) -> Result<QueryOutput> {
        OverpassManager::submit(self, request).await
    }
}

/// Builder for [`OverpassManager`].
///
/// Starts with [`endpoints::MAIN`] as the only endpoint. All endpoints share
/// one transport, and with it one HTTP connection pool.
pub struct OverpassManagerBuilder {
    endpoints: Vec<String>,
    selection: SelectionPolicy,
    config: Option<EndpointConfig>,
    http: Option<HttpTransportConfig>,
    transport: Option<Arc<dyn Transport>>,
}

impl OverpassManagerBuilder {
    pub fn new() -> Self {
        Self {
            endpoints: vec![endpoints::MAIN.to_string()],
            selection: SelectionPolicy::default(),
            config: None,
            http: None,
            transport: None,
        }
    }

    /// Replace the endpoint list.
    pub fn endpoints<I, S>(mut self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.endpoints = endpoints.into_iter().map(Into::into).collect();
        self
    }

    pub fn selection(mut self, policy: SelectionPolicy) -> Self {
        self.selection = policy;
        self
    }

    /// Scheduling settings applied to every endpoint.
    pub fn endpoint_config(mut self, config: EndpointConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn http_config(mut self, http: HttpTransportConfig) -> Self {
        self.http = Some(http);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<OverpassManager> {
        if self.endpoints.is_empty() {
            return Err(Error::configuration_with_context(
                "at least one endpoint is required",
                ErrorContext::new()
                    .with_field_path("endpoints")
                    .with_source("manager_builder"),
            ));
        }
        if let SelectionPolicy::Endpoint(index) = self.selection {
            if index >= self.endpoints.len() {
                return Err(Error::configuration_with_context(
                    format!(
                        "selection pins endpoint {} but only {} are configured",
                        index,
                        self.endpoints.len()
                    ),
                    ErrorContext::new()
                        .with_field_path("selection")
                        .with_source("manager_builder"),
                ));
            }
        }

        let config = self.config.unwrap_or_else(EndpointConfig::from_env);
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new(
                self.http.unwrap_or_else(HttpTransportConfig::from_env),
            )?),
        };

        let endpoints = self
            .endpoints
            .iter()
            .enumerate()
            .map(|(i, raw)| {
                parse_endpoint_url(raw)
                    .map_err(|e| match e {
                        Error::Configuration { message, context } => Error::Configuration {
                            message,
                            context: context.with_field_path(format!("endpoints[{}]", i)),
                        },
                        other => other,
                    })
                    .map(|url| OverpassEndpoint::from_parts(url, config.clone(), transport.clone()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(OverpassManager {
            endpoints,
            selection: self.selection,
            cursor: AtomicUsize::new(0),
        })
    }
}

impl Default for OverpassManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
