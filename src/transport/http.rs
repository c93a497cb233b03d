use super::{HttpReply, Transport};
use crate::query::RequestOptions;
use crate::Result;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Proxy;
use std::env;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default `User-Agent` sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("overpass-lib-rust/", env!("CARGO_PKG_VERSION"));

/// Connection settings for [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub proxy_url: Option<String>,
    /// Some public mirrors run with expired certificates.
    pub accept_invalid_certs: bool,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(180),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pool_max_idle_per_host: 8,
            pool_idle_timeout: Duration::from_secs(90),
            proxy_url: None,
            accept_invalid_certs: false,
        }
    }
}

impl HttpTransportConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: env::var("OVERPASS_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            user_agent: env::var("OVERPASS_USER_AGENT")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.user_agent),
            pool_max_idle_per_host: env::var("OVERPASS_HTTP_POOL_MAX_IDLE_PER_HOST")
                .ok()
                .and_then(|s| s.parse::<usize>().ok())
                .unwrap_or(defaults.pool_max_idle_per_host),
            pool_idle_timeout: env::var("OVERPASS_HTTP_POOL_IDLE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.pool_idle_timeout),
            proxy_url: env::var("OVERPASS_PROXY_URL").ok(),
            accept_invalid_certs: defaults.accept_invalid_certs,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy_url = Some(proxy_url.into());
        self
    }

    pub fn accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// reqwest-backed [`Transport`].
pub struct HttpTransport {
    client: reqwest::Client,
    config: HttpTransportConfig,
}

impl HttpTransport {
    pub fn new(config: HttpTransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(Some(config.pool_idle_timeout))
            .danger_accept_invalid_certs(config.accept_invalid_certs);

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                crate::Error::configuration_with_context(
                    format!("invalid proxy url: {}", e),
                    crate::ErrorContext::new()
                        .with_field_path("proxy_url")
                        .with_source("http_transport"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| crate::Error::Transport(TransportError::Other(e.to_string())))?;

        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(HttpTransportConfig::from_env())
    }

    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post_query(
        &self,
        endpoint: &Url,
        query: &str,
        options: &RequestOptions,
    ) -> Result<HttpReply> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("data", query)
            .finish();

        let user_agent = options
            .user_agent
            .as_deref()
            .unwrap_or(&self.config.user_agent);

        let mut req = self
            .client
            .post(endpoint.clone())
            .header(ACCEPT, "*/*")
            .header(USER_AGENT, user_agent)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);

        if let Some(timeout) = options.timeout {
            req = req.timeout(timeout);
        }
        for (name, value) in &options.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        debug!(endpoint = %endpoint, query_len = query.len(), "posting overpass query");

        let resp = req
            .send()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;
        Ok(HttpReply::from_reqwest(resp))
    }

    async fn get_status(&self, status_url: &Url) -> Result<HttpReply> {
        let resp = self
            .client
            .get(status_url.clone())
            .header(USER_AGENT, self.config.user_agent.as_str())
            .send()
            .await
            .map_err(|e| crate::Error::Transport(TransportError::Http(e)))?;
        Ok(HttpReply::from_reqwest(resp))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
