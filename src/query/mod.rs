//! Query requests, outputs and single-attempt execution.

pub mod executor;
pub mod remark;
mod target;

pub use executor::{classify, Outcome, OutcomeKind, RequestExecutor};
pub use target::QueryTarget;

use crate::types::OverpassJson;
use crate::{BoxStream, Error, Result};
use bytes::Bytes;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How the response body is handed back to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputMode {
    #[default]
    Raw,
    Json,
    Xml,
    Csv,
    Stream,
}

impl OutputMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputMode::Raw => "raw",
            OutputMode::Json => "json",
            OutputMode::Xml => "xml",
            OutputMode::Csv => "csv",
            OutputMode::Stream => "stream",
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request settings passed through to the transport untouched.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A query as submitted to an endpoint or manager.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    /// Optional label used in logs.
    pub name: Option<String>,
    pub output: OutputMode,
    pub options: RequestOptions,
    /// Honored while queued, while waiting on a retry and during the HTTP call.
    pub cancel: Option<CancellationToken>,
}

impl QueryRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            name: None,
            output: OutputMode::Raw,
            options: RequestOptions::default(),
            cancel: None,
        }
    }

    pub fn json(query: impl Into<String>) -> Self {
        Self::new(query).with_output(OutputMode::Json)
    }

    pub fn xml(query: impl Into<String>) -> Self {
        Self::new(query).with_output(OutputMode::Xml)
    }

    pub fn csv(query: impl Into<String>) -> Self {
        Self::new(query).with_output(OutputMode::Csv)
    }

    pub fn stream(query: impl Into<String>) -> Self {
        Self::new(query).with_output(OutputMode::Stream)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

impl From<&str> for QueryRequest {
    fn from(query: &str) -> Self {
        Self::new(query)
    }
}

impl From<String> for QueryRequest {
    fn from(query: String) -> Self {
        Self::new(query)
    }
}

/// Decoded response, shaped by the request's [`OutputMode`].
pub enum QueryOutput {
    Raw(Bytes),
    Json(OverpassJson),
    Xml(String),
    Csv(String),
    Stream(BoxStream<'static, Bytes>),
}

impl QueryOutput {
    pub fn mode(&self) -> OutputMode {
        match self {
            QueryOutput::Raw(_) => OutputMode::Raw,
            QueryOutput::Json(_) => OutputMode::Json,
            QueryOutput::Xml(_) => OutputMode::Xml,
            QueryOutput::Csv(_) => OutputMode::Csv,
            QueryOutput::Stream(_) => OutputMode::Stream,
        }
    }

    fn mismatch(self, expected: OutputMode) -> Error {
        Error::UnexpectedOutput {
            expected,
            actual: self.mode(),
        }
    }

    pub fn into_json(self) -> Result<OverpassJson> {
        match self {
            QueryOutput::Json(json) => Ok(json),
            other => Err(other.mismatch(OutputMode::Json)),
        }
    }

    /// Text for xml and csv outputs, or raw bytes read as UTF-8.
    pub fn into_text(self) -> Result<String> {
        match self {
            QueryOutput::Xml(text) | QueryOutput::Csv(text) => Ok(text),
            QueryOutput::Raw(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
            other => Err(other.mismatch(OutputMode::Xml)),
        }
    }

    pub fn into_bytes(self) -> Result<Bytes> {
        match self {
            QueryOutput::Raw(bytes) => Ok(bytes),
            QueryOutput::Xml(text) | QueryOutput::Csv(text) => Ok(Bytes::from(text)),
            other => Err(other.mismatch(OutputMode::Raw)),
        }
    }

    pub fn into_stream(self) -> Result<BoxStream<'static, Bytes>> {
        match self {
            QueryOutput::Stream(stream) => Ok(stream),
            other => Err(other.mismatch(OutputMode::Stream)),
        }
    }
}

impl fmt::Debug for QueryOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryOutput::Raw(bytes) => f.debug_tuple("Raw").field(&bytes.len()).finish(),
            QueryOutput::Json(json) => f
                .debug_struct("Json")
                .field("elements", &json.elements.len())
                .finish(),
            QueryOutput::Xml(text) => f.debug_tuple("Xml").field(&text.len()).finish(),
            QueryOutput::Csv(text) => f.debug_tuple("Csv").field(&text.len()).finish(),
            QueryOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}
