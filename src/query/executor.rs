//! 请求执行：单次查询尝试及其结果分类。
//!
//! Request execution logic (single-attempt).
//!
//! One call to the transport, then a deterministic classification of what came
//! back. Retry and rescheduling decisions live in the endpoint scheduler.

use super::remark::{bad_request_errors, xml_remarks};
use super::{OutputMode, QueryOutput, QueryRequest};
use crate::transport::{HttpReply, Transport};
use crate::types::OverpassJson;
use crate::utils::human_readable_bytes;
use crate::Error;
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Classified result of one attempt.
#[derive(Debug)]
pub enum Outcome {
    Success(QueryOutput),
    /// HTTP 400 with the error details extracted from the HTML page.
    BadRequest(Vec<String>),
    /// HTTP 200 whose body carries a remark.
    RuntimeError(Vec<String>),
    RateLimited,
    GatewayTimeout,
    Other {
        status: u16,
        reason: String,
    },
    /// The call never produced a usable response (network failure, unreadable
    /// or undecodable body).
    TransportFailure(Error),
}

/// Fieldless view of [`Outcome`], used for policy decisions and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    Success,
    BadRequest,
    RuntimeError,
    RateLimited,
    GatewayTimeout,
    Other,
    TransportFailure,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "success",
            OutcomeKind::BadRequest => "bad_request",
            OutcomeKind::RuntimeError => "runtime_error",
            OutcomeKind::RateLimited => "rate_limited",
            OutcomeKind::GatewayTimeout => "gateway_timeout",
            OutcomeKind::Other => "other",
            OutcomeKind::TransportFailure => "transport_failure",
        }
    }
}

impl Outcome {
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Outcome::Success(_) => OutcomeKind::Success,
            Outcome::BadRequest(_) => OutcomeKind::BadRequest,
            Outcome::RuntimeError(_) => OutcomeKind::RuntimeError,
            Outcome::RateLimited => OutcomeKind::RateLimited,
            Outcome::GatewayTimeout => OutcomeKind::GatewayTimeout,
            Outcome::Other { .. } => OutcomeKind::Other,
            Outcome::TransportFailure(_) => OutcomeKind::TransportFailure,
        }
    }

    /// Convert a failed outcome into the error surfaced to the caller.
    ///
    /// Returns `Ok(output)` for [`Outcome::Success`].
    pub fn into_result(self, query: &str) -> crate::Result<QueryOutput> {
        match self {
            Outcome::Success(output) => Ok(output),
            Outcome::BadRequest(errors) => Err(Error::BadRequest {
                query: query.to_string(),
                errors,
            }),
            Outcome::RuntimeError(errors) => Err(Error::QueryRuntime { errors }),
            Outcome::RateLimited => Err(Error::RateLimited { status: None }),
            Outcome::GatewayTimeout => Err(Error::GatewayTimeout),
            Outcome::Other { status, reason } => Err(Error::Remote { status, reason }),
            Outcome::TransportFailure(e) => Err(e),
        }
    }
}

/// Runs one query against one endpoint. Stateless between calls.
#[derive(Clone)]
pub struct RequestExecutor {
    transport: Arc<dyn Transport>,
}

impl RequestExecutor {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    pub async fn execute(&self, endpoint: &Url, request: &QueryRequest) -> Outcome {
        match self
            .transport
            .post_query(endpoint, &request.query, &request.options)
            .await
        {
            Ok(reply) => classify(reply, request.output).await,
            Err(e) => Outcome::TransportFailure(e),
        }
    }
}

/// Classify a raw reply. Deterministic: the same reply always maps to the same outcome.
pub async fn classify(reply: HttpReply, output: OutputMode) -> Outcome {
    if !reply.is_success() {
        return match reply.status {
            400 => match reply.text().await {
                Ok(html) => Outcome::BadRequest(bad_request_errors(&html)),
                Err(e) => Outcome::TransportFailure(e),
            },
            429 => Outcome::RateLimited,
            504 => Outcome::GatewayTimeout,
            status => Outcome::Other {
                status,
                reason: reply.reason_or_default(),
            },
        };
    }

    if let Some(len) = reply.content_length {
        debug!(payload = %human_readable_bytes(len), output = %output, "response received");
    }

    match output {
        OutputMode::Stream => Outcome::Success(QueryOutput::Stream(reply.into_stream())),
        OutputMode::Raw => match reply.bytes().await {
            Ok(bytes) => Outcome::Success(QueryOutput::Raw(bytes)),
            Err(e) => Outcome::TransportFailure(e),
        },
        OutputMode::Csv => match reply.text().await {
            Ok(text) => Outcome::Success(QueryOutput::Csv(text)),
            Err(e) => Outcome::TransportFailure(e),
        },
        OutputMode::Xml => match reply.text().await {
            Ok(text) => {
                let remarks = xml_remarks(&text);
                if remarks.is_empty() {
                    Outcome::Success(QueryOutput::Xml(text))
                } else {
                    Outcome::RuntimeError(remarks)
                }
            }
            Err(e) => Outcome::TransportFailure(e),
        },
        OutputMode::Json => {
            let bytes = match reply.bytes().await {
                Ok(bytes) => bytes,
                Err(e) => return Outcome::TransportFailure(e),
            };
            match serde_json::from_slice::<OverpassJson>(&bytes) {
                Ok(json) => match json.runtime_remark() {
                    Some(remark) => Outcome::RuntimeError(vec![remark.to_string()]),
                    None => Outcome::Success(QueryOutput::Json(json)),
                },
                Err(e) => Outcome::TransportFailure(Error::Serialization(e)),
            }
        }
    }
}
