use crate::query::OutputMode;
use crate::status::ApiStatus;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path or configuration key that caused the error (e.g., "endpoints[1]", "max_slots")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "manager_builder", "status_probe")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for Overpass query orchestration.
///
/// `RateLimited` and `GatewayTimeout` are normally absorbed by the endpoint
/// scheduler; they only reach callers when retries are disabled or capped.
#[derive(Debug, Error)]
pub enum Error {
    /// The server rejected the query text itself (HTTP 400).
    #[error("{}", format_bad_request(.query, .errors))]
    BadRequest { query: String, errors: Vec<String> },

    /// The query was accepted but the server gave up while producing output,
    /// reported through a `remark` inside a 200 response.
    #[error("Query runtime error: {}", .errors.join("; "))]
    QueryRuntime { errors: Vec<String> },

    #[error("429 Rate limit exceeded")]
    RateLimited { status: Option<Box<ApiStatus>> },

    #[error("504 Gateway timeout")]
    GatewayTimeout,

    #[error("API status unavailable: {message}")]
    StatusUnavailable { message: String },

    #[error("Network transport error: {0}")]
    Transport(#[from] crate::transport::TransportError),

    #[error("Remote error: HTTP {status} {reason}")]
    Remote { status: u16, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Query cancelled")]
    Cancelled,

    #[error("Unexpected query output: expected {expected}, got {actual}")]
    UnexpectedOutput {
        expected: OutputMode,
        actual: OutputMode,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_bad_request(query: &str, errors: &[String]) -> String {
    format!(
        "400 Bad Request\nErrors:\n  {}\nQuery:\n  {}",
        errors.join("\n  "),
        query.replace('\n', "\n  ")
    )
}

impl Error {
    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    pub fn status_unavailable(msg: impl Into<String>) -> Self {
        Error::StatusUnavailable {
            message: msg.into(),
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Stable snake_case label, used as a structured logging field.
    pub fn class(&self) -> &'static str {
        match self {
            Error::BadRequest { .. } => "bad_request",
            Error::QueryRuntime { .. } => "runtime_error",
            Error::RateLimited { .. } => "rate_limited",
            Error::GatewayTimeout => "gateway_timeout",
            Error::StatusUnavailable { .. } => "status_unavailable",
            Error::Transport(_) => "transport",
            Error::Remote { .. } => "remote",
            Error::Serialization(_) => "serialization",
            Error::Configuration { .. } => "configuration",
            Error::Cancelled => "cancelled",
            Error::UnexpectedOutput { .. } => "unexpected_output",
        }
    }

    /// Whether the scheduler would retry this condition on its own.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::RateLimited { .. } | Error::GatewayTimeout)
    }

    /// Error fragments extracted from the server response, if any.
    pub fn server_messages(&self) -> &[String] {
        match self {
            Error::BadRequest { errors, .. } | Error::QueryRuntime { errors } => errors,
            _ => &[],
        }
    }
}
