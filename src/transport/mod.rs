//! HTTP transport seam.
//!
//! The scheduler only ever talks to an endpoint through [`Transport`], so the
//! reqwest-backed [`HttpTransport`] can be swapped for an in-process fake in tests.

pub mod http;

pub use http::{HttpTransport, HttpTransportConfig, TransportError};

use crate::query::RequestOptions;
use crate::{BoxStream, Result};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt};
use url::Url;

/// The two calls an endpoint needs: run a query, read the status page.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `query` to the interpreter at `endpoint`.
    async fn post_query(
        &self,
        endpoint: &Url,
        query: &str,
        options: &RequestOptions,
    ) -> Result<HttpReply>;

    /// GET the plain-text status resource.
    async fn get_status(&self, status_url: &Url) -> Result<HttpReply>;
}

/// A response whose body has not been read yet.
pub struct HttpReply {
    pub status: u16,
    pub reason: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    body: BoxStream<'static, Bytes>,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        let body: Bytes = body.into();
        let content_length = Some(body.len() as u64);
        Self {
            status,
            reason: None,
            content_type: None,
            content_length,
            body: Box::pin(futures::stream::once(async move { Ok(body) })),
        }
    }

    pub fn streaming(status: u16, body: BoxStream<'static, Bytes>) -> Self {
        Self {
            status,
            reason: None,
            content_type: None,
            content_length: None,
            body,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Media type without parameters, lowercased (`text/plain; charset=utf-8` -> `text/plain`).
    pub fn media_type(&self) -> Option<String> {
        self.content_type
            .as_deref()
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
    }

    pub fn reason_or_default(&self) -> String {
        self.reason.clone().unwrap_or_else(|| {
            reqwest::StatusCode::from_u16(self.status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("Unknown")
                .to_string()
        })
    }

    pub async fn bytes(self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        let mut body = self.body;
        while let Some(chunk) = body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(buf.freeze())
    }

    pub async fn text(self) -> Result<String> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    pub fn into_stream(self) -> BoxStream<'static, Bytes> {
        self.body
    }

    pub(crate) fn from_reqwest(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let content_length = resp.content_length();
        let body: BoxStream<'static, Bytes> = Box::pin(
            resp.bytes_stream()
                .map_err(|e| crate::Error::Transport(TransportError::Http(e))),
        );
        Self {
            status: status.as_u16(),
            reason: status.canonical_reason().map(|s| s.to_string()),
            content_type,
            content_length,
            body,
        }
    }
}

impl std::fmt::Debug for HttpReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpReply")
            .field("status", &self.status)
            .field("reason", &self.reason)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}
