use super::{QueryOutput, QueryRequest};
use crate::types::OverpassJson;
use crate::{BoxStream, Result};
use async_trait::async_trait;
use bytes::Bytes;

/// Anything that accepts queries: a single endpoint or a manager.
///
/// Only [`QueryTarget::submit`] is required; the typed helpers build a request
/// with the matching output mode and unwrap the result.
#[async_trait]
pub trait QueryTarget: Send + Sync {
    async fn submit(&self, request: QueryRequest) -> Result<QueryOutput>;

    /// Raw response body.
    async fn query(&self, query: &str) -> Result<Bytes> {
        self.submit(QueryRequest::new(query)).await?.into_bytes()
    }

    async fn query_json(&self, query: &str) -> Result<OverpassJson> {
        self.submit(QueryRequest::json(query)).await?.into_json()
    }

    async fn query_xml(&self, query: &str) -> Result<String> {
        self.submit(QueryRequest::xml(query)).await?.into_text()
    }

    async fn query_csv(&self, query: &str) -> Result<String> {
        self.submit(QueryRequest::csv(query)).await?.into_text()
    }

    /// Body chunks as they arrive. The slot is released once the headers are in.
    async fn query_stream(&self, query: &str) -> Result<BoxStream<'static, Bytes>> {
        self.submit(QueryRequest::stream(query)).await?.into_stream()
    }
}
