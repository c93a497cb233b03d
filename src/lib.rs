//! # overpass-lib-rust
//!
//! Overpass API 的异步查询运行时：按端点公布的容量排队，自动等待限流与网关超时。
//!
//! Async query runtime for the OpenStreetMap Overpass API. Queries are queued
//! per endpoint and admitted only while the endpoint's status page reports a
//! free slot, so clients stay within their rate limit instead of hammering the
//! server with requests it will reject.
//!
//! ## Core Behavior
//!
//! - **Capacity-Aware**: admission follows `/api/status` (rate limit, running and limited slots)
//! - **FIFO**: per endpoint, queries are admitted in submission order
//! - **Self-Healing**: 429 responses wait for capacity, 504 responses pause and resend
//! - **Typed Failures**: syntax errors, runtime remarks and transport failures are distinct [`Error`] variants
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use overpass_lib_rust::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> overpass_lib_rust::Result<()> {
//!     let manager = OverpassManager::builder()
//!         .endpoints([overpass_lib_rust::endpoints::MAIN, overpass_lib_rust::endpoints::KUMI])
//!         .build()?;
//!
//!     let doc = manager
//!         .query_json("[out:json];node[amenity=drinking_water](51.50,-0.13,51.51,-0.12);out;")
//!         .await?;
//!     println!("{} fountains", doc.nodes().count());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`endpoint`] | Per-endpoint scheduler: queue, admission, retries |
//! | [`manager`] | Routing across several endpoints |
//! | [`query`] | Requests, outputs, single-attempt execution and classification |
//! | [`status`] | Status page parsing and capacity snapshots |
//! | [`transport`] | HTTP seam and the reqwest-based implementation |
//! | [`types`] | `[out:json]` document model |
//! | [`endpoints`] | Well-known public instances |

pub mod endpoint;
pub mod endpoints;
pub mod manager;
pub mod prelude;
pub mod query;
pub mod status;
pub mod transport;
pub mod types;
pub mod utils;

// Re-export main types for convenience
pub use endpoint::{
    EndpointConfig, EndpointSignals, OverpassEndpoint, OverpassEndpointBuilder, QueryState,
    QueuedQuery,
};
pub use manager::{OverpassManager, OverpassManagerBuilder, SelectionPolicy};
pub use query::{OutputMode, QueryOutput, QueryRequest, QueryTarget, RequestOptions};
pub use status::{ApiStatus, SlotCapacity, StatusState};
pub use transport::{HttpReply, HttpTransport, HttpTransportConfig, Transport};
pub use types::{Element, OverpassJson};

use futures::Stream;
use std::pin::Pin;

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// A unified pinned, boxed stream that emits `Result<T>`
pub type BoxStream<'a, T> = Pin<Box<dyn Stream<Item = Result<T>> + Send + 'a>>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
