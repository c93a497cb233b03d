//! Common imports for applications.
//!
//! ```rust
//! use overpass_lib_rust::prelude::*;
//! ```

pub use crate::endpoint::{EndpointConfig, OverpassEndpoint};
pub use crate::manager::{OverpassManager, SelectionPolicy};
pub use crate::query::{OutputMode, QueryOutput, QueryRequest, QueryTarget, RequestOptions};
pub use crate::types::{Element, OverpassJson};
pub use crate::{Error, Result};
