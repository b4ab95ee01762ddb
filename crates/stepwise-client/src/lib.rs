#![forbid(unsafe_code)]

//! HTTP access to the trace-generation backend.
//!
//! [`TraceSource`] is the seam the player talks to; [`HttpTraceClient`] is
//! the blocking `reqwest` implementation. Calls block, so hosts run them as
//! background tasks.

pub mod api;
pub mod config;
pub mod error;
pub mod http;

pub use api::{AlgorithmInfo, AlgorithmSummary, ExampleInput, TraceRequest};
pub use config::ClientConfig;
pub use error::ClientError;
pub use http::HttpTraceClient;

use stepwise_core::trace::TraceDocument;

/// Anything that can produce traces and algorithm metadata.
pub trait TraceSource: Send + Sync {
    /// Generate a trace for `request`.
    fn fetch_trace(&self, request: &TraceRequest) -> Result<TraceDocument, ClientError>;

    /// List the algorithms the backend can trace.
    fn list_algorithms(&self) -> Result<Vec<AlgorithmSummary>, ClientError>;

    /// Fetch the markdown documentation for one algorithm.
    fn algorithm_info(&self, name: &str) -> Result<AlgorithmInfo, ClientError>;
}
