//! # ClearML Transport
//!
//! Executes API calls against a ClearML server on top of a host
//! [`HttpClient`](bridge_traits::HttpClient):
//!
//! - endpoint URLs resolved from the API root with an ordered query string
//! - bounded retry with backoff on network failures and retryable statuses
//! - cancellation of in-flight attempts and backoff sleeps
//! - one observer record per attempt, before sending and after receiving
//! - statuses >= 400 turned into [`RemoteRejection`] with the raw body and
//!   the parsed ClearML `meta` block
//!
//! Authentication is not handled here; `core-auth` adds the headers.

pub mod error;
pub mod trace;
pub mod transport;

pub use error::{ApiErrorMeta, RemoteRejection, Result, TransportError};
pub use trace::TracingObserver;
pub use transport::{ApiBody, ApiRequest, ApiResponse, ApiTransport};
pub use tokio_util::sync::CancellationToken;
