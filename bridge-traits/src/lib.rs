//! # Host Bridge Traits
//!
//! Contract between the ClearML sync core and the host-provided HTTP stack.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - single-attempt async HTTP
//! - [`HttpObserver`](observer::HttpObserver) - per-attempt request/response records
//!
//! ## Implementations
//!
//! | Target | Implementation Crate |
//! |--------|---------------------|
//! | Native | `bridge-native` (reqwest) |
//! | Tests  | `mockall` mocks, in-memory fakes |
//!
//! ## Error Handling
//!
//! [`BridgeError`](error::BridgeError) only describes failures that happen
//! before a response exists. HTTP statuses are data, not errors, at this
//! layer; `core-transport` decides what a 4xx or 5xx means.
//!
//! ## Thread Safety
//!
//! Both traits require `Send + Sync` so one client can serve concurrent
//! reconciliations of independent resources.

pub mod error;
pub mod http;
pub mod observer;

pub use error::BridgeError;

pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use observer::{HttpObserver, RequestRecord, ResponseRecord};
