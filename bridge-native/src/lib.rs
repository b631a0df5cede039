//! # Native Bridge Implementations
//!
//! Default bridge implementations for native hosts (macOS, Windows, Linux):
//! - `HttpClient` using `reqwest` with a pooled, rustls-backed connection set
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_native::{NativeHttpSettings, ReqwestHttpClient};
//! use std::sync::Arc;
//!
//! let http_client = Arc::new(ReqwestHttpClient::try_new(NativeHttpSettings::default())?);
//! ```

mod http;

pub use http::{NativeHttpSettings, ReqwestHttpClient};
