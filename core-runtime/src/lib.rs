//! # Core Runtime Module
//!
//! Ambient infrastructure shared by every ClearML sync crate:
//! - Validated client configuration with environment defaults
//! - Logging and tracing bootstrap
//!
//! Nothing in here talks to the network; it only decides how the layers
//! above are configured and how they report what they do.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, Result};
