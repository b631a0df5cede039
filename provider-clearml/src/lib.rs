//! # ClearML Provider
//!
//! Typed queue operations over an authenticated [`core_auth::Session`].
//!
//! ## Overview
//!
//! - [`QueueApi`]: create, get, update and delete, one remote call each
//! - [`ClearmlQueues`]: the ClearML implementation (`/queues.*` endpoints)
//! - [`ProviderError::NotFound`]: a rejection that means the queue does not
//!   exist, matched on status and ClearML result subcode rather than text

pub mod error;
pub mod queues;
pub mod types;

pub use error::{ProviderError, Result};
pub use queues::{ClearmlQueues, QueueApi};
pub use types::{QueueEntry, QueueRecord};
