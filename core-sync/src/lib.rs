//! # Queue Reconciliation
//!
//! Maps create, read, update and delete intents for one ClearML queue onto
//! the [`provider_clearml::QueueApi`] and reports back what the server holds.
//!
//! ## Components
//!
//! - **State** (`state`): `QueueSpec` (desired), `ObservedQueue` (confirmed),
//!   `ResourceState` and `DeleteOutcome`
//! - **Diff** (`diff`): which mutable attributes differ between the two
//! - **Reconciler** (`reconciler`): the create/read/update/delete transitions,
//!   each mutation followed by a confirmation read
//!
//! A delete of a queue the server no longer knows is a success. A create
//! whose confirmation read fails returns the new identifier inside
//! [`SyncError::Unconfirmed`].

pub mod diff;
pub mod error;
pub mod reconciler;
pub mod state;

pub use diff::{Change, QueueDiff};
pub use error::{Result, SyncError};
pub use reconciler::{ConfirmPolicy, ConvergeAction, Convergence, QueueReconciler};
pub use state::{DeleteOutcome, ObservedQueue, QueueSpec, ResourceState};
