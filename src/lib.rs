//! Workspace entry crate.
//!
//! Hosts depend on `clearml-sync` and enable the `native` feature (on by
//! default) to get the reqwest-backed [`QueueService`] without wiring the
//! individual workspace crates themselves.

#[cfg(feature = "native")]
pub use core_service::{
    init_logging, CancellationToken, ClientConfig, ConfirmPolicy, ConvergeAction, Convergence,
    DeleteOutcome, LogFormat, LogLevel, LoggingConfig, ObservedQueue, QueueDiff, QueueService,
    QueueSpec, ResourceState, ServiceDependencies, ServiceError, SyncError,
};
