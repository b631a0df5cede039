//! # Queue Reconciler
//!
//! Drives a [`QueueApi`] so that one remote queue matches a [`QueueSpec`].
//!
//! Every mutation is followed by a confirmation read; the observed state
//! returned to the caller always comes from the server. Operations are
//! sequential and hold no state between calls, so one reconciler may serve
//! many queues concurrently.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{QueueReconciler, QueueSpec};
//!
//! let reconciler = QueueReconciler::new(queue_api);
//! let spec = QueueSpec::new("gpu-a100", ["team:ml"])?;
//!
//! let queue = reconciler.create(&spec, &cancel).await?;
//! let queue = reconciler.update(&queue.id, &spec, &cancel).await?;
//! reconciler.delete(&queue.id, &cancel).await?;
//! ```

use provider_clearml::{QueueApi, QueueRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::diff::QueueDiff;
use crate::error::{Result, SyncError};
use crate::state::{DeleteOutcome, ObservedQueue, QueueSpec, ResourceState};

/// Retry budget for the read that confirms a create or update.
///
/// The default is a single read. With [`ConfirmPolicy::eventual`] only a
/// not-found answer is retried: it is what a lagging read replica returns
/// right after a write. Any other error ends the confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPolicy {
    /// Reads attempted, including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self::single_read()
    }
}

impl ConfirmPolicy {
    /// Single read, no retry
    pub fn single_read() -> Self {
        Self {
            max_attempts: 1,
            ..Self::eventual()
        }
    }

    /// Up to three reads, 200ms apart and doubling, for eventually
    /// consistent deployments
    pub fn eventual() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// What [`QueueReconciler::converge`] had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergeAction {
    Created,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Convergence {
    pub action: ConvergeAction,
    pub queue: ObservedQueue,
}

pub struct QueueReconciler {
    api: Arc<dyn QueueApi>,
    confirm_policy: ConfirmPolicy,
}

impl QueueReconciler {
    pub fn new(api: Arc<dyn QueueApi>) -> Self {
        Self {
            api,
            confirm_policy: ConfirmPolicy::default(),
        }
    }

    pub fn with_confirm_policy(mut self, policy: ConfirmPolicy) -> Self {
        self.confirm_policy = policy;
        self
    }

    pub fn confirm_policy(&self) -> &ConfirmPolicy {
        &self.confirm_policy
    }

    /// Absent → Present.
    ///
    /// # Errors
    ///
    /// When the create succeeds but the confirmation read does not, returns
    /// [`SyncError::Unconfirmed`] carrying the new identifier. Recover with
    /// [`QueueReconciler::read`] rather than creating again.
    #[instrument(skip(self, spec, cancel), fields(name = %spec.name()))]
    pub async fn create(&self, spec: &QueueSpec, cancel: &CancellationToken) -> Result<ObservedQueue> {
        let id = self
            .api
            .create_queue(spec.name(), spec.tags(), cancel)
            .await
            .map_err(SyncError::from_create)?;

        match self.confirm(&id, cancel).await {
            Ok(record) => {
                info!(id = %id, "Queue created");
                Ok(record.into())
            }
            Err(error) => {
                warn!(id = %id, error = %error, "Queue created but confirmation read failed");
                Err(SyncError::Unconfirmed {
                    id,
                    source: Box::new(error),
                })
            }
        }
    }

    /// Present → Present: fetch the queue as the server has it.
    #[instrument(skip(self, cancel))]
    pub async fn read(&self, id: &str, cancel: &CancellationToken) -> Result<ObservedQueue> {
        require_id(id)?;

        self.api
            .get_queue(id, cancel)
            .await
            .map(ObservedQueue::from)
            .map_err(|e| SyncError::from_provider(e, id))
    }

    /// Like [`read`](Self::read), but a missing queue is `Absent` rather than
    /// an error.
    pub async fn observe(&self, id: &str, cancel: &CancellationToken) -> Result<ResourceState> {
        match self.read(id, cancel).await {
            Ok(queue) => Ok(ResourceState::Present(queue)),
            Err(SyncError::NotFound { .. }) => {
                debug!(id, "Queue no longer exists");
                Ok(ResourceState::Absent)
            }
            Err(error) => Err(error),
        }
    }

    /// Adopt an existing queue by identifier alone.
    #[instrument(skip(self, cancel))]
    pub async fn import(&self, id: &str, cancel: &CancellationToken) -> Result<ObservedQueue> {
        let queue = self.read(id.trim(), cancel).await?;
        info!(name = %queue.name, "Queue imported");
        Ok(queue)
    }

    /// Present → Present: replace name and tags, then re-read.
    #[instrument(skip(self, spec, cancel), fields(name = %spec.name()))]
    pub async fn update(
        &self,
        id: &str,
        spec: &QueueSpec,
        cancel: &CancellationToken,
    ) -> Result<ObservedQueue> {
        require_id(id)?;

        self.api
            .update_queue(id, spec.name(), spec.tags(), cancel)
            .await
            .map_err(|e| SyncError::from_provider(e, id))?;

        let record = self.confirm(id, cancel).await?;
        info!("Queue updated");
        Ok(record.into())
    }

    /// Present → Absent. A queue the server no longer knows counts as deleted.
    #[instrument(skip(self, cancel))]
    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<DeleteOutcome> {
        require_id(id)?;

        match self.api.delete_queue(id, cancel).await {
            Ok(()) => {
                info!("Queue deleted");
                Ok(DeleteOutcome::Deleted)
            }
            Err(error) if error.is_not_found() => {
                info!("Queue already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(error) => Err(SyncError::from_provider(error, id)),
        }
    }

    /// Bring the remote queue in line with `spec`.
    ///
    /// Creates when no identifier is held. Otherwise reads and updates only
    /// if name or tags differ.
    #[instrument(skip(self, spec, cancel), fields(name = %spec.name()))]
    pub async fn converge(
        &self,
        current_id: Option<&str>,
        spec: &QueueSpec,
        cancel: &CancellationToken,
    ) -> Result<Convergence> {
        let id = match current_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id,
            None => {
                let queue = self.create(spec, cancel).await?;
                return Ok(Convergence {
                    action: ConvergeAction::Created,
                    queue,
                });
            }
        };

        let observed = self.read(id, cancel).await?;
        let diff = QueueDiff::between(spec, &observed);
        if diff.is_empty() {
            debug!(id, "Queue already converged");
            return Ok(Convergence {
                action: ConvergeAction::Unchanged,
                queue: observed,
            });
        }

        info!(id, changes = %diff, "Queue drifted from spec");
        let queue = self.update(id, spec, cancel).await?;
        Ok(Convergence {
            action: ConvergeAction::Updated,
            queue,
        })
    }

    async fn confirm(&self, id: &str, cancel: &CancellationToken) -> Result<QueueRecord> {
        let max_attempts = self.confirm_policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.api.get_queue(id, cancel).await {
                Ok(record) => return Ok(record),
                Err(error) if error.is_not_found() && attempt < max_attempts => {
                    let delay = self.confirm_policy.delay_for(attempt);
                    debug!(id, attempt, delay_ms = delay.as_millis() as u64, "Queue not visible yet");

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(error) => return Err(SyncError::from_provider(error, id)),
            }
        }
    }
}

fn require_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(SyncError::MissingId);
    }
    Ok(())
}
