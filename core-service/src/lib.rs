//! Core service façade and bootstrap helpers.
//!
//! This crate wires a host-provided [`HttpClient`] and [`HttpObserver`] into
//! the queue stack: transport → session → ClearML queue API → reconciler.
//! Native hosts enable the `native` feature (on by default) to use the
//! reqwest client from `bridge-native`; other hosts pass their own client to
//! [`QueueService::connect_with`].
//!
//! ```ignore
//! use core_service::{ClientConfig, QueueService, QueueSpec};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let service = QueueService::connect(ClientConfig::from_env()?, &cancel).await?;
//!
//! let queue = service.create(&QueueSpec::new("gpu-a100", ["team:ml"])?, &cancel).await?;
//! service.delete(&queue.id, &cancel).await?;
//! ```

pub mod error;

pub use error::{Result, ServiceError};

pub use core_runtime::config::ClientConfig;
pub use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use core_sync::{
    ConfirmPolicy, ConvergeAction, Convergence, DeleteOutcome, ObservedQueue, QueueDiff,
    QueueSpec, ResourceState, SyncError,
};
pub use tokio_util::sync::CancellationToken;

use std::sync::Arc;

use bridge_traits::{http::HttpClient, observer::HttpObserver};
use core_auth::{Credentials, Session};
use core_sync::QueueReconciler;
use core_transport::{ApiTransport, TracingObserver};
use provider_clearml::{ClearmlQueues, QueueApi};
use tracing::{info, instrument};

/// Host handles the service is built from.
pub struct ServiceDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub observer: Arc<dyn HttpObserver>,
}

impl ServiceDependencies {
    /// Dependencies with the default `TRACE`-level observer.
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            http_client,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn HttpObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// reqwest-backed client configured from `config`.
    #[cfg(all(feature = "native", not(target_arch = "wasm32")))]
    pub fn native(config: &ClientConfig) -> Result<Self> {
        let settings = bridge_native::NativeHttpSettings {
            timeout: config.request_timeout(),
            connect_timeout: config.connect_timeout(),
            user_agent: config.user_agent().to_string(),
            ..Default::default()
        };
        let client = bridge_native::ReqwestHttpClient::try_new(settings)?;
        Ok(Self::new(Arc::new(client)))
    }
}

/// Primary façade exposed to host applications.
///
/// Holding a `QueueService` means the login succeeded; every operation runs
/// with the session token obtained at construction.
#[derive(Clone)]
pub struct QueueService {
    api: Arc<dyn QueueApi>,
    reconciler: Arc<QueueReconciler>,
}

impl QueueService {
    /// Validate `config`, build the native HTTP client and log in.
    #[cfg(all(feature = "native", not(target_arch = "wasm32")))]
    pub async fn connect(config: ClientConfig, cancel: &CancellationToken) -> Result<Self> {
        let deps = ServiceDependencies::native(&config)?;
        Self::connect_with(&config, deps, cancel).await
    }

    /// Log in over host-provided dependencies.
    ///
    /// # Errors
    ///
    /// Any failure here is a construction error: invalid credentials are
    /// rejected before a request is made, and a failed login leaves no
    /// usable service behind.
    #[instrument(skip(config, deps, cancel), fields(api_url = %config.api_url()))]
    pub async fn connect_with(
        config: &ClientConfig,
        deps: ServiceDependencies,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let credentials = Credentials::from_config(config)?;
        let transport =
            ApiTransport::from_config(deps.http_client, config).with_observer(deps.observer);

        let session = Session::login(transport, &credentials, cancel).await?;
        info!(access_key = %credentials.access_key(), "Queue service connected");

        Ok(Self::from_api(Arc::new(ClearmlQueues::new(session))))
    }

    /// Service over an arbitrary queue API.
    pub fn from_api(api: Arc<dyn QueueApi>) -> Self {
        let reconciler = Arc::new(QueueReconciler::new(Arc::clone(&api)));
        Self { api, reconciler }
    }

    pub fn with_confirm_policy(mut self, policy: ConfirmPolicy) -> Self {
        self.reconciler =
            Arc::new(QueueReconciler::new(Arc::clone(&self.api)).with_confirm_policy(policy));
        self
    }

    /// Raw queue operations, one remote call each.
    pub fn queues(&self) -> Arc<dyn QueueApi> {
        Arc::clone(&self.api)
    }

    pub fn reconciler(&self) -> &QueueReconciler {
        &self.reconciler
    }

    pub async fn create(&self, spec: &QueueSpec, cancel: &CancellationToken) -> Result<ObservedQueue> {
        Ok(self.reconciler.create(spec, cancel).await?)
    }

    pub async fn read(&self, id: &str, cancel: &CancellationToken) -> Result<ObservedQueue> {
        Ok(self.reconciler.read(id, cancel).await?)
    }

    pub async fn observe(&self, id: &str, cancel: &CancellationToken) -> Result<ResourceState> {
        Ok(self.reconciler.observe(id, cancel).await?)
    }

    pub async fn update(
        &self,
        id: &str,
        spec: &QueueSpec,
        cancel: &CancellationToken,
    ) -> Result<ObservedQueue> {
        Ok(self.reconciler.update(id, spec, cancel).await?)
    }

    pub async fn delete(&self, id: &str, cancel: &CancellationToken) -> Result<DeleteOutcome> {
        Ok(self.reconciler.delete(id, cancel).await?)
    }

    pub async fn import(&self, id: &str, cancel: &CancellationToken) -> Result<ObservedQueue> {
        Ok(self.reconciler.import(id, cancel).await?)
    }

    pub async fn converge(
        &self,
        current_id: Option<&str>,
        spec: &QueueSpec,
        cancel: &CancellationToken,
    ) -> Result<Convergence> {
        Ok(self.reconciler.converge(current_id, spec, cancel).await?)
    }
}
