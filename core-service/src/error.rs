use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// Construction input failed validation
    #[error("Invalid client configuration: {0}")]
    ConstructionConfig(#[from] core_runtime::Error),

    /// The host HTTP client could not be built
    #[error("HTTP client initialization failed: {0}")]
    ConstructionHttp(#[from] bridge_traits::error::BridgeError),

    /// Credential exchange failed; no client was built
    #[error("Authentication error: {0}")]
    ConstructionAuth(#[from] core_auth::AuthError),

    #[error("Sync error: {0}")]
    Sync(#[from] core_sync::SyncError),
}

impl ServiceError {
    pub fn is_construction(&self) -> bool {
        !matches!(self, ServiceError::Sync(_))
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
