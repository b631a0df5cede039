use provider_clearml::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid queue spec: {0}")]
    InvalidSpec(String),

    /// Read, update and delete need an identifier from a prior create
    #[error("Queue has no identifier; it must be created first")]
    MissingId,

    #[error("Queue {id} not found")]
    NotFound { id: String },

    /// The queue exists remotely but the read after the mutation failed.
    /// `id` is kept so a later pass can recover with a read.
    #[error("Queue {id} was created but its state could not be confirmed: {source}")]
    Unconfirmed {
        id: String,
        #[source]
        source: Box<SyncError>,
    },

    #[error("Queue operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Provider(ProviderError),
}

impl SyncError {
    /// Lift a provider error raised while operating on queue `id`.
    pub fn from_provider(error: ProviderError, id: &str) -> Self {
        if error.is_cancelled() {
            return SyncError::Cancelled;
        }
        match error {
            ProviderError::NotFound { id: reported, .. } => SyncError::NotFound {
                id: if reported.is_empty() { id.to_string() } else { reported },
            },
            ProviderError::EmptyId => SyncError::MissingId,
            other => SyncError::Provider(other),
        }
    }

    /// Lift a provider error raised by a create, where no identifier exists
    /// yet and so nothing can be reported as not found.
    pub fn from_create(error: ProviderError) -> Self {
        if error.is_cancelled() {
            return SyncError::Cancelled;
        }
        SyncError::Provider(error)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::NotFound { .. })
    }

    /// Identifier of a queue that exists remotely despite the error
    pub fn recovered_id(&self) -> Option<&str> {
        match self {
            SyncError::Unconfirmed { id, .. } => Some(id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
