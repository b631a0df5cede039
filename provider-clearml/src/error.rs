//! Error types for the ClearML provider

use core_transport::{RemoteRejection, TransportError};
use thiserror::Error;

/// ClearML result subcode for `queues.*` calls naming an unknown queue
pub const INVALID_QUEUE_ID_SUBCODE: u32 = 701;

/// ClearML provider errors
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The identified queue does not exist remotely
    #[error("Queue not found: {id} ({message})")]
    NotFound { id: String, message: String },

    /// Reads, updates and deletes need the identifier assigned at create
    #[error("Queue identifier must not be empty")]
    EmptyId,

    /// Response decoded as JSON but not in the expected shape
    #[error("Unexpected response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error(transparent)]
    Transport(TransportError),
}

impl ProviderError {
    /// Classify a transport error raised while operating on queue `id`.
    pub fn from_transport(error: TransportError, id: Option<&str>) -> Self {
        match error {
            TransportError::Rejected(rejection) if is_not_found(&rejection) => {
                ProviderError::NotFound {
                    id: id.unwrap_or_default().to_string(),
                    message: rejection.message().to_string(),
                }
            }
            TransportError::Decode { url, message } => ProviderError::Decode {
                endpoint: url,
                message,
            },
            other => ProviderError::Transport(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Transport(e) if e.is_cancelled())
    }
}

/// ClearML's invalid-queue-id subcode in the parsed `meta` block.
///
/// A bare 404 (unknown endpoint, proxy, wrong server) is not a missing queue.
pub fn is_not_found(rejection: &RemoteRejection) -> bool {
    rejection.result_subcode() == INVALID_QUEUE_ID_SUBCODE
}

/// Result type for provider operations
pub type Result<T> = std::result::Result<T, ProviderError>;
