use thiserror::Error;

/// Failures raised by an [`HttpClient`](crate::http::HttpClient) before a
/// response could be obtained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Bridge operation failed: {0}")]
    OperationFailed(String),
}

impl BridgeError {
    /// Whether a fresh attempt of the same request may succeed.
    /// Malformed requests are final.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
