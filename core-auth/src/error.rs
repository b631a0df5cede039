use core_transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// The login call itself failed (network, cancellation or rejection)
    #[error("Login failed: {0}")]
    LoginFailed(#[source] TransportError),

    /// The server answered but not with `{ "data": { "token": ... } }`
    #[error("Invalid login response from {url}: {reason}")]
    InvalidLoginResponse { url: String, reason: String },
}

impl AuthError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AuthError::LoginFailed(e) if e.is_cancelled())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
