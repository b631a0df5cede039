use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use core_runtime::config::ClientConfig;
use core_runtime::logging::redact_if_sensitive;
use std::fmt;

use crate::error::{AuthError, Result};

/// ClearML access/secret key pair.
///
/// Immutable once built. `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    access_key: String,
    secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Result<Self> {
        let access_key = access_key.into();
        let secret_key = secret_key.into();

        if access_key.trim().is_empty() {
            return Err(AuthError::MissingCredentials(
                "access key must not be empty".to_string(),
            ));
        }
        if secret_key.trim().is_empty() {
            return Err(AuthError::MissingCredentials(
                "secret key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            access_key,
            secret_key,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(config.access_key(), config.secret_key())
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }

    /// `Authorization` value for HTTP Basic auth (access key as user name)
    pub fn basic_authorization(&self) -> String {
        let raw = format!("{}:{}", self.access_key, self.secret_key);
        format!("Basic {}", STANDARD.encode(raw))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &redact_if_sensitive("secret_key", &self.secret_key))
            .finish()
    }
}
