//! Error types for the ClearML transport

use bridge_traits::error::BridgeError;
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// `meta` block ClearML attaches to every response, successful or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorMeta {
    #[serde(default)]
    pub result_code: u16,
    #[serde(default)]
    pub result_subcode: u32,
    #[serde(default)]
    pub result_msg: String,
    #[serde(default)]
    pub endpoint: Option<EndpointMeta>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EndpointMeta {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    meta: ApiErrorMeta,
}

/// A response with status >= 400.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRejection {
    pub status: u16,
    pub url: String,
    /// Raw response body, lossily decoded
    pub body: String,
    /// Parsed `meta` block when the body has one
    pub meta: Option<ApiErrorMeta>,
}

impl RemoteRejection {
    pub fn new(status: u16, url: impl Into<String>, body: &[u8]) -> Self {
        let meta = serde_json::from_slice::<ErrorEnvelope>(body)
            .ok()
            .map(|envelope| envelope.meta);

        Self {
            status,
            url: url.into(),
            body: String::from_utf8_lossy(body).into_owned(),
            meta,
        }
    }

    /// ClearML result subcode, 0 when the body carried none
    pub fn result_subcode(&self) -> u32 {
        self.meta.as_ref().map(|m| m.result_subcode).unwrap_or(0)
    }

    /// Server-side message, falling back to the raw body
    pub fn message(&self) -> &str {
        match &self.meta {
            Some(meta) if !meta.result_msg.is_empty() => &meta.result_msg,
            _ => &self.body,
        }
    }

    pub fn status_line(&self) -> String {
        match status_text(self.status) {
            Some(text) => format!("{} {}", self.status, text),
            None => self.status.to_string(),
        }
    }
}

impl fmt::Display for RemoteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ClearML API returned status {} for {}: {}",
            self.status_line(),
            self.url,
            self.body
        )
    }
}

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request could not be built (bad path, unserializable payload)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No response was obtained, retries included
    #[error("Request to {url} failed after {attempts} attempt(s): {source}")]
    Network {
        url: String,
        attempts: u32,
        #[source]
        source: BridgeError,
    },

    #[error("Request to {url} was cancelled")]
    Cancelled { url: String },

    #[error("{0}")]
    Rejected(RemoteRejection),

    /// Body present but not the expected JSON
    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl TransportError {
    pub fn rejection(&self) -> Option<&RemoteRejection> {
        match self {
            TransportError::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransportError::Cancelled { .. })
    }
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

fn status_text(status: u16) -> Option<&'static str> {
    let text = match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => return None,
    };
    Some(text)
}
