//! Token-bearing session over an [`ApiTransport`]

use core_runtime::logging::redact_if_sensitive;
use core_transport::{ApiRequest, ApiResponse, ApiTransport, TransportError};
use serde::Deserialize;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::credentials::Credentials;
use crate::error::{AuthError, Result};

/// Login endpoint, relative to the API root
pub const LOGIN_PATH: &str = "/auth.login";

#[derive(Deserialize)]
struct LoginResponse {
    data: LoginData,
}

#[derive(Deserialize)]
struct LoginData {
    token: String,
}

/// Authenticated ClearML session.
///
/// Only [`Session::login`] creates one, so holding a `Session` means holding
/// a token.
#[derive(Clone)]
pub struct Session {
    transport: ApiTransport,
    access_key: String,
    token: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("api_url", &self.transport.base_url().as_str())
            .field("access_key", &self.access_key)
            .field("token", &redact_if_sensitive("token", &self.token))
            .finish()
    }
}

impl Session {
    /// Exchange credentials for a bearer token.
    ///
    /// Sends one `POST /auth.login` with Basic authentication and no body.
    /// Transport-level retry applies to the call.
    ///
    /// # Errors
    ///
    /// - [`AuthError::LoginFailed`] on network failure, cancellation or a
    ///   status >= 400
    /// - [`AuthError::InvalidLoginResponse`] when the body is empty, not JSON,
    ///   lacks `data.token`, or the token is blank
    #[instrument(skip(transport, credentials, cancel), fields(api_url = %transport.base_url(), access_key = %credentials.access_key()))]
    pub async fn login(
        transport: ApiTransport,
        credentials: &Credentials,
        cancel: &CancellationToken,
    ) -> Result<Self> {
        let request =
            ApiRequest::post(LOGIN_PATH).header("Authorization", credentials.basic_authorization());

        let response = transport.send(request, cancel).await.map_err(|e| match e {
            TransportError::Decode { url, message } => AuthError::InvalidLoginResponse {
                url,
                reason: message,
            },
            other => {
                warn!(error = %other, "Login request failed");
                AuthError::LoginFailed(other)
            }
        })?;

        let url = response.url.clone();
        let login: LoginResponse = response.decode().map_err(|e| match e {
            TransportError::Decode { url, message } => AuthError::InvalidLoginResponse {
                url,
                reason: message,
            },
            other => AuthError::LoginFailed(other),
        })?;

        if login.data.token.trim().is_empty() {
            return Err(AuthError::InvalidLoginResponse {
                url,
                reason: "token is empty".to_string(),
            });
        }

        info!("Authenticated with ClearML");

        Ok(Self {
            transport,
            access_key: credentials.access_key().to_string(),
            token: login.data.token,
        })
    }

    /// Send a request with `Authorization: Bearer <token>` attached.
    pub async fn send(
        &self,
        request: ApiRequest,
        cancel: &CancellationToken,
    ) -> core_transport::Result<ApiResponse> {
        let request = request.header("Authorization", format!("Bearer {}", self.token));
        self.transport.send(request, cancel).await
    }

    pub fn transport(&self) -> &ApiTransport {
        &self.transport
    }

    pub fn access_key(&self) -> &str {
        &self.access_key
    }
}
