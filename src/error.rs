// --- File: src/error.rs ---

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use oauth2::{basic::BasicErrorResponse, RequestTokenError};
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};

use crate::storage::StorageError;

/// Literal body returned when the host application has not authenticated the caller.
pub const NOT_AUTHENTICATED_BODY: &str = "User not authenticated";
/// Literal body returned when no usable Google credential is stored for the caller.
pub const INVALID_CREDENTIALS_BODY: &str = "Invalid credentials";

/// Coarse classification of a failure talking to Google.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Google rejected the code, token or client (4xx from the token endpoint, 401/403 from the API).
    Auth,
    /// Connection, TLS, DNS or timeout failure before a response arrived.
    Network,
    /// HTTP 429 from Google.
    RateLimited,
    /// Anything else: 5xx, unparseable bodies.
    Provider,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Auth => "auth_error",
            Self::Network => "network_error",
            Self::RateLimited => "rate_limited",
            Self::Provider => "provider_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Auth => StatusCode::UNAUTHORIZED,
            Self::Network => StatusCode::BAD_GATEWAY,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Provider => StatusCode::BAD_GATEWAY,
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Auth, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Network, message)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message)
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Provider, message)
    }

    /// Classifies a failed token request (code exchange or refresh).
    pub fn from_token_error<RE>(err: RequestTokenError<RE, BasicErrorResponse>) -> Self
    where
        RE: std::error::Error + 'static,
    {
        match err {
            RequestTokenError::ServerResponse(response) => Self::auth(response.to_string()),
            RequestTokenError::Request(e) => Self::network(format!("token request failed: {e}")),
            other => Self::provider(other.to_string()),
        }
    }

    /// Classifies a reqwest transport error.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::network("request timeout")
        } else if err.is_connect() {
            Self::network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::provider(format!("failed to decode response: {err}"))
        } else {
            Self::network(format!("request failed: {err}"))
        }
    }

    /// Classifies a non-success HTTP status from the Calendar API.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        match status {
            reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN => {
                Self::auth(format!("calendar API rejected credentials ({status})"))
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => Self::rate_limited("rate limit exceeded"),
            _ => {
                warn!(%status, body, "calendar API error body");
                Self::provider(format!("calendar API error ({status})"))
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: String,
}

/// Every failure a calendar endpoint can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("User not authenticated")]
    NotAuthenticated,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("invalid OAuth state: {0}")]
    InvalidState(&'static str),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotAuthenticated => "not_authenticated",
            Self::InvalidCredentials => "invalid_credentials",
            Self::InvalidState(_) => "invalid_state",
            Self::Provider(e) => e.kind.as_str(),
            Self::Storage(_) => "storage_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal(format!("credential serialization failed: {err}"))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotAuthenticated | Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::Provider(e) => e.kind.status_code(),
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            // Plain-text literals, kept stable for existing API clients.
            Self::NotAuthenticated => builder
                .content_type("text/plain; charset=utf-8")
                .body(NOT_AUTHENTICATED_BODY),
            Self::InvalidCredentials => builder
                .content_type("text/plain; charset=utf-8")
                .body(INVALID_CREDENTIALS_BODY),
            // Internal details stay in the logs.
            Self::Storage(_) | Self::Internal(_) => {
                error!(error = %self, "request failed");
                builder.json(ErrorBody {
                    error: self.code(),
                    message: "internal server error".to_string(),
                })
            }
            _ => builder.json(ErrorBody {
                error: self.code(),
                message: self.to_string(),
            }),
        }
    }
}
