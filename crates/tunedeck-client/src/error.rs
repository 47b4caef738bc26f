//! Error types for the fetch adapters and the query layer.
//!
//! `ApiError` is what the adapters return; `FetchError` is the flattened
//! `{ code, message }` shape that views render.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use thiserror::Error;

/// Message shown when a query runs without a stored token.
pub const MISSING_TOKEN_MESSAGE: &str = "Token not found";

/// Failures raised while talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No token is available; no request was sent.
    #[error("token not found")]
    MissingToken,
    /// Backend answered with a non-success status.
    #[error("request returned an error status")]
    Http {
        /// HTTP status code.
        code: u16,
        /// Reason phrase for the status.
        message: String,
        /// Request path.
        path: String,
    },
    /// The request never produced a response.
    #[error("request transport failed")]
    Transport {
        /// Request path.
        path: String,
        /// Underlying client error.
        source: reqwest::Error,
    },
    /// Response body did not match the expected shape.
    #[error("failed to decode response")]
    Decode {
        /// Request path.
        path: String,
        /// Decoder detail.
        detail: String,
    },
    /// The request URL could not be built.
    #[error("invalid request url")]
    InvalidUrl {
        /// Path that could not be joined onto the base URL.
        path: String,
        /// Why the URL was rejected.
        reason: String,
    },
    /// The HTTP client could not be constructed.
    #[error("failed to build http client")]
    Client {
        /// Underlying client error.
        source: reqwest::Error,
    },
}

impl ApiError {
    /// HTTP status code, when the failure came from a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether retrying the same request may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Http { code, .. } => *code >= 500 || *code == 429,
            Self::MissingToken
            | Self::Decode { .. }
            | Self::InvalidUrl { .. }
            | Self::Client { .. } => false,
        }
    }
}

/// Uniform error surfaced to views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchError {
    /// HTTP status, absent for local and transport failures.
    pub code: Option<u16>,
    /// Human-readable message.
    pub message: String,
}

impl FetchError {
    /// Error recorded when no token is stored.
    #[must_use]
    pub fn missing_token() -> Self {
        Self {
            code: None,
            message: MISSING_TOKEN_MESSAGE.to_string(),
        }
    }

    /// Whether this error was recorded because no token was stored.
    #[must_use]
    pub fn is_missing_token(&self) -> bool {
        self.code.is_none() && self.message == MISSING_TOKEN_MESSAGE
    }
}

impl Display for FetchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} ({code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for FetchError {}

impl From<&ApiError> for FetchError {
    fn from(error: &ApiError) -> Self {
        match error {
            ApiError::MissingToken => Self::missing_token(),
            ApiError::Http { code, message, .. } => Self {
                code: Some(*code),
                message: message.clone(),
            },
            ApiError::Transport { source, .. } => Self {
                code: None,
                message: if source.is_timeout() {
                    "Request timed out".to_string()
                } else {
                    "Network request failed".to_string()
                },
            },
            ApiError::Decode { detail, .. } => Self {
                code: None,
                message: format!("Unexpected response: {detail}"),
            },
            ApiError::InvalidUrl { reason, .. } => Self {
                code: None,
                message: format!("Invalid request URL: {reason}"),
            },
            ApiError::Client { .. } => Self {
                code: None,
                message: "HTTP client unavailable".to_string(),
            },
        }
    }
}

impl From<ApiError> for FetchError {
    fn from(error: ApiError) -> Self {
        Self::from(&error)
    }
}
