use thiserror::Error;

use crate::types::error_types::Error as ApiError;

/// A unified error type for this library.
#[derive(Debug, Error)]
pub enum RevoltError {
    /// HTTP request failed (network or protocol issue).
    #[error("Reqwest Error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    /// HTTP returned a non-2xx status and the body parsed as an API error.
    #[error("API Error: {0:?}")]
    ApiError(ApiError),

    /// The server returned an error body we could not parse as `ApiError`.
    #[error("Non-success HTTP status {code}, body: {body}")]
    HttpStatus { code: u16, body: String },

    /// Serde (de)serialization error.
    #[error("Serde JSON error: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// Anything that went wrong on the gateway socket.
    #[error("WebSocket error: {0}")]
    Gateway(String),

    /// The client was built with settings it cannot use.
    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl RevoltError {
    /// True when the API reported that the target (channel, user, ...) does
    /// not exist or is not visible to us.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::HttpStatus { code, .. } => *code == 404,
            Self::ApiError(err) => err.kind.is_not_found(),
            _ => false,
        }
    }
}
