use thiserror::Error;

use crate::utils::IsTransient;

/// Failures talking to a remote collaborator.
///
/// A "not found" answer is never an error; lookups return `Ok(None)`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Timeout calling {collaborator}")]
    Timeout { collaborator: String },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response from {collaborator}: {reason}")]
    InvalidResponse { collaborator: String, reason: String },

    #[error("Circuit open for {collaborator}")]
    CircuitOpen { collaborator: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Classify a transport error, splitting out timeouts
    pub fn transport(collaborator: &str, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                collaborator: collaborator.to_string(),
            }
        } else {
            Self::Http(error)
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl IsTransient for ClientError {
    fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            ClientError::Timeout { .. } => true,
            ClientError::Api { status, .. } => *status >= 500 || *status == 429,
            // Retryable for the caller, not inside the breaker
            ClientError::CircuitOpen { .. } => false,
            ClientError::InvalidResponse { .. } | ClientError::Config(_) => false,
        }
    }
}
