//! Common error types and handling for CRM Sync

use serde::{Deserialize, Serialize};

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the CRM Sync backend
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Client-facing error body: `{"error": message}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl Error {
    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::Authentication(_) => "AUTHENTICATION_ERROR",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::Upstream(_) => "UPSTREAM_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether details of this error must stay out of client responses
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Error::Unexpected(_) | Error::Serialization(_) | Error::Internal(_)
        )
    }

    /// The message shown to clients, without the category prefix
    pub fn client_message(&self) -> String {
        match self {
            Error::Authentication(msg)
            | Error::Validation(msg)
            | Error::NotFound(msg)
            | Error::Conflict(msg)
            | Error::Upstream(msg) => msg.clone(),
            Error::Unexpected(_) | Error::Serialization(_) | Error::Internal(_) => {
                "Internal server error".to_string()
            }
        }
    }

    /// Convert into the body returned to clients
    pub fn to_body(&self) -> ErrorBody {
        // Log internal errors with full context
        if self.is_internal() {
            tracing::error!(error = %self, code = self.error_code(), "Internal server error");
        }

        ErrorBody {
            error: self.client_message(),
        }
    }
}

impl From<Error> for ErrorBody {
    fn from(error: Error) -> Self {
        error.to_body()
    }
}
