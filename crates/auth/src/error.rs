//! Authentication errors

/// Authentication error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header required")]
    MissingAuthorization,

    #[error("Invalid authorization header format")]
    InvalidAuthorizationFormat,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Failed to issue access token: {0}")]
    TokenCreation(String),
}

impl From<AuthError> for crmsync_common::Error {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::TokenCreation(msg) => crmsync_common::Error::Internal(msg),
            other => crmsync_common::Error::Authentication(other.to_string()),
        }
    }
}
