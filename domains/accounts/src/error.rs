//! Accounts domain errors

use crmsync_auth::AuthError;

/// Errors returned by the account service. Messages are client-safe.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("User already exists")]
    AlreadyExists,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("{0}")]
    InvalidInput(String),

    /// CRM sync failed and the local account was rolled back
    #[error("Failed to create account")]
    RegistrationFailed,

    #[error(transparent)]
    Store(#[from] crmsync_common::Error),

    #[error(transparent)]
    Token(#[from] AuthError),
}

impl From<AccountError> for crmsync_common::Error {
    fn from(error: AccountError) -> Self {
        match error {
            AccountError::AlreadyExists => {
                crmsync_common::Error::Conflict(AccountError::AlreadyExists.to_string())
            }
            AccountError::InvalidCredentials => {
                crmsync_common::Error::Authentication(AccountError::InvalidCredentials.to_string())
            }
            AccountError::InvalidInput(msg) => crmsync_common::Error::Validation(msg),
            AccountError::RegistrationFailed => {
                crmsync_common::Error::Upstream(AccountError::RegistrationFailed.to_string())
            }
            AccountError::Store(e) => e,
            AccountError::Token(e) => e.into(),
        }
    }
}
