//! Access tokens for CRM Sync
//!
//! Issues HS256 JWTs at login and validates them from `Authorization: Bearer`
//! headers for the routing layer.

mod claims;
mod config;
mod error;
mod jwt;

pub use claims::AccessClaims;
pub use config::AuthConfig;
pub use error::AuthError;
pub use jwt::{extract_bearer_token, AccessToken, TokenIssuer};
