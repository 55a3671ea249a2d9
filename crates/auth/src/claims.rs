//! JWT claims types

use serde::{Deserialize, Serialize};

/// Claims carried by access tokens issued at login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (local user ID)
    pub sub: String,
    /// Normalized email
    pub email: String,
    /// Issued at
    pub iat: u64,
    /// Expires at
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}
