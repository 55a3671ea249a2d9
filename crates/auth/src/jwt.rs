//! JWT issuing, validation and token extraction helpers

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use crate::claims::AccessClaims;
use crate::config::AuthConfig;
use crate::error::AuthError;

/// Access token handed back at login
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Issues and validates HS256 access tokens with one shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    config: AuthConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(config: AuthConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.jwt_secret.as_ref());
        let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_ref());
        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// Issue a token for `user_id` valid from now.
    pub fn issue(&self, user_id: &str, email: &str) -> Result<AccessToken, AuthError> {
        self.issue_at(user_id, email, Utc::now())
    }

    pub fn issue_at(
        &self,
        user_id: &str,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, AuthError> {
        let expires_at = TimeDelta::try_seconds(self.config.access_token_ttl_secs)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::TokenCreation(format!(
                    "invalid token lifetime: {}",
                    self.config.access_token_ttl_secs
                ))
            })?;

        let claims = AccessClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp().max(0) as u64,
            exp: expires_at.timestamp().max(0) as u64,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenCreation(e.to_string()))?;

        Ok(AccessToken {
            access_token,
            token_type: "Bearer",
            expires_at,
        })
    }

    /// Validate signature, expiry and the configured issuer/audience.
    pub fn validate(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);

        if let Some(aud) = &self.config.audience {
            validation.set_audience(&[aud]);
        } else {
            validation.validate_aud = false;
        }

        if let Some(iss) = &self.config.issuer {
            validation.set_issuer(&[iss]);
        }

        let token_data =
            decode::<AccessClaims>(token, &self.decoding_key, &validation).map_err(|e| {
                tracing::debug!(error = %e, "JWT validation failed");
                AuthError::InvalidToken
            })?;

        Ok(token_data.claims)
    }

    /// Validate the token carried by an `Authorization` header value.
    pub fn validate_bearer(&self, header: Option<&str>) -> Result<AccessClaims, AuthError> {
        let header = header.ok_or(AuthError::MissingAuthorization)?;
        let token = extract_bearer_token(header)?;
        self.validate(token)
    }
}

/// Extract bearer token from an Authorization header value
pub fn extract_bearer_token(header: &str) -> Result<&str, AuthError> {
    match header.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidAuthorizationFormat),
    }
}
