//! Configuration management following 12-factor app principles
//!
//! All configuration is loaded from environment variables to ensure
//! clean separation between code and config.

use anyhow::Result;
use std::env;

#[derive(Clone)]
pub struct Config {
    /// CRM provider (hubspot, mock)
    pub crm_provider: String,

    /// HubSpot OAuth app credentials
    pub hubspot_client_id: String,
    pub hubspot_client_secret: String,
    pub hubspot_refresh_token: String,
    pub hubspot_base_url: String,
    pub hubspot_timeout_secs: u64,

    /// How upserts treat a failed search (lenient, strict)
    pub crm_resolve_policy: String,

    /// Access token signing
    pub jwt_secret: String,
    pub jwt_issuer: Option<String>,
    pub jwt_audience: Option<String>,
    pub jwt_access_token_ttl_secs: i64,

    /// Runtime configuration
    pub rust_log: String,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("crm_provider", &self.crm_provider)
            .field("hubspot_client_id", &self.hubspot_client_id)
            .field("hubspot_client_secret", &"[REDACTED]")
            .field("hubspot_refresh_token", &"[REDACTED]")
            .field("hubspot_base_url", &self.hubspot_base_url)
            .field("hubspot_timeout_secs", &self.hubspot_timeout_secs)
            .field("crm_resolve_policy", &self.crm_resolve_policy)
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("jwt_access_token_ttl_secs", &self.jwt_access_token_ttl_secs)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}

/// Longest access token lifetime accepted from the environment (one year)
const MAX_ACCESS_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

fn parse_positive<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    match optional(name) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) if value > T::default() => Ok(value),
            _ => Err(anyhow::anyhow!("{} must be a positive integer", name)),
        },
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        let config = Self {
            crm_provider: optional("CRM_PROVIDER").unwrap_or_else(|| "mock".to_string()),

            hubspot_client_id: env::var("HUBSPOT_CLIENT_ID").unwrap_or_default(),
            hubspot_client_secret: env::var("HUBSPOT_CLIENT_SECRET").unwrap_or_default(),
            hubspot_refresh_token: env::var("HUBSPOT_REFRESH_TOKEN").unwrap_or_default(),
            hubspot_base_url: optional("HUBSPOT_BASE_URL")
                .unwrap_or_else(|| "https://api.hubapi.com".to_string()),
            hubspot_timeout_secs: parse_positive("HUBSPOT_TIMEOUT_SECS", 30)?,

            crm_resolve_policy: optional("CRM_RESOLVE_POLICY")
                .unwrap_or_else(|| "lenient".to_string()),

            jwt_secret: optional("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET is required"))?,
            jwt_issuer: optional("JWT_ISSUER"),
            jwt_audience: optional("JWT_AUDIENCE"),
            jwt_access_token_ttl_secs: parse_positive("JWT_ACCESS_TOKEN_TTL_SECS", 86_400)?,

            rust_log: env::var("RUST_LOG").unwrap_or_else(|_| "crmsync=info".to_string()),
        };

        if config.jwt_access_token_ttl_secs > MAX_ACCESS_TOKEN_TTL_SECS {
            return Err(anyhow::anyhow!(
                "JWT_ACCESS_TOKEN_TTL_SECS must be at most {}",
                MAX_ACCESS_TOKEN_TTL_SECS
            ));
        }

        Ok(config)
    }
}
