//! CRM Sync HubSpot Integration
//!
//! Keeps contacts, deals and support tickets in HubSpot in step with local
//! registrations:
//! - OAuth access-token lease with lazy, single-flight renewal
//! - Natural-key resolution and create-or-update for contacts and deals
//! - Ticket creation wired to both its deal and its contact
//! - Paginated contact listing with nested deal/ticket expansion
//! - Pipeline and stage enumeration
//! - In-memory mock CRM for testing and development

pub mod api;
pub mod client;
pub mod lease;
pub mod mock;
pub mod model;
pub mod properties;
pub mod service;

use std::sync::Arc;

use crmsync_common::config::Config;
use thiserror::Error;

pub use api::{CrmApi, CrmObject, ObjectPage, PageRequest, SearchRequest};
pub use client::HubSpotClient;
pub use lease::{Credential, RefreshGrant, TokenExchange, TokenGrant, TokenLease};
pub use mock::{MockCall, MockCrm, MockFailure};
pub use model::*;
pub use properties::{PropertyMap, PropertyValue};
pub use service::{CrmSync, ResolveFailurePolicy, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};

pub const DEFAULT_BASE_URL: &str = "https://api.hubapi.com";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CrmError {
    #[error("CRM configuration error: {0}")]
    Configuration(String),

    #[error("CRM token exchange error: {0}")]
    TokenExchange(String),

    #[error("CRM request error: {0}")]
    Request(String),

    #[error("CRM response error ({status}): {message}")]
    Response { status: u16, message: String },

    #[error("CRM decode error: {0}")]
    Decode(String),

    #[error("Invalid CRM input: {0}")]
    InvalidInput(String),
}

impl From<CrmError> for crmsync_common::Error {
    fn from(error: CrmError) -> Self {
        match error {
            CrmError::InvalidInput(msg) => crmsync_common::Error::Validation(msg),
            CrmError::Configuration(msg) => crmsync_common::Error::Internal(msg),
            other => crmsync_common::Error::Upstream(other.to_string()),
        }
    }
}

/// CRM integration configuration
#[derive(Clone)]
pub struct CrmConfig {
    /// CRM provider (hubspot, mock)
    pub provider: String,
    /// OAuth app client id
    pub client_id: String,
    /// OAuth app client secret
    pub client_secret: String,
    /// Long-lived refresh token for the connected portal
    pub refresh_token: String,
    /// Base URL for the HubSpot API
    pub base_url: String,
    /// Transport timeout for every request
    pub timeout_secs: u64,
    /// How a failed natural-key search is treated during upserts
    pub resolve_policy: ResolveFailurePolicy,
}

impl std::fmt::Debug for CrmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrmConfig")
            .field("provider", &self.provider)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("resolve_policy", &self.resolve_policy)
            .finish()
    }
}

impl CrmConfig {
    /// Configuration for the in-memory mock CRM
    pub fn mock() -> Self {
        Self {
            provider: "mock".to_string(),
            client_id: "mock-client-id".to_string(),
            client_secret: "mock-client-secret".to_string(),
            refresh_token: "mock-refresh-token".to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            resolve_policy: ResolveFailurePolicy::default(),
        }
    }

    /// OAuth refresh grant built from the configured credentials
    pub fn refresh_grant(&self) -> RefreshGrant {
        RefreshGrant {
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            refresh_token: self.refresh_token.clone(),
        }
    }

    fn validate_credentials(&self) -> Result<(), CrmError> {
        let missing: Vec<&str> = [
            ("HUBSPOT_CLIENT_ID", &self.client_id),
            ("HUBSPOT_CLIENT_SECRET", &self.client_secret),
            ("HUBSPOT_REFRESH_TOKEN", &self.refresh_token),
        ]
        .iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| *name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CrmError::Configuration(format!(
                "{} required for HubSpot provider",
                missing.join(", ")
            )))
        }
    }
}

impl TryFrom<&Config> for CrmConfig {
    type Error = CrmError;

    fn try_from(config: &Config) -> Result<Self, Self::Error> {
        Ok(Self {
            provider: config.crm_provider.clone(),
            client_id: config.hubspot_client_id.clone(),
            client_secret: config.hubspot_client_secret.clone(),
            refresh_token: config.hubspot_refresh_token.clone(),
            base_url: config.hubspot_base_url.clone(),
            timeout_secs: config.hubspot_timeout_secs,
            resolve_policy: config.crm_resolve_policy.parse()?,
        })
    }
}

/// Factory for building the CRM sync service from configuration.
pub struct CrmServiceFactory;

impl CrmServiceFactory {
    pub fn create(config: CrmConfig) -> Result<CrmSync, CrmError> {
        match config.provider.as_str() {
            "hubspot" => {
                tracing::info!("Creating HubSpot CRM service");
                config.validate_credentials()?;
                let client = Arc::new(HubSpotClient::new(&config)?);
                let lease = TokenLease::new(client.clone(), config.refresh_grant());
                Ok(CrmSync::new(client, Arc::new(lease)).with_resolve_policy(config.resolve_policy))
            }
            "mock" => {
                tracing::info!("Creating mock CRM service");
                let mock = Arc::new(MockCrm::new());
                Ok(mock.sync_service().with_resolve_policy(config.resolve_policy))
            }
            provider => Err(CrmError::Configuration(format!(
                "Unknown CRM provider: {}. Supported providers: hubspot, mock",
                provider
            ))),
        }
    }
}
