//! CRM Sync application composition root
//!
//! Wires the CRM sync service, the local user store and the token issuer
//! into a single `Backend` whose methods are what the routing layer calls.
//! Every error leaving the facade is an [`ErrorBody`].

use std::sync::Arc;

use crmsync_accounts::{
    AccountService, InMemoryUserStore, Registration, RegistrationOrchestrator,
    RegistrationRequest, UserStore,
};
use crmsync_auth::{AccessClaims, AccessToken, AuthConfig, TokenIssuer};
use crmsync_common::{Config, Error, ErrorBody};
use crmsync_hubspot::{
    ContactPage, CrmConfig, CrmServiceFactory, CrmSync, DealInput, Pipeline, TicketInput,
    DEFAULT_PAGE_LIMIT,
};

fn respond<T, E: Into<Error>>(result: Result<T, E>) -> Result<T, ErrorBody> {
    result.map_err(|e| {
        let error: Error = e.into();
        if !error.is_internal() {
            tracing::warn!(code = error.error_code(), error = %error, "Request failed");
        }
        error.to_body()
    })
}

#[derive(Clone)]
pub struct Backend {
    accounts: AccountService,
    crm: CrmSync,
}

impl Backend {
    pub fn new(crm: CrmSync, users: Arc<dyn UserStore>, auth: AuthConfig) -> Self {
        let accounts = AccountService::new(
            users,
            RegistrationOrchestrator::new(crm.clone()),
            TokenIssuer::new(auth),
        );
        Self { accounts, crm }
    }

    /// Build the backend from environment configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let crm_config = CrmConfig::try_from(config)?;
        tracing::info!(config = ?crm_config, "Configuring CRM");
        let crm = CrmServiceFactory::create(crm_config)?;

        Ok(Self::new(
            crm,
            Arc::new(InMemoryUserStore::new()),
            AuthConfig::from(config),
        ))
    }

    pub async fn register_user(
        &self,
        request: RegistrationRequest,
    ) -> Result<Registration, ErrorBody> {
        respond(self.accounts.register_user(request).await)
    }

    pub async fn authenticate_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccessToken, ErrorBody> {
        respond(self.accounts.authenticate_user(email, password).await)
    }

    /// Validate the `Authorization` header value of an inbound request.
    pub fn verify_access_token(&self, header: Option<&str>) -> Result<AccessClaims, ErrorBody> {
        respond(self.accounts.tokens().validate_bearer(header))
    }

    /// One page of contacts with their deals and tickets; `limit` defaults to 10.
    pub async fn list_contacts(
        &self,
        limit: Option<u32>,
        cursor: Option<&str>,
    ) -> Result<ContactPage, ErrorBody> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
        respond(self.crm.list_contacts(limit, cursor).await)
    }

    pub async fn list_pipeline_tickets(&self) -> Result<Vec<Pipeline>, ErrorBody> {
        respond(self.crm.list_pipeline_tickets().await)
    }

    pub async fn list_deal_stages(&self) -> Result<Vec<Pipeline>, ErrorBody> {
        respond(self.crm.list_deal_stages().await)
    }

    /// Create or update a deal for an existing contact. Returns the deal id.
    pub async fn create_deal(&self, contact_id: &str, deal: DealInput) -> Result<String, ErrorBody> {
        respond(
            self.crm
                .create_or_update_deal(contact_id, deal)
                .await
                .map(|upserted| upserted.id),
        )
    }

    /// Create a ticket under a deal and contact. Returns the ticket id.
    pub async fn create_ticket(
        &self,
        contact_id: &str,
        deal_id: &str,
        ticket: TicketInput,
    ) -> Result<String, ErrorBody> {
        respond(self.crm.create_ticket(contact_id, deal_id, ticket).await)
    }
}
