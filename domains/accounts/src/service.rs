//! Account service: registration with CRM sync, and login
//!
//! Registration creates the local account first and then syncs the CRM.
//! If the sync aborts, the local account is deleted again so no account is
//! left without a CRM contact.

use std::sync::Arc;

use crmsync_auth::{AccessToken, TokenIssuer};
use crmsync_hubspot::{normalize_email, ContactInput};
use uuid::Uuid;

use crate::domain::entities::NewUserAccount;
use crate::domain::registration::{Registration, RegistrationRequest};
use crate::error::AccountError;
use crate::orchestrator::RegistrationOrchestrator;
use crate::repository::UserStore;

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    orchestrator: RegistrationOrchestrator,
    tokens: TokenIssuer,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        orchestrator: RegistrationOrchestrator,
        tokens: TokenIssuer,
    ) -> Self {
        Self {
            users,
            orchestrator,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Register a user and sync them, their deals and tickets into the CRM.
    pub async fn register_user(
        &self,
        request: RegistrationRequest,
    ) -> Result<Registration, AccountError> {
        let RegistrationRequest {
            email,
            password,
            firstname,
            lastname,
            phone,
            deals,
        } = request;

        if password.is_empty() {
            return Err(AccountError::InvalidInput("Password is required".to_string()));
        }
        let new_user = NewUserAccount::new(&email, firstname, lastname, phone)
            .map_err(|_| AccountError::InvalidInput("Email is required".to_string()))?;

        if self.users.find_by_email(&new_user.email).await?.is_some() {
            return Err(AccountError::AlreadyExists);
        }

        let contact = ContactInput::new(
            new_user.email.clone(),
            new_user.firstname.clone(),
            new_user.lastname.clone(),
            new_user.phone.clone(),
        );

        let account = match self.users.create(new_user, &password).await {
            Ok(account) => account,
            Err(crmsync_common::Error::Conflict(_)) => return Err(AccountError::AlreadyExists),
            Err(e) => return Err(e.into()),
        };

        let report = match self.orchestrator.sync(contact, deals).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(
                    user_id = %account.id,
                    error = %e,
                    "CRM sync failed during registration, removing local account"
                );
                self.compensate(account.id).await;
                return Err(AccountError::RegistrationFailed);
            }
        };

        if let Err(e) = self.users.link_contact(account.id, &report.contact_id).await {
            tracing::error!(
                user_id = %account.id,
                contact_id = %report.contact_id,
                error = %e,
                "Failed to link CRM contact, removing local account"
            );
            self.compensate(account.id).await;
            return Err(AccountError::RegistrationFailed);
        }

        tracing::info!(
            user_id = %account.id,
            contact_id = %report.contact_id,
            "User registered"
        );

        Ok(Registration {
            id: account.id,
            contact_id: report.contact_id.clone(),
            report,
        })
    }

    async fn compensate(&self, user_id: Uuid) {
        match self.users.delete(user_id).await {
            Ok(true) => tracing::info!(user_id = %user_id, "Local account removed"),
            Ok(false) => tracing::warn!(user_id = %user_id, "Local account already gone"),
            Err(e) => tracing::error!(
                user_id = %user_id,
                error = %e,
                "Failed to remove local account after CRM sync failure"
            ),
        }
    }

    /// Check credentials and issue an access token.
    pub async fn authenticate_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AccessToken, AccountError> {
        let email = normalize_email(email);
        let Some(user) = self.users.verify_credentials(&email, password).await? else {
            tracing::debug!("Login rejected");
            return Err(AccountError::InvalidCredentials);
        };

        let token = self.tokens.issue(&user.id.to_string(), &user.email)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok(token)
    }
}
