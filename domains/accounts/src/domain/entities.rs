//! Domain entities for the accounts domain

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crmsync_common::{Error, Result};
use crmsync_hubspot::normalize_email;

/// Local user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAccount {
    pub id: Uuid,
    /// Normalized email, unique across accounts
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    /// CRM contact id, set once the registration sync succeeded
    pub contact_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields for creating a local account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserAccount {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
}

impl NewUserAccount {
    /// Normalizes the email; an empty email is rejected.
    pub fn new(
        email: &str,
        firstname: impl Into<String>,
        lastname: impl Into<String>,
        phone: impl Into<String>,
    ) -> Result<Self> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(Error::Validation("Email is required".to_string()));
        }

        Ok(Self {
            email,
            firstname: firstname.into(),
            lastname: lastname.into(),
            phone: phone.into(),
        })
    }
}

impl UserAccount {
    pub fn new(id: Uuid, user: NewUserAccount) -> Self {
        let now = Utc::now();
        Self {
            id,
            email: user.email,
            firstname: user.firstname,
            lastname: user.lastname,
            phone: user.phone,
            contact_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn link_contact(&mut self, contact_id: impl Into<String>) {
        self.contact_id = Some(contact_id.into());
        self.updated_at = Utc::now();
    }
}
