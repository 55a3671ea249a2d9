//! Local account storage
//!
//! The store owns persistence and password hashing; the account service only
//! sees accounts and yes/no answers on credentials.

pub mod users;

use crmsync_common::Result;
use uuid::Uuid;

use crate::domain::entities::{NewUserAccount, UserAccount};

pub use users::InMemoryUserStore;

#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Find an account by normalized email
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>>;

    /// Create an account. Fails with `Conflict` if the email is taken.
    async fn create(&self, user: NewUserAccount, password: &str) -> Result<UserAccount>;

    /// Delete an account. Returns whether it existed.
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Record the CRM contact id for an account
    async fn link_contact(&self, id: Uuid, contact_id: &str) -> Result<UserAccount>;

    /// The account for `email` if `password` matches, otherwise `None`
    async fn verify_credentials(&self, email: &str, password: &str)
        -> Result<Option<UserAccount>>;
}
