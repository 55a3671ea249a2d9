//! In-memory user store with Argon2id password hashes

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use uuid::Uuid;

use crmsync_common::{Error, Result};

use super::UserStore;
use crate::domain::entities::{NewUserAccount, UserAccount};

#[derive(Debug, Clone)]
struct StoredUser {
    account: UserAccount,
    password_hash: String,
}

/// User store kept in process memory, for development and tests.
pub struct InMemoryUserStore {
    users: Mutex<HashMap<Uuid, StoredUser>>,
    params: Params,
}

impl std::fmt::Debug for InMemoryUserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryUserStore").finish_non_exhaustive()
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryUserStore {
    /// Store using the Argon2 default (OWASP-recommended) cost.
    pub fn new() -> Self {
        Self::with_params(Params::default())
    }

    /// Store with explicit Argon2 cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self {
            users: Mutex::new(HashMap::new()),
            params,
        }
    }

    /// Cheapest parameters Argon2 accepts, for tests.
    pub fn for_tests() -> Result<Self> {
        let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, 1, None)
            .map_err(|e| Error::Internal(format!("argon2 params error: {e}")))?;
        Ok(Self::with_params(params))
    }

    fn users(&self) -> Result<MutexGuard<'_, HashMap<Uuid, StoredUser>>> {
        self.users
            .lock()
            .map_err(|e| Error::Internal(format!("user store lock poisoned: {e}")))
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    async fn hash_password(&self, password: &str) -> Result<String> {
        let argon2 = self.hasher();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| Error::Internal(format!("password hashing failed: {e}")))
        })
        .await
        .map_err(|e| Error::Internal(format!("password hashing task failed: {e}")))?
    }

    async fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let argon2 = self.hasher();
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash)
                .map_err(|e| Error::Internal(format!("invalid hash format: {e}")))?;
            match argon2.verify_password(password.as_bytes(), &parsed) {
                Ok(()) => Ok(true),
                Err(argon2::password_hash::Error::Password) => Ok(false),
                Err(e) => Err(Error::Internal(format!("verify error: {e}"))),
            }
        })
        .await
        .map_err(|e| Error::Internal(format!("password verification task failed: {e}")))?
    }

    fn find(&self, email: &str) -> Result<Option<StoredUser>> {
        let users = self.users()?;
        let found = users.values().find(|u| u.account.email == email).cloned();
        Ok(found)
    }
}

#[async_trait::async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>> {
        Ok(self.find(email)?.map(|stored| stored.account))
    }

    async fn create(&self, user: NewUserAccount, password: &str) -> Result<UserAccount> {
        let password_hash = self.hash_password(password).await?;

        let mut users = self.users()?;
        if users.values().any(|u| u.account.email == user.email) {
            return Err(Error::Conflict("User already exists".to_string()));
        }

        let account = UserAccount::new(Uuid::new_v4(), user);
        users.insert(
            account.id,
            StoredUser {
                account: account.clone(),
                password_hash,
            },
        );

        tracing::debug!(user_id = %account.id, "Stored local user account");
        Ok(account)
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.users()?.remove(&id).is_some())
    }

    async fn link_contact(&self, id: Uuid, contact_id: &str) -> Result<UserAccount> {
        let mut users = self.users()?;
        let stored = users
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("User {} not found", id)))?;
        stored.account.link_contact(contact_id);
        Ok(stored.account.clone())
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserAccount>> {
        let Some(stored) = self.find(email)? else {
            return Ok(None);
        };

        if self.verify_password(password, &stored.password_hash).await? {
            Ok(Some(stored.account))
        } else {
            Ok(None)
        }
    }
}
