//! OAuth access-token lease
//!
//! HubSpot access tokens are short-lived. The lease holds the current
//! credential and swaps in a fresh one from the refresh-token exchange when a
//! caller asks for a token at or after its expiry. Renewal is lazy: nothing
//! happens until the next outbound call.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::CrmError;

/// Static client credentials for the refresh-token grant
#[derive(Clone)]
pub struct RefreshGrant {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for RefreshGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshGrant")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Token endpoint response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// An access token and the instant it stops being usable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Credential {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Performs the refresh-token exchange against the OAuth endpoint.
#[async_trait::async_trait]
pub trait TokenExchange: Send + Sync {
    async fn exchange_refresh_token(&self, grant: &RefreshGrant) -> Result<TokenGrant, CrmError>;
}

/// Shared, lazily renewed access credential.
///
/// The credential is replaced wholesale, so readers always see a complete
/// old or new value. Renewals are single-flight: callers that find the
/// credential expired queue on `renewal` and re-check before exchanging.
pub struct TokenLease {
    exchange: Arc<dyn TokenExchange>,
    grant: RefreshGrant,
    current: RwLock<Option<Arc<Credential>>>,
    renewal: Mutex<()>,
}

impl TokenLease {
    pub fn new(exchange: Arc<dyn TokenExchange>, grant: RefreshGrant) -> Self {
        Self {
            exchange,
            grant,
            current: RwLock::new(None),
            renewal: Mutex::new(()),
        }
    }

    /// A token that is valid right now, renewing first if needed.
    pub async fn access_token(&self) -> Result<String, CrmError> {
        self.access_token_at(Utc::now()).await
    }

    /// A token that is valid at `now`, renewing first if needed.
    pub async fn access_token_at(&self, now: DateTime<Utc>) -> Result<String, CrmError> {
        if let Some(credential) = self.valid_credential(now) {
            return Ok(credential.access_token.clone());
        }

        let _guard = self.renewal.lock().await;

        // Another caller may have renewed while we waited.
        if let Some(credential) = self.valid_credential(now) {
            return Ok(credential.access_token.clone());
        }

        let credential = Arc::new(self.renew(now).await?);
        *self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(credential.clone());

        Ok(credential.access_token.clone())
    }

    /// The credential currently held, valid or not
    pub fn credential(&self) -> Option<Arc<Credential>> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn valid_credential(&self, now: DateTime<Utc>) -> Option<Arc<Credential>> {
        self.credential().filter(|c| c.is_valid_at(now))
    }

    async fn renew(&self, now: DateTime<Utc>) -> Result<Credential, CrmError> {
        let grant = self
            .exchange
            .exchange_refresh_token(&self.grant)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "CRM access token exchange failed");
                e
            })?;

        let expires_at = TimeDelta::try_seconds(grant.expires_in)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                CrmError::TokenExchange(format!("invalid expires_in: {}", grant.expires_in))
            })?;

        tracing::info!(expires_at = %expires_at, "Refreshed CRM access token");

        Ok(Credential {
            access_token: grant.access_token,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingExchange {
        calls: AtomicUsize,
        ttl: i64,
        fail: bool,
    }

    impl CountingExchange {
        fn new(ttl: i64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                ttl,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new(60)
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl TokenExchange for CountingExchange {
        async fn exchange_refresh_token(
            &self,
            grant: &RefreshGrant,
        ) -> Result<TokenGrant, CrmError> {
            assert_eq!(grant.refresh_token, "refresh-xyz");
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            // Give racing callers a chance to pile up behind the renewal guard.
            tokio::task::yield_now().await;
            if self.fail {
                return Err(CrmError::TokenExchange("invalid_grant".to_string()));
            }
            Ok(TokenGrant {
                access_token: format!("token-{n}"),
                expires_in: self.ttl,
            })
        }
    }

    fn grant() -> RefreshGrant {
        RefreshGrant {
            client_id: "client-123".to_string(),
            client_secret: "secret-abc".to_string(),
            refresh_token: "refresh-xyz".to_string(),
        }
    }

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    // HUB-U17: First use performs exactly one exchange
    #[tokio::test]
    async fn test_first_use_exchanges_once() {
        let exchange = Arc::new(CountingExchange::new(1800));
        let lease = TokenLease::new(exchange.clone(), grant());

        assert!(lease.credential().is_none());
        let token = lease.access_token_at(t0()).await.unwrap();

        assert_eq!(token, "token-1");
        assert_eq!(exchange.calls(), 1);
        let credential = lease.credential().unwrap();
        assert_eq!(credential.expires_at, t0() + TimeDelta::seconds(1800));
    }

    // HUB-U18: Unexpired credential is reused without an exchange
    #[tokio::test]
    async fn test_valid_credential_is_reused() {
        let exchange = Arc::new(CountingExchange::new(1800));
        let lease = TokenLease::new(exchange.clone(), grant());

        lease.access_token_at(t0()).await.unwrap();
        let token = lease
            .access_token_at(t0() + TimeDelta::seconds(1799))
            .await
            .unwrap();

        assert_eq!(token, "token-1");
        assert_eq!(exchange.calls(), 1);
    }

    // HUB-U19: Expired credential renews exactly once
    #[tokio::test]
    async fn test_expired_credential_renews_exactly_once() {
        let exchange = Arc::new(CountingExchange::new(1800));
        let lease = TokenLease::new(exchange.clone(), grant());

        lease.access_token_at(t0()).await.unwrap();

        // now == expires_at counts as expired
        let expiry = t0() + TimeDelta::seconds(1800);
        let token = lease.access_token_at(expiry).await.unwrap();
        assert_eq!(token, "token-2");
        assert_eq!(exchange.calls(), 2);

        let again = lease.access_token_at(expiry).await.unwrap();
        assert_eq!(again, "token-2");
        assert_eq!(exchange.calls(), 2);
    }

    // HUB-U20: Concurrent callers share one renewal
    #[tokio::test]
    async fn test_concurrent_callers_share_one_renewal() {
        let exchange = Arc::new(CountingExchange::new(1800));
        let lease = Arc::new(TokenLease::new(exchange.clone(), grant()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let lease = lease.clone();
            handles.push(tokio::spawn(
                async move { lease.access_token_at(t0()).await },
            ));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "token-1");
        }
        assert_eq!(exchange.calls(), 1);
    }

    // HUB-U21: Exchange failure propagates and caches nothing
    #[tokio::test]
    async fn test_exchange_failure_propagates_and_keeps_no_credential() {
        let exchange = Arc::new(CountingExchange::failing());
        let lease = TokenLease::new(exchange.clone(), grant());

        let err = lease.access_token_at(t0()).await.unwrap_err();
        assert!(matches!(err, CrmError::TokenExchange(_)));
        assert!(lease.credential().is_none());

        // Not retried internally; the next call tries again.
        let _ = lease.access_token_at(t0()).await;
        assert_eq!(exchange.calls(), 2);
    }

    // HUB-U22: Absurd expires_in is an exchange error, not a panic
    #[tokio::test]
    async fn test_out_of_range_lifetime_is_exchange_error() {
        let exchange = Arc::new(CountingExchange::new(9_000_000_000_000_000));
        let lease = TokenLease::new(exchange.clone(), grant());

        let err = lease.access_token_at(t0()).await.unwrap_err();
        assert_eq!(
            err,
            CrmError::TokenExchange("invalid expires_in: 9000000000000000".to_string())
        );
        assert!(lease.credential().is_none());
    }

    // HUB-U23: Refresh grant Debug hides secrets
    #[test]
    fn test_refresh_grant_debug_redacts_secrets() {
        let debug = format!("{:?}", grant());
        assert!(debug.contains("client-123"));
        assert!(!debug.contains("secret-abc"));
        assert!(!debug.contains("refresh-xyz"));
    }
}
