//! Persistence seam for OAuth tokens obtained through the callback flow.
//!
//! Tokens are keyed by `(user_id, carrier)`; a second grant for the same key
//! replaces the first. The bundled [`InMemoryTokenStore`] keeps everything in
//! process memory, a deployment that needs tokens to survive restarts plugs
//! its own [`TokenStore`] into the application state.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use shiplane_core::CarrierId;

/// Failure raised by a token store backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("token store error: {0}")]
pub struct TokenStoreError(pub String);

/// OAuth tokens persisted for one user and carrier.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredToken {
    pub user_id: String,
    pub carrier: CarrierId,
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Absolute expiry. `None` when the token endpoint reported no lifetime.
    pub expires_at: Option<OffsetDateTime>,
}

impl StoredToken {
    /// Whether the token is still usable at `now`. Tokens without a reported
    /// expiry never go stale here.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        self.expires_at.map_or(true, |expires_at| now < expires_at)
    }
}

/// Token persistence contract used by the callback handlers.
pub trait TokenStore: Send + Sync {
    fn put<'a>(
        &'a self,
        token: StoredToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), TokenStoreError>> + Send + 'a>>;

    fn get<'a>(
        &'a self,
        user_id: &'a str,
        carrier: CarrierId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<StoredToken>, TokenStoreError>> + Send + 'a>>;
}

/// Process-local token store.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    tokens: RwLock<HashMap<(String, CarrierId), StoredToken>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TokenStore for InMemoryTokenStore {
    fn put<'a>(
        &'a self,
        token: StoredToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), TokenStoreError>> + Send + 'a>> {
        Box::pin(async move {
            let key = (token.user_id.clone(), token.carrier);
            self.tokens.write().await.insert(key, token);
            Ok(())
        })
    }

    fn get<'a>(
        &'a self,
        user_id: &'a str,
        carrier: CarrierId,
    ) -> Pin<Box<dyn Future<Output = Result<Option<StoredToken>, TokenStoreError>> + Send + 'a>>
    {
        Box::pin(async move {
            let key = (user_id.to_owned(), carrier);
            Ok(self.tokens.read().await.get(&key).cloned())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn token(user_id: &str, carrier: CarrierId, access_token: &str) -> StoredToken {
        StoredToken {
            user_id: String::from(user_id),
            carrier,
            access_token: String::from(access_token),
            refresh_token: None,
            expires_at: None,
        }
    }

    #[tokio::test]
    async fn stored_tokens_come_back_for_their_user_and_carrier() {
        let store = InMemoryTokenStore::new();
        store
            .put(token("alice", CarrierId::Dhl, "dhl-token"))
            .await
            .expect("store accepts the token");

        let found = store
            .get("alice", CarrierId::Dhl)
            .await
            .expect("store reads")
            .expect("token present");
        assert_eq!(found.access_token, "dhl-token");

        let missing = store
            .get("alice", CarrierId::Fedex)
            .await
            .expect("store reads");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn a_second_grant_replaces_the_first() {
        let store = InMemoryTokenStore::new();
        store
            .put(token("alice", CarrierId::Dhl, "first"))
            .await
            .expect("store accepts the token");
        store
            .put(token("alice", CarrierId::Dhl, "second"))
            .await
            .expect("store accepts the token");

        let found = store
            .get("alice", CarrierId::Dhl)
            .await
            .expect("store reads")
            .expect("token present");
        assert_eq!(found.access_token, "second");
    }

    #[tokio::test]
    async fn users_do_not_see_each_others_tokens() {
        let store = InMemoryTokenStore::new();
        store
            .put(token("alice", CarrierId::Ups, "alice-token"))
            .await
            .expect("store accepts the token");

        let missing = store.get("bob", CarrierId::Ups).await.expect("store reads");
        assert!(missing.is_none());
    }

    #[test]
    fn validity_follows_the_recorded_expiry() {
        let now = OffsetDateTime::now_utc();

        let mut stored = token("alice", CarrierId::Dhl, "t");
        assert!(stored.is_valid_at(now));

        stored.expires_at = Some(now + Duration::hours(1));
        assert!(stored.is_valid_at(now));

        stored.expires_at = Some(now - Duration::seconds(1));
        assert!(!stored.is_valid_at(now));
    }
}
