//! OAuth token caching for carrier adapters.
//!
//! FedEx and UPS authenticate API calls with short-lived client-credentials
//! tokens. Each adapter owns one [`TokenCache`]; the cache hands out the
//! stored bearer until it is within the refresh skew of expiry, then fetches
//! a replacement. The async mutex is held across the fetch, so concurrent
//! requests that miss perform exactly one token call between them.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use crate::adapter::CarrierError;

/// Lifetime assumed when a token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3_600;

/// Bearer token issued by a carrier token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in_secs: u64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    bearer: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Per-adapter OAuth token cache with single-flight refresh.
#[derive(Debug)]
pub struct TokenCache {
    slot: Mutex<Option<CachedToken>>,
    refresh_skew: Duration,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::with_refresh_skew(Duration::from_secs(60))
    }

    /// A cache that treats tokens as stale `refresh_skew` before their
    /// reported expiry, so calls never race the carrier's clock.
    pub fn with_refresh_skew(refresh_skew: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            refresh_skew,
        }
    }

    /// Returns a fresh bearer token, calling `refresh` when the cached one is
    /// missing or stale. The slot stays locked for the duration of the fetch.
    pub async fn bearer<F, Fut>(&self, refresh: F) -> Result<String, CarrierError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuedToken, CarrierError>>,
    {
        let mut slot = self.slot.lock().await;
        let now = Instant::now();

        if let Some(cached) = slot.as_ref() {
            if cached.is_fresh(now) {
                return Ok(cached.bearer.clone());
            }
        }

        let issued = refresh().await?;
        let lifetime = Duration::from_secs(issued.expires_in_secs).saturating_sub(self.refresh_skew);
        let cached = CachedToken {
            bearer: issued.access_token,
            expires_at: now + lifetime,
        };
        let bearer = cached.bearer.clone();
        *slot = Some(cached);
        Ok(bearer)
    }

    /// Drops any cached token so the next call re-authenticates.
    pub async fn invalidate(&self) {
        *self.slot.lock().await = None;
    }
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponseBody {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Parses a client-credentials token response body.
///
/// `access_token` is required; `expires_in` falls back to one hour when the
/// carrier omits it.
pub fn parse_client_credentials_response(body: &str) -> Result<IssuedToken, CarrierError> {
    let parsed: TokenResponseBody = serde_json::from_str(body)
        .map_err(|e| CarrierError::internal(format!("failed to parse token response: {e}")))?;

    let access_token = parsed
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            CarrierError::unavailable("token response did not include an access_token")
        })?;

    Ok(IssuedToken {
        access_token,
        expires_in_secs: parsed.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
    })
}
