//! OAuth authorization-code exchange against carrier token endpoints.
//!
//! The carriers redirect the user's browser back to this service with a
//! `code` query parameter; [`OAuthExchanger`] turns that code into an access
//! and refresh token pair with a form-encoded `grant_type=authorization_code`
//! POST. The exchange runs over the same [`HttpClient`] seam the carrier
//! adapters use.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use shiplane_core::{HttpClient, HttpRequest};

const EXCHANGE_TIMEOUT_MS: u64 = 10_000;

/// Inputs for one authorization-code exchange.
#[derive(Debug, Clone)]
pub struct AuthCodeExchange {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub code: String,
}

impl AuthCodeExchange {
    /// Form-encoded request body. Blank optional fields are left out rather
    /// than sent empty, some token endpoints reject empty parameters.
    fn form_body(&self) -> String {
        let mut body = format!(
            "grant_type=authorization_code&code={}&client_id={}",
            urlencoding::encode(self.code.trim()),
            urlencoding::encode(self.client_id.trim()),
        );
        if let Some(redirect_uri) = trimmed(self.redirect_uri.as_deref()) {
            body.push_str("&redirect_uri=");
            body.push_str(&urlencoding::encode(redirect_uri));
        }
        if let Some(client_secret) = trimmed(self.client_secret.as_deref()) {
            body.push_str("&client_secret=");
            body.push_str(&urlencoding::encode(client_secret));
        }
        body
    }
}

/// Token set issued by a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    pub refresh_token: Option<String>,
    /// Reported token lifetime. `None` when the endpoint omitted it or
    /// reported a non-positive value.
    pub expires_in_secs: Option<i64>,
}

/// Failure of an authorization-code exchange.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("token endpoint request failed: {0}")]
    Transport(String),

    #[error("token endpoint returned status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    #[error("token response invalid: {0}")]
    InvalidResponse(String),
}

/// Carrier-agnostic authorization-code exchanger.
pub struct OAuthExchanger {
    http_client: Arc<dyn HttpClient>,
}

impl OAuthExchanger {
    pub fn new(http_client: Arc<dyn HttpClient>) -> Self {
        Self { http_client }
    }

    /// Exchanges an authorization code for a token grant.
    ///
    /// # Errors
    ///
    /// Returns [`ExchangeError`] when the token endpoint is unreachable,
    /// rejects the code, or answers without an `access_token`.
    pub async fn exchange_authorization_code(
        &self,
        exchange: &AuthCodeExchange,
    ) -> Result<TokenGrant, ExchangeError> {
        let request = HttpRequest::post(&exchange.token_url)
            .with_form_body(exchange.form_body())
            .with_timeout_ms(EXCHANGE_TIMEOUT_MS);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|error| ExchangeError::Transport(error.message().to_owned()))?;

        if !response.is_success() {
            return Err(ExchangeError::Rejected {
                status: response.status,
                reason: oauth_error_reason(&response.body),
            });
        }

        parse_token_grant(&response.body)
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn parse_token_grant(body: &str) -> Result<TokenGrant, ExchangeError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| ExchangeError::InvalidResponse(format!("not json: {error}")))?;

    let access_token = value
        .get("access_token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ExchangeError::InvalidResponse(String::from("missing access_token")))?
        .to_owned();

    let refresh_token = value
        .get("refresh_token")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned);

    let expires_in_secs = value
        .get("expires_in")
        .and_then(parse_secs_lossy)
        .filter(|secs| *secs > 0);

    Ok(TokenGrant {
        access_token,
        refresh_token,
        expires_in_secs,
    })
}

/// Token endpoints report `expires_in` as either a number or a decimal string.
fn parse_secs_lossy(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Pulls the standard `error`/`error_description` fields out of a failed
/// token response. The raw body is never echoed, it can carry token material.
fn oauth_error_reason(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return String::from("no error detail provided");
    };

    let code = value
        .get("error")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|code| !code.is_empty());
    let description = value
        .get("error_description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|description| !description.is_empty());

    match (code, description) {
        (Some(code), Some(description)) => format!("{code} ({description})"),
        (Some(code), None) => code.to_owned(),
        (None, Some(description)) => description.to_owned(),
        (None, None) => String::from("no error detail provided"),
    }
}
