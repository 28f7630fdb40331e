//! OAuth authorization-code callbacks for DHL and FedEx.
//!
//! Both callbacks do the same work: exchange the `code` for a token grant
//! and persist it keyed by user and carrier. They differ only in how they
//! answer the browser. DHL's console registers an API-style redirect URI and
//! gets JSON back; FedEx registers a browser-facing one and gets a redirect
//! to the dashboard.

use axum::extract::{Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use time::{Duration, OffsetDateTime};

use shiplane_core::{CarrierId, CarrierSettings};

use crate::error::ApiError;
use crate::oauth::{AuthCodeExchange, TokenGrant};
use crate::state::AppState;
use crate::token_store::StoredToken;

/// User bucket for callbacks that arrive without a `user_id`.
const DEFAULT_USER_ID: &str = "default";

/// Where the browser lands after the FedEx exchange.
const FEDEX_CONNECTED_PATH: &str = "/dashboard/shipping?fedex=connected";
const FEDEX_FAILED_PATH: &str = "/dashboard/shipping?fedex=error";

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub user_id: Option<String>,
}

impl CallbackQuery {
    /// The authorization code, or a 400 when it is absent or blank. Nothing
    /// is exchanged or persisted in that case.
    fn code(&self) -> Result<String, ApiError> {
        self.code
            .as_deref()
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| {
                ApiError::BadRequest(String::from("callback is missing the authorization code"))
            })
    }

    fn user_id(&self) -> String {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|user_id| !user_id.is_empty())
            .map(str::to_owned)
            .unwrap_or_else(|| String::from(DEFAULT_USER_ID))
    }
}

/// `GET /shipping/dhl/callback`
///
/// Tokens are only persisted after a successful exchange; the response
/// confirms the grant without echoing token material.
pub async fn dhl_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<Value>, ApiError> {
    let code = query.code()?;
    let exchange = dhl_exchange(&state.settings, code)?;
    let grant = state.oauth.exchange_authorization_code(&exchange).await?;
    let stored = persist_grant(&state, query.user_id(), CarrierId::Dhl, grant).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "userId": stored.user_id,
            "carrier": stored.carrier,
            "expiresAt": stored.expires_at.map(OffsetDateTime::unix_timestamp),
        },
    })))
}

/// `GET /shipping/fedex/callback`
///
/// A missing code is still a 400: there is nothing to exchange and nowhere
/// sensible to send the user. After that point the browser is always
/// redirected, to the dashboard when the grant was stored and to the error
/// page otherwise.
pub async fn fedex_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, ApiError> {
    let code = query.code()?;

    let outcome = async {
        let exchange = fedex_exchange(&state.settings, code)?;
        let grant = state.oauth.exchange_authorization_code(&exchange).await?;
        persist_grant(&state, query.user_id(), CarrierId::Fedex, grant).await
    }
    .await;

    match outcome {
        Ok(_) => Ok(Redirect::to(FEDEX_CONNECTED_PATH)),
        Err(error) => {
            tracing::warn!(error = %error, "fedex token exchange failed");
            Ok(Redirect::to(FEDEX_FAILED_PATH))
        }
    }
}

fn dhl_exchange(settings: &CarrierSettings, code: String) -> Result<AuthCodeExchange, ApiError> {
    let dhl = settings
        .dhl
        .as_ref()
        .ok_or(ApiError::OauthUnconfigured(CarrierId::Dhl))?;
    let client_id = dhl
        .client_id
        .clone()
        .ok_or(ApiError::OauthUnconfigured(CarrierId::Dhl))?;

    Ok(AuthCodeExchange {
        token_url: dhl.token_url(),
        client_id,
        client_secret: dhl.client_secret.clone(),
        redirect_uri: dhl.redirect_uri.clone(),
        code,
    })
}

fn fedex_exchange(settings: &CarrierSettings, code: String) -> Result<AuthCodeExchange, ApiError> {
    let fedex = settings
        .fedex
        .as_ref()
        .ok_or(ApiError::OauthUnconfigured(CarrierId::Fedex))?;

    Ok(AuthCodeExchange {
        token_url: fedex.token_url(),
        client_id: fedex.client_id.clone(),
        client_secret: Some(fedex.client_secret.clone()),
        redirect_uri: fedex.redirect_uri.clone(),
        code,
    })
}

async fn persist_grant(
    state: &AppState,
    user_id: String,
    carrier: CarrierId,
    grant: TokenGrant,
) -> Result<StoredToken, ApiError> {
    let expires_at = grant
        .expires_in_secs
        .map(|secs| OffsetDateTime::now_utc() + Duration::seconds(secs));

    let token = StoredToken {
        user_id,
        carrier,
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
        expires_at,
    };
    state.token_store.put(token.clone()).await?;
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use shiplane_core::{DhlSettings, FedexSettings};

    fn query(code: Option<&str>, user_id: Option<&str>) -> CallbackQuery {
        CallbackQuery {
            code: code.map(String::from),
            user_id: user_id.map(String::from),
        }
    }

    fn settings_with_oauth() -> CarrierSettings {
        CarrierSettings {
            fedex: Some(FedexSettings {
                base_url: String::from("https://apis.fedex.com"),
                client_id: String::from("fedex-id"),
                client_secret: String::from("fedex-secret"),
                redirect_uri: Some(String::from("https://shop.example/shipping/fedex/callback")),
                account_number: None,
            }),
            ups: None,
            dhl: Some(DhlSettings {
                base_url: String::from("https://express.api.dhl.com/mydhlapi"),
                api_key: String::from("dhl-key"),
                client_id: Some(String::from("dhl-app-id")),
                client_secret: Some(String::from("dhl-app-secret")),
                redirect_uri: Some(String::from("https://shop.example/shipping/dhl/callback")),
                account_number: None,
            }),
        }
    }

    #[test]
    fn missing_and_blank_codes_are_client_errors() {
        let error = query(None, None).code().expect_err("rejected");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);

        let error = query(Some("   "), None).code().expect_err("rejected");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn user_id_falls_back_to_the_default_bucket() {
        assert_eq!(query(Some("c"), None).user_id(), "default");
        assert_eq!(query(Some("c"), Some("  ")).user_id(), "default");
        assert_eq!(query(Some("c"), Some("alice")).user_id(), "alice");
    }

    #[test]
    fn dhl_exchange_uses_the_oauth_app_settings() {
        let exchange = dhl_exchange(&settings_with_oauth(), String::from("code-1"))
            .expect("exchange builds");

        assert_eq!(
            exchange.token_url,
            "https://express.api.dhl.com/mydhlapi/oauth/token"
        );
        assert_eq!(exchange.client_id, "dhl-app-id");
        assert_eq!(exchange.client_secret.as_deref(), Some("dhl-app-secret"));
        assert_eq!(exchange.code, "code-1");
    }

    #[test]
    fn dhl_exchange_requires_an_oauth_client_id() {
        let mut settings = settings_with_oauth();
        settings.dhl.as_mut().expect("dhl present").client_id = None;

        let error = dhl_exchange(&settings, String::from("code-1")).expect_err("rejected");
        assert_eq!(error.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.to_string().contains("oauth client"));
    }

    #[test]
    fn fedex_exchange_reuses_the_api_credentials() {
        let exchange = fedex_exchange(&settings_with_oauth(), String::from("code-2"))
            .expect("exchange builds");

        assert_eq!(exchange.token_url, "https://apis.fedex.com/oauth/token");
        assert_eq!(exchange.client_id, "fedex-id");
        assert_eq!(exchange.client_secret.as_deref(), Some("fedex-secret"));
    }

    #[test]
    fn fedex_exchange_without_settings_is_unconfigured() {
        let error = fedex_exchange(&CarrierSettings::default(), String::from("code-3"))
            .expect_err("rejected");
        assert!(matches!(error, ApiError::OauthUnconfigured(CarrierId::Fedex)));
    }
}
