//! Error envelope for the HTTP surface.
//!
//! Every failure leaves the API as `{ "success": false, "error": "..." }`
//! with a status that tells the caller whose fault it was: 400 for requests
//! rejected before any carrier call, 500 for carrier-side failures, 502 when
//! an OAuth token endpoint turns the exchange down.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use shiplane_core::{CarrierError, CarrierErrorKind, CarrierId, ValidationError};

use crate::oauth::ExchangeError;
use crate::token_store::TokenStoreError;

/// Route-level error, mapped to a status code and the standard envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request rejected before any carrier was touched.
    #[error("{0}")]
    BadRequest(String),

    /// A gateway call failed; the carrier's message is surfaced as-is so an
    /// unconfigured carrier stays distinguishable from an unreachable one.
    #[error("{}", .0.message())]
    Carrier(CarrierError),

    /// The carrier's OAuth app credentials are absent from the environment.
    #[error("carrier '{0}' has no oauth client configured")]
    OauthUnconfigured(CarrierId),

    /// The authorization-code exchange failed upstream.
    #[error("{0}")]
    TokenExchange(String),

    /// Unexpected failure. The detail is logged, the response stays generic.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Carrier(_) | Self::OauthUnconfigured(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::TokenExchange(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(detail) => {
                tracing::error!(%detail, "request failed unexpectedly");
                String::from("internal server error")
            }
            other => {
                if status.is_server_error() {
                    tracing::error!(error = %other, "request failed");
                }
                other.to_string()
            }
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

impl From<CarrierError> for ApiError {
    fn from(error: CarrierError) -> Self {
        match error.kind() {
            CarrierErrorKind::InvalidRequest => Self::BadRequest(error.message().to_owned()),
            _ => Self::Carrier(error),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(error: ValidationError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

impl From<ExchangeError> for ApiError {
    fn from(error: ExchangeError) -> Self {
        Self::TokenExchange(error.to_string())
    }
}

impl From<TokenStoreError> for ApiError {
    fn from(error: TokenStoreError) -> Self {
        Self::Internal(error.to_string())
    }
}
