//! Route handlers for the shipping API.

pub mod callbacks;
pub mod rates;
pub mod shipments;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use shiplane_core::Dimensions;

use crate::error::ApiError;
use crate::state::AppState;

/// Package dimensions as they arrive on the wire, centimetres throughout.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DimensionsBody {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl DimensionsBody {
    /// Range-checked [`Dimensions`]; zero or negative sides are a 400.
    pub(crate) fn validated(self) -> Result<Dimensions, ApiError> {
        Ok(Dimensions::new(self.length, self.width, self.height)?)
    }
}

/// Deserializes a JSON body, folding both transport-level rejections and
/// shape mismatches into a 400 with the standard envelope.
pub(crate) fn parse_body<T: DeserializeOwned>(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<T, ApiError> {
    let Json(value) = body.map_err(|rejection| {
        ApiError::BadRequest(format!("invalid request body: {}", rejection.body_text()))
    })?;
    serde_json::from_value(value)
        .map_err(|error| ApiError::BadRequest(format!("invalid request body: {error}")))
}

/// `GET /shipping/health`
///
/// Reports which carriers have a registered adapter.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "carriers": state.gateway.registered() }))
}
