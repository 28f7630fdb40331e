//! Shipment creation, tracking, and pickup endpoints.

use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use shiplane_core::{Address, CarrierId, Parcel, ShipmentRequest};

use super::{parse_body, DimensionsBody};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ParcelBody {
    pub weight: f64,
    pub dimensions: DimensionsBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
    pub carrier: Option<String>,
    pub from_address: Address,
    pub to_address: Address,
    pub parcel: ParcelBody,
    pub service_code: String,
    pub label_format: Option<String>,
    pub declared_value: Option<f64>,
    pub idempotency_key: Option<String>,
    pub use_nearest_warehouse: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct PickupBody {
    pub carrier: Option<String>,
    pub details: Value,
}

/// `POST /shipping/create`
///
/// Books a shipment with exactly one carrier. `"auto"` is a rate-lookup
/// concept and is rejected here before any adapter is touched. Unlike rate
/// lookups, the origin is only rewritten to the nearest warehouse when the
/// caller asks for it.
pub async fn create_shipment(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body: CreateBody = parse_body(body)?;

    let carrier = single_carrier(body.carrier.as_deref())?;
    let dimensions = body.parcel.dimensions.validated()?;
    let parcel = Parcel::new(body.parcel.weight, dimensions)?;

    let origin = if body.use_nearest_warehouse.unwrap_or(false) {
        state
            .gateway
            .selector()
            .pick_best(Some(&body.to_address))
            .dispatch_address()
    } else {
        body.from_address
    };

    let mut request = ShipmentRequest::new(origin, body.to_address, parcel, body.service_code)?;
    if let Some(label_format) = body.label_format {
        request = request.with_label_format(label_format);
    }
    if let Some(declared_value) = body.declared_value {
        request = request.with_declared_value(declared_value)?;
    }
    if let Some(idempotency_key) = body.idempotency_key {
        request = request.with_idempotency_key(idempotency_key);
    }

    let result = state.gateway.create_shipment(carrier, request).await?;
    Ok(Json(json!({
        "success": true,
        "carrier": carrier,
        "result": result,
    })))
}

/// `GET /shipping/track/:carrier/:tracking_number`
///
/// The carrier's tracking payload passes through untouched.
pub async fn track_shipment(
    State(state): State<AppState>,
    Path((carrier, tracking_number)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let carrier = single_carrier(Some(&carrier))?;
    let data = state.gateway.track(carrier, &tracking_number).await?;
    Ok(Json(json!({ "success": true, "carrier": carrier, "data": data })))
}

/// `POST /shipping/pickup`
///
/// Carrier pickup payloads share no schema, so `details` passes through
/// untouched in both directions.
pub async fn schedule_pickup(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body: PickupBody = parse_body(body)?;
    let carrier = single_carrier(body.carrier.as_deref())?;
    let data = state.gateway.schedule_pickup(carrier, body.details).await?;
    Ok(Json(json!({ "success": true, "carrier": carrier, "data": data })))
}

/// Parses the carrier for single-carrier endpoints. Absent, blank, and
/// `"auto"` values are all rejected.
fn single_carrier(raw: Option<&str>) -> Result<CarrierId, ApiError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            ApiError::BadRequest(String::from("request must name a carrier (fedex, ups, or dhl)"))
        })?;
    Ok(CarrierId::from_str(raw)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn single_carrier_accepts_the_three_carriers() {
        assert_eq!(single_carrier(Some("fedex")).expect("parses"), CarrierId::Fedex);
        assert_eq!(single_carrier(Some(" UPS ")).expect("parses"), CarrierId::Ups);
        assert_eq!(single_carrier(Some("dhl")).expect("parses"), CarrierId::Dhl);
    }

    #[test]
    fn auto_is_not_a_bookable_carrier() {
        let error = single_carrier(Some("auto")).expect_err("rejected");
        assert_eq!(error.status(), StatusCode::BAD_REQUEST);
        assert!(error.to_string().contains("auto"));
    }

    #[test]
    fn absent_and_blank_carriers_are_rejected() {
        assert!(single_carrier(None).is_err());
        assert!(single_carrier(Some("   ")).is_err());
    }
}
