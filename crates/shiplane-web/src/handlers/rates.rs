//! Aggregated rate lookup endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use shiplane_core::{Address, CarrierSelection, RateAggregate, RateLookup, RatePreference};

use super::{parse_body, DimensionsBody};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesBody {
    pub carrier: Option<String>,
    pub from_address: Address,
    pub to_address: Address,
    pub weight: f64,
    pub dimensions: DimensionsBody,
    pub prefer: Option<String>,
    pub use_nearest_warehouse: Option<bool>,
}

/// `POST /shipping/rates`
///
/// Fans the lookup out to the selected carriers and answers with one slot
/// per carrier, successes and failures side by side. The whole request only
/// fails when the lookup itself is invalid.
pub async fn aggregated_rates(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let body: RatesBody = parse_body(body)?;

    let selection = match body.carrier.as_deref() {
        Some(raw) => raw.parse::<CarrierSelection>()?,
        None => CarrierSelection::Auto,
    };
    let prefer = body
        .prefer
        .as_deref()
        .map(str::parse::<RatePreference>)
        .transpose()?;
    let dimensions = body.dimensions.validated()?;

    let mut lookup = RateLookup::new(body.from_address, body.to_address, body.weight, dimensions)
        .with_selection(selection);
    if let Some(use_nearest_warehouse) = body.use_nearest_warehouse {
        lookup = lookup.with_use_nearest_warehouse(use_nearest_warehouse);
    }
    if let Some(preference) = prefer {
        lookup = lookup.with_preference(preference);
    }

    let aggregate = state.gateway.aggregated_rates(lookup).await?;
    Ok(Json(rates_response(&aggregate)))
}

/// One slot per carrier: `rates` on success, a structured `error` otherwise.
fn rates_response(aggregate: &RateAggregate) -> Value {
    let options: Vec<Value> = aggregate
        .options
        .iter()
        .map(|option| match &option.outcome {
            Ok(quotes) => json!({ "carrier": option.carrier, "rates": quotes }),
            Err(error) => json!({
                "carrier": option.carrier,
                "error": {
                    "code": error.code(),
                    "message": error.message(),
                    "retryable": error.retryable(),
                },
            }),
        })
        .collect();

    json!({
        "success": true,
        "origin": aggregate.origin,
        "options": options,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shiplane_core::{CarrierError, CarrierId, CarrierRateOutcome, RateQuote};

    fn address(city: &str) -> Address {
        Address::new("1 Main Rd", city, "GP", "ZA", "2000").expect("valid address")
    }

    #[test]
    fn response_keeps_successes_and_failures_side_by_side() {
        let aggregate = RateAggregate {
            origin: address("Johannesburg"),
            options: vec![
                CarrierRateOutcome {
                    carrier: CarrierId::Fedex,
                    outcome: Ok(vec![RateQuote {
                        carrier: CarrierId::Fedex,
                        service_code: Some(String::from("FEDEX_GROUND")),
                        service_name: Some(String::from("FedEx Ground")),
                        amount: Some(412.5),
                        currency: Some(String::from("ZAR")),
                        transit_days: Some(2),
                        raw: json!({}),
                    }]),
                },
                CarrierRateOutcome {
                    carrier: CarrierId::Ups,
                    outcome: Err(CarrierError::unavailable(
                        "carrier 'ups' returned status 503",
                    )),
                },
            ],
        };

        let response = rates_response(&aggregate);

        assert_eq!(response["success"], true);
        assert_eq!(response["origin"]["city"], "Johannesburg");
        assert_eq!(response["options"][0]["carrier"], "fedex");
        assert_eq!(response["options"][0]["rates"][0]["amount"], 412.5);
        assert_eq!(response["options"][1]["carrier"], "ups");
        assert_eq!(response["options"][1]["error"]["code"], "carrier.unavailable");
        assert_eq!(response["options"][1]["error"]["retryable"], true);
        assert!(response["options"][1].get("rates").is_none());
    }

    #[test]
    fn empty_rate_lists_stay_successful_slots() {
        let aggregate = RateAggregate {
            origin: address("Cape Town"),
            options: vec![CarrierRateOutcome {
                carrier: CarrierId::Dhl,
                outcome: Ok(Vec::new()),
            }],
        };

        let response = rates_response(&aggregate);
        assert_eq!(response["options"][0]["rates"], json!([]));
        assert!(response["options"][0].get("error").is_none());
    }
}
