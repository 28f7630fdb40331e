use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::adapter::{CarrierAdapter, CarrierError, RateRequest, ShipmentRequest};
use crate::config::FedexSettings;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::token::{parse_client_credentials_response, IssuedToken, TokenCache};
use crate::{Address, CarrierId, RateQuote, ShipmentResult};

/// FedEx REST adapter.
///
/// API calls carry a client-credentials bearer token from the shared cache.
/// A 401 invalidates the cached token and the call is retried once with a
/// fresh one before the failure is surfaced.
pub struct FedexAdapter {
    settings: FedexSettings,
    http_client: Arc<dyn HttpClient>,
    tokens: TokenCache,
}

impl FedexAdapter {
    pub fn new(settings: FedexSettings, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            settings,
            http_client,
            tokens: TokenCache::new(),
        }
    }

    async fn fetch_token(&self) -> Result<IssuedToken, CarrierError> {
        let body = format!(
            "grant_type=client_credentials&client_id={}&client_secret={}",
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.client_secret)
        );
        let request = HttpRequest::post(self.settings.token_url())
            .with_form_body(body)
            .with_timeout_ms(10_000);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| self.transport_error(e.message()))?;

        if !response.is_success() {
            return Err(CarrierError::from_upstream_status(
                CarrierId::Fedex,
                response.status,
            ));
        }

        parse_client_credentials_response(&response.body)
    }

    async fn bearer(&self) -> Result<String, CarrierError> {
        self.tokens.bearer(|| self.fetch_token()).await
    }

    /// Executes a bearer-authenticated call, retrying once with a fresh token
    /// when the carrier rejects the current one.
    async fn authed_call(
        &self,
        build: impl Fn(&str) -> HttpRequest,
    ) -> Result<String, CarrierError> {
        let bearer = self.bearer().await?;
        let response = self
            .http_client
            .execute(build(&bearer))
            .await
            .map_err(|e| self.transport_error(e.message()))?;

        let response = if response.status == 401 {
            self.tokens.invalidate().await;
            let bearer = self.bearer().await?;
            self.http_client
                .execute(build(&bearer))
                .await
                .map_err(|e| self.transport_error(e.message()))?
        } else {
            response
        };

        if !response.is_success() {
            return Err(CarrierError::from_upstream_status(
                CarrierId::Fedex,
                response.status,
            ));
        }

        Ok(response.body)
    }

    fn transport_error(&self, message: &str) -> CarrierError {
        CarrierError::unavailable(format!("fedex transport error: {message}"))
    }

    fn rate_payload(&self, req: &RateRequest) -> Value {
        let mut payload = json!({
            "requestedShipment": {
                "shipper": { "address": address_block(&req.origin) },
                "recipient": { "address": address_block(&req.destination) },
                "pickupType": "DROPOFF_AT_FEDEX_LOCATION",
                "rateRequestType": ["LIST", "ACCOUNT"],
                "requestedPackageLineItems": [{
                    "weight": { "units": "KG", "value": req.weight_kg },
                    "dimensions": {
                        "length": req.dimensions.length,
                        "width": req.dimensions.width,
                        "height": req.dimensions.height,
                        "units": "CM"
                    }
                }]
            }
        });
        if let Some(account) = &self.settings.account_number {
            payload["accountNumber"] = json!({ "value": account });
        }
        payload
    }

    fn shipment_payload(&self, req: &ShipmentRequest) -> Value {
        let mut line_item = json!({
            "weight": { "units": "KG", "value": req.parcel.weight_kg },
            "dimensions": {
                "length": req.parcel.dimensions.length,
                "width": req.parcel.dimensions.width,
                "height": req.parcel.dimensions.height,
                "units": "CM"
            }
        });
        if req.declared_value > 0.0 {
            line_item["declaredValue"] = json!({
                "amount": req.declared_value,
                "currency": super::DECLARED_VALUE_CURRENCY
            });
        }

        let mut payload = json!({
            "labelResponseOptions": "LABEL",
            "requestedShipment": {
                "shipper": { "address": address_block(&req.origin) },
                "recipients": [{ "address": address_block(&req.destination) }],
                "serviceType": req.service_code,
                "packagingType": "YOUR_PACKAGING",
                "pickupType": "DROPOFF_AT_FEDEX_LOCATION",
                "shippingChargesPayment": { "paymentType": "SENDER" },
                "labelSpecification": { "imageType": req.label_format },
                "requestedPackageLineItems": [line_item]
            }
        });
        if let Some(account) = &self.settings.account_number {
            payload["accountNumber"] = json!({ "value": account });
        }
        payload
    }
}

fn address_block(address: &Address) -> Value {
    json!({
        "streetLines": [address.street],
        "city": address.city,
        "stateOrProvinceCode": address.state,
        "postalCode": address.postal_code,
        "countryCode": address.country
    })
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FedexRateDetail {
    #[serde(default)]
    service_type: Option<String>,
    #[serde(default)]
    service_name: Option<String>,
    #[serde(default)]
    rated_shipment_details: Vec<FedexRatedShipmentDetail>,
    #[serde(default)]
    operational_detail: Option<FedexOperationalDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FedexRatedShipmentDetail {
    #[serde(default)]
    total_net_charge: Option<f64>,
    #[serde(default)]
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FedexOperationalDetail {
    #[serde(default)]
    transit_time: Option<String>,
}

/// FedEx reports transit time as a coded label rather than a number.
fn transit_days_from_code(code: &str) -> Option<u32> {
    match code {
        "ONE_DAY" => Some(1),
        "TWO_DAYS" => Some(2),
        "THREE_DAYS" => Some(3),
        "FOUR_DAYS" => Some(4),
        "FIVE_DAYS" => Some(5),
        "SIX_DAYS" => Some(6),
        "SEVEN_DAYS" => Some(7),
        "EIGHT_DAYS" => Some(8),
        "NINE_DAYS" => Some(9),
        "TEN_DAYS" => Some(10),
        _ => None,
    }
}

fn parse_rate_response(body: &str) -> Result<Vec<RateQuote>, CarrierError> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| CarrierError::internal(format!("failed to parse fedex rate response: {e}")))?;

    let Some(items) = parsed
        .pointer("/output/rateReplyDetails")
        .and_then(Value::as_array)
    else {
        return Ok(Vec::new());
    };

    let quotes = items
        .iter()
        .filter_map(|item| {
            let detail: FedexRateDetail = serde_json::from_value(item.clone()).ok()?;
            let charge = detail.rated_shipment_details.first();

            Some(RateQuote {
                carrier: CarrierId::Fedex,
                service_code: detail.service_type,
                service_name: detail.service_name,
                amount: charge.and_then(|c| c.total_net_charge),
                currency: charge.and_then(|c| c.currency.clone()),
                transit_days: detail
                    .operational_detail
                    .and_then(|od| od.transit_time)
                    .as_deref()
                    .and_then(transit_days_from_code),
                raw: item.clone(),
            })
        })
        .collect();

    Ok(quotes)
}

fn parse_shipment_response(body: &str) -> Result<ShipmentResult, CarrierError> {
    let raw: Value = serde_json::from_str(body).map_err(|e| {
        CarrierError::internal(format!("failed to parse fedex shipment response: {e}"))
    })?;

    let shipment = raw.pointer("/output/transactionShipments/0");
    let tracking_number = shipment
        .and_then(|s| s.pointer("/masterTrackingNumber"))
        .and_then(Value::as_str)
        .map(String::from);
    let label = shipment
        .and_then(|s| s.pointer("/pieceResponses/0/packageDocuments/0/encodedLabel"))
        .and_then(Value::as_str)
        .map(String::from);

    Ok(ShipmentResult {
        carrier: CarrierId::Fedex,
        tracking_number,
        label,
        raw,
    })
}

impl CarrierAdapter for FedexAdapter {
    fn id(&self) -> CarrierId {
        CarrierId::Fedex
    }

    fn rates<'a>(
        &'a self,
        req: RateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RateQuote>, CarrierError>> + Send + 'a>> {
        Box::pin(async move {
            let payload = self.rate_payload(&req);
            let body = payload.to_string();
            let url = format!("{}/rate/v1/rates/quotes", self.settings.base_url);

            let response_body = self
                .authed_call(|bearer| {
                    HttpRequest::post(&url)
                        .with_json_body(body.clone())
                        .with_auth(&HttpAuth::BearerToken(String::from(bearer)))
                        .with_timeout_ms(10_000)
                })
                .await?;

            parse_rate_response(&response_body)
        })
    }

    fn create_shipment<'a>(
        &'a self,
        req: ShipmentRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ShipmentResult, CarrierError>> + Send + 'a>> {
        Box::pin(async move {
            let payload = self.shipment_payload(&req);
            let body = payload.to_string();
            let url = format!("{}/ship/v1/shipments", self.settings.base_url);
            let idempotency_key = req.idempotency_key.clone();

            let response_body = self
                .authed_call(|bearer| {
                    let mut request = HttpRequest::post(&url)
                        .with_json_body(body.clone())
                        .with_auth(&HttpAuth::BearerToken(String::from(bearer)))
                        .with_timeout_ms(15_000);
                    if let Some(key) = &idempotency_key {
                        request = request.with_header("x-customer-transaction-id", key);
                    }
                    request
                })
                .await?;

            parse_shipment_response(&response_body)
        })
    }

    fn track<'a>(
        &'a self,
        tracking_number: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value, CarrierError>> + Send + 'a>> {
        Box::pin(async move {
            let payload = json!({
                "includeDetailedScans": true,
                "trackingInfo": [{
                    "trackingNumberInfo": { "trackingNumber": tracking_number }
                }]
            });
            let body = payload.to_string();
            let url = format!("{}/track/v1/trackingnumbers", self.settings.base_url);

            let response_body = self
                .authed_call(|bearer| {
                    HttpRequest::post(&url)
                        .with_json_body(body.clone())
                        .with_auth(&HttpAuth::BearerToken(String::from(bearer)))
                        .with_timeout_ms(10_000)
                })
                .await?;

            serde_json::from_str(&response_body).map_err(|e| {
                CarrierError::internal(format!("failed to parse fedex tracking response: {e}"))
            })
        })
    }

    fn schedule_pickup<'a>(
        &'a self,
        details: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, CarrierError>> + Send + 'a>> {
        Box::pin(async move {
            let body = details.to_string();
            let url = format!("{}/pickup/v1/pickups", self.settings.base_url);

            let response_body = self
                .authed_call(|bearer| {
                    HttpRequest::post(&url)
                        .with_json_body(body.clone())
                        .with_auth(&HttpAuth::BearerToken(String::from(bearer)))
                        .with_timeout_ms(10_000)
                })
                .await?;

            serde_json::from_str(&response_body).map_err(|e| {
                CarrierError::internal(format!("failed to parse fedex pickup response: {e}"))
            })
        })
    }
}
