use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::adapter::{CarrierAdapter, CarrierError, RateRequest, ShipmentRequest};
use crate::config::UpsSettings;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::token::{parse_client_credentials_response, IssuedToken, TokenCache};
use crate::{Address, CarrierId, RateQuote, ShipmentResult};

/// UPS REST adapter.
///
/// The token endpoint takes the client id and secret as HTTP Basic
/// credentials rather than form fields. Numeric fields in UPS payloads are
/// strings on the wire, and single-element collections come back as bare
/// objects instead of one-element arrays.
pub struct UpsAdapter {
    settings: UpsSettings,
    http_client: Arc<dyn HttpClient>,
    tokens: TokenCache,
}

impl UpsAdapter {
    pub fn new(settings: UpsSettings, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            settings,
            http_client,
            tokens: TokenCache::new(),
        }
    }

    async fn fetch_token(&self) -> Result<IssuedToken, CarrierError> {
        let request = HttpRequest::post(self.settings.token_url())
            .with_form_body("grant_type=client_credentials")
            .with_auth(&HttpAuth::Basic {
                username: self.settings.client_id.clone(),
                password: self.settings.client_secret.clone(),
            })
            .with_timeout_ms(10_000);

        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| self.transport_error(e.message()))?;

        if !response.is_success() {
            return Err(CarrierError::from_upstream_status(
                CarrierId::Ups,
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
        let request = build(&bearer).with_header("transactionSrc", "shiplane");
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(|e| self.transport_error(e.message()))?;

        let response = if response.status == 401 {
            self.tokens.invalidate().await;
            let bearer = self.bearer().await?;
            let request = build(&bearer).with_header("transactionSrc", "shiplane");
            self.http_client
                .execute(request)
                .await
                .map_err(|e| self.transport_error(e.message()))?
        } else {
            response
        };

        if !response.is_success() {
            return Err(CarrierError::from_upstream_status(
                CarrierId::Ups,
                response.status,
            ));
        }

        Ok(response.body)
    }

    fn transport_error(&self, message: &str) -> CarrierError {
        CarrierError::unavailable(format!("ups transport error: {message}"))
    }

    fn rate_payload(&self, req: &RateRequest) -> Value {
        let mut shipper = json!({ "Address": address_block(&req.origin) });
        if let Some(account) = &self.settings.account_number {
            shipper["ShipperNumber"] = json!(account);
        }

        json!({
            "RateRequest": {
                "Request": { "RequestOption": "Shop" },
                "Shipment": {
                    "Shipper": shipper,
                    "ShipTo": { "Address": address_block(&req.destination) },
                    "ShipFrom": { "Address": address_block(&req.origin) },
                    "Package": {
                        "PackagingType": { "Code": "02" },
                        "Dimensions": {
                            "UnitOfMeasurement": { "Code": "CM" },
                            "Length": measure(req.dimensions.length),
                            "Width": measure(req.dimensions.width),
                            "Height": measure(req.dimensions.height)
                        },
                        "PackageWeight": {
                            "UnitOfMeasurement": { "Code": "KGS" },
                            "Weight": measure(req.weight_kg)
                        }
                    }
                }
            }
        })
    }

    fn shipment_payload(&self, req: &ShipmentRequest) -> Value {
        let mut package = json!({
            "Packaging": { "Code": "02" },
            "Dimensions": {
                "UnitOfMeasurement": { "Code": "CM" },
                "Length": measure(req.parcel.dimensions.length),
                "Width": measure(req.parcel.dimensions.width),
                "Height": measure(req.parcel.dimensions.height)
            },
            "PackageWeight": {
                "UnitOfMeasurement": { "Code": "KGS" },
                "Weight": measure(req.parcel.weight_kg)
            }
        });
        if req.declared_value > 0.0 {
            package["PackageServiceOptions"] = json!({
                "DeclaredValue": {
                    "CurrencyCode": super::DECLARED_VALUE_CURRENCY,
                    "MonetaryValue": measure(req.declared_value)
                }
            });
        }

        let mut shipper = json!({ "Address": address_block(&req.origin) });
        let mut payment = json!({ "ShipmentCharge": { "Type": "01" } });
        if let Some(account) = &self.settings.account_number {
            shipper["ShipperNumber"] = json!(account);
            payment["ShipmentCharge"]["BillShipper"] = json!({ "AccountNumber": account });
        }

        json!({
            "ShipmentRequest": {
                "Shipment": {
                    "Shipper": shipper,
                    "ShipTo": { "Address": address_block(&req.destination) },
                    "ShipFrom": { "Address": address_block(&req.origin) },
                    "PaymentInformation": payment,
                    "Service": { "Code": req.service_code },
                    "Package": package
                },
                "LabelSpecification": {
                    "LabelImageFormat": { "Code": req.label_format }
                }
            }
        })
    }
}

fn address_block(address: &Address) -> Value {
    json!({
        "AddressLine": [address.street],
        "City": address.city,
        "StateProvinceCode": address.state,
        "PostalCode": address.postal_code,
        "CountryCode": address.country
    })
}

/// UPS expects numeric fields as decimal strings.
fn measure(value: f64) -> String {
    format!("{value}")
}

/// UPS collapses single-element collections to a bare object.
fn collection_items(value: Option<&Value>) -> Vec<&Value> {
    match value {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(item @ Value::Object(_)) => vec![item],
        _ => Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
struct UpsRatedShipment {
    #[serde(rename = "Service", default)]
    service: Option<UpsService>,
    #[serde(rename = "TotalCharges", default)]
    total_charges: Option<UpsCharges>,
    #[serde(rename = "GuaranteedDelivery", default)]
    guaranteed_delivery: Option<UpsGuaranteedDelivery>,
}

#[derive(Debug, Deserialize)]
struct UpsService {
    #[serde(rename = "Code", default)]
    code: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpsCharges {
    #[serde(rename = "MonetaryValue", default)]
    monetary_value: Option<String>,
    #[serde(rename = "CurrencyCode", default)]
    currency_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpsGuaranteedDelivery {
    #[serde(rename = "BusinessDaysInTransit", default)]
    business_days_in_transit: Option<String>,
}

/// Shop responses often omit the service description.
fn service_name_from_code(code: &str) -> Option<&'static str> {
    match code {
        "01" => Some("UPS Next Day Air"),
        "02" => Some("UPS 2nd Day Air"),
        "03" => Some("UPS Ground"),
        "07" => Some("UPS Worldwide Express"),
        "08" => Some("UPS Worldwide Expedited"),
        "11" => Some("UPS Standard"),
        "54" => Some("UPS Worldwide Express Plus"),
        "65" => Some("UPS Worldwide Saver"),
        _ => None,
    }
}

fn parse_rate_response(body: &str) -> Result<Vec<RateQuote>, CarrierError> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| CarrierError::internal(format!("failed to parse ups rate response: {e}")))?;

    let quotes = collection_items(parsed.pointer("/RateResponse/RatedShipment"))
        .into_iter()
        .filter_map(|item| {
            let detail: UpsRatedShipment = serde_json::from_value(item.clone()).ok()?;
            let code = detail.service.as_ref().and_then(|s| s.code.clone());
            let name = detail
                .service
                .as_ref()
                .and_then(|s| s.description.clone())
                .filter(|d| !d.trim().is_empty())
                .or_else(|| {
                    code.as_deref()
                        .and_then(service_name_from_code)
                        .map(String::from)
                });

            Some(RateQuote {
                carrier: CarrierId::Ups,
                service_code: code,
                service_name: name,
                amount: detail
                    .total_charges
                    .as_ref()
                    .and_then(|c| c.monetary_value.as_deref())
                    .and_then(|v| v.parse().ok()),
                currency: detail
                    .total_charges
                    .as_ref()
                    .and_then(|c| c.currency_code.clone()),
                transit_days: detail
                    .guaranteed_delivery
                    .as_ref()
                    .and_then(|g| g.business_days_in_transit.as_deref())
                    .and_then(|v| v.parse().ok()),
                raw: item.clone(),
            })
        })
        .collect();

    Ok(quotes)
}

fn parse_shipment_response(body: &str) -> Result<ShipmentResult, CarrierError> {
    let raw: Value = serde_json::from_str(body).map_err(|e| {
        CarrierError::internal(format!("failed to parse ups shipment response: {e}"))
    })?;

    let results = raw.pointer("/ShipmentResponse/ShipmentResults");
    let tracking_number = results
        .and_then(|r| r.get("ShipmentIdentificationNumber"))
        .and_then(Value::as_str)
        .map(String::from);
    let label = collection_items(results.and_then(|r| r.get("PackageResults")))
        .into_iter()
        .next()
        .and_then(|p| p.pointer("/ShippingLabel/GraphicImage"))
        .and_then(Value::as_str)
        .map(String::from);

    Ok(ShipmentResult {
        carrier: CarrierId::Ups,
        tracking_number,
        label,
        raw,
    })
}

impl CarrierAdapter for UpsAdapter {
    fn id(&self) -> CarrierId {
        CarrierId::Ups
    }

    fn rates<'a>(
        &'a self,
        req: RateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RateQuote>, CarrierError>> + Send + 'a>> {
        Box::pin(async move {
            let body = self.rate_payload(&req).to_string();
            let url = format!("{}/api/rating/v1/Shop", self.settings.base_url);

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
            let body = self.shipment_payload(&req).to_string();
            let url = format!("{}/api/shipments/v1/ship", self.settings.base_url);
            let idempotency_key = req.idempotency_key.clone();

            let response_body = self
                .authed_call(|bearer| {
                    let mut request = HttpRequest::post(&url)
                        .with_json_body(body.clone())
                        .with_auth(&HttpAuth::BearerToken(String::from(bearer)))
                        .with_timeout_ms(15_000);
                    if let Some(key) = &idempotency_key {
                        request = request.with_header("transId", key);
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
            let url = format!(
                "{}/api/track/v1/details/{}",
                self.settings.base_url,
                urlencoding::encode(tracking_number)
            );

            let response_body = self
                .authed_call(|bearer| {
                    HttpRequest::get(&url)
                        .with_auth(&HttpAuth::BearerToken(String::from(bearer)))
                        .with_timeout_ms(10_000)
                })
                .await?;

            serde_json::from_str(&response_body).map_err(|e| {
                CarrierError::internal(format!("failed to parse ups tracking response: {e}"))
            })
        })
    }

    fn schedule_pickup<'a>(
        &'a self,
        details: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, CarrierError>> + Send + 'a>> {
        Box::pin(async move {
            let body = details.to_string();
            let url = format!("{}/api/pickupcreation/v1/pickup", self.settings.base_url);

            let response_body = self
                .authed_call(|bearer| {
                    HttpRequest::post(&url)
                        .with_json_body(body.clone())
                        .with_auth(&HttpAuth::BearerToken(String::from(bearer)))
                        .with_timeout_ms(10_000)
                })
                .await?;

            serde_json::from_str(&response_body).map_err(|e| {
                CarrierError::internal(format!("failed to parse ups pickup response: {e}"))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_response_parses_string_numerics() {
        let body = r#"{
            "RateResponse": {
                "RatedShipment": [{
                    "Service": { "Code": "65", "Description": "UPS Worldwide Saver" },
                    "TotalCharges": { "CurrencyCode": "ZAR", "MonetaryValue": "950.10" },
                    "GuaranteedDelivery": { "BusinessDaysInTransit": "3" }
                }]
            }
        }"#;

        let quotes = parse_rate_response(body).expect("response parses");
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].carrier, CarrierId::Ups);
        assert_eq!(quotes[0].service_code.as_deref(), Some("65"));
        assert_eq!(quotes[0].amount, Some(950.10));
        assert_eq!(quotes[0].currency.as_deref(), Some("ZAR"));
        assert_eq!(quotes[0].transit_days, Some(3));
    }

    #[test]
    fn single_rated_shipment_object_is_one_quote() {
        let body = r#"{
            "RateResponse": {
                "RatedShipment": {
                    "Service": { "Code": "11" },
                    "TotalCharges": { "CurrencyCode": "ZAR", "MonetaryValue": "402.00" }
                }
            }
        }"#;

        let quotes = parse_rate_response(body).expect("response parses");
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].service_code.as_deref(), Some("11"));
        assert_eq!(quotes[0].service_name.as_deref(), Some("UPS Standard"));
        assert_eq!(quotes[0].amount, Some(402.00));
    }

    #[test]
    fn unparseable_monetary_value_becomes_none() {
        let body = r#"{
            "RateResponse": {
                "RatedShipment": [{
                    "Service": { "Code": "03" },
                    "TotalCharges": { "CurrencyCode": "USD", "MonetaryValue": "n/a" }
                }]
            }
        }"#;

        let quotes = parse_rate_response(body).expect("response parses");
        assert_eq!(quotes[0].amount, None);
        assert_eq!(quotes[0].currency.as_deref(), Some("USD"));
    }

    #[test]
    fn blank_description_falls_back_to_code_table() {
        let body = r#"{
            "RateResponse": {
                "RatedShipment": [{
                    "Service": { "Code": "03", "Description": " " },
                    "TotalCharges": { "MonetaryValue": "12.00" }
                }]
            }
        }"#;

        let quotes = parse_rate_response(body).expect("response parses");
        assert_eq!(quotes[0].service_name.as_deref(), Some("UPS Ground"));
    }

    #[test]
    fn shipment_response_handles_bare_package_results_object() {
        let body = r#"{
            "ShipmentResponse": {
                "ShipmentResults": {
                    "ShipmentIdentificationNumber": "1Z999AA10123456784",
                    "PackageResults": {
                        "ShippingLabel": { "GraphicImage": "R0lGODsA" }
                    }
                }
            }
        }"#;

        let result = parse_shipment_response(body).expect("response parses");
        assert_eq!(result.carrier, CarrierId::Ups);
        assert_eq!(result.tracking_number.as_deref(), Some("1Z999AA10123456784"));
        assert_eq!(result.label.as_deref(), Some("R0lGODsA"));
    }

    struct UnusedClient;

    impl HttpClient for UnusedClient {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> Pin<
            Box<
                dyn Future<
                        Output = Result<
                            crate::http_client::HttpResponse,
                            crate::http_client::HttpError,
                        >,
                    > + Send
                    + 'a,
            >,
        > {
            Box::pin(async { panic!("payload tests never hit the transport") })
        }
    }

    #[test]
    fn rate_payload_serializes_measures_as_strings() {
        let settings = UpsSettings {
            base_url: String::from("https://onlinetools.ups.com"),
            client_id: String::from("id"),
            client_secret: String::from("secret"),
            redirect_uri: None,
            account_number: None,
        };
        let adapter = UpsAdapter::new(settings, Arc::new(UnusedClient));

        let origin = Address::new("24 Electron Ave", "Isando", "GP", "ZA", "1601")
            .expect("valid address");
        let destination =
            Address::new("1 Long St", "Cape Town", "WC", "ZA", "8001").expect("valid address");
        let req = RateRequest::new(
            origin,
            destination,
            2.5,
            crate::Dimensions::new(30.0, 20.0, 10.0).expect("valid dimensions"),
        )
        .expect("valid request");

        let payload = adapter.rate_payload(&req);
        let weight = payload
            .pointer("/RateRequest/Shipment/Package/PackageWeight/Weight")
            .expect("weight present");
        assert_eq!(weight, &json!("2.5"));
    }
}
