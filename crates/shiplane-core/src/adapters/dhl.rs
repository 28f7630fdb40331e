use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::adapter::{CarrierAdapter, CarrierError, RateRequest, ShipmentRequest};
use crate::config::DhlSettings;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::{Address, CarrierId, RateQuote, ShipmentResult};

/// DHL Express adapter.
///
/// DHL authenticates with a pre-provisioned API key on every call, so there
/// is no token cache here. Rate lookups are a GET with the shipment encoded
/// in the query string.
pub struct DhlAdapter {
    settings: DhlSettings,
    http_client: Arc<dyn HttpClient>,
}

impl DhlAdapter {
    pub fn new(settings: DhlSettings, http_client: Arc<dyn HttpClient>) -> Self {
        Self {
            settings,
            http_client,
        }
    }

    fn auth(&self) -> HttpAuth {
        HttpAuth::ApiKey {
            header: String::from("DHL-API-Key"),
            key: self.settings.api_key.clone(),
        }
    }

    async fn call(&self, request: HttpRequest) -> Result<String, CarrierError> {
        let response = self.http_client.execute(request).await.map_err(|e| {
            CarrierError::unavailable(format!("dhl transport error: {}", e.message()))
        })?;

        if !response.is_success() {
            return Err(CarrierError::from_upstream_status(
                CarrierId::Dhl,
                response.status,
            ));
        }

        Ok(response.body)
    }

    fn rate_query(&self, req: &RateRequest) -> String {
        let mut pairs: Vec<(&str, String)> = vec![
            ("originCountryCode", req.origin.country.clone()),
            ("originPostalCode", req.origin.postal_code.clone()),
            ("originCityName", req.origin.city.clone()),
            ("destinationCountryCode", req.destination.country.clone()),
            ("destinationPostalCode", req.destination.postal_code.clone()),
            ("destinationCityName", req.destination.city.clone()),
            ("weight", req.weight_kg.to_string()),
            ("length", req.dimensions.length.to_string()),
            ("width", req.dimensions.width.to_string()),
            ("height", req.dimensions.height.to_string()),
            ("plannedShippingDate", planned_shipping_date()),
            ("isCustomsDeclarable", String::from("false")),
            ("unitOfMeasurement", String::from("metric")),
        ];
        if let Some(account) = &self.settings.account_number {
            pairs.push(("accountNumber", account.clone()));
        }

        pairs
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    fn shipment_payload(&self, req: &ShipmentRequest) -> Value {
        let mut content = json!({
            "packages": [{
                "weight": req.parcel.weight_kg,
                "dimensions": {
                    "length": req.parcel.dimensions.length,
                    "width": req.parcel.dimensions.width,
                    "height": req.parcel.dimensions.height
                }
            }],
            "isCustomsDeclarable": false,
            "description": "Merchandise",
            "unitOfMeasurement": "metric"
        });
        if req.declared_value > 0.0 {
            content["declaredValue"] = json!(req.declared_value);
            content["declaredValueCurrency"] = json!(super::DECLARED_VALUE_CURRENCY);
        }

        let mut payload = json!({
            "plannedShippingDateAndTime": format!("{}T12:00:00GMT+00:00", planned_shipping_date()),
            "pickup": { "isRequested": false },
            "productCode": req.service_code,
            "outputImageProperties": {
                "encodingFormat": req.label_format.to_lowercase()
            },
            "customerDetails": {
                "shipperDetails": { "postalAddress": postal_address(&req.origin) },
                "receiverDetails": { "postalAddress": postal_address(&req.destination) }
            },
            "content": content
        });
        if let Some(account) = &self.settings.account_number {
            payload["accounts"] = json!([{ "typeCode": "shipper", "number": account }]);
        }
        payload
    }
}

fn postal_address(address: &Address) -> Value {
    json!({
        "addressLine1": address.street,
        "cityName": address.city,
        "provinceCode": address.state,
        "postalCode": address.postal_code,
        "countryCode": address.country
    })
}

fn planned_shipping_date() -> String {
    let format = format_description!("[year]-[month]-[day]");
    OffsetDateTime::now_utc()
        .date()
        .format(&format)
        .expect("static date format")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DhlProduct {
    #[serde(default)]
    product_name: Option<String>,
    #[serde(default)]
    product_code: Option<String>,
    #[serde(default)]
    total_price: Vec<DhlPrice>,
    #[serde(default)]
    delivery_capabilities: Option<DhlDeliveryCapabilities>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DhlPrice {
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    price_currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DhlDeliveryCapabilities {
    #[serde(default)]
    total_transit_days: Option<u32>,
}

fn parse_rate_response(body: &str) -> Result<Vec<RateQuote>, CarrierError> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| CarrierError::internal(format!("failed to parse dhl rate response: {e}")))?;

    let Some(items) = parsed.get("products").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };

    let quotes = items
        .iter()
        .filter_map(|item| {
            let product: DhlProduct = serde_json::from_value(item.clone()).ok()?;
            let price = product.total_price.first();

            Some(RateQuote {
                carrier: CarrierId::Dhl,
                service_code: product.product_code,
                service_name: product.product_name,
                amount: price.and_then(|p| p.price),
                currency: price.and_then(|p| p.price_currency.clone()),
                transit_days: product
                    .delivery_capabilities
                    .and_then(|d| d.total_transit_days),
                raw: item.clone(),
            })
        })
        .collect();

    Ok(quotes)
}

fn parse_shipment_response(body: &str) -> Result<ShipmentResult, CarrierError> {
    let raw: Value = serde_json::from_str(body).map_err(|e| {
        CarrierError::internal(format!("failed to parse dhl shipment response: {e}"))
    })?;

    let tracking_number = raw
        .get("shipmentTrackingNumber")
        .and_then(Value::as_str)
        .map(String::from);
    let label = raw
        .get("documents")
        .and_then(Value::as_array)
        .and_then(|docs| {
            docs.iter()
                .find(|d| d.get("typeCode").and_then(Value::as_str) == Some("label"))
                .or_else(|| docs.first())
        })
        .and_then(|d| d.get("content"))
        .and_then(Value::as_str)
        .map(String::from);

    Ok(ShipmentResult {
        carrier: CarrierId::Dhl,
        tracking_number,
        label,
        raw,
    })
}

impl CarrierAdapter for DhlAdapter {
    fn id(&self) -> CarrierId {
        CarrierId::Dhl
    }

    fn rates<'a>(
        &'a self,
        req: RateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RateQuote>, CarrierError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/rates?{}", self.settings.base_url, self.rate_query(&req));
            let request = HttpRequest::get(url)
                .with_auth(&self.auth())
                .with_timeout_ms(10_000);

            let response_body = self.call(request).await?;
            parse_rate_response(&response_body)
        })
    }

    fn create_shipment<'a>(
        &'a self,
        req: ShipmentRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ShipmentResult, CarrierError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/shipments", self.settings.base_url);
            let mut request = HttpRequest::post(url)
                .with_json_body(self.shipment_payload(&req).to_string())
                .with_auth(&self.auth())
                .with_timeout_ms(15_000);
            if let Some(key) = &req.idempotency_key {
                request = request.with_header("Message-Reference", key);
            }

            let response_body = self.call(request).await?;
            parse_shipment_response(&response_body)
        })
    }

    fn track<'a>(
        &'a self,
        tracking_number: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Value, CarrierError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!(
                "{}/shipments/{}/tracking",
                self.settings.base_url,
                urlencoding::encode(tracking_number)
            );
            let request = HttpRequest::get(url)
                .with_auth(&self.auth())
                .with_timeout_ms(10_000);

            let response_body = self.call(request).await?;
            serde_json::from_str(&response_body).map_err(|e| {
                CarrierError::internal(format!("failed to parse dhl tracking response: {e}"))
            })
        })
    }

    fn schedule_pickup<'a>(
        &'a self,
        details: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, CarrierError>> + Send + 'a>> {
        Box::pin(async move {
            let url = format!("{}/pickups", self.settings.base_url);
            let request = HttpRequest::post(url)
                .with_json_body(details.to_string())
                .with_auth(&self.auth())
                .with_timeout_ms(10_000);

            let response_body = self.call(request).await?;
            serde_json::from_str(&response_body).map_err(|e| {
                CarrierError::internal(format!("failed to parse dhl pickup response: {e}"))
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> DhlSettings {
        DhlSettings {
            base_url: String::from("https://express.api.dhl.com/mydhlapi"),
            api_key: String::from("demo-key"),
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            account_number: None,
        }
    }

    #[test]
    fn rate_query_encodes_address_fields() {
        let adapter = DhlAdapter::new(settings(), Arc::new(UnusedClient));
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

        let query = adapter.rate_query(&req);
        assert!(query.contains("originCountryCode=ZA"));
        assert!(query.contains("destinationCityName=Cape%20Town"));
        assert!(query.contains("weight=2.5"));
        assert!(query.contains("unitOfMeasurement=metric"));
        assert!(!query.contains("accountNumber"));
    }

    #[test]
    fn rate_response_maps_products() {
        let body = r#"{
            "products": [{
                "productName": "EXPRESS WORLDWIDE",
                "productCode": "P",
                "totalPrice": [{ "price": 1520.75, "priceCurrency": "ZAR" }],
                "deliveryCapabilities": { "totalTransitDays": 2 }
            }]
        }"#;

        let quotes = parse_rate_response(body).expect("response parses");
        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].carrier, CarrierId::Dhl);
        assert_eq!(quotes[0].service_code.as_deref(), Some("P"));
        assert_eq!(quotes[0].service_name.as_deref(), Some("EXPRESS WORLDWIDE"));
        assert_eq!(quotes[0].amount, Some(1520.75));
        assert_eq!(quotes[0].currency.as_deref(), Some("ZAR"));
        assert_eq!(quotes[0].transit_days, Some(2));
    }

    #[test]
    fn empty_product_list_is_not_an_error() {
        let quotes = parse_rate_response(r#"{"products": []}"#).expect("response parses");
        assert!(quotes.is_empty());

        let quotes = parse_rate_response("{}").expect("response parses");
        assert!(quotes.is_empty());
    }

    #[test]
    fn shipment_response_prefers_the_label_document() {
        let body = r#"{
            "shipmentTrackingNumber": "7340011234",
            "documents": [
                { "typeCode": "invoice", "content": "aW52b2ljZQ==" },
                { "typeCode": "label", "content": "bGFiZWw=" }
            ]
        }"#;

        let result = parse_shipment_response(body).expect("response parses");
        assert_eq!(result.tracking_number.as_deref(), Some("7340011234"));
        assert_eq!(result.label.as_deref(), Some("bGFiZWw="));
    }

    #[test]
    fn shipment_response_falls_back_to_first_document() {
        let body = r#"{
            "shipmentTrackingNumber": "7340011234",
            "documents": [{ "typeCode": "waybillDoc", "content": "ZG9j" }]
        }"#;

        let result = parse_shipment_response(body).expect("response parses");
        assert_eq!(result.label.as_deref(), Some("ZG9j"));
    }

    #[test]
    fn declared_value_is_included_only_when_positive() {
        let adapter = DhlAdapter::new(settings(), Arc::new(UnusedClient));
        let origin = Address::new("24 Electron Ave", "Isando", "GP", "ZA", "1601")
            .expect("valid address");
        let destination =
            Address::new("1 Long St", "Cape Town", "WC", "ZA", "8001").expect("valid address");
        let parcel = crate::Parcel::new(
            1.0,
            crate::Dimensions::new(10.0, 10.0, 10.0).expect("valid dimensions"),
        )
        .expect("valid parcel");

        let plain = ShipmentRequest::new(origin.clone(), destination.clone(), parcel, "P")
            .expect("valid request");
        let payload = adapter.shipment_payload(&plain);
        assert!(payload["content"].get("declaredValue").is_none());

        let insured = ShipmentRequest::new(origin, destination, parcel, "P")
            .expect("valid request")
            .with_declared_value(450.0)
            .expect("valid declared value");
        let payload = adapter.shipment_payload(&insured);
        assert_eq!(payload["content"]["declaredValue"], json!(450.0));
        assert_eq!(payload["content"]["declaredValueCurrency"], json!("ZAR"));
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
}
