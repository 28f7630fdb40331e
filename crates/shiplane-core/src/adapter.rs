//! Carrier adapter trait and request types.
//!
//! This module defines the core adapter contract (`CarrierAdapter`) that all
//! carrier implementations must follow, along with the request types for each
//! operation and the structured error the gateway uses for failure isolation.
//!
//! # Operations
//!
//! | Operation | Request | Response | Description |
//! |-----------|---------|----------|-------------|
//! | Rates | [`RateRequest`] | `Vec<RateQuote>` | Available services with prices |
//! | Create shipment | [`ShipmentRequest`] | [`ShipmentResult`] | Book a shipment, get label + tracking |
//! | Track | tracking number | `serde_json::Value` | Raw carrier tracking payload |
//! | Schedule pickup | `serde_json::Value` | `serde_json::Value` | Raw carrier pickup booking |
//!
//! # Example
//!
//! ```rust,ignore
//! use shiplane_core::{CarrierAdapter, RateRequest, CarrierError};
//!
//! async fn fetch_rates(adapter: &dyn CarrierAdapter, req: RateRequest) -> Result<(), CarrierError> {
//!     let quotes = adapter.rates(req).await?;
//!
//!     for quote in &quotes {
//!         println!("{}: {:?} {:?}", quote.carrier, quote.service_name, quote.amount);
//!     }
//!
//!     Ok(())
//! }
//! ```

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;

use crate::{Address, CarrierId, Dimensions, Parcel, RateQuote, ShipmentResult};

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CarrierErrorKind {
    /// Credentials for this carrier are absent; no network call was made.
    Unconfigured,
    Unavailable,
    Timeout,
    RateLimited,
    InvalidRequest,
    Internal,
}

/// Structured carrier error used by the gateway for per-carrier isolation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CarrierError {
    kind: CarrierErrorKind,
    message: String,
    retryable: bool,
}

impl CarrierError {
    pub fn unconfigured(carrier: CarrierId) -> Self {
        Self {
            kind: CarrierErrorKind::Unconfigured,
            message: format!("carrier '{carrier}' is not configured (missing credentials)"),
            retryable: false,
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: CarrierErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: CarrierErrorKind::Timeout,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: CarrierErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: CarrierErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: CarrierErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    /// Classifies a non-2xx carrier response. 429 and 5xx-class statuses are
    /// retryable; other client-side rejections are terminal.
    pub fn from_upstream_status(carrier: CarrierId, status: u16) -> Self {
        match status {
            429 => Self::rate_limited(format!("carrier '{carrier}' returned status 429")),
            408 | 500..=599 => {
                Self::unavailable(format!("carrier '{carrier}' returned status {status}"))
            }
            _ => Self {
                kind: CarrierErrorKind::Unavailable,
                message: format!("carrier '{carrier}' returned status {status}"),
                retryable: false,
            },
        }
    }

    pub const fn kind(&self) -> CarrierErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            CarrierErrorKind::Unconfigured => "carrier.unconfigured",
            CarrierErrorKind::Unavailable => "carrier.unavailable",
            CarrierErrorKind::Timeout => "carrier.timeout",
            CarrierErrorKind::RateLimited => "carrier.rate_limited",
            CarrierErrorKind::InvalidRequest => "carrier.invalid_request",
            CarrierErrorKind::Internal => "carrier.internal",
        }
    }
}

impl Display for CarrierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for CarrierError {}

/// Request payload for rate lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRequest {
    pub origin: Address,
    pub destination: Address,
    pub weight_kg: f64,
    pub dimensions: Dimensions,
}

impl RateRequest {
    pub fn new(
        origin: Address,
        destination: Address,
        weight_kg: f64,
        dimensions: Dimensions,
    ) -> Result<Self, CarrierError> {
        if !weight_kg.is_finite() || weight_kg <= 0.0 {
            return Err(CarrierError::invalid_request(
                "rate request weight must be greater than zero",
            ));
        }
        Ok(Self {
            origin,
            destination,
            weight_kg,
            dimensions,
        })
    }
}

/// Request payload for shipment creation.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipmentRequest {
    pub origin: Address,
    pub destination: Address,
    pub parcel: Parcel,
    pub service_code: String,
    pub label_format: String,
    pub declared_value: f64,
    /// Caller-supplied request id forwarded to the carrier. Creation is only
    /// retried when this is present.
    pub idempotency_key: Option<String>,
}

impl ShipmentRequest {
    pub fn new(
        origin: Address,
        destination: Address,
        parcel: Parcel,
        service_code: impl Into<String>,
    ) -> Result<Self, CarrierError> {
        let service_code = service_code.into();
        if service_code.trim().is_empty() {
            return Err(CarrierError::invalid_request(
                "shipment request must include a service code",
            ));
        }
        Ok(Self {
            origin,
            destination,
            parcel,
            service_code,
            label_format: String::from("PDF"),
            declared_value: 0.0,
            idempotency_key: None,
        })
    }

    pub fn with_label_format(mut self, label_format: impl Into<String>) -> Self {
        self.label_format = label_format.into();
        self
    }

    pub fn with_declared_value(mut self, declared_value: f64) -> Result<Self, CarrierError> {
        if !declared_value.is_finite() || declared_value < 0.0 {
            return Err(CarrierError::invalid_request(
                "declared value must be a non-negative amount",
            ));
        }
        self.declared_value = declared_value;
        Ok(self)
    }

    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Carrier adapter contract.
///
/// All carriers must implement this trait to be used with the gateway.
/// The trait uses async methods returning boxed futures for flexibility.
///
/// # Required Methods
///
/// | Method | Description |
/// |--------|-------------|
/// | [`id`](CarrierAdapter::id) | Unique carrier identifier |
/// | [`rates`](CarrierAdapter::rates) | Fetch available services with prices |
/// | [`create_shipment`](CarrierAdapter::create_shipment) | Book a shipment |
/// | [`track`](CarrierAdapter::track) | Fetch raw tracking status |
/// | [`schedule_pickup`](CarrierAdapter::schedule_pickup) | Book a pickup |
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` as they are shared across request
/// handlers behind `Arc`.
pub trait CarrierAdapter: Send + Sync {
    /// Returns the unique carrier identifier.
    fn id(&self) -> CarrierId;

    /// Fetches the carrier's available services with prices for a parcel.
    ///
    /// A carrier that offers no services for the lane returns an empty vec,
    /// not an error.
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError`] if:
    /// - The carrier API is unreachable or returns a non-2xx status
    /// - Authentication fails
    /// - The response body cannot be parsed
    fn rates<'a>(
        &'a self,
        req: RateRequest,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RateQuote>, CarrierError>> + Send + 'a>>;

    /// Books a shipment and returns the tracking number and label.
    ///
    /// # Errors
    ///
    /// Returns [`CarrierError`] if the carrier rejects the booking or is
    /// unavailable.
    fn create_shipment<'a>(
        &'a self,
        req: ShipmentRequest,
    ) -> Pin<Box<dyn Future<Output = Result<ShipmentResult, CarrierError>> + Send + 'a>>;

    /// Fetches the carrier's tracking payload for a shipment, unmodified.
    fn track<'a>(
        &'a self,
        tracking_number: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, CarrierError>> + Send + 'a>>;

    /// Books a pickup with carrier-specific details, passed through as-is.
    fn schedule_pickup<'a>(
        &'a self,
        details: serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<serde_json::Value, CarrierError>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Address;

    fn address(city: &str) -> Address {
        Address::new("1 Main Rd", city, "GP", "ZA", "2000").expect("valid address")
    }

    fn dimensions() -> Dimensions {
        Dimensions::new(30.0, 20.0, 10.0).expect("valid dimensions")
    }

    #[test]
    fn rate_request_rejects_non_positive_weight() {
        let result = RateRequest::new(address("Johannesburg"), address("Durban"), 0.0, dimensions());

        let error = result.expect_err("zero weight should be rejected");
        assert_eq!(error.kind(), CarrierErrorKind::InvalidRequest);
        assert!(!error.retryable());
    }

    #[test]
    fn shipment_request_defaults_label_format_and_declared_value() {
        let parcel = Parcel::new(2.5, dimensions()).expect("valid parcel");
        let request = ShipmentRequest::new(
            address("Johannesburg"),
            address("Cape Town"),
            parcel,
            "FEDEX_GROUND",
        )
        .expect("valid request");

        assert_eq!(request.label_format, "PDF");
        assert_eq!(request.declared_value, 0.0);
        assert_eq!(request.idempotency_key, None);
    }

    #[test]
    fn shipment_request_requires_a_service_code() {
        let parcel = Parcel::new(2.5, dimensions()).expect("valid parcel");
        let result =
            ShipmentRequest::new(address("Johannesburg"), address("Cape Town"), parcel, "  ");

        assert!(result.is_err());
    }

    #[test]
    fn negative_declared_value_is_rejected() {
        let parcel = Parcel::new(2.5, dimensions()).expect("valid parcel");
        let request =
            ShipmentRequest::new(address("Johannesburg"), address("Cape Town"), parcel, "03")
                .expect("valid request");

        let error = request
            .clone()
            .with_declared_value(-10.0)
            .expect_err("negative declared value should be rejected");
        assert_eq!(error.kind(), CarrierErrorKind::InvalidRequest);
        assert!(!error.retryable());

        assert!(request.with_declared_value(f64::NAN).is_err());
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(
            CarrierError::unconfigured(CarrierId::Dhl).code(),
            "carrier.unconfigured"
        );
        assert_eq!(CarrierError::timeout("t").code(), "carrier.timeout");
        assert_eq!(CarrierError::unavailable("u").code(), "carrier.unavailable");
    }

    #[test]
    fn upstream_statuses_classify_by_transience() {
        let rate_limited = CarrierError::from_upstream_status(CarrierId::Fedex, 429);
        assert_eq!(rate_limited.kind(), CarrierErrorKind::RateLimited);
        assert!(rate_limited.retryable());

        let server_error = CarrierError::from_upstream_status(CarrierId::Ups, 503);
        assert_eq!(server_error.kind(), CarrierErrorKind::Unavailable);
        assert!(server_error.retryable());

        let rejected = CarrierError::from_upstream_status(CarrierId::Dhl, 401);
        assert_eq!(rejected.kind(), CarrierErrorKind::Unavailable);
        assert!(!rejected.retryable());
        assert!(rejected.message().contains("401"));
    }

    #[test]
    fn only_upstream_and_rate_limit_errors_are_retryable() {
        assert!(CarrierError::unavailable("503").retryable());
        assert!(CarrierError::rate_limited("429").retryable());
        assert!(!CarrierError::timeout("deadline").retryable());
        assert!(!CarrierError::unconfigured(CarrierId::Ups).retryable());
        assert!(!CarrierError::invalid_request("bad").retryable());
        assert!(!CarrierError::internal("parse").retryable());
    }
}
