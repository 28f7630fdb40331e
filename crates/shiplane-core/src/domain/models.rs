use serde::{Deserialize, Serialize};

use crate::{CarrierId, ValidationError};

/// Postal address used for shipment origins and destinations.
///
/// Coordinates are optional. Warehouse selection only considers them when
/// both latitude and longitude are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub country: String,
    pub postal_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

impl Address {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        country: impl Into<String>,
        postal_code: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let country = country.into();
        if country.trim().is_empty() {
            return Err(ValidationError::EmptyCountry);
        }

        Ok(Self {
            street: street.into(),
            city: city.into(),
            state: state.into(),
            country,
            postal_code: postal_code.into(),
            latitude: None,
            longitude: None,
        })
    }

    pub fn with_coordinates(
        mut self,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, ValidationError> {
        validate_latitude(latitude)?;
        validate_longitude(longitude)?;
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        Ok(self)
    }

    /// Both coordinates present. A lone latitude or longitude counts as absent.
    pub const fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }
}

/// Package dimensions in centimetres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: f64,
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(length: f64, width: f64, height: f64) -> Result<Self, ValidationError> {
        validate_positive("length", length)?;
        validate_positive("width", width)?;
        validate_positive("height", height)?;

        Ok(Self {
            length,
            width,
            height,
        })
    }
}

/// Package weight plus dimensions, metric units throughout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    #[serde(rename = "weight")]
    pub weight_kg: f64,
    pub dimensions: Dimensions,
}

impl Parcel {
    pub fn new(weight_kg: f64, dimensions: Dimensions) -> Result<Self, ValidationError> {
        validate_positive("weight", weight_kg)?;

        Ok(Self {
            weight_kg,
            dimensions,
        })
    }
}

/// Dispatch warehouse with a fixed geographic location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: String,
    pub name: String,
    pub address: Address,
    pub latitude: f64,
    pub longitude: f64,
}

impl Warehouse {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        address: Address,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::EmptyWarehouseId);
        }
        validate_latitude(latitude)?;
        validate_longitude(longitude)?;

        Ok(Self {
            id,
            name: name.into(),
            address,
            latitude,
            longitude,
        })
    }

    /// The warehouse address with its own coordinates attached, used when a
    /// lookup rewrites the shipment origin to this warehouse.
    pub fn dispatch_address(&self) -> Address {
        let mut address = self.address.clone();
        address.latitude = Some(self.latitude);
        address.longitude = Some(self.longitude);
        address
    }
}

/// One normalized shipping option from a carrier rate response.
///
/// Fields the carrier omitted stay `None`; a missing amount or transit time
/// never fails the lookup. The untouched carrier line item is kept in `raw`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateQuote {
    pub carrier: CarrierId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transit_days: Option<u32>,
    pub raw: serde_json::Value,
}

/// Outcome of a shipment creation call.
///
/// `label` carries the base64 label content or an opaque carrier reference,
/// depending on what the carrier returned. The full carrier payload is kept
/// in `raw` for callers that need more than the normalized fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentResult {
    pub carrier: CarrierId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub raw: serde_json::Value,
}

fn validate_positive(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    if value <= 0.0 {
        return Err(ValidationError::NonPositiveValue { field });
    }
    Ok(())
}

fn validate_latitude(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(-90.0..=90.0).contains(&value) {
        return Err(ValidationError::LatitudeOutOfRange { value });
    }
    Ok(())
}

fn validate_longitude(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(-180.0..=180.0).contains(&value) {
        return Err(ValidationError::LongitudeOutOfRange { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_address() -> Address {
        Address::new("12 Electron Ave", "Johannesburg", "GP", "ZA", "1619").expect("valid address")
    }

    #[test]
    fn address_requires_a_country() {
        let result = Address::new("1 Main Rd", "Cape Town", "WC", "  ", "8001");
        assert_eq!(result, Err(ValidationError::EmptyCountry));
    }

    #[test]
    fn coordinates_count_only_when_both_present() {
        let mut address = sample_address();
        assert!(!address.has_coordinates());

        address.latitude = Some(-26.2041);
        assert!(!address.has_coordinates());
        assert_eq!(address.coordinates(), None);

        address.longitude = Some(28.0473);
        assert!(address.has_coordinates());
        assert_eq!(address.coordinates(), Some((-26.2041, 28.0473)));
    }

    #[test]
    fn coordinate_ranges_are_enforced() {
        let address = sample_address();
        assert!(matches!(
            address.clone().with_coordinates(-91.0, 20.0),
            Err(ValidationError::LatitudeOutOfRange { .. })
        ));
        assert!(matches!(
            address.with_coordinates(-26.0, 181.0),
            Err(ValidationError::LongitudeOutOfRange { .. })
        ));
    }

    #[test]
    fn dimensions_must_be_strictly_positive() {
        assert!(Dimensions::new(30.0, 20.0, 10.0).is_ok());
        assert!(matches!(
            Dimensions::new(30.0, 0.0, 10.0),
            Err(ValidationError::NonPositiveValue { field: "width" })
        ));
        assert!(matches!(
            Dimensions::new(f64::NAN, 20.0, 10.0),
            Err(ValidationError::NonFiniteValue { field: "length" })
        ));
    }

    #[test]
    fn parcel_rejects_zero_weight() {
        let dims = Dimensions::new(30.0, 20.0, 10.0).expect("valid dimensions");
        assert!(matches!(
            Parcel::new(0.0, dims),
            Err(ValidationError::NonPositiveValue { field: "weight" })
        ));
    }

    #[test]
    fn dispatch_address_carries_warehouse_coordinates() {
        let warehouse = Warehouse::new(
            "jnb",
            "Johannesburg Fulfilment Centre",
            sample_address(),
            -26.2041,
            28.0473,
        )
        .expect("valid warehouse");

        let address = warehouse.dispatch_address();
        assert_eq!(address.coordinates(), Some((-26.2041, 28.0473)));
        assert_eq!(address.city, "Johannesburg");
    }

    #[test]
    fn rate_quote_serializes_camel_case_and_skips_absent_fields() {
        let quote = RateQuote {
            carrier: CarrierId::Ups,
            service_code: Some(String::from("03")),
            service_name: None,
            amount: Some(412.5),
            currency: Some(String::from("ZAR")),
            transit_days: None,
            raw: serde_json::json!({"Service": {"Code": "03"}}),
        };

        let json = serde_json::to_value(&quote).expect("serializes");
        assert_eq!(json["carrier"], "ups");
        assert_eq!(json["serviceCode"], "03");
        assert!(json.get("serviceName").is_none());
        assert!(json.get("transitDays").is_none());
    }
}
