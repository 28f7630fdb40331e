use thiserror::Error;

/// Validation and contract errors exposed by `shiplane-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("address country cannot be empty")]
    EmptyCountry,

    #[error("latitude {value} is out of range -90..=90")]
    LatitudeOutOfRange { value: f64 },
    #[error("longitude {value} is out of range -180..=180")]
    LongitudeOutOfRange { value: f64 },

    #[error("invalid carrier '{value}', expected one of fedex, ups, dhl")]
    InvalidCarrier { value: String },
    #[error("invalid carrier selection '{value}', expected auto, fedex, ups, or dhl")]
    InvalidSelection { value: String },
    #[error("invalid rate preference '{value}', expected cheapest or fastest")]
    InvalidPreference { value: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be greater than zero")]
    NonPositiveValue { field: &'static str },

    #[error("warehouse id cannot be empty")]
    EmptyWarehouseId,
    #[error("warehouse catalog must contain at least one warehouse")]
    EmptyWarehouseCatalog,
}
