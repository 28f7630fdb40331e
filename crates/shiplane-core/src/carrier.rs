use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical carrier identifiers used on the wire and in responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CarrierId {
    Fedex,
    Ups,
    Dhl,
}

impl CarrierId {
    /// Fixed aggregation order. Rate responses list carriers in this order
    /// regardless of which call finishes first.
    pub const ALL: [Self; 3] = [Self::Fedex, Self::Ups, Self::Dhl];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fedex => "fedex",
            Self::Ups => "ups",
            Self::Dhl => "dhl",
        }
    }
}

impl Display for CarrierId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CarrierId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fedex" => Ok(Self::Fedex),
            "ups" => Ok(Self::Ups),
            "dhl" => Ok(Self::Dhl),
            other => Err(ValidationError::InvalidCarrier {
                value: other.to_owned(),
            }),
        }
    }
}

/// Carrier selection for rate lookups.
///
/// `Auto` fans out to every carrier; `Only` restricts the lookup to a single
/// carrier and never touches the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CarrierSelection {
    #[default]
    Auto,
    Only(CarrierId),
}

impl CarrierSelection {
    /// Carriers this selection resolves to, in aggregation order.
    pub fn targets(self) -> Vec<CarrierId> {
        match self {
            Self::Auto => CarrierId::ALL.to_vec(),
            Self::Only(carrier) => vec![carrier],
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Only(carrier) => carrier.as_str(),
        }
    }
}

impl Display for CarrierSelection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CarrierSelection {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        if normalized == "auto" {
            return Ok(Self::Auto);
        }
        CarrierId::from_str(&normalized)
            .map(Self::Only)
            .map_err(|_| ValidationError::InvalidSelection { value: normalized })
    }
}

/// Sort order applied within each carrier's rate list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatePreference {
    Cheapest,
    Fastest,
}

impl RatePreference {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cheapest => "cheapest",
            Self::Fastest => "fastest",
        }
    }
}

impl Display for RatePreference {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RatePreference {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cheapest" => Ok(Self::Cheapest),
            "fastest" => Ok(Self::Fastest),
            other => Err(ValidationError::InvalidPreference {
                value: other.to_owned(),
            }),
        }
    }
}
