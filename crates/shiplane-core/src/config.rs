//! Environment-driven carrier configuration.
//!
//! Each carrier is configured when its credential pair is present (FedEx and
//! UPS: client id + secret, DHL: API key). Variables are read with a
//! `SHIPLANE_`-prefixed primary name and a bare fallback:
//!
//! | Carrier | Primary | Fallback |
//! |---------|---------|----------|
//! | FedEx | `SHIPLANE_FEDEX_CLIENT_ID` | `FEDEX_CLIENT_ID` |
//! | FedEx | `SHIPLANE_FEDEX_CLIENT_SECRET` | `FEDEX_CLIENT_SECRET` |
//! | UPS | `SHIPLANE_UPS_CLIENT_ID` | `UPS_CLIENT_ID` |
//! | UPS | `SHIPLANE_UPS_CLIENT_SECRET` | `UPS_CLIENT_SECRET` |
//! | DHL | `SHIPLANE_DHL_API_KEY` | `DHL_API_KEY` |
//!
//! Base URLs (`..._BASE_URL`) default to the production carrier hosts.
//! Redirect URIs, OAuth app credentials for the callback flows, and account
//! numbers are optional extras with the same naming scheme.

use std::env;

use crate::CarrierId;

const DEFAULT_FEDEX_BASE_URL: &str = "https://apis.fedex.com";
const DEFAULT_UPS_BASE_URL: &str = "https://onlinetools.ups.com";
const DEFAULT_DHL_BASE_URL: &str = "https://express.api.dhl.com/mydhlapi";

/// FedEx API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FedexSettings {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
    pub account_number: Option<String>,
}

impl FedexSettings {
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url)
    }
}

/// UPS API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsSettings {
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Option<String>,
    pub account_number: Option<String>,
}

impl UpsSettings {
    pub fn token_url(&self) -> String {
        format!("{}/security/v1/oauth/token", self.base_url)
    }
}

/// DHL API settings. API calls use the static key; the OAuth app fields only
/// feed the authorization-code callback flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhlSettings {
    pub base_url: String,
    pub api_key: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: Option<String>,
    pub account_number: Option<String>,
}

impl DhlSettings {
    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.base_url)
    }
}

/// Per-carrier configuration snapshot. `None` means the carrier is
/// unconfigured and will fail fast without a network call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarrierSettings {
    pub fedex: Option<FedexSettings>,
    pub ups: Option<UpsSettings>,
    pub dhl: Option<DhlSettings>,
}

impl CarrierSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds settings from an explicit variable lookup. `from_env` delegates
    /// here; tests pass a map instead of touching the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fedex = match (
            var(&lookup, "SHIPLANE_FEDEX_CLIENT_ID", "FEDEX_CLIENT_ID"),
            var(&lookup, "SHIPLANE_FEDEX_CLIENT_SECRET", "FEDEX_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(FedexSettings {
                base_url: base_url(
                    &lookup,
                    "SHIPLANE_FEDEX_BASE_URL",
                    "FEDEX_BASE_URL",
                    DEFAULT_FEDEX_BASE_URL,
                ),
                client_id,
                client_secret,
                redirect_uri: var(&lookup, "SHIPLANE_FEDEX_REDIRECT_URI", "FEDEX_REDIRECT_URI"),
                account_number: var(
                    &lookup,
                    "SHIPLANE_FEDEX_ACCOUNT_NUMBER",
                    "FEDEX_ACCOUNT_NUMBER",
                ),
            }),
            _ => None,
        };

        let ups = match (
            var(&lookup, "SHIPLANE_UPS_CLIENT_ID", "UPS_CLIENT_ID"),
            var(&lookup, "SHIPLANE_UPS_CLIENT_SECRET", "UPS_CLIENT_SECRET"),
        ) {
            (Some(client_id), Some(client_secret)) => Some(UpsSettings {
                base_url: base_url(
                    &lookup,
                    "SHIPLANE_UPS_BASE_URL",
                    "UPS_BASE_URL",
                    DEFAULT_UPS_BASE_URL,
                ),
                client_id,
                client_secret,
                redirect_uri: var(&lookup, "SHIPLANE_UPS_REDIRECT_URI", "UPS_REDIRECT_URI"),
                account_number: var(
                    &lookup,
                    "SHIPLANE_UPS_ACCOUNT_NUMBER",
                    "UPS_ACCOUNT_NUMBER",
                ),
            }),
            _ => None,
        };

        let dhl = var(&lookup, "SHIPLANE_DHL_API_KEY", "DHL_API_KEY").map(|api_key| DhlSettings {
            base_url: base_url(
                &lookup,
                "SHIPLANE_DHL_BASE_URL",
                "DHL_BASE_URL",
                DEFAULT_DHL_BASE_URL,
            ),
            api_key,
            client_id: var(&lookup, "SHIPLANE_DHL_CLIENT_ID", "DHL_CLIENT_ID"),
            client_secret: var(&lookup, "SHIPLANE_DHL_CLIENT_SECRET", "DHL_CLIENT_SECRET"),
            redirect_uri: var(&lookup, "SHIPLANE_DHL_REDIRECT_URI", "DHL_REDIRECT_URI"),
            account_number: var(&lookup, "SHIPLANE_DHL_ACCOUNT_NUMBER", "DHL_ACCOUNT_NUMBER"),
        });

        Self { fedex, ups, dhl }
    }

    /// Configured carriers in aggregation order.
    pub fn configured(&self) -> Vec<CarrierId> {
        let mut carriers = Vec::with_capacity(3);
        if self.fedex.is_some() {
            carriers.push(CarrierId::Fedex);
        }
        if self.ups.is_some() {
            carriers.push(CarrierId::Ups);
        }
        if self.dhl.is_some() {
            carriers.push(CarrierId::Dhl);
        }
        carriers
    }
}

fn var(
    lookup: &impl Fn(&str) -> Option<String>,
    primary: &str,
    fallback: &str,
) -> Option<String> {
    lookup(primary)
        .or_else(|| lookup(fallback))
        .filter(|value| !value.trim().is_empty())
}

fn base_url(
    lookup: &impl Fn(&str) -> Option<String>,
    primary: &str,
    fallback: &str,
    default: &str,
) -> String {
    var(lookup, primary, fallback)
        .map(|url| url.trim_end_matches('/').to_owned())
        .unwrap_or_else(|| String::from(default))
}
