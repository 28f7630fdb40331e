//! Carrier adapter implementations.
//!
//! Each adapter speaks one carrier's REST dialect and maps it onto the
//! shared [`CarrierAdapter`](crate::CarrierAdapter) contract:
//!
//! | Adapter | Auth | Idempotency header |
//! |---------|------|--------------------|
//! | [`FedexAdapter`] | OAuth client credentials | `x-customer-transaction-id` |
//! | [`UpsAdapter`] | OAuth client credentials (Basic token endpoint) | `transId` |
//! | [`DhlAdapter`] | Static API key header | `Message-Reference` |
//!
//! Quotes and shipment confirmations keep the carrier's unmodified response
//! item under `raw` so callers can reach fields the normalized shape drops.

mod dhl;
mod fedex;
mod ups;

pub use dhl::DhlAdapter;
pub use fedex::FedexAdapter;
pub use ups::UpsAdapter;

/// Declared parcel values are charged in rand.
pub(crate) const DECLARED_VALUE_CURRENCY: &str = "ZAR";
