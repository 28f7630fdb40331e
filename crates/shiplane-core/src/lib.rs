//! # Shiplane Core
//!
//! Core contracts and domain types for the Shiplane shipping gateway.
//!
//! ## Overview
//!
//! This crate provides the foundational components for Shiplane:
//!
//! - **Canonical domain models** for addresses, parcels, quotes, and warehouses
//! - **Carrier identifiers** for multi-adapter support
//! - **Carrier adapter trait** with per-carrier REST implementations
//! - **Rate gateway** with concurrent fan-out and failure isolation
//! - **Warehouse selector** that picks the dispatch point closest to a destination
//! - **OAuth token cache** with single-flight refresh
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | Carrier adapter trait and request/error types |
//! | [`adapters`] | Carrier adapters (FedEx, UPS, DHL) |
//! | [`carrier`] | Carrier identifiers and selection |
//! | [`config`] | Environment-driven carrier credentials |
//! | [`domain`] | Domain models (Address, Parcel, RateQuote, Warehouse) |
//! | [`error`] | Core error types |
//! | [`gateway`] | Carrier registry, rate fan-out, and dispatch |
//! | [`http_client`] | HTTP client abstraction |
//! | [`retry`] | Retry policy with backoff |
//! | [`token`] | OAuth client-credentials token cache |
//! | [`warehouse`] | Warehouse catalog and nearest-warehouse selection |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use shiplane_core::{Address, Dimensions, GatewayBuilder, RateLookup};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credentials come from SHIPLANE_* environment variables
//!     let gateway = GatewayBuilder::from_env().build();
//!
//!     let destination = Address::new("1 Long St", "Cape Town", "WC", "ZA", "8001")?
//!         .with_coordinates(-33.9249, 18.4241)?;
//!     let origin = Address::new("24 Electron Ave", "Isando", "GP", "ZA", "1601")?;
//!
//!     let lookup = RateLookup::new(origin, destination, 2.5, Dimensions::new(30.0, 20.0, 10.0)?);
//!     let aggregate = gateway.aggregated_rates(lookup).await?;
//!
//!     for option in &aggregate.options {
//!         match &option.outcome {
//!             Ok(rates) => println!("{}: {} services", option.carrier, rates.len()),
//!             Err(error) => println!("{}: {}", option.carrier, error),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  HTTP / Caller  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Carrier Gateway │────▶│ Warehouse        │
//! │ (fan-out)       │     │ Selector         │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ Carrier Adapter │────▶│ Token Cache      │
//! │ (FedEx/UPS/DHL) │     │ (OAuth)          │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ HTTP Client     │
//! │ (reqwest)       │
//! └─────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! Carrier operations return `Result` types with structured errors:
//!
//! ```rust
//! use shiplane_core::{CarrierError, CarrierErrorKind};
//!
//! fn handle_error(error: CarrierError) {
//!     match error.kind() {
//!         CarrierErrorKind::RateLimited => {
//!             // Wait and retry
//!         }
//!         CarrierErrorKind::Unconfigured => {
//!             // Credentials missing; do not call again
//!         }
//!         CarrierErrorKind::InvalidRequest => {
//!             // Report to the caller
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - Carrier credentials are read from environment variables only (never logged)
//! - OAuth tokens live in memory and are refreshed single-flight
//! - Input validation on all domain types

pub mod adapter;
pub mod adapters;
pub mod carrier;
pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod http_client;
pub mod retry;
pub mod token;
pub mod warehouse;

// Re-export commonly used types at crate root for convenience

// Adapter implementations
pub use adapters::{DhlAdapter, FedexAdapter, UpsAdapter};

// Adapter contract and request types
pub use adapter::{CarrierAdapter, CarrierError, CarrierErrorKind, RateRequest, ShipmentRequest};

// Carrier identifiers
pub use carrier::{CarrierId, CarrierSelection, RatePreference};

// Configuration
pub use config::{CarrierSettings, DhlSettings, FedexSettings, UpsSettings};

// Domain models
pub use domain::{Address, Dimensions, Parcel, RateQuote, ShipmentResult, Warehouse};

// Error types
pub use error::ValidationError;

// Gateway types
pub use gateway::{
    CarrierGateway, CarrierRateOutcome, GatewayBuilder, GatewayConfig, RateAggregate, RateLookup,
};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
};

// Retry logic
pub use retry::{Backoff, RetryConfig};

// Token cache
pub use token::{parse_client_credentials_response, IssuedToken, TokenCache};

// Warehouse selection
pub use warehouse::{haversine_km, WarehouseSelector};
