//! # Domain Models
//!
//! Canonical domain types for shipping rate lookups and shipment creation.
//!
//! ## Overview
//!
//! This module provides strongly-typed domain models with built-in validation.
//! All models are designed to be:
//!
//! - **Type-safe**: Invalid states are unrepresentable
//! - **Validated**: Construction validates all invariants
//! - **Serializable**: Full serde support for JSON
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Address`] | Postal address with optional coordinates |
//! | [`Dimensions`] | Package dimensions in centimetres |
//! | [`Parcel`] | Package weight plus dimensions |
//! | [`Warehouse`] | Dispatch warehouse with a fixed location |
//! | [`RateQuote`] | One normalized shipping option from a carrier |
//! | [`ShipmentResult`] | Outcome of a shipment creation call |
//!
//! ## Validation
//!
//! All domain types enforce invariants at construction time:
//!
//! ```rust,ignore
//! use shiplane_core::{Dimensions, ValidationError};
//!
//! // Valid dimensions
//! let dims = Dimensions::new(30.0, 20.0, 10.0)?;
//!
//! // Invalid dimensions (zero height) - returns ValidationError
//! let invalid = Dimensions::new(30.0, 20.0, 0.0);
//! assert!(matches!(invalid, Err(ValidationError::NonPositiveValue { .. })));
//! ```

mod models;

pub use models::{Address, Dimensions, Parcel, RateQuote, ShipmentResult, Warehouse};
