//! # Shiplane Web
//!
//! HTTP API for the Shiplane shipping gateway, built on [`axum`].
//!
//! ## Endpoints
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `/shipping/rates` | POST | Aggregated rate lookup across carriers |
//! | `/shipping/create` | POST | Book a shipment with a named carrier |
//! | `/shipping/track/:carrier/:tracking_number` | GET | Raw tracking payload |
//! | `/shipping/pickup` | POST | Book a carrier pickup |
//! | `/shipping/dhl/callback` | GET | DHL OAuth authorization-code exchange |
//! | `/shipping/fedex/callback` | GET | FedEx OAuth exchange with dashboard redirect |
//! | `/shipping/health` | GET | Liveness and registered carriers |
//!
//! Responses share one envelope: `{"success": true, ...}` on success and
//! `{"success": false, "error": "..."}` on failure, with conventional status
//! codes (400 for rejected input, 502 for upstream OAuth failures, 500
//! otherwise). The FedEx callback is the exception, answering with a 303
//! redirect to the dashboard for both outcomes once a code is present.

pub mod error;
pub mod handlers;
pub mod oauth;
pub mod routes;
pub mod state;
pub mod token_store;

pub use error::ApiError;
pub use oauth::{AuthCodeExchange, ExchangeError, OAuthExchanger, TokenGrant};
pub use routes::create_router;
pub use state::AppState;
pub use token_store::{InMemoryTokenStore, StoredToken, TokenStore, TokenStoreError};
