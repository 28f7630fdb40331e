//! Router assembly.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the application router.
///
/// | Route | Method | Purpose |
/// |-------|--------|---------|
/// | `/shipping/rates` | POST | Aggregated rate lookup |
/// | `/shipping/create` | POST | Book a shipment with one carrier |
/// | `/shipping/track/:carrier/:tracking_number` | GET | Raw tracking payload |
/// | `/shipping/pickup` | POST | Book a carrier pickup |
/// | `/shipping/dhl/callback` | GET | DHL OAuth code exchange |
/// | `/shipping/fedex/callback` | GET | FedEx OAuth code exchange |
/// | `/shipping/health` | GET | Registered carriers |
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/shipping/rates", post(handlers::rates::aggregated_rates))
        .route("/shipping/create", post(handlers::shipments::create_shipment))
        .route(
            "/shipping/track/:carrier/:tracking_number",
            get(handlers::shipments::track_shipment),
        )
        .route("/shipping/pickup", post(handlers::shipments::schedule_pickup))
        .route("/shipping/dhl/callback", get(handlers::callbacks::dhl_callback))
        .route(
            "/shipping/fedex/callback",
            get(handlers::callbacks::fedex_callback),
        )
        .route("/shipping/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
