//! Router configuration.
//!
//! Builds the complete Axum router with all endpoints.

use super::health::{health_check, readiness_check};
use super::state::AppState;
use crate::api::{events, reservations};
use axum::{
    Router,
    routing::{get, patch, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// Configures:
/// - Health and readiness checks
/// - Event endpoints (registration, reservations listing, sharing)
/// - Reservation endpoints (creation, payment, door validation)
///
/// Every request is traced through `tower-http`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Events
        .route("/events", post(events::create_event))
        .route("/events/:id", get(events::get_event))
        .route(
            "/events/:id/reservations",
            get(events::list_event_reservations),
        )
        .route("/events/:id/share-link", post(events::share_link))
        .route("/events/:id/share", post(events::share_event))
        // Reservations
        .route("/reservations", post(reservations::create_reservation))
        .route("/reservations/validate", post(reservations::validate_ticket))
        .route("/reservations/:id", get(reservations::get_reservation))
        .route(
            "/reservations/:id/event",
            get(reservations::get_reservation_event),
        )
        .route(
            "/reservations/:id/confirm",
            post(reservations::confirm_payment),
        )
        .route(
            "/reservations/:id/payment",
            patch(reservations::update_payment),
        );

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
