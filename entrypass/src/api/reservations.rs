//! Reservation API endpoints.
//!
//! - POST /api/reservations - Create a reservation
//! - GET /api/reservations/:id - Get a reservation
//! - GET /api/reservations/:id/event - Get the event a reservation belongs to
//! - POST /api/reservations/:id/confirm - Confirm payment (issues the ticket)
//! - PATCH /api/reservations/:id/payment - Set the payment flag
//! - POST /api/reservations/validate - Validate scanned ticket data at the door
//!
//! # State Machine
//!
//! ```text
//! Created ──confirm──→ Paid ──validate──→ Used
//!    ↑                   │
//!    └──payment=false────┘
//! ```

use super::error::ApiError;
use crate::lifecycle::{ConfirmationReport, ValidationOutcome};
use crate::server::state::AppState;
use crate::types::{Event, NewReservation, Reservation, ReservationId};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

// ============================================================================
// Request Types
// ============================================================================

/// Request to set the payment flag.
#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    /// New value of the flag
    pub paid: bool,
}

/// Scanned ticket data submitted at the door.
#[derive(Debug, Deserialize)]
pub struct ValidateTicketRequest {
    /// Payload string read from the QR code
    #[serde(alias = "ticketData")]
    pub ticket_data: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a reservation.
///
/// # Errors
///
/// Returns 404 if the event does not exist and 422 for invalid fields.
pub async fn create_reservation(
    State(state): State<AppState>,
    request: Result<Json<NewReservation>, JsonRejection>,
) -> Result<(StatusCode, Json<Reservation>), ApiError> {
    let Json(request) = request?;
    let reservation = state.lifecycle.create_reservation(request).await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// Get a reservation by id.
///
/// # Errors
///
/// Returns 404 if the reservation does not exist.
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = state
        .lifecycle
        .get_reservation(ReservationId::from_uuid(id))
        .await?;
    Ok(Json(reservation))
}

/// Get the event a reservation belongs to.
///
/// # Errors
///
/// Returns 404 if the reservation or its event does not exist.
pub async fn get_reservation_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError> {
    let event = state
        .lifecycle
        .reservation_event(ReservationId::from_uuid(id))
        .await?;
    Ok(Json(event))
}

/// Confirm payment of a reservation.
///
/// Idempotent: repeated calls report `ticket_issued: false` and send nothing.
///
/// # Errors
///
/// Returns 404 if the reservation does not exist.
pub async fn confirm_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ConfirmationReport>, ApiError> {
    let report = state
        .lifecycle
        .confirm_payment(ReservationId::from_uuid(id))
        .await?;
    Ok(Json(report))
}

/// Set the payment flag of a reservation.
///
/// # Errors
///
/// Returns 404 if the reservation does not exist and 422 when revoking the
/// payment of a used ticket.
pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Result<Json<UpdatePaymentRequest>, JsonRejection>,
) -> Result<Json<ConfirmationReport>, ApiError> {
    let Json(request) = request?;
    let report = state
        .lifecycle
        .update_payment_flag(ReservationId::from_uuid(id), request.paid)
        .await?;
    Ok(Json(report))
}

/// Validate a scanned ticket.
///
/// Refusals (not paid, already used) are `200 OK` with `success: false`.
///
/// # Errors
///
/// Returns 400 for a body without ticket data or for undecodable ticket
/// data, and 404 when no reservation matches.
pub async fn validate_ticket(
    State(state): State<AppState>,
    request: Result<Json<ValidateTicketRequest>, JsonRejection>,
) -> Result<Json<ValidationOutcome>, ApiError> {
    let Json(request) = request?;
    let outcome = state.lifecycle.validate_ticket(&request.ticket_data).await?;
    Ok(Json(outcome))
}
