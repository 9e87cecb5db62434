//! Event API endpoints.
//!
//! - POST /api/events - Register an event
//! - GET /api/events/:id - Get an event
//! - GET /api/events/:id/reservations - List the reservations of an event
//! - POST /api/events/:id/share-link - Build a share deep link (no message sent)
//! - POST /api/events/:id/share - Send the event to a messaging number

use super::error::ApiError;
use crate::lifecycle::{NotificationStatus, ShareLink};
use crate::server::state::AppState;
use crate::types::{Event, EventId, NewEvent, Reservation};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;
use uuid::Uuid;

/// Request to share an event with someone.
#[derive(Debug, Deserialize)]
pub struct ShareEventRequest {
    /// Messaging number to send the event to
    pub destination: String,
}

/// Register an event.
///
/// # Errors
///
/// Returns 422 for invalid fields.
pub async fn create_event(
    State(state): State<AppState>,
    request: Result<Json<NewEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let Json(request) = request?;
    let event = state.lifecycle.register_event(request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// Get an event by id.
///
/// # Errors
///
/// Returns 404 if the event does not exist.
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError> {
    let event = state.lifecycle.get_event(EventId::from_uuid(id)).await?;
    Ok(Json(event))
}

/// List the reservations of an event.
///
/// # Errors
///
/// Returns 404 if the event does not exist.
pub async fn list_event_reservations(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    let reservations = state
        .lifecycle
        .list_reservations(EventId::from_uuid(id))
        .await?;
    Ok(Json(reservations))
}

/// Build the share deep link of an event.
///
/// # Errors
///
/// Returns 404 if the event does not exist.
pub async fn share_link(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShareLink>, ApiError> {
    let link = state.lifecycle.share_link(EventId::from_uuid(id)).await?;
    Ok(Json(link))
}

/// Send an event to a messaging number.
///
/// Gateway failures are reported in the body, not as an error status.
///
/// # Errors
///
/// Returns 404 if the event does not exist and 422 for an empty destination.
pub async fn share_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Result<Json<ShareEventRequest>, JsonRejection>,
) -> Result<Json<NotificationStatus>, ApiError> {
    let Json(request) = request?;
    let status = state
        .lifecycle
        .share_event(EventId::from_uuid(id), &request.destination)
        .await?;
    Ok(Json(status))
}
