//! Business metrics for entry passes.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `entrypass_reservations_created_total` - Reservations created
//! - `entrypass_places_booked_total` - Places booked across reservations
//! - `entrypass_reserved_amount_total` - Amount due across reservations, in
//!   currency units
//! - `entrypass_tickets_issued_total` - Tickets issued on payment confirmation
//! - `entrypass_ticket_validations_total{outcome}` - Door validations by outcome
//!   (accepted, not_paid, already_used, not_found, malformed)
//! - `entrypass_notifications_total{status}` - Delivery attempts by status
//!   (sent, failed)

use crate::types::Money;
use metrics::describe_counter;

/// Initialize and register all business metrics descriptions.
///
/// This should be called once at application startup, before any metrics are recorded.
pub fn register_business_metrics() {
    describe_counter!(
        "entrypass_reservations_created_total",
        "Total number of reservations created"
    );
    describe_counter!(
        "entrypass_places_booked_total",
        "Total number of places booked"
    );
    describe_counter!(
        "entrypass_reserved_amount_total",
        "Total amount due across created reservations"
    );
    describe_counter!(
        "entrypass_tickets_issued_total",
        "Total number of tickets issued on payment confirmation"
    );
    describe_counter!(
        "entrypass_ticket_validations_total",
        "Total number of ticket validations by outcome"
    );
    describe_counter!(
        "entrypass_notifications_total",
        "Total number of notification deliveries by status (sent, failed)"
    );

    tracing::info!("Business metrics registered");
}

// ============================================================================
// Metric Recording Functions
// ============================================================================

/// Record a reservation created.
///
/// # Arguments
///
/// * `places` - Number of places in the reservation
/// * `amount` - Total amount due
pub fn record_reservation_created(places: u32, amount: Money) {
    metrics::counter!("entrypass_reservations_created_total").increment(1);
    metrics::counter!("entrypass_places_booked_total").increment(u64::from(places));
    metrics::counter!("entrypass_reserved_amount_total").increment(amount.amount());
    tracing::debug!(places, amount = amount.amount(), "Recorded reservation_created metric");
}

/// Record a ticket issued.
pub fn record_ticket_issued() {
    metrics::counter!("entrypass_tickets_issued_total").increment(1);
    tracing::debug!("Recorded ticket_issued metric");
}

/// Record a ticket validation.
///
/// # Arguments
///
/// * `outcome` - Validation outcome (e.g., "accepted", "already_used")
pub fn record_ticket_validation(outcome: &'static str) {
    metrics::counter!("entrypass_ticket_validations_total", "outcome" => outcome).increment(1);
    tracing::debug!(outcome, "Recorded ticket_validation metric");
}

/// Record a notification delivery attempt.
///
/// # Arguments
///
/// * `status` - Delivery status ("sent" or "failed")
pub fn record_notification(status: &'static str) {
    metrics::counter!("entrypass_notifications_total", "status" => status).increment(1);
    tracing::debug!(status, "Recorded notification metric");
}
