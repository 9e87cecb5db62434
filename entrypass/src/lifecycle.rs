//! Reservation lifecycle manager.
//!
//! Drives each reservation through `Created → Paid → Used`:
//!
//! - **Payment confirmation** flips `paid`, issues a ticket and attempts one
//!   delivery to the holder
//! - **Validation** consumes a paid ticket exactly once at the door
//! - **Payment flag updates** either route through the same issuance step or
//!   write the flag without side effects
//!
//! Every state change is delegated to a conditional update in the
//! [`ReservationStore`], so concurrent callers never both win a transition.
//! Notification runs after the ticket is committed, bounded by a timeout, and
//! its failure is reported, never propagated.

use crate::codec::{CodecError, TicketCodec};
use crate::config::Config;
use crate::environment::Clock;
use crate::metrics;
use crate::notification::{self, NotificationError, NotificationGateway, TicketContext};
use crate::store::{
    EventCatalog, PaymentRevocation, PaymentTransition, Redemption, ReservationStore, StoreError,
    TicketAttachment,
};
use crate::types::{
    Event, EventId, EventSummary, NewEvent, NewReservation, Reservation, ReservationId,
    display_datetime,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Message returned when a ticket is accepted at the door
pub const ACCEPTED_MESSAGE: &str = "Ticket validated. Welcome!";

/// Message returned when the reservation was never paid
pub const NOT_PAID_MESSAGE: &str = "Payment required: this reservation is not paid";

/// Lifecycle result
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Errors returned by lifecycle operations.
///
/// Door rejections (not paid, already used) are not errors: they come back
/// as a [`ValidationOutcome`] with `success == false`.
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// Request fields are invalid
    #[error("Validation error: {0}")]
    Validation(String),

    /// The referenced record does not exist
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of record ("reservation", "event")
        resource: &'static str,
        /// Requested identifier
        id: String,
    },

    /// Scanned data is not a ticket payload
    #[error("Malformed ticket: {0}")]
    MalformedTicket(String),

    /// The reservation changed concurrently in a way that forbids the operation
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The store failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// The ticket could not be produced
    #[error("Ticket issuance failed: {0}")]
    Issuance(String),
}

impl From<StoreError> for LifecycleError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::ReservationNotFound(id) => Self::NotFound {
                resource: "reservation",
                id: id.to_string(),
            },
            StoreError::Conflict(message) => Self::Conflict(message),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<CodecError> for LifecycleError {
    fn from(error: CodecError) -> Self {
        match error {
            CodecError::Malformed(message) => Self::MalformedTicket(message),
            CodecError::Render(message) => Self::Issuance(message),
        }
    }
}

/// What happened to the delivery attempted after a payment confirmation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NotificationStatus {
    /// The gateway accepted the message
    Sent,
    /// The gateway was unavailable; state is unaffected
    Failed {
        /// Gateway error description
        reason: String,
    },
    /// No delivery was attempted
    Skipped,
}

/// Result of an operation that may confirm a payment
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfirmationReport {
    /// Reservation after the operation
    pub reservation: Reservation,
    /// Whether this call issued the ticket
    pub ticket_issued: bool,
    /// Delivery status
    pub notification: NotificationStatus,
}

/// Door validation verdict
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationOutcome {
    /// `true` only when this call consumed the ticket
    pub success: bool,
    /// Message shown to door staff
    pub message: String,
    /// Reservation as it stands after the call
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation: Option<Reservation>,
}

/// A pre-filled share link for an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLink {
    /// Deep link opening a pre-filled message
    pub share_link: String,
    /// The message the link pre-fills
    pub message: String,
}

/// Settings the lifecycle reads from configuration at construction
#[derive(Clone, Debug)]
pub struct LifecycleSettings {
    /// Upper bound on one delivery attempt
    pub notification_timeout: Duration,
    /// Currency label used in messages
    pub currency: String,
    /// Public frontend URL event pages live under
    pub frontend_url: String,
}

impl LifecycleSettings {
    /// Extracts lifecycle settings from the application configuration
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            notification_timeout: config.notification.timeout(),
            currency: config.notification.currency_label.clone(),
            frontend_url: config.share.frontend_url.trim_end_matches('/').to_string(),
        }
    }

    fn event_url(&self, id: EventId) -> String {
        format!("{}/events/{id}", self.frontend_url)
    }
}

/// Orchestrates reservations, tickets and notifications
#[derive(Clone)]
pub struct LifecycleManager {
    reservations: Arc<dyn ReservationStore>,
    events: Arc<dyn EventCatalog>,
    notifier: Arc<dyn NotificationGateway>,
    clock: Arc<dyn Clock>,
    codec: TicketCodec,
    settings: LifecycleSettings,
}

impl LifecycleManager {
    /// Creates a manager over the given collaborators
    #[must_use]
    pub fn new(
        reservations: Arc<dyn ReservationStore>,
        events: Arc<dyn EventCatalog>,
        notifier: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
        settings: LifecycleSettings,
    ) -> Self {
        Self {
            reservations,
            events,
            notifier,
            codec: TicketCodec::new(Arc::clone(&clock)),
            clock,
            settings,
        }
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Registers an event.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::Validation`] for invalid fields, or a storage error.
    #[tracing::instrument(skip(self, request), fields(name = %request.name))]
    pub async fn register_event(&self, request: NewEvent) -> LifecycleResult<Event> {
        request.validate().map_err(LifecycleError::Validation)?;

        let event = self
            .events
            .insert_event(request.into_event(self.clock.now()))
            .await?;

        tracing::info!(event_id = %event.id, "Event registered");
        Ok(event)
    }

    /// Loads an event.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if the event does not exist.
    pub async fn get_event(&self, id: EventId) -> LifecycleResult<Event> {
        self.events
            .get_event(id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound {
                resource: "event",
                id: id.to_string(),
            })
    }

    // ========================================================================
    // Reservations
    // ========================================================================

    /// Creates a reservation in the `Created` state.
    ///
    /// A request already marked as paid is stored paid, but no ticket is
    /// issued and nothing is sent.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if the event does not exist,
    /// [`LifecycleError::Validation`] for invalid fields, or a storage error.
    #[tracing::instrument(skip(self, request), fields(event_id = %request.event_id))]
    pub async fn create_reservation(&self, request: NewReservation) -> LifecycleResult<Reservation> {
        let event = self.get_event(request.event_id).await?;
        request.validate(&event).map_err(LifecycleError::Validation)?;

        let reservation = self
            .reservations
            .insert(request.into_reservation(self.clock.now()))
            .await?;

        metrics::record_reservation_created(reservation.places, reservation.total_amount);
        tracing::info!(
            reservation_id = %reservation.id,
            places = reservation.places,
            paid = reservation.paid,
            "Reservation created"
        );
        Ok(reservation)
    }

    /// Loads a reservation.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if the reservation does not exist.
    pub async fn get_reservation(&self, id: ReservationId) -> LifecycleResult<Reservation> {
        self.reservations
            .get(id)
            .await?
            .ok_or_else(|| LifecycleError::NotFound {
                resource: "reservation",
                id: id.to_string(),
            })
    }

    /// Lists the reservations of an event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if the event does not exist.
    pub async fn list_reservations(&self, event_id: EventId) -> LifecycleResult<Vec<Reservation>> {
        self.get_event(event_id).await?;
        Ok(self.reservations.list_by_event(event_id).await?)
    }

    /// Loads the event a reservation belongs to.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if either record is missing.
    pub async fn reservation_event(&self, id: ReservationId) -> LifecycleResult<Event> {
        let reservation = self.get_reservation(id).await?;
        self.get_event(reservation.event_id).await
    }

    // ========================================================================
    // Payment
    // ========================================================================

    /// Confirms payment of a reservation.
    ///
    /// The first confirmation issues the ticket and attempts one delivery.
    /// Later confirmations change nothing and send nothing, except that a
    /// paid reservation still lacking a ticket gets one.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for unknown reservations, or a
    /// storage or issuance error. Delivery failures are reported in the
    /// [`ConfirmationReport`], never returned as errors.
    #[tracing::instrument(skip(self), fields(reservation_id = %id))]
    pub async fn confirm_payment(&self, id: ReservationId) -> LifecycleResult<ConfirmationReport> {
        self.confirm_and_issue(id).await
    }

    /// Sets the payment flag.
    ///
    /// Setting `paid` goes through the same transition as
    /// [`confirm_payment`](Self::confirm_payment), so a retry after a failed
    /// issuance still issues the ticket. Clearing it only changes the flag.
    /// Payment cannot be revoked once the ticket was used.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] for unknown reservations,
    /// [`LifecycleError::Validation`] when revoking a redeemed reservation,
    /// or a storage or issuance error.
    #[tracing::instrument(skip(self), fields(reservation_id = %id))]
    pub async fn update_payment_flag(
        &self,
        id: ReservationId,
        paid: bool,
    ) -> LifecycleResult<ConfirmationReport> {
        if paid {
            return self.confirm_and_issue(id).await;
        }

        match self.reservations.revoke_payment(id).await? {
            PaymentRevocation::Revoked(reservation) => {
                tracing::info!("Payment flag cleared");
                Ok(ConfirmationReport {
                    reservation,
                    ticket_issued: false,
                    notification: NotificationStatus::Skipped,
                })
            }
            PaymentRevocation::Redeemed(_) => Err(LifecycleError::Validation(format!(
                "Reservation {id} was already used, payment cannot be revoked"
            ))),
        }
    }

    /// Marks the reservation paid and issues its ticket.
    ///
    /// A reservation left paid without a ticket by an earlier failed
    /// issuance gets its ticket on the next call.
    async fn confirm_and_issue(&self, id: ReservationId) -> LifecycleResult<ConfirmationReport> {
        match self.reservations.mark_paid(id).await? {
            PaymentTransition::Confirmed(reservation) => {
                tracing::info!("Payment confirmed");
                self.issue_ticket(reservation).await
            }
            PaymentTransition::AlreadyPaid(reservation) if reservation.ticket.is_none() => {
                tracing::warn!("Paid reservation has no ticket, issuing it now");
                self.issue_ticket(reservation).await
            }
            PaymentTransition::AlreadyPaid(reservation) => {
                tracing::debug!("Payment already confirmed");
                Ok(ConfirmationReport {
                    reservation,
                    ticket_issued: false,
                    notification: NotificationStatus::Skipped,
                })
            }
        }
    }

    /// Issues, persists and delivers the ticket of a paid reservation.
    ///
    /// Only the caller whose ticket is stored sends a notification.
    async fn issue_ticket(&self, reservation: Reservation) -> LifecycleResult<ConfirmationReport> {
        let ticket = self.codec.encode(reservation.id, reservation.event_id)?;
        let issued_at = ticket.payload.issued_at;

        match self
            .reservations
            .attach_ticket(reservation.id, ticket.artifact)
            .await?
        {
            TicketAttachment::Attached(reservation) => {
                metrics::record_ticket_issued();
                tracing::info!(
                    reservation_id = %reservation.id,
                    issued_at = %issued_at,
                    "Ticket issued"
                );

                let notification = self.notify_holder(&reservation).await;
                Ok(ConfirmationReport {
                    reservation,
                    ticket_issued: true,
                    notification,
                })
            }
            TicketAttachment::AlreadyIssued(reservation) => {
                tracing::debug!(
                    reservation_id = %reservation.id,
                    "Ticket already issued by a concurrent confirmation"
                );
                Ok(ConfirmationReport {
                    reservation,
                    ticket_issued: false,
                    notification: NotificationStatus::Skipped,
                })
            }
        }
    }

    async fn notify_holder(&self, reservation: &Reservation) -> NotificationStatus {
        let Some(artifact) = reservation.ticket.as_deref() else {
            return NotificationStatus::Skipped;
        };

        let event = match self.get_event(reservation.event_id).await {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(
                    reservation_id = %reservation.id,
                    error = %e,
                    "Cannot build ticket message, skipping delivery"
                );
                metrics::record_notification("failed");
                return NotificationStatus::Failed {
                    reason: e.to_string(),
                };
            }
        };

        let context = TicketContext {
            event_name: event.name.clone(),
            event_date: display_datetime(&event.date),
            places: reservation.places,
            amount: reservation.total_amount,
            recipient_name: reservation.contact.full_name(),
        };

        let delivery = self.notifier.send_ticket(
            &reservation.contact.messaging_number,
            artifact,
            &context,
        );
        self.bounded_delivery(delivery, reservation.id.to_string())
            .await
    }

    async fn bounded_delivery(
        &self,
        delivery: impl std::future::Future<Output = Result<(), NotificationError>>,
        subject: String,
    ) -> NotificationStatus {
        let timeout = self.settings.notification_timeout;
        let result = match tokio::time::timeout(timeout, delivery).await {
            Ok(result) => result,
            Err(_) => Err(NotificationError::Timeout(timeout)),
        };

        match result {
            Ok(()) => {
                metrics::record_notification("sent");
                tracing::info!(subject = %subject, "Notification sent");
                NotificationStatus::Sent
            }
            Err(e) => {
                metrics::record_notification("failed");
                tracing::warn!(subject = %subject, error = %e, "Notification failed");
                NotificationStatus::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    // ========================================================================
    // Door validation
    // ========================================================================

    /// Validates scanned ticket data at the door.
    ///
    /// The only operation that marks a reservation used. Concurrent
    /// validations of one ticket yield exactly one acceptance.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::MalformedTicket`] for undecodable data and
    /// [`LifecycleError::NotFound`] when no reservation matches.
    #[tracing::instrument(skip(self, raw))]
    pub async fn validate_ticket(&self, raw: &str) -> LifecycleResult<ValidationOutcome> {
        let payload = TicketCodec::decode(raw).inspect_err(|e| {
            metrics::record_ticket_validation("malformed");
            tracing::info!(error = %e, "Rejected malformed ticket");
        })?;
        let id = payload.reservation_id;

        let redemption = match self.reservations.redeem(id, self.clock.now()).await {
            Ok(redemption) => redemption,
            Err(e) => {
                if matches!(e, StoreError::ReservationNotFound(_)) {
                    metrics::record_ticket_validation("not_found");
                    tracing::info!(reservation_id = %id, "Ticket matches no reservation");
                }
                return Err(e.into());
            }
        };

        let outcome = match redemption {
            Redemption::Redeemed(reservation) => {
                metrics::record_ticket_validation("accepted");
                tracing::info!(
                    reservation_id = %id,
                    status = ?reservation.status(),
                    "Ticket accepted"
                );
                ValidationOutcome {
                    success: true,
                    message: ACCEPTED_MESSAGE.to_string(),
                    reservation: Some(reservation),
                }
            }
            Redemption::NotPaid(reservation) => {
                metrics::record_ticket_validation("not_paid");
                tracing::info!(
                    reservation_id = %id,
                    status = ?reservation.status(),
                    "Ticket refused, reservation not paid"
                );
                ValidationOutcome {
                    success: false,
                    message: NOT_PAID_MESSAGE.to_string(),
                    reservation: Some(reservation),
                }
            }
            Redemption::AlreadyUsed(reservation) => {
                metrics::record_ticket_validation("already_used");
                let used_at = reservation
                    .used_at
                    .as_ref()
                    .map(display_datetime)
                    .unwrap_or_default();
                tracing::info!(reservation_id = %id, used_at = %used_at, "Ticket refused, already used");
                ValidationOutcome {
                    success: false,
                    message: format!("This ticket was already used on {used_at}"),
                    reservation: Some(reservation),
                }
            }
        };

        Ok(outcome)
    }

    // ========================================================================
    // Sharing
    // ========================================================================

    /// Summary of an event as shared with prospective attendees.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if the event does not exist.
    pub async fn event_summary(&self, event_id: EventId) -> LifecycleResult<EventSummary> {
        let event = self.get_event(event_id).await?;
        Ok(event.summary(self.settings.event_url(event_id)))
    }

    /// Builds the share deep link of an event. No message is sent.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if the event does not exist.
    #[tracing::instrument(skip(self), fields(event_id = %event_id))]
    pub async fn share_link(&self, event_id: EventId) -> LifecycleResult<ShareLink> {
        let summary = self.event_summary(event_id).await?;
        let currency = &self.settings.currency;

        Ok(ShareLink {
            share_link: notification::share_link(&summary, currency),
            message: format!(
                "{}\n\nBook now: {}",
                notification::share_message(&summary, currency),
                summary.url
            ),
        })
    }

    /// Sends an event share message, with the flyer when the event has one.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::NotFound`] if the event does not exist and
    /// [`LifecycleError::Validation`] for an empty destination. Delivery
    /// failures come back as [`NotificationStatus::Failed`].
    #[tracing::instrument(skip(self, destination), fields(event_id = %event_id))]
    pub async fn share_event(
        &self,
        event_id: EventId,
        destination: &str,
    ) -> LifecycleResult<NotificationStatus> {
        if destination.trim().is_empty() {
            return Err(LifecycleError::Validation(
                "Destination number must not be empty".to_string(),
            ));
        }

        let event = self.get_event(event_id).await?;
        let summary = event.summary(self.settings.event_url(event_id));
        let delivery =
            self.notifier
                .share_event(destination, &summary, event.flyer_url.as_deref());

        Ok(self.bounded_delivery(delivery, event_id.to_string()).await)
    }
}
