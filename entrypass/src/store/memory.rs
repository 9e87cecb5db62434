//! In-memory store.
//!
//! Each conditional update runs under the map's write lock, which gives the
//! same per-reservation atomicity as a guarded `UPDATE` in `PostgreSQL`.

use super::{
    EventCatalog, PaymentRevocation, PaymentTransition, Redemption, ReservationStore, StoreError,
    StoreFuture, TicketAttachment,
};
use crate::types::{Event, EventId, Reservation, ReservationId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Reservations and events held in process memory
#[derive(Debug, Default)]
pub struct InMemoryStore {
    reservations: RwLock<HashMap<ReservationId, Reservation>>,
    events: RwLock<HashMap<EventId, Event>>,
}

impl InMemoryStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored reservations
    pub async fn reservation_count(&self) -> usize {
        self.reservations.read().await.len()
    }
}

impl ReservationStore for InMemoryStore {
    fn insert(&self, reservation: Reservation) -> StoreFuture<'_, Reservation> {
        Box::pin(async move {
            let mut reservations = self.reservations.write().await;
            if reservations.contains_key(&reservation.id) {
                return Err(StoreError::Duplicate(format!("reservation {}", reservation.id)));
            }
            reservations.insert(reservation.id, reservation.clone());
            Ok(reservation)
        })
    }

    fn get(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>> {
        Box::pin(async move { Ok(self.reservations.read().await.get(&id).cloned()) })
    }

    fn list_by_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            let mut matching: Vec<Reservation> = self
                .reservations
                .read()
                .await
                .values()
                .filter(|reservation| reservation.event_id == event_id)
                .cloned()
                .collect();
            matching.sort_by_key(|reservation| reservation.reserved_at);
            Ok(matching)
        })
    }

    fn mark_paid(&self, id: ReservationId) -> StoreFuture<'_, PaymentTransition> {
        Box::pin(async move {
            let mut reservations = self.reservations.write().await;
            let reservation = reservations
                .get_mut(&id)
                .ok_or(StoreError::ReservationNotFound(id))?;

            if reservation.paid {
                return Ok(PaymentTransition::AlreadyPaid(reservation.clone()));
            }
            reservation.paid = true;
            Ok(PaymentTransition::Confirmed(reservation.clone()))
        })
    }

    fn revoke_payment(&self, id: ReservationId) -> StoreFuture<'_, PaymentRevocation> {
        Box::pin(async move {
            let mut reservations = self.reservations.write().await;
            let reservation = reservations
                .get_mut(&id)
                .ok_or(StoreError::ReservationNotFound(id))?;

            if reservation.used {
                return Ok(PaymentRevocation::Redeemed(reservation.clone()));
            }
            reservation.paid = false;
            Ok(PaymentRevocation::Revoked(reservation.clone()))
        })
    }

    fn attach_ticket(
        &self,
        id: ReservationId,
        ticket: String,
    ) -> StoreFuture<'_, TicketAttachment> {
        Box::pin(async move {
            let mut reservations = self.reservations.write().await;
            let reservation = reservations
                .get_mut(&id)
                .ok_or(StoreError::ReservationNotFound(id))?;

            if reservation.ticket.is_some() {
                return Ok(TicketAttachment::AlreadyIssued(reservation.clone()));
            }
            if !reservation.paid {
                return Err(StoreError::Conflict(format!(
                    "reservation {id} is not paid, refusing to attach a ticket"
                )));
            }
            reservation.ticket = Some(ticket);
            Ok(TicketAttachment::Attached(reservation.clone()))
        })
    }

    fn redeem(&self, id: ReservationId, at: DateTime<Utc>) -> StoreFuture<'_, Redemption> {
        Box::pin(async move {
            let mut reservations = self.reservations.write().await;
            let reservation = reservations
                .get_mut(&id)
                .ok_or(StoreError::ReservationNotFound(id))?;

            if !reservation.paid {
                return Ok(Redemption::NotPaid(reservation.clone()));
            }
            if reservation.used {
                return Ok(Redemption::AlreadyUsed(reservation.clone()));
            }
            reservation.used = true;
            reservation.used_at = Some(at);
            Ok(Redemption::Redeemed(reservation.clone()))
        })
    }
}

impl EventCatalog for InMemoryStore {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let mut events = self.events.write().await;
            if events.contains_key(&event.id) {
                return Err(StoreError::Duplicate(format!("event {}", event.id)));
            }
            events.insert(event.id, event.clone());
            Ok(event)
        })
    }

    fn get_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move { Ok(self.events.read().await.get(&id).cloned()) })
    }
}
