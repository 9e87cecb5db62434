//! Reservation and event storage.
//!
//! The lifecycle never reads a reservation, decides, then writes it back.
//! Every lifecycle mutation is a single conditional update scoped by
//! reservation id (`paid` false → true, `ticket` absent → present, `used`
//! false → true), and the store reports which branch it took. Two backends
//! implement the traits:
//!
//! - [`InMemoryStore`]: a write-locked map, used for tests and when no
//!   database is configured
//! - [`PostgresStore`]: `UPDATE ... WHERE <guard> RETURNING` statements

pub mod memory;
pub mod postgres;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;

use crate::types::{Event, EventId, Reservation, ReservationId};
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Store result
pub type StoreResult<T> = Result<T, StoreError>;

/// Boxed future returned by store operations
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = StoreResult<T>> + Send + 'a>>;

/// Storage errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing database failed
    #[error("Database error: {0}")]
    Database(String),

    /// A stored record could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// No reservation with this id exists
    #[error("Reservation {0} not found")]
    ReservationNotFound(ReservationId),

    /// A record with this id already exists
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// The record changed state in a way that forbids the update
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Result of the `paid` false → true compare-and-set
#[derive(Clone, Debug, PartialEq)]
pub enum PaymentTransition {
    /// This call flipped `paid` to true
    Confirmed(Reservation),
    /// `paid` was already true; nothing changed
    AlreadyPaid(Reservation),
}

/// Result of clearing the `paid` flag
#[derive(Clone, Debug, PartialEq)]
pub enum PaymentRevocation {
    /// `paid` is now false
    Revoked(Reservation),
    /// The ticket was already redeemed, so payment cannot be revoked
    Redeemed(Reservation),
}

/// Result of the `ticket` absent → present compare-and-set
#[derive(Clone, Debug, PartialEq)]
pub enum TicketAttachment {
    /// This call stored the ticket
    Attached(Reservation),
    /// A ticket was already stored and is kept
    AlreadyIssued(Reservation),
}

/// Result of the `used` false → true compare-and-set
#[derive(Clone, Debug, PartialEq)]
pub enum Redemption {
    /// This call consumed the ticket
    Redeemed(Reservation),
    /// Payment was never confirmed; nothing changed
    NotPaid(Reservation),
    /// The ticket was consumed earlier; nothing changed
    AlreadyUsed(Reservation),
}

/// Durable record of reservations
pub trait ReservationStore: Send + Sync {
    /// Persist a new reservation.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the id is taken, or a backend error.
    fn insert(&self, reservation: Reservation) -> StoreFuture<'_, Reservation>;

    /// Load a reservation by id.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn get(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>>;

    /// List the reservations of an event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the query fails.
    fn list_by_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Reservation>>;

    /// Atomically set `paid` to true if it was false.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReservationNotFound`] for unknown ids.
    fn mark_paid(&self, id: ReservationId) -> StoreFuture<'_, PaymentTransition>;

    /// Atomically set `paid` to false unless the ticket was redeemed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReservationNotFound`] for unknown ids.
    fn revoke_payment(&self, id: ReservationId) -> StoreFuture<'_, PaymentRevocation>;

    /// Atomically store a ticket if none is stored yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReservationNotFound`] for unknown ids and
    /// [`StoreError::Conflict`] if the reservation is no longer paid.
    fn attach_ticket(&self, id: ReservationId, ticket: String)
    -> StoreFuture<'_, TicketAttachment>;

    /// Atomically mark a paid, unused reservation as used at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReservationNotFound`] for unknown ids.
    fn redeem(&self, id: ReservationId, at: DateTime<Utc>) -> StoreFuture<'_, Redemption>;
}

/// Read access to events (plus registration, used to seed the catalog)
pub trait EventCatalog: Send + Sync {
    /// Register an event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] if the id is taken, or a backend error.
    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event>;

    /// Load an event by id.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the lookup fails.
    fn get_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>>;
}
