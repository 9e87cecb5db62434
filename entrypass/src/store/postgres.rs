//! PostgreSQL-backed store.
//!
//! Reservations keep their commercial fields (contact, tier, amount, ...) as
//! JSONB in `data`, while the lifecycle flags live in dedicated columns so
//! every transition is one guarded `UPDATE ... RETURNING`. When both disagree
//! the columns win.

use super::{
    EventCatalog, PaymentRevocation, PaymentTransition, Redemption, ReservationStore, StoreError,
    StoreFuture, StoreResult, TicketAttachment,
};
use crate::config::DatabaseConfig;
use crate::types::{Event, EventId, Reservation, ReservationId};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::JsonValue;
use std::time::Duration;

type ReservationRow = (JsonValue, bool, Option<String>, bool, Option<DateTime<Utc>>);

const RETURNING: &str = "RETURNING data, paid, ticket, used, used_at";

/// `PostgreSQL` store for reservations and events
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if no URL is configured or the
    /// database cannot be reached.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| StoreError::Database("DATABASE_URL is not set".to_string()))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout))
            .connect(url)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to connect: {e}")))?;

        Ok(Self::new(pool))
    }

    /// Run database migrations.
    ///
    /// # Errors
    ///
    /// Returns error if migrations fail.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        Ok(())
    }

    /// Checks that the database answers.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the ping fails.
    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Ping failed: {e}")))?;
        Ok(())
    }

    async fn fetch(&self, id: ReservationId) -> StoreResult<Option<Reservation>> {
        let row: Option<ReservationRow> = sqlx::query_as(
            "SELECT data, paid, ticket, used, used_at FROM reservations WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to query reservation: {e}")))?;

        row.map(from_row).transpose()
    }

    async fn fetch_existing(&self, id: ReservationId) -> StoreResult<Reservation> {
        self.fetch(id)
            .await?
            .ok_or(StoreError::ReservationNotFound(id))
    }

    /// Runs a guarded update; `None` means the guard did not match.
    async fn guarded_update(
        &self,
        statement: &str,
        id: ReservationId,
        argument: Option<UpdateArgument>,
    ) -> StoreResult<Option<Reservation>> {
        let query = sqlx::query_as::<_, ReservationRow>(statement).bind(id.as_uuid());
        let query = match argument {
            Some(UpdateArgument::Text(text)) => query.bind(text),
            Some(UpdateArgument::Timestamp(at)) => query.bind(at),
            None => query,
        };

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to update reservation: {e}")))?;

        row.map(from_row).transpose()
    }
}

enum UpdateArgument {
    Text(String),
    Timestamp(DateTime<Utc>),
}

fn from_row((data, paid, ticket, used, used_at): ReservationRow) -> StoreResult<Reservation> {
    let mut reservation: Reservation = serde_json::from_value(data)
        .map_err(|e| StoreError::Serialization(format!("Failed to deserialize reservation: {e}")))?;
    reservation.paid = paid;
    reservation.ticket = ticket;
    reservation.used = used;
    reservation.used_at = used_at;
    Ok(reservation)
}

/// Classifies a reservation the redeem guard did not match.
///
/// A payment confirmed between the guard and the re-read leaves the row paid
/// but unused; it was unpaid when the guard ran.
fn missed_redemption(current: Reservation) -> Redemption {
    if current.used {
        Redemption::AlreadyUsed(current)
    } else {
        Redemption::NotPaid(current)
    }
}

fn insert_error(e: &sqlx::Error, what: String) -> StoreError {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StoreError::Duplicate(what),
        _ => StoreError::Database(format!("Failed to insert {what}: {e}")),
    }
}

impl ReservationStore for PostgresStore {
    fn insert(&self, reservation: Reservation) -> StoreFuture<'_, Reservation> {
        Box::pin(async move {
            let data = serde_json::to_value(&reservation)
                .map_err(|e| StoreError::Serialization(format!("Failed to serialize reservation: {e}")))?;

            sqlx::query(
                "INSERT INTO reservations
                    (id, event_id, data, paid, ticket, used, used_at, reserved_at)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
            )
            .bind(reservation.id.as_uuid())
            .bind(reservation.event_id.as_uuid())
            .bind(&data)
            .bind(reservation.paid)
            .bind(reservation.ticket.as_deref())
            .bind(reservation.used)
            .bind(reservation.used_at)
            .bind(reservation.reserved_at)
            .execute(&self.pool)
            .await
            .map_err(|e| insert_error(&e, format!("reservation {}", reservation.id)))?;

            Ok(reservation)
        })
    }

    fn get(&self, id: ReservationId) -> StoreFuture<'_, Option<Reservation>> {
        Box::pin(self.fetch(id))
    }

    fn list_by_event(&self, event_id: EventId) -> StoreFuture<'_, Vec<Reservation>> {
        Box::pin(async move {
            let rows: Vec<ReservationRow> = sqlx::query_as(
                "SELECT data, paid, ticket, used, used_at FROM reservations
                 WHERE event_id = $1
                 ORDER BY reserved_at ASC",
            )
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Failed to query reservations: {e}")))?;

            rows.into_iter().map(from_row).collect()
        })
    }

    fn mark_paid(&self, id: ReservationId) -> StoreFuture<'_, PaymentTransition> {
        Box::pin(async move {
            let statement =
                format!("UPDATE reservations SET paid = TRUE WHERE id = $1 AND paid = FALSE {RETURNING}");
            if let Some(updated) = self.guarded_update(&statement, id, None).await? {
                return Ok(PaymentTransition::Confirmed(updated));
            }
            Ok(PaymentTransition::AlreadyPaid(self.fetch_existing(id).await?))
        })
    }

    fn revoke_payment(&self, id: ReservationId) -> StoreFuture<'_, PaymentRevocation> {
        Box::pin(async move {
            let statement =
                format!("UPDATE reservations SET paid = FALSE WHERE id = $1 AND used = FALSE {RETURNING}");
            if let Some(updated) = self.guarded_update(&statement, id, None).await? {
                return Ok(PaymentRevocation::Revoked(updated));
            }
            Ok(PaymentRevocation::Redeemed(self.fetch_existing(id).await?))
        })
    }

    fn attach_ticket(
        &self,
        id: ReservationId,
        ticket: String,
    ) -> StoreFuture<'_, TicketAttachment> {
        Box::pin(async move {
            let statement = format!(
                "UPDATE reservations SET ticket = $2
                 WHERE id = $1 AND ticket IS NULL AND paid = TRUE {RETURNING}"
            );
            if let Some(updated) = self
                .guarded_update(&statement, id, Some(UpdateArgument::Text(ticket)))
                .await?
            {
                return Ok(TicketAttachment::Attached(updated));
            }

            let current = self.fetch_existing(id).await?;
            if current.ticket.is_some() {
                Ok(TicketAttachment::AlreadyIssued(current))
            } else {
                Err(StoreError::Conflict(format!(
                    "reservation {id} is not paid, refusing to attach a ticket"
                )))
            }
        })
    }

    fn redeem(&self, id: ReservationId, at: DateTime<Utc>) -> StoreFuture<'_, Redemption> {
        Box::pin(async move {
            let statement = format!(
                "UPDATE reservations SET used = TRUE, used_at = $2
                 WHERE id = $1 AND paid = TRUE AND used = FALSE {RETURNING}"
            );
            if let Some(updated) = self
                .guarded_update(&statement, id, Some(UpdateArgument::Timestamp(at)))
                .await?
            {
                return Ok(Redemption::Redeemed(updated));
            }

            let current = self.fetch_existing(id).await?;
            Ok(missed_redemption(current))
        })
    }
}

impl EventCatalog for PostgresStore {
    fn insert_event(&self, event: Event) -> StoreFuture<'_, Event> {
        Box::pin(async move {
            let data = serde_json::to_value(&event)
                .map_err(|e| StoreError::Serialization(format!("Failed to serialize event: {e}")))?;

            sqlx::query("INSERT INTO events (id, data, created_at) VALUES ($1, $2, $3)")
                .bind(event.id.as_uuid())
                .bind(&data)
                .bind(event.created_at)
                .execute(&self.pool)
                .await
                .map_err(|e| insert_error(&e, format!("event {}", event.id)))?;

            Ok(event)
        })
    }

    fn get_event(&self, id: EventId) -> StoreFuture<'_, Option<Event>> {
        Box::pin(async move {
            let result: Option<(JsonValue,)> =
                sqlx::query_as("SELECT data FROM events WHERE id = $1")
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|e| StoreError::Database(format!("Failed to query event: {e}")))?;

            result
                .map(|(json,)| {
                    serde_json::from_value(json).map_err(|e| {
                        StoreError::Serialization(format!("Failed to deserialize event: {e}"))
                    })
                })
                .transpose()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Contact, Money};

    fn reservation(paid: bool, used_at: Option<DateTime<Utc>>) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            event_id: EventId::new(),
            user_id: None,
            contact: Contact {
                first_name: "Awa".to_string(),
                last_name: "Kone".to_string(),
                messaging_number: "0712345678".to_string(),
                email: None,
            },
            places: 1,
            entry_tier: "Standard".to_string(),
            payment_method: "cash".to_string(),
            total_amount: Money::new(2000),
            approved: true,
            comment: None,
            reserved_at: Utc::now(),
            paid,
            ticket: None,
            used: used_at.is_some(),
            used_at,
        }
    }

    #[test]
    fn test_missed_redemption_of_used_ticket() {
        let outcome = missed_redemption(reservation(true, Some(Utc::now())));
        assert!(matches!(outcome, Redemption::AlreadyUsed(r) if r.used_at.is_some()));
    }

    #[test]
    fn test_missed_redemption_of_unpaid_reservation() {
        assert!(matches!(
            missed_redemption(reservation(false, None)),
            Redemption::NotPaid(_)
        ));
    }

    #[test]
    fn test_payment_racing_the_guard_is_not_reported_as_used() {
        assert!(matches!(
            missed_redemption(reservation(true, None)),
            Redemption::NotPaid(_)
        ));
    }
}
