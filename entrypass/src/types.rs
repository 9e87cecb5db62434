//! Domain types for event entry passes.
//!
//! Value objects and entities shared by the codec, the stores and the
//! reservation lifecycle: identifiers, money, events with their entry tiers,
//! and the reservation aggregate whose lifecycle fields (`paid`, `ticket`,
//! `used`, `used_at`) only the lifecycle manager mutates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a reservation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(Uuid);

impl ReservationId {
    /// Creates a new random `ReservationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ReservationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReservationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the user account owning a reservation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Value Objects
// ============================================================================

/// Money amount in the smallest unit of the configured currency
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from an amount in currency units
    #[must_use]
    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    /// Returns the raw amount
    #[must_use]
    pub const fn amount(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named price point an attendee may select when reserving
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTier {
    /// Tier label (e.g., "VIP", "Standard")
    pub label: String,
    /// Price of one place in this tier
    pub price: Money,
    /// Optional description shown to attendees
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EntryTier {
    /// Creates a tier without description
    #[must_use]
    pub fn new(label: impl Into<String>, price: Money) -> Self {
        Self {
            label: label.into(),
            price,
            description: None,
        }
    }
}

/// A payment method accepted by an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Method kind (e.g., "cash", "mobile-money")
    pub kind: String,
    /// Free-form details (account number, instructions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Contact details of the person holding a reservation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    /// First name
    pub first_name: String,
    /// Last name
    pub last_name: String,
    /// Messaging (WhatsApp) number, any local or international format
    pub messaging_number: String,
    /// Optional email address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Contact {
    /// Full display name ("First Last")
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

// ============================================================================
// Events
// ============================================================================

/// An event attendees can reserve places for.
///
/// Read-only from the lifecycle's point of view: consulted for notification
/// content and share links, never mutated by it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Event identifier
    pub id: EventId,
    /// Event name
    pub name: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Where the event takes place
    pub location: String,
    /// Number of places on offer
    pub capacity: u32,
    /// Entry tiers with their prices
    pub entry_tiers: Vec<EntryTier>,
    /// Accepted payment methods
    pub payment_methods: Vec<PaymentMethod>,
    /// Optional flyer image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flyer_url: Option<String>,
    /// When the event was registered
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Lowest price across all entry tiers, or zero when the event has none.
    #[must_use]
    pub fn minimum_price(&self) -> Money {
        self.entry_tiers
            .iter()
            .map(|tier| tier.price)
            .min()
            .unwrap_or(Money::ZERO)
    }

    /// Looks up an entry tier by label
    #[must_use]
    pub fn tier(&self, label: &str) -> Option<&EntryTier> {
        self.entry_tiers.iter().find(|tier| tier.label == label)
    }

    /// Checks whether a payment method kind is accepted
    #[must_use]
    pub fn accepts_payment(&self, kind: &str) -> bool {
        self.payment_methods.iter().any(|method| method.kind == kind)
    }

    /// Builds the summary used for share messages.
    ///
    /// `event_url` is the public page attendees land on.
    #[must_use]
    pub fn summary(&self, event_url: String) -> EventSummary {
        EventSummary {
            name: self.name.clone(),
            description: self
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "Upcoming event".to_string()),
            date: display_datetime(&self.date),
            location: self.location.clone(),
            minimum_price: self.minimum_price(),
            url: event_url,
        }
    }
}

/// Fields required to register an event
#[derive(Clone, Debug, Deserialize)]
pub struct NewEvent {
    /// Event name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// When the event takes place
    pub date: DateTime<Utc>,
    /// Where the event takes place
    pub location: String,
    /// Number of places on offer
    pub capacity: u32,
    /// Entry tiers
    pub entry_tiers: Vec<EntryTier>,
    /// Accepted payment methods
    pub payment_methods: Vec<PaymentMethod>,
    /// Optional flyer image URL
    #[serde(default)]
    pub flyer_url: Option<String>,
}

impl NewEvent {
    /// Validates the event fields.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Event name must not be empty".to_string());
        }
        if self.location.trim().is_empty() {
            return Err("Event location must not be empty".to_string());
        }
        if self.entry_tiers.iter().any(|tier| tier.label.trim().is_empty()) {
            return Err("Entry tier labels must not be empty".to_string());
        }
        Ok(())
    }

    /// Turns the request into an `Event` with a fresh id
    #[must_use]
    pub fn into_event(self, created_at: DateTime<Utc>) -> Event {
        Event {
            id: EventId::new(),
            name: self.name,
            description: self.description,
            date: self.date,
            location: self.location,
            capacity: self.capacity,
            entry_tiers: self.entry_tiers,
            payment_methods: self.payment_methods,
            flyer_url: self.flyer_url,
            created_at,
        }
    }
}

/// Event details carried by a share message
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EventSummary {
    /// Event name
    pub name: String,
    /// Description (falls back to a generic phrase)
    pub description: String,
    /// Human-readable date
    pub date: String,
    /// Location
    pub location: String,
    /// Cheapest entry tier price
    pub minimum_price: Money,
    /// Destination URL of the share link
    pub url: String,
}

// ============================================================================
// Reservations
// ============================================================================

/// Lifecycle state of a reservation, derived from its flags
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReservationStatus {
    /// Created, payment not confirmed
    Created,
    /// Payment confirmed, ticket not yet redeemed
    Paid,
    /// Ticket redeemed at the door (terminal)
    Used,
}

/// A booked allocation of places at an event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    /// Reservation identifier
    pub id: ReservationId,
    /// Event the places are booked for
    pub event_id: EventId,
    /// Owning user account, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    /// Contact details of the holder
    pub contact: Contact,
    /// Number of places booked
    pub places: u32,
    /// Selected entry tier label
    pub entry_tier: String,
    /// Selected payment method kind
    pub payment_method: String,
    /// Total amount due
    pub total_amount: Money,
    /// Whether an organizer approved the reservation
    pub approved: bool,
    /// Free-form comment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// When the reservation was made
    pub reserved_at: DateTime<Utc>,
    /// Payment confirmed
    pub paid: bool,
    /// Issued ticket artifact (set once)
    pub ticket: Option<String>,
    /// Ticket redeemed at the door
    pub used: bool,
    /// When the ticket was redeemed
    pub used_at: Option<DateTime<Utc>>,
}

impl Reservation {
    /// Current lifecycle state
    #[must_use]
    pub const fn status(&self) -> ReservationStatus {
        if self.used {
            ReservationStatus::Used
        } else if self.paid {
            ReservationStatus::Paid
        } else {
            ReservationStatus::Created
        }
    }

    /// Checks the lifecycle invariants: `used` implies `paid`, and
    /// `used_at` is set exactly when `used` is.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        (!self.used || self.paid) && (self.used == self.used_at.is_some())
    }
}

/// Fields supplied when creating a reservation
#[derive(Clone, Debug, Deserialize)]
pub struct NewReservation {
    /// Event to book places for
    pub event_id: EventId,
    /// Owning user account
    #[serde(default)]
    pub user_id: Option<UserId>,
    /// Contact details
    pub contact: Contact,
    /// Number of places
    pub places: u32,
    /// Entry tier label
    pub entry_tier: String,
    /// Payment method kind
    pub payment_method: String,
    /// Total amount due
    pub total_amount: Money,
    /// Record the reservation as already paid (does not issue a ticket)
    #[serde(default)]
    pub paid: bool,
    /// Organizer approval flag
    #[serde(default)]
    pub approved: bool,
    /// Free-form comment
    #[serde(default)]
    pub comment: Option<String>,
}

impl NewReservation {
    /// Validates the request against the event it targets.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid field.
    pub fn validate(&self, event: &Event) -> Result<(), String> {
        if self.places == 0 {
            return Err("Place count must be greater than zero".to_string());
        }
        if self.contact.first_name.trim().is_empty() || self.contact.last_name.trim().is_empty() {
            return Err("Contact name must not be empty".to_string());
        }
        if self.contact.messaging_number.trim().is_empty() {
            return Err("Messaging number must not be empty".to_string());
        }
        if !event.entry_tiers.is_empty() && event.tier(&self.entry_tier).is_none() {
            return Err(format!(
                "Unknown entry tier '{}' for event {}",
                self.entry_tier, event.id
            ));
        }
        if !event.payment_methods.is_empty() && !event.accepts_payment(&self.payment_method) {
            return Err(format!(
                "Payment method '{}' is not accepted for event {}",
                self.payment_method, event.id
            ));
        }
        Ok(())
    }

    /// Builds the reservation in its initial state.
    ///
    /// Lifecycle fields start cleared; `paid` is copied from the request
    /// but no ticket is attached.
    #[must_use]
    pub fn into_reservation(self, reserved_at: DateTime<Utc>) -> Reservation {
        Reservation {
            id: ReservationId::new(),
            event_id: self.event_id,
            user_id: self.user_id,
            contact: self.contact,
            places: self.places,
            entry_tier: self.entry_tier,
            payment_method: self.payment_method,
            total_amount: self.total_amount,
            approved: self.approved,
            comment: self.comment,
            reserved_at,
            paid: self.paid,
            ticket: None,
            used: false,
            used_at: None,
        }
    }
}

/// Formats a timestamp the way it is shown to attendees and door staff
#[must_use]
pub fn display_datetime(at: &DateTime<Utc>) -> String {
    at.format("%d/%m/%Y %H:%M:%S").to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event_with_tiers(tiers: Vec<EntryTier>) -> Event {
        Event {
            id: EventId::new(),
            name: "Concert".to_string(),
            description: None,
            date: Utc.with_ymd_and_hms(2026, 12, 31, 20, 0, 0).unwrap(),
            location: "Abidjan".to_string(),
            capacity: 500,
            entry_tiers: tiers,
            payment_methods: vec![PaymentMethod {
                kind: "cash".to_string(),
                details: None,
            }],
            flyer_url: None,
            created_at: Utc::now(),
        }
    }

    fn new_reservation(event: &Event) -> NewReservation {
        NewReservation {
            event_id: event.id,
            user_id: None,
            contact: Contact {
                first_name: "Awa".to_string(),
                last_name: "Kone".to_string(),
                messaging_number: "07 12 34 56 78".to_string(),
                email: None,
            },
            places: 2,
            entry_tier: "VIP".to_string(),
            payment_method: "cash".to_string(),
            total_amount: Money::new(10_000),
            paid: false,
            approved: false,
            comment: None,
        }
    }

    #[test]
    fn test_minimum_price_picks_cheapest_tier() {
        let event = event_with_tiers(vec![
            EntryTier::new("VIP", Money::new(5000)),
            EntryTier::new("Standard", Money::new(2000)),
        ]);
        assert_eq!(event.minimum_price(), Money::new(2000));
    }

    #[test]
    fn test_minimum_price_without_tiers_is_zero() {
        let event = event_with_tiers(vec![]);
        assert_eq!(event.minimum_price(), Money::ZERO);
    }

    #[test]
    fn test_summary_falls_back_to_generic_description() {
        let event = event_with_tiers(vec![EntryTier::new("VIP", Money::new(5000))]);
        let summary = event.summary("http://localhost:4200/events/1".to_string());
        assert_eq!(summary.description, "Upcoming event");
        assert_eq!(summary.date, "31/12/2026 20:00:00");
        assert_eq!(summary.minimum_price, Money::new(5000));
    }

    #[test]
    fn test_new_reservation_starts_created() {
        let event = event_with_tiers(vec![EntryTier::new("VIP", Money::new(5000))]);
        let reservation = new_reservation(&event).into_reservation(Utc::now());
        assert_eq!(reservation.status(), ReservationStatus::Created);
        assert!(reservation.ticket.is_none());
        assert!(!reservation.used);
        assert!(reservation.is_consistent());
    }

    #[test]
    fn test_validate_rejects_zero_places() {
        let event = event_with_tiers(vec![EntryTier::new("VIP", Money::new(5000))]);
        let mut request = new_reservation(&event);
        request.places = 0;
        assert!(request.validate(&event).is_err());
    }

    #[test]
    fn test_validate_rejects_unknown_tier() {
        let event = event_with_tiers(vec![EntryTier::new("Standard", Money::new(2000))]);
        let request = new_reservation(&event);
        let err = request.validate(&event).unwrap_err();
        assert!(err.contains("VIP"));
    }

    #[test]
    fn test_validate_rejects_unaccepted_payment_method() {
        let event = event_with_tiers(vec![EntryTier::new("VIP", Money::new(5000))]);
        let mut request = new_reservation(&event);
        request.payment_method = "card".to_string();
        assert!(request.validate(&event).is_err());
    }

    #[test]
    fn test_status_follows_flags() {
        let event = event_with_tiers(vec![EntryTier::new("VIP", Money::new(5000))]);
        let mut reservation = new_reservation(&event).into_reservation(Utc::now());
        reservation.paid = true;
        assert_eq!(reservation.status(), ReservationStatus::Paid);
        reservation.used = true;
        reservation.used_at = Some(Utc::now());
        assert_eq!(reservation.status(), ReservationStatus::Used);
        assert!(reservation.is_consistent());
    }
}
