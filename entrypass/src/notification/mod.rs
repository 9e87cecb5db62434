//! Notification gateway: delivering tickets and event shares to attendees.
//!
//! The gateway is a pure side-effecting boundary. The lifecycle treats every
//! [`NotificationError`] as "gateway unavailable": it is logged and reported
//! but never unwinds payment or ticket state.
//!
//! Message bodies and the share deep link are built here so every adapter
//! sends the same text.

pub mod whatsapp;

pub use whatsapp::WhatsAppGateway;

use crate::types::{EventSummary, Money};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Base of the WhatsApp "click to chat" deep link
pub const SHARE_LINK_BASE: &str = "https://wa.me/?text=";

/// Gateway result
pub type NotificationResult<T> = Result<T, NotificationError>;

/// Notification gateway error.
///
/// All variants mean the gateway is unavailable for this delivery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotificationError {
    /// Delivery credentials are not configured
    #[error("Messaging gateway is not configured")]
    NotConfigured,

    /// The provider could not be reached
    #[error("Messaging gateway unavailable: {0}")]
    Unavailable(String),

    /// The provider refused the message
    #[error("Messaging provider rejected the message (status {status}): {message}")]
    Rejected {
        /// HTTP status returned by the provider
        status: u16,
        /// Provider error body
        message: String,
    },

    /// Delivery did not finish within the configured bound
    #[error("Messaging gateway timed out after {0:?}")]
    Timeout(Duration),
}

/// Reservation details included in a ticket message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TicketContext {
    /// Event name
    pub event_name: String,
    /// Human-readable event date
    pub event_date: String,
    /// Number of places booked
    pub places: u32,
    /// Amount paid
    pub amount: Money,
    /// Recipient display name
    pub recipient_name: String,
}

/// Messaging gateway trait
///
/// Abstraction over messaging providers (WhatsApp via Twilio, SMS, ...).
pub trait NotificationGateway: Send + Sync {
    /// Send a ticket confirmation carrying the ticket artifact.
    ///
    /// # Errors
    ///
    /// Returns error if the gateway is not configured or delivery fails.
    fn send_ticket<'a>(
        &'a self,
        destination: &'a str,
        artifact: &'a str,
        context: &'a TicketContext,
    ) -> Pin<Box<dyn Future<Output = NotificationResult<()>> + Send + 'a>>;

    /// Send an event share message, optionally with an image.
    ///
    /// # Errors
    ///
    /// Returns error if the gateway is not configured or delivery fails.
    fn share_event<'a>(
        &'a self,
        destination: &'a str,
        summary: &'a EventSummary,
        image_url: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = NotificationResult<()>> + Send + 'a>>;
}

/// Normalizes a messaging number to international form.
///
/// Spaces, dashes and parentheses are stripped; a leading `0` (local trunk
/// prefix) is replaced with `country_code`; any number still lacking a `+`
/// gets `country_code` prepended.
///
/// ```
/// use entrypass::notification::normalize_phone_number;
///
/// assert_eq!(normalize_phone_number("07 12-34 (56) 78", "+225"), "+225712345678");
/// assert_eq!(normalize_phone_number("+33 6 12 34 56 78", "+225"), "+33612345678");
/// ```
#[must_use]
pub fn normalize_phone_number(raw: &str, country_code: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect();

    let local = stripped.strip_prefix('0').map_or_else(
        || stripped.clone(),
        |rest| format!("{country_code}{rest}"),
    );

    if local.starts_with('+') {
        local
    } else {
        format!("{country_code}{local}")
    }
}

/// Builds the ticket confirmation message body
#[must_use]
pub fn ticket_message(context: &TicketContext, currency: &str) -> String {
    format!(
        "Hello {},\n\n\
         Your reservation for \"{}\" is confirmed!\n\n\
         Date: {}\n\
         Places: {}\n\
         Amount paid: {} {currency}\n\n\
         Please show this QR code at the entrance.\n\n\
         Thank you!",
        context.recipient_name, context.event_name, context.event_date, context.places, context.amount,
    )
}

/// Builds the event share message body, without the destination URL
#[must_use]
pub fn share_message(summary: &EventSummary, currency: &str) -> String {
    format!(
        "Don't miss this event!\n\n\
         {}\n\n\
         {}\n\n\
         Date: {}\n\
         Location: {}\n\
         Price: {} {currency}",
        summary.name, summary.description, summary.date, summary.location, summary.minimum_price,
    )
}

/// Builds a deep link pre-filling a share message for an event.
///
/// Pure: no network call, cannot fail.
#[must_use]
pub fn share_link(summary: &EventSummary, currency: &str) -> String {
    let message = format!(
        "{}\n\nBook now: {}",
        share_message(summary, currency),
        summary.url
    );
    format!("{SHARE_LINK_BASE}{}", urlencoding::encode(&message))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn summary() -> EventSummary {
        EventSummary {
            name: "Jazz Night".to_string(),
            description: "Live jazz & drinks".to_string(),
            date: "31/12/2026 20:00:00".to_string(),
            location: "Plateau, Abidjan".to_string(),
            minimum_price: Money::new(2000),
            url: "http://localhost:4200/events/42".to_string(),
        }
    }

    #[test]
    fn test_leading_zero_replaced_with_country_code() {
        assert_eq!(normalize_phone_number("0712345678", "+225"), "+225712345678");
    }

    #[test]
    fn test_separators_are_stripped() {
        assert_eq!(
            normalize_phone_number("(07) 12-34 56 78", "+225"),
            "+225712345678"
        );
    }

    #[test]
    fn test_missing_prefix_is_prepended() {
        assert_eq!(normalize_phone_number("712345678", "+225"), "+225712345678");
    }

    #[test]
    fn test_international_number_is_kept() {
        assert_eq!(
            normalize_phone_number("+33 6 12 34 56 78", "+225"),
            "+33612345678"
        );
    }

    #[test]
    fn test_share_link_is_pure_deep_link() {
        let link = share_link(&summary(), "FCFA");
        assert!(link.starts_with(SHARE_LINK_BASE));

        let encoded = link.strip_prefix(SHARE_LINK_BASE).unwrap();
        assert!(!encoded.contains(' '));
        assert!(!encoded.contains('&'));

        let decoded = urlencoding::decode(encoded).unwrap();
        assert!(decoded.contains("Jazz Night"));
        assert!(decoded.contains("Live jazz & drinks"));
        assert!(decoded.contains("Plateau, Abidjan"));
        assert!(decoded.contains("2000 FCFA"));
        assert!(decoded.contains("http://localhost:4200/events/42"));
    }

    #[test]
    fn test_ticket_message_mentions_reservation_details() {
        let message = ticket_message(
            &TicketContext {
                event_name: "Jazz Night".to_string(),
                event_date: "31/12/2026 20:00:00".to_string(),
                places: 3,
                amount: Money::new(6000),
                recipient_name: "Awa Kone".to_string(),
            },
            "FCFA",
        );
        assert!(message.starts_with("Hello Awa Kone"));
        assert!(message.contains("Places: 3"));
        assert!(message.contains("6000 FCFA"));
    }

    proptest! {
        #[test]
        fn prop_normalized_numbers_are_international(raw in "[0-9 ()+-]{1,20}") {
            let normalized = normalize_phone_number(&raw, "+225");
            prop_assert!(normalized.starts_with('+'));
            prop_assert!(!normalized.contains(' '));
            prop_assert!(!normalized.contains('-'));
        }
    }
}
