//! Mock implementations for testing.
//!
//! In-memory stand-ins for the clock and the messaging gateway, for use in
//! unit and integration tests.

use crate::environment::Clock;
use crate::notification::{
    NotificationError, NotificationGateway, NotificationResult, TicketContext,
};
use crate::types::EventSummary;
use chrono::{DateTime, TimeZone, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

/// Fixed clock for deterministic tests
///
/// Always returns the same time, making tests reproducible.
///
/// # Example
///
/// ```
/// use entrypass::environment::Clock;
/// use entrypass::mocks::FixedClock;
/// use chrono::Utc;
///
/// let clock = FixedClock::new(Utc::now());
/// assert_eq!(clock.now(), clock.now());
/// ```
#[derive(Debug, Clone)]
pub struct FixedClock {
    time: DateTime<Utc>,
}

impl FixedClock {
    /// Create a new fixed clock with the given time
    #[must_use]
    pub const fn new(time: DateTime<Utc>) -> Self {
        Self { time }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.time
    }
}

/// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default(),
    )
}

/// A message captured by [`MockNotificationGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentNotification {
    /// A ticket confirmation
    Ticket {
        /// Destination address as given
        destination: String,
        /// Ticket artifact
        artifact: String,
        /// Message context
        context: TicketContext,
    },
    /// An event share
    Share {
        /// Destination address as given
        destination: String,
        /// Shared event
        summary: EventSummary,
    },
}

/// Mock messaging gateway.
///
/// Records every delivery attempt. Can be told to fail every delivery or to
/// stall for a while before answering.
#[derive(Debug, Default)]
pub struct MockNotificationGateway {
    /// Whether to simulate success or failure.
    pub should_succeed: bool,
    /// Artificial delay before answering.
    pub delay: Option<Duration>,
    attempts: Mutex<Vec<SentNotification>>,
}

impl MockNotificationGateway {
    /// Create a new mock gateway that succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            should_succeed: true,
            ..Self::default()
        }
    }

    /// Create a mock gateway whose deliveries always fail.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            should_succeed: false,
            ..Self::default()
        }
    }

    /// Create a mock gateway that stalls for `delay` before succeeding.
    #[must_use]
    pub fn stalled(delay: Duration) -> Self {
        Self {
            should_succeed: true,
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// All delivery attempts so far, successful or not.
    #[must_use]
    pub fn attempts(&self) -> Vec<SentNotification> {
        self.attempts
            .lock()
            .map(|attempts| attempts.clone())
            .unwrap_or_default()
    }

    /// Number of ticket deliveries attempted.
    #[must_use]
    pub fn ticket_attempts(&self) -> usize {
        self.attempts()
            .iter()
            .filter(|sent| matches!(sent, SentNotification::Ticket { .. }))
            .count()
    }

    fn record(&self, sent: SentNotification) {
        if let Ok(mut attempts) = self.attempts.lock() {
            attempts.push(sent);
        }
    }

    async fn answer(&self) -> NotificationResult<()> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.should_succeed {
            Ok(())
        } else {
            Err(NotificationError::Unavailable(
                "mock gateway configured to fail".to_string(),
            ))
        }
    }
}

impl NotificationGateway for MockNotificationGateway {
    fn send_ticket<'a>(
        &'a self,
        destination: &'a str,
        artifact: &'a str,
        context: &'a TicketContext,
    ) -> Pin<Box<dyn Future<Output = NotificationResult<()>> + Send + 'a>> {
        self.record(SentNotification::Ticket {
            destination: destination.to_string(),
            artifact: artifact.to_string(),
            context: context.clone(),
        });
        Box::pin(self.answer())
    }

    fn share_event<'a>(
        &'a self,
        destination: &'a str,
        summary: &'a EventSummary,
        _image_url: Option<&'a str>,
    ) -> Pin<Box<dyn Future<Output = NotificationResult<()>> + Send + 'a>> {
        self.record(SentNotification::Share {
            destination: destination.to_string(),
            summary: summary.clone(),
        });
        Box::pin(self.answer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        assert_eq!(clock.now(), clock.now());
        assert_eq!(clock.now().to_rfc3339(), "2025-01-01T00:00:00+00:00");
    }
}
