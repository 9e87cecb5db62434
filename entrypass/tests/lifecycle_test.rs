//! End-to-end lifecycle tests over the in-memory store.
//!
//! Covers the concurrency guarantees: one acceptance among concurrent
//! validations, one issuance among concurrent confirmations, and `used`
//! never set without `paid`.

#![allow(clippy::unwrap_used)]

use chrono::{TimeZone, Utc};
use entrypass::codec::TicketPayload;
use entrypass::environment::Clock;
use entrypass::mocks::{MockNotificationGateway, test_clock};
use entrypass::store::InMemoryStore;
use entrypass::types::{Contact, EntryTier, Money, NewEvent, NewReservation, PaymentMethod};
use entrypass::{LifecycleManager, LifecycleSettings, NotificationStatus};
use std::sync::Arc;
use std::time::Duration;

struct Fixture {
    manager: Arc<LifecycleManager>,
    gateway: Arc<MockNotificationGateway>,
}

fn fixture() -> Fixture {
    let store = Arc::new(InMemoryStore::new());
    let gateway = Arc::new(MockNotificationGateway::new());
    let manager = LifecycleManager::new(
        store.clone(),
        store,
        gateway.clone(),
        Arc::new(test_clock()),
        LifecycleSettings {
            notification_timeout: Duration::from_secs(5),
            currency: "FCFA".to_string(),
            frontend_url: "https://tickets.example.com".to_string(),
        },
    );
    Fixture {
        manager: Arc::new(manager),
        gateway,
    }
}

fn new_event() -> NewEvent {
    NewEvent {
        name: "Afrobeat Festival".to_string(),
        description: Some("Two stages, one night".to_string()),
        date: Utc.with_ymd_and_hms(2026, 8, 15, 19, 0, 0).unwrap(),
        location: "Palais de la Culture".to_string(),
        capacity: 1000,
        entry_tiers: vec![
            EntryTier::new("VIP", Money::new(5000)),
            EntryTier::new("Standard", Money::new(2000)),
        ],
        payment_methods: vec![PaymentMethod {
            kind: "mobile-money".to_string(),
            details: Some("Orange Money 07 00 00 00 00".to_string()),
        }],
        flyer_url: None,
    }
}

async fn create_reservation(f: &Fixture) -> entrypass::types::Reservation {
    let event = f.manager.register_event(new_event()).await.unwrap();
    f.manager
        .create_reservation(NewReservation {
            event_id: event.id,
            user_id: None,
            contact: Contact {
                first_name: "Koffi".to_string(),
                last_name: "Yao".to_string(),
                messaging_number: "0102030405".to_string(),
                email: Some("koffi@example.com".to_string()),
            },
            places: 1,
            entry_tier: "VIP".to_string(),
            payment_method: "mobile-money".to_string(),
            total_amount: Money::new(5000),
            paid: false,
            approved: false,
            comment: Some("Front row please".to_string()),
        })
        .await
        .unwrap()
}

fn scanned(reservation: &entrypass::types::Reservation) -> String {
    TicketPayload {
        reservation_id: reservation.id,
        event_id: reservation.event_id,
        issued_at: test_clock().now(),
    }
    .to_transport()
    .unwrap()
}

#[tokio::test]
async fn test_create_confirm_validate_flow() {
    let f = fixture();
    let reservation = create_reservation(&f).await;

    let report = f.manager.confirm_payment(reservation.id).await.unwrap();
    assert!(report.ticket_issued);
    assert!(report.reservation.paid);
    assert!(report.reservation.ticket.as_deref().is_some_and(|t| !t.is_empty()));
    assert_eq!(report.notification, NotificationStatus::Sent);

    let accepted = f.manager.validate_ticket(&scanned(&reservation)).await.unwrap();
    assert!(accepted.success);

    let refused = f.manager.validate_ticket(&scanned(&reservation)).await.unwrap();
    assert!(!refused.success);
    assert!(refused.message.contains("01/01/2025 00:00:00"));

    let stored = f.manager.get_reservation(reservation.id).await.unwrap();
    assert!(stored.used && stored.paid);
    assert!(stored.is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_validations_accept_exactly_once() {
    let f = fixture();
    let reservation = create_reservation(&f).await;
    f.manager.confirm_payment(reservation.id).await.unwrap();
    let raw = scanned(&reservation);

    let attempts = 50;
    let handles: Vec<_> = (0..attempts)
        .map(|_| {
            let manager = Arc::clone(&f.manager);
            let raw = raw.clone();
            tokio::spawn(async move { manager.validate_ticket(&raw).await.unwrap() })
        })
        .collect();

    let mut accepted = 0;
    let mut already_used = 0;
    for handle in handles {
        let outcome = handle.await.unwrap();
        if outcome.success {
            accepted += 1;
        } else {
            assert!(outcome.message.contains("already used"));
            already_used += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(already_used, attempts - 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_confirmations_notify_once() {
    let f = fixture();
    let reservation = create_reservation(&f).await;

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let manager = Arc::clone(&f.manager);
            tokio::spawn(async move { manager.confirm_payment(reservation.id).await.unwrap() })
        })
        .collect();

    let mut issued = 0;
    let mut tickets = Vec::new();
    for handle in handles {
        let report = handle.await.unwrap();
        if report.ticket_issued {
            issued += 1;
        }
        tickets.extend(report.reservation.ticket);
    }

    assert_eq!(issued, 1);
    assert_eq!(f.gateway.ticket_attempts(), 1);
    tickets.dedup();
    assert_eq!(tickets.len(), 1, "every report must carry the same ticket");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_used_implies_paid_under_interleaving() {
    let f = fixture();
    let reservation = create_reservation(&f).await;
    let raw = scanned(&reservation);

    let mut handles = Vec::new();
    for i in 0..30 {
        let manager = Arc::clone(&f.manager);
        let raw = raw.clone();
        let id = reservation.id;
        handles.push(tokio::spawn(async move {
            match i % 3 {
                0 => {
                    let _ = manager.update_payment_flag(id, true).await;
                }
                1 => {
                    let _ = manager.update_payment_flag(id, false).await;
                }
                _ => {
                    let _ = manager.validate_ticket(&raw).await;
                }
            }
            let current = manager.get_reservation(id).await.unwrap();
            assert!(current.is_consistent());
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stored = f.manager.get_reservation(reservation.id).await.unwrap();
    assert!(stored.is_consistent());
}
