//! Entry passes for events: the reservation-to-ticket lifecycle.
//!
//! A reservation is created unpaid. Confirming its payment issues a QR ticket
//! and sends it to the holder over WhatsApp. At the door the scanned ticket is
//! validated exactly once.
//!
//! # Architecture
//!
//! ```text
//!                 ┌──────────────────────┐
//!   HTTP (axum) → │  LifecycleManager    │
//!                 └──────────────────────┘
//!                   │         │         │
//!                   ▼         ▼         ▼
//!            ┌──────────┐ ┌───────┐ ┌──────────────┐
//!            │  Store   │ │ Codec │ │ Notification │
//!            │ (CAS on  │ │ (QR)  │ │  Gateway     │
//!            │  flags)  │ └───────┘ └──────────────┘
//!            └──────────┘
//! ```
//!
//! # Key Properties
//!
//! - `used` implies `paid` for every reservation
//! - A ticket is issued and delivered at most once per reservation
//! - Concurrent validations of one ticket accept exactly one of them
//! - A failed or slow delivery never rolls back payment or ticket state
//!
//! # Usage
//!
//! See [`lifecycle::LifecycleManager`] for the operations and
//! [`server::build_router`] for the HTTP surface.

#![forbid(unsafe_code)]

pub mod api;
pub mod codec;
pub mod config;
pub mod environment;
pub mod lifecycle;
pub mod metrics;
pub mod notification;
pub mod server;
pub mod store;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod mocks;

pub use config::Config;
pub use lifecycle::{
    ConfirmationReport, LifecycleError, LifecycleManager, LifecycleSettings, NotificationStatus,
    ValidationOutcome,
};
