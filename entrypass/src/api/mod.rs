//! HTTP API handlers.

pub mod error;
pub mod events;
pub mod reservations;

pub use error::ApiError;
