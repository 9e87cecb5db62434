//! Application state for the HTTP server.

use crate::lifecycle::LifecycleManager;
use crate::store::PostgresStore;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned (cheaply via Arc) for each request.
#[derive(Clone)]
pub struct AppState {
    /// Reservation lifecycle orchestration
    pub lifecycle: Arc<LifecycleManager>,

    /// Name of the storage backend in use ("memory" or "postgres")
    pub storage: &'static str,

    /// Database pinged by the readiness check, when one is configured
    pub database: Option<PostgresStore>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(lifecycle: LifecycleManager, storage: &'static str) -> Self {
        Self {
            lifecycle: Arc::new(lifecycle),
            storage,
            database: None,
        }
    }

    /// Attach the database the readiness check should ping.
    #[must_use]
    pub fn with_database(mut self, database: PostgresStore) -> Self {
        self.database = Some(database);
        self
    }
}
