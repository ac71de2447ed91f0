//! Application state for Axum handlers.

use boxoffice_runtime::ReservationCoordinator;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Reservation coordinator behind every booking endpoint
    pub coordinator: Arc<ReservationCoordinator>,
    /// Public payment key handed to the checkout page with each order
    pub checkout_key: Option<String>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub const fn new(coordinator: Arc<ReservationCoordinator>) -> Self {
        Self {
            coordinator,
            checkout_key: None,
        }
    }

    /// Attach the public payment key.
    #[must_use]
    pub fn with_checkout_key(mut self, key: impl Into<String>) -> Self {
        self.checkout_key = Some(key.into());
        self
    }
}
