//! Showtime catalog.

use crate::error::StoreError;
use crate::types::{Showtime, ShowtimeId, ShowtimeStatus};
use futures::future::BoxFuture;

/// Lookup and registration of showtimes.
pub trait ShowtimeCatalog: Send + Sync {
    /// Finds a showtime; absence is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the catalog cannot be read.
    fn get(&self, id: ShowtimeId) -> BoxFuture<'_, Result<Option<Showtime>, StoreError>>;

    /// Registers a showtime with its seat map.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the showtime cannot be stored.
    fn insert<'a>(&'a self, showtime: &'a Showtime) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Opens or closes a showtime for booking.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for unknown showtimes.
    fn set_status(
        &self,
        id: ShowtimeId,
        status: ShowtimeStatus,
    ) -> BoxFuture<'_, Result<(), StoreError>>;
}
