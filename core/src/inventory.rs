//! Durable seat inventory: the source of truth for which seats are booked.

use crate::error::StoreError;
use crate::types::{SeatNumber, ShowtimeId};
use futures::future::BoxFuture;
use std::collections::BTreeSet;

/// Outcome of an availability check against confirmed bookings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SeatAvailability {
    /// None of the seats are booked
    Free,
    /// These seats (ascending) are covered by confirmed bookings
    Taken(Vec<SeatNumber>),
}

impl SeatAvailability {
    /// Builds the outcome from the conflicting seats found
    #[must_use]
    pub fn from_conflicts(mut conflicts: Vec<SeatNumber>) -> Self {
        if conflicts.is_empty() {
            Self::Free
        } else {
            conflicts.sort_unstable();
            conflicts.dedup();
            Self::Taken(conflicts)
        }
    }

    /// Whether every seat is free
    #[must_use]
    pub const fn is_free(&self) -> bool {
        matches!(self, Self::Free)
    }
}

/// Read access to confirmed seat state.
///
/// Implementations answer from committed data only; holds live in the
/// coordinator, not here.
pub trait InventoryStore: Send + Sync {
    /// Seats covered by non-cancelled bookings.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    fn list_booked(
        &self,
        showtime_id: ShowtimeId,
    ) -> BoxFuture<'_, Result<BTreeSet<SeatNumber>, StoreError>>;

    /// Checks that none of `seats` is booked, naming the ones that are.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store cannot be read.
    fn are_seats_free<'a>(
        &'a self,
        showtime_id: ShowtimeId,
        seats: &'a [SeatNumber],
    ) -> BoxFuture<'a, Result<SeatAvailability, StoreError>>;
}
