//! Booking ledger: append-only record of confirmed bookings.

use crate::error::StoreError;
use crate::types::{Booking, BookingId, GatewayPaymentId, UserId};
use futures::future::BoxFuture;

/// Persistence for bookings, their seats and payments.
pub trait BookingLedger: Send + Sync {
    /// Writes the payment, the booking and its seats atomically.
    ///
    /// # Errors
    ///
    /// - [`StoreError::DuplicatePayment`] if the payment id is already recorded
    /// - [`StoreError::SeatConflict`] if a seat is covered by another confirmed booking
    /// - [`StoreError::Unavailable`] on transient failure (nothing was written)
    fn insert<'a>(&'a self, booking: &'a Booking) -> BoxFuture<'a, Result<BookingId, StoreError>>;

    /// Finds a booking by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the ledger cannot be read.
    fn find_by_id(&self, id: BookingId) -> BoxFuture<'_, Result<Option<Booking>, StoreError>>;

    /// Bookings of a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the ledger cannot be read.
    fn find_by_user(&self, user_id: UserId) -> BoxFuture<'_, Result<Vec<Booking>, StoreError>>;

    /// Finds the booking paid by a gateway payment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the ledger cannot be read.
    fn find_by_payment_id<'a>(
        &'a self,
        payment_id: &'a GatewayPaymentId,
    ) -> BoxFuture<'a, Result<Option<Booking>, StoreError>>;

    /// Marks a booking and its seats cancelled in one transaction.
    ///
    /// Returns `false` if the booking was already cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if there is no such booking.
    fn cancel(&self, id: BookingId) -> BoxFuture<'_, Result<bool, StoreError>>;
}
