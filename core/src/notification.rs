//! Booking confirmation delivery.
//!
//! Dispatch is fire-and-forget: the coordinator spawns it after commit and
//! only logs failures.

use crate::types::{BookingId, Money, Recipient, SeatNumber, ShowtimeId};
use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Details included in a booking confirmation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingConfirmation {
    /// Showtime booked
    pub showtime_id: ShowtimeId,
    /// Scheduled start
    pub starts_at: DateTime<Utc>,
    /// Seats booked
    pub seats: Vec<SeatNumber>,
    /// Amount charged
    pub total_amount: Money,
    /// Discount applied
    pub discount: Money,
    /// Offer code applied
    pub offer_code: Option<String>,
}

/// Notification delivery failure
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("notification failed: {0}")]
pub struct NotificationError(pub String);

/// Sends booking confirmations
pub trait NotificationDispatcher: Send + Sync {
    /// Delivers a confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`NotificationError`] if delivery fails.
    fn notify_booking_confirmed(
        &self,
        booking_id: BookingId,
        recipient: Recipient,
        details: BookingConfirmation,
    ) -> BoxFuture<'static, Result<(), NotificationError>>;
}
