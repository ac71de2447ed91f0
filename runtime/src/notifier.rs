//! Development notification dispatcher that writes confirmations to the log.

use boxoffice_core::notification::{BookingConfirmation, NotificationDispatcher, NotificationError};
use boxoffice_core::types::{BookingId, Recipient, format_seats};
use futures::future::BoxFuture;

/// Logs booking confirmations instead of sending them.
///
/// Useful for development and tests. Stands in for an email or SMS
/// provider, which lives outside this workspace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl TracingNotifier {
    /// Creates a new tracing notifier
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NotificationDispatcher for TracingNotifier {
    fn notify_booking_confirmed(
        &self,
        booking_id: BookingId,
        recipient: Recipient,
        details: BookingConfirmation,
    ) -> BoxFuture<'static, Result<(), NotificationError>> {
        Box::pin(async move {
            tracing::info!(
                %booking_id,
                to = %recipient.email,
                name = recipient.name.as_deref().unwrap_or(""),
                showtime_id = %details.showtime_id,
                starts_at = %details.starts_at,
                seats = %format_seats(&details.seats),
                total = details.total_amount.units(),
                discount = details.discount.units(),
                offer_code = details.offer_code.as_deref().unwrap_or(""),
                "Booking confirmation"
            );
            Ok(())
        })
    }
}
