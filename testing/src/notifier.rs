//! Notification doubles.

use boxoffice_core::notification::{BookingConfirmation, NotificationDispatcher, NotificationError};
use boxoffice_core::types::{BookingId, Recipient};
use futures::future::BoxFuture;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;

/// A delivered confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentConfirmation {
    /// Booking confirmed
    pub booking_id: BookingId,
    /// Recipient
    pub recipient: Recipient,
    /// Details
    pub details: BookingConfirmation,
}

/// Records every confirmation it is asked to send.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<SentConfirmation>>>,
    notify: Arc<Notify>,
}

impl RecordingNotifier {
    /// Empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Confirmations sent so far
    #[must_use]
    pub fn sent(&self) -> Vec<SentConfirmation> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Waits until at least `count` confirmations were sent.
    ///
    /// Returns `false` on timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.sent().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl NotificationDispatcher for RecordingNotifier {
    fn notify_booking_confirmed(
        &self,
        booking_id: BookingId,
        recipient: Recipient,
        details: BookingConfirmation,
    ) -> BoxFuture<'static, Result<(), NotificationError>> {
        let sent = Arc::clone(&self.sent);
        let notify = Arc::clone(&self.notify);
        Box::pin(async move {
            sent.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(SentConfirmation {
                    booking_id,
                    recipient,
                    details,
                });
            notify.notify_waiters();
            Ok(())
        })
    }
}

/// Fails every delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingNotifier;

impl NotificationDispatcher for FailingNotifier {
    fn notify_booking_confirmed(
        &self,
        _booking_id: BookingId,
        _recipient: Recipient,
        _details: BookingConfirmation,
    ) -> BoxFuture<'static, Result<(), NotificationError>> {
        Box::pin(async { Err(NotificationError("smtp relay refused".to_string())) })
    }
}
