//! In-memory implementation of every storage trait.
//!
//! Enforces the same uniqueness rules as the Postgres store: one booking
//! per gateway payment id, and no seat in two confirmed bookings of the
//! same showtime. Failures can be injected to exercise retry paths.

use boxoffice_core::catalog::ShowtimeCatalog;
use boxoffice_core::error::StoreError;
use boxoffice_core::inventory::{InventoryStore, SeatAvailability};
use boxoffice_core::ledger::BookingLedger;
use boxoffice_core::offer::{Offer, OfferService, normalize_code};
use boxoffice_core::types::{
    Booking, BookingId, BookingStatus, GatewayPaymentId, SeatNumber, Showtime, ShowtimeId,
    ShowtimeStatus, UserId,
};
use futures::future::BoxFuture;
use std::collections::{BTreeSet, HashMap};
use std::future::ready;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Default)]
struct State {
    showtimes: HashMap<ShowtimeId, Showtime>,
    bookings: HashMap<BookingId, Booking>,
    payments: HashMap<GatewayPaymentId, BookingId>,
    offers: HashMap<String, Offer>,
}

impl State {
    fn booked_seats(&self, showtime_id: ShowtimeId) -> BTreeSet<SeatNumber> {
        self.bookings
            .values()
            .filter(|b| b.showtime_id == showtime_id && b.is_confirmed())
            .flat_map(Booking::seat_numbers)
            .collect()
    }
}

/// In-memory showtimes, bookings, payments and offers.
#[derive(Default)]
pub struct InMemoryBoxOffice {
    state: Mutex<State>,
    transient_insert_failures: AtomicU32,
    lost_insert_acks: AtomicU32,
    insert_attempts: AtomicU32,
    offers_unavailable: AtomicBool,
    fail_usage_increment: AtomicBool,
}

impl InMemoryBoxOffice {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces an offer
    pub fn put_offer(&self, offer: Offer) {
        self.state().offers.insert(normalize_code(&offer.code), offer);
    }

    /// Current state of an offer
    #[must_use]
    pub fn offer(&self, code: &str) -> Option<Offer> {
        self.state().offers.get(&normalize_code(code)).cloned()
    }

    /// Makes the next `count` ledger inserts fail with a transient error
    pub fn fail_next_inserts(&self, count: u32) {
        self.transient_insert_failures.store(count, Ordering::SeqCst);
    }

    /// Makes the next `count` successful inserts report a transient error
    /// after the booking was written
    pub fn lose_next_insert_acks(&self, count: u32) {
        self.lost_insert_acks.store(count, Ordering::SeqCst);
    }

    /// Number of ledger insert calls so far
    #[must_use]
    pub fn insert_attempts(&self) -> u32 {
        self.insert_attempts.load(Ordering::SeqCst)
    }

    /// Makes offer lookups fail
    pub fn set_offers_unavailable(&self, unavailable: bool) {
        self.offers_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Makes usage increments fail
    pub fn set_usage_increment_failing(&self, failing: bool) {
        self.fail_usage_increment.store(failing, Ordering::SeqCst);
    }

    /// Writes a booking directly, bypassing the coordinator
    pub fn seed_booking(&self, booking: Booking) {
        let mut state = self.state();
        state
            .payments
            .insert(booking.payment.payment_id.clone(), booking.id);
        state.bookings.insert(booking.id, booking);
    }

    /// Every booking, in no particular order
    #[must_use]
    pub fn all_bookings(&self) -> Vec<Booking> {
        self.state().bookings.values().cloned().collect()
    }

    /// Number of recorded payments
    #[must_use]
    pub fn payment_count(&self) -> usize {
        self.state().payments.len()
    }
}

impl InventoryStore for InMemoryBoxOffice {
    fn list_booked(
        &self,
        showtime_id: ShowtimeId,
    ) -> BoxFuture<'_, Result<BTreeSet<SeatNumber>, StoreError>> {
        let booked = self.state().booked_seats(showtime_id);
        Box::pin(ready(Ok(booked)))
    }

    fn are_seats_free<'a>(
        &'a self,
        showtime_id: ShowtimeId,
        seats: &'a [SeatNumber],
    ) -> BoxFuture<'a, Result<SeatAvailability, StoreError>> {
        let booked = self.state().booked_seats(showtime_id);
        let taken = seats.iter().copied().filter(|s| booked.contains(s)).collect();
        Box::pin(ready(Ok(SeatAvailability::from_conflicts(taken))))
    }
}

impl BookingLedger for InMemoryBoxOffice {
    fn insert<'a>(&'a self, booking: &'a Booking) -> BoxFuture<'a, Result<BookingId, StoreError>> {
        self.insert_attempts.fetch_add(1, Ordering::SeqCst);
        let injected = self
            .transient_insert_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Box::pin(ready(Err(StoreError::Unavailable(
                "injected transient failure".to_string(),
            ))));
        }

        let mut state = self.state();
        let result = if state.payments.contains_key(&booking.payment.payment_id) {
            Err(StoreError::DuplicatePayment {
                payment_id: booking.payment.payment_id.clone(),
            })
        } else {
            let booked = state.booked_seats(booking.showtime_id);
            let taken: Vec<SeatNumber> = booking
                .seat_numbers()
                .into_iter()
                .filter(|s| booked.contains(s))
                .collect();
            if taken.is_empty() {
                state
                    .payments
                    .insert(booking.payment.payment_id.clone(), booking.id);
                state.bookings.insert(booking.id, booking.clone());
                let ack_lost = self
                    .lost_insert_acks
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok();
                if ack_lost {
                    Err(StoreError::Unavailable("acknowledgement lost".to_string()))
                } else {
                    Ok(booking.id)
                }
            } else {
                Err(StoreError::SeatConflict { seats: taken })
            }
        };
        Box::pin(ready(result))
    }

    fn find_by_id(&self, id: BookingId) -> BoxFuture<'_, Result<Option<Booking>, StoreError>> {
        let booking = self.state().bookings.get(&id).cloned();
        Box::pin(ready(Ok(booking)))
    }

    fn find_by_user(&self, user_id: UserId) -> BoxFuture<'_, Result<Vec<Booking>, StoreError>> {
        let mut bookings: Vec<Booking> = self
            .state()
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Box::pin(ready(Ok(bookings)))
    }

    fn find_by_payment_id<'a>(
        &'a self,
        payment_id: &'a GatewayPaymentId,
    ) -> BoxFuture<'a, Result<Option<Booking>, StoreError>> {
        let state = self.state();
        let booking = state
            .payments
            .get(payment_id)
            .and_then(|id| state.bookings.get(id))
            .cloned();
        drop(state);
        Box::pin(ready(Ok(booking)))
    }

    fn cancel(&self, id: BookingId) -> BoxFuture<'_, Result<bool, StoreError>> {
        let mut state = self.state();
        let result = match state.bookings.get_mut(&id) {
            None => Err(StoreError::NotFound),
            Some(booking) if booking.status == BookingStatus::Cancelled => Ok(false),
            Some(booking) => {
                booking.status = BookingStatus::Cancelled;
                Ok(true)
            }
        };
        Box::pin(ready(result))
    }
}

impl ShowtimeCatalog for InMemoryBoxOffice {
    fn get(&self, id: ShowtimeId) -> BoxFuture<'_, Result<Option<Showtime>, StoreError>> {
        let showtime = self.state().showtimes.get(&id).cloned();
        Box::pin(ready(Ok(showtime)))
    }

    fn insert<'a>(&'a self, showtime: &'a Showtime) -> BoxFuture<'a, Result<(), StoreError>> {
        self.state().showtimes.insert(showtime.id, showtime.clone());
        Box::pin(ready(Ok(())))
    }

    fn set_status(
        &self,
        id: ShowtimeId,
        status: ShowtimeStatus,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        let mut state = self.state();
        let result = match state.showtimes.get_mut(&id) {
            Some(showtime) => {
                showtime.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        };
        Box::pin(ready(result))
    }
}

impl OfferService for InMemoryBoxOffice {
    fn lookup(&self, code: &str) -> BoxFuture<'_, Result<Option<Offer>, StoreError>> {
        let result = if self.offers_unavailable.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("offers offline".to_string()))
        } else {
            Ok(self.state().offers.get(&normalize_code(code)).cloned())
        };
        Box::pin(ready(result))
    }

    fn increment_usage(&self, code: &str) -> BoxFuture<'_, Result<(), StoreError>> {
        let result = if self.fail_usage_increment.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("offers offline".to_string()))
        } else {
            match self.state().offers.get_mut(&normalize_code(code)) {
                Some(offer) => {
                    offer.usage_count += 1;
                    Ok(())
                }
                None => Err(StoreError::NotFound),
            }
        };
        Box::pin(ready(result))
    }

    fn list_offers(&self) -> BoxFuture<'_, Result<Vec<Offer>, StoreError>> {
        let mut offers: Vec<Offer> = self
            .state()
            .offers
            .values()
            .filter(|o| o.active)
            .cloned()
            .collect();
        offers.sort_by(|a, b| a.code.cmp(&b.code));
        Box::pin(ready(Ok(offers)))
    }
}
