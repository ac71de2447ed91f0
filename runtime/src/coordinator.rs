//! Reservation coordinator: holds, commits and cancellations.
//!
//! Each showtime's [`SeatBoard`] lives in its own [`Store`]. Every state
//! transition is a [`BoardAction`] applied under that store's lock,
//! including the store round-trips that check and write confirmed seats,
//! so a check and the mutation it guards are one atomic unit. Showtimes
//! never share a lock. Payment verification runs with no lock held, and
//! confirmations and offer usage run as effects of the commit.

use crate::metrics::{CommitMetrics, CommitOutcomeLabel, HoldMetrics};
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::store::Store;
use boxoffice_core::board::{
    BoardAction, BoardEnvironment, BoardEvent, Hold, HoldStatus, SeatBoard, SeatBoardReducer,
};
use boxoffice_core::catalog::ShowtimeCatalog;
use boxoffice_core::environment::Clock;
use boxoffice_core::error::{BookingError, OfferRejection, Result, StoreError};
use boxoffice_core::inventory::{InventoryStore, SeatAvailability};
use boxoffice_core::ledger::BookingLedger;
use boxoffice_core::notification::NotificationDispatcher;
use boxoffice_core::offer::{ApplicableOffer, OfferService, applicable_offers, normalize_code};
use boxoffice_core::payment::{GatewayOrder, PaymentGateway, PaymentProof};
use boxoffice_core::pricing::{PricingPolicy, Quote};
use boxoffice_core::types::{
    Actor, Booking, BookingId, BookingSeat, BookingStatus, HoldToken, Money, Payment, Recipient,
    SeatNumber, SeatState, Showtime, ShowtimeId, Tier, UserId,
};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Collaborators injected at startup.
#[derive(Clone)]
pub struct CoordinatorEnvironment {
    /// Time source for expiry and offer validity
    pub clock: Arc<dyn Clock>,
    /// Showtime lookup
    pub catalog: Arc<dyn ShowtimeCatalog>,
    /// Confirmed seat state
    pub inventory: Arc<dyn InventoryStore>,
    /// Durable bookings
    pub ledger: Arc<dyn BookingLedger>,
    /// Offer codes
    pub offers: Arc<dyn OfferService>,
    /// Payment gateway adapter
    pub gateway: Arc<dyn PaymentGateway>,
    /// Confirmation delivery
    pub notifier: Arc<dyn NotificationDispatcher>,
}

/// Coordinator settings.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// TTL used when the caller does not ask for one
    pub default_hold_ttl: Duration,
    /// Shortest TTL granted
    pub min_hold_ttl: Duration,
    /// Longest TTL granted
    pub max_hold_ttl: Duration,
    /// How long retired tokens are remembered (for replayed commits)
    pub tombstone_retention: Duration,
    /// Currency passed to the gateway
    pub currency: String,
    /// Fee settings
    pub pricing: PricingPolicy,
    /// Retry policy for the durable booking write
    pub retry: RetryPolicy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_hold_ttl: Duration::seconds(600),
            min_hold_ttl: Duration::seconds(300),
            max_hold_ttl: Duration::seconds(900),
            tombstone_retention: Duration::hours(1),
            currency: "INR".to_string(),
            pricing: PricingPolicy::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl CoordinatorConfig {
    /// TTL for a hold, clamped to the configured window
    #[must_use]
    pub fn hold_ttl(&self, requested: Option<Duration>) -> Duration {
        let min = self.min_hold_ttl.min(self.max_hold_ttl);
        requested
            .unwrap_or(self.default_hold_ttl)
            .clamp(min, self.max_hold_ttl)
    }
}

/// Request to hold seats during checkout
#[derive(Debug, Clone)]
pub struct HoldRequest {
    /// Showtime
    pub showtime_id: ShowtimeId,
    /// User checking out
    pub user_id: UserId,
    /// Confirmation recipient
    pub recipient: Recipient,
    /// Seats requested
    pub seats: Vec<SeatNumber>,
    /// Offer code typed by the user
    pub offer_code: Option<String>,
    /// Requested TTL; clamped to the configured window
    pub ttl: Option<Duration>,
}

/// A placed hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldReceipt {
    /// Token to commit or release with
    pub token: HoldToken,
    /// Showtime
    pub showtime_id: ShowtimeId,
    /// Price of the held seats
    pub quote: Quote,
    /// When the hold lapses
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new booking was written
    Committed(Booking),
    /// The proof was already committed; this is the existing booking
    AlreadyCommitted(Booking),
}

impl CommitOutcome {
    /// The booking, new or existing
    #[must_use]
    pub const fn booking(&self) -> &Booking {
        match self {
            Self::Committed(booking) | Self::AlreadyCommitted(booking) => booking,
        }
    }

    /// Consumes the outcome, returning the booking
    #[must_use]
    pub fn into_booking(self) -> Booking {
        match self {
            Self::Committed(booking) | Self::AlreadyCommitted(booking) => booking,
        }
    }

    /// Whether this was a replay of an earlier commit
    #[must_use]
    pub const fn is_replay(&self) -> bool {
        matches!(self, Self::AlreadyCommitted(_))
    }
}

/// One seat in an availability listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatView {
    /// Seat number
    pub seat_number: SeatNumber,
    /// Tier
    pub tier: Tier,
    /// Price
    pub price: Money,
    /// Current state
    pub state: SeatState,
}

/// Seat map with live state, for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Availability {
    /// Showtime
    pub showtime_id: ShowtimeId,
    /// Number of seats
    pub capacity: u32,
    /// Last Normal-tier seat
    pub tier_boundary: u32,
    /// Every seat, ascending
    pub seats: Vec<SeatView>,
}

impl Availability {
    /// Seats in a given state
    #[must_use]
    pub fn seats_in(&self, state: SeatState) -> Vec<SeatNumber> {
        self.seats
            .iter()
            .filter(|seat| seat.state == state)
            .map(|seat| seat.seat_number)
            .collect()
    }
}

type BoardSlot = Arc<Store<SeatBoardReducer>>;

/// Concurrency-safe coordinator over per-showtime seat boards.
pub struct ReservationCoordinator {
    env: CoordinatorEnvironment,
    config: CoordinatorConfig,
    boards: RwLock<HashMap<ShowtimeId, BoardSlot>>,
    tokens: RwLock<HashMap<HoldToken, ShowtimeId>>,
}

impl ReservationCoordinator {
    /// Creates a coordinator over the given collaborators
    #[must_use]
    pub fn new(env: CoordinatorEnvironment, config: CoordinatorConfig) -> Self {
        Self {
            env,
            config,
            boards: RwLock::new(HashMap::new()),
            tokens: RwLock::new(HashMap::new()),
        }
    }

    /// Settings in use
    #[must_use]
    pub const fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Registers a new showtime in the catalog.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Storage`] if the catalog write fails.
    pub async fn register_showtime(&self, showtime: &Showtime) -> Result<()> {
        self.env.catalog.insert(showtime).await?;
        tracing::info!(
            showtime_id = %showtime.id,
            capacity = showtime.seat_map().capacity(),
            tier_boundary = showtime.seat_map().tier_boundary(),
            "Showtime registered"
        );
        Ok(())
    }

    /// Prices seats without holding them.
    ///
    /// # Errors
    ///
    /// - [`BookingError::ShowtimeNotFound`] / [`BookingError::ShowtimeInactive`]
    /// - selection errors from pricing
    /// - [`BookingError::OfferInvalid`] if a supplied code is rejected
    pub async fn quote(
        &self,
        showtime_id: ShowtimeId,
        seats: &[SeatNumber],
        offer_code: Option<&str>,
    ) -> Result<Quote> {
        let showtime = self.active_showtime(showtime_id).await?;
        let quote = self.config.pricing.price(showtime.seat_map(), seats)?;
        match offer_code.filter(|code| !code.trim().is_empty()) {
            Some(code) => {
                let (code, discount) = self.resolve_offer(&showtime, &quote, code).await?;
                Ok(quote.with_discount(code, discount))
            }
            None => Ok(quote),
        }
    }

    /// Offers valid for a seat selection, largest discount first.
    ///
    /// # Errors
    ///
    /// Returns showtime, selection or storage errors.
    pub async fn applicable_offers(
        &self,
        showtime_id: ShowtimeId,
        seats: &[SeatNumber],
    ) -> Result<Vec<ApplicableOffer>> {
        let showtime = self.active_showtime(showtime_id).await?;
        let quote = self.config.pricing.price(showtime.seat_map(), seats)?;
        let offers = self.env.offers.list_offers().await?;
        let context = quote.offer_context(&showtime, self.env.clock.now().date_naive());
        Ok(applicable_offers(&offers, &context))
    }

    /// Holds seats for checkout, all or nothing.
    ///
    /// An offer code that does not apply never fails the hold; the quote
    /// records the rejection instead.
    ///
    /// # Errors
    ///
    /// - [`BookingError::SeatConflict`] naming every seat already held or booked
    /// - [`BookingError::SeatOutOfRange`], [`BookingError::EmptySelection`],
    ///   [`BookingError::DuplicateSeat`]
    /// - [`BookingError::ShowtimeNotFound`] / [`BookingError::ShowtimeInactive`]
    pub async fn create_hold(&self, request: HoldRequest) -> Result<HoldReceipt> {
        let showtime = self.active_showtime(request.showtime_id).await?;
        let mut quote = self.config.pricing.price(showtime.seat_map(), &request.seats)?;

        if let Some(code) = request.offer_code.as_deref().filter(|c| !c.trim().is_empty()) {
            quote = match self.resolve_offer(&showtime, &quote, code).await {
                Ok((code, discount)) => quote.with_discount(code, discount),
                Err(BookingError::OfferInvalid(rejection)) => {
                    tracing::info!(showtime_id = %showtime.id, %rejection, "Offer not applied to hold");
                    quote.with_rejection(rejection)
                }
                Err(other) => return Err(other),
            };
        }

        let seats = quote.seat_numbers();
        let ttl = self.config.hold_ttl(request.ttl);
        let token = HoldToken::new();
        let slot = self.board(&showtime).await;

        let mut board = slot.lock().await;
        let availability = self.env.inventory.are_seats_free(showtime.id, &seats).await?;
        let taken = match availability {
            SeatAvailability::Free => Vec::new(),
            SeatAvailability::Taken(taken) => taken,
        };
        slot.apply(
            &mut board,
            BoardAction::SyncSeats {
                seats: seats.clone(),
                taken,
            },
        );

        let now = self.env.clock.now();
        let hold = Hold {
            token,
            showtime_id: showtime.id,
            user_id: request.user_id,
            recipient: request.recipient,
            quote: quote.clone(),
            order: None,
            starts_at: showtime.starts_at,
            created_at: now,
            expires_at: now + ttl,
        };
        let expires_at = hold.expires_at;

        slot.apply(&mut board, BoardAction::PlaceHold { hold });
        let mut rejected = None;
        for event in board.take_events() {
            match event {
                BoardEvent::HoldRejected { seats } => rejected = Some(seats),
                BoardEvent::HoldExpired { token, seats } => {
                    HoldMetrics::expired(1);
                    tracing::info!(showtime_id = %showtime.id, hold_token = %token, seats = ?seats, "Hold expired");
                }
                _ => {}
            }
        }
        if let Some(conflicts) = rejected {
            HoldMetrics::conflict();
            tracing::warn!(
                showtime_id = %showtime.id,
                seats = ?conflicts,
                "Hold rejected, seats taken"
            );
            return Err(BookingError::SeatConflict { seats: conflicts });
        }
        self.tokens.write().await.insert(token, showtime.id);
        drop(board);

        HoldMetrics::placed();
        tracing::info!(
            showtime_id = %showtime.id,
            hold_token = %token,
            seats = ?seats,
            %expires_at,
            "Hold placed"
        );

        Ok(HoldReceipt {
            token,
            showtime_id: showtime.id,
            quote,
            expires_at,
        })
    }

    /// Creates (once) the gateway order for a hold's total.
    ///
    /// Calling it again returns the same order. The gateway call runs
    /// without the board lock.
    ///
    /// # Errors
    ///
    /// - [`BookingError::HoldNotFound`] / [`BookingError::HoldExpired`]
    /// - [`BookingError::Gateway`] if the gateway refuses
    pub async fn create_order(&self, token: HoldToken) -> Result<GatewayOrder> {
        let slot = self.slot_for_token(token).await?;

        let total = {
            let mut board = slot.lock().await;
            let hold = live_hold(&mut board, token, self.env.clock.now())?;
            if let Some(order) = &hold.order {
                return Ok(order.clone());
            }
            hold.quote.total
        };

        let order = self
            .env
            .gateway
            .create_order(total.minor_units(), &self.config.currency)
            .await?;

        let mut board = slot.lock().await;
        if let Some(existing) = live_hold(&mut board, token, self.env.clock.now())?.order.clone() {
            return Ok(existing);
        }
        slot.apply(
            &mut board,
            BoardAction::AttachOrder {
                token,
                order: order.clone(),
            },
        );
        for event in board.take_events() {
            if let BoardEvent::Rejected { error } = event {
                return Err(error);
            }
        }
        drop(board);
        tracing::info!(
            hold_token = %token,
            order_id = %order.order_id,
            amount_minor_units = order.amount_minor_units,
            "Gateway order created"
        );
        Ok(order)
    }

    /// Turns a hold into a booking once the payment proof verifies.
    ///
    /// Replaying a committed proof returns the existing booking. A proof
    /// that fails verification leaves the hold and the inventory untouched.
    /// Once the payment verifies, a hold that lapsed in the meantime is
    /// still committed if none of its seats were taken.
    ///
    /// # Errors
    ///
    /// - [`BookingError::SignatureInvalid`] if verification fails
    /// - [`BookingError::HoldExpired`] if the hold lapsed before verification
    /// - [`BookingError::HoldNotFound`] if released or unknown
    /// - [`BookingError::OrderMismatch`] if the proof is for another order
    /// - [`BookingError::SeatConflict`] if seats were taken meanwhile
    /// - [`BookingError::Storage`] if the durable write keeps failing
    pub async fn commit_hold(&self, token: HoldToken, proof: &PaymentProof) -> Result<CommitOutcome> {
        let started = Instant::now();
        let result = self.commit_inner(token, proof).await;
        let label = match &result {
            Ok(CommitOutcome::Committed(_)) => CommitOutcomeLabel::Committed,
            Ok(CommitOutcome::AlreadyCommitted(_)) => CommitOutcomeLabel::Replayed,
            Err(BookingError::SignatureInvalid) => CommitOutcomeLabel::SignatureInvalid,
            Err(BookingError::HoldExpired) => CommitOutcomeLabel::Expired,
            Err(BookingError::SeatConflict { .. }) => CommitOutcomeLabel::Conflict,
            Err(_) => CommitOutcomeLabel::Failed,
        };
        CommitMetrics::record(label, started.elapsed());
        result
    }

    async fn commit_inner(&self, token: HoldToken, proof: &PaymentProof) -> Result<CommitOutcome> {
        if let Some(existing) = self.env.ledger.find_by_payment_id(&proof.payment_id).await? {
            return self.replay(existing, proof).await;
        }

        let slot = self.slot_for_token(token).await?;
        let snapshot = {
            let mut board = slot.lock().await;
            match board.status(token, self.env.clock.now()) {
                HoldStatus::Live(hold) => Ok(hold.clone()),
                HoldStatus::Committed(booking_id) => Err(Some(booking_id)),
                HoldStatus::Expired => {
                    tracing::warn!(hold_token = %token, "Commit rejected, hold expired");
                    return Err(BookingError::HoldExpired);
                }
                HoldStatus::Released | HoldStatus::Unknown => Err(None),
            }
        };
        let hold = match snapshot {
            Ok(hold) => hold,
            Err(Some(booking_id)) => {
                let existing = self.find_booking(booking_id).await?;
                return self.replay(existing, proof).await;
            }
            Err(None) => return Err(BookingError::HoldNotFound),
        };

        let order = match &hold.order {
            Some(order) if order.order_id == proof.order_id => order.clone(),
            _ => {
                tracing::warn!(hold_token = %token, order_id = %proof.order_id, "Commit rejected, order mismatch");
                return Err(BookingError::OrderMismatch);
            }
        };

        if let Err(error) = self.env.gateway.verify(proof).await {
            tracing::warn!(hold_token = %token, payment_id = %proof.payment_id, %error, "Payment verification failed");
            return Err(error.into());
        }
        let verified_at = self.env.clock.now();

        let seats = hold.seats();
        let mut board = slot.lock().await;
        let now = self.env.clock.now();
        // A hold that lapsed during verification still commits if its seats are untouched.
        match board.commit_check(token, &seats, now) {
            Ok(None) => {}
            Ok(Some(booking_id)) => {
                drop(board);
                let existing = self.find_booking(booking_id).await?;
                return self.replay(existing, proof).await;
            }
            Err(BookingError::SeatConflict { seats: lost }) => {
                slot.apply(&mut board, BoardAction::ReleaseHold { token });
                board.take_events();
                tracing::warn!(hold_token = %token, seats = ?lost, "Commit rejected, seats claimed after the hold lapsed");
                return Err(BookingError::SeatConflict { seats: lost });
            }
            Err(error) => return Err(error),
        }

        if let SeatAvailability::Taken(taken) =
            self.env.inventory.are_seats_free(hold.showtime_id, &seats).await?
        {
            slot.apply(
                &mut board,
                BoardAction::RejectCommit {
                    token,
                    taken: taken.clone(),
                },
            );
            board.take_events();
            tracing::warn!(hold_token = %token, seats = ?taken, "Commit rejected, seats booked elsewhere");
            return Err(BookingError::SeatConflict { seats: taken });
        }

        let booking = booking_from_hold(&hold, proof, &order, verified_at, now);
        let write = retry_with_backoff(
            &self.config.retry,
            || self.env.ledger.insert(&booking),
            StoreError::is_transient,
        )
        .await;

        let booking = match write {
            Ok(_) => booking,
            Err(StoreError::DuplicatePayment { .. }) => {
                let existing = self
                    .env
                    .ledger
                    .find_by_payment_id(&proof.payment_id)
                    .await?
                    .ok_or(BookingError::Storage(StoreError::NotFound))?;
                if !is_commit_of(&existing, &hold, &order) {
                    drop(board);
                    return self.replay(existing, proof).await;
                }
                // An earlier attempt was written but its acknowledgement was lost.
                tracing::info!(booking_id = %existing.id, hold_token = %token, "Booking found from an unacknowledged write");
                existing
            }
            Err(StoreError::SeatConflict { seats }) => {
                slot.apply(
                    &mut board,
                    BoardAction::RejectCommit {
                        token,
                        taken: seats.clone(),
                    },
                );
                board.take_events();
                tracing::warn!(hold_token = %token, seats = ?seats, "Commit rejected by ledger, seats booked");
                return Err(BookingError::SeatConflict { seats });
            }
            Err(error) => {
                tracing::error!(hold_token = %token, %error, "Booking write failed, hold kept for retry");
                return Err(error.into());
            }
        };

        slot.apply(
            &mut board,
            BoardAction::CommitHold {
                hold,
                booking: booking.clone(),
            },
        );
        board.take_events();
        drop(board);

        tracing::info!(
            booking_id = %booking.id,
            showtime_id = %booking.showtime_id,
            hold_token = %token,
            seats = ?booking.seat_numbers(),
            total = booking.total_amount.units(),
            "Booking committed"
        );
        CommitMetrics::booked(booking.seats.len(), booking.total_amount.units());
        Ok(CommitOutcome::Committed(booking))
    }

    async fn replay(&self, existing: Booking, proof: &PaymentProof) -> Result<CommitOutcome> {
        if existing.payment.order_id != proof.order_id {
            return Err(BookingError::OrderMismatch);
        }
        self.env.gateway.verify(proof).await?;
        tracing::info!(booking_id = %existing.id, payment_id = %proof.payment_id, "Commit replayed");
        Ok(CommitOutcome::AlreadyCommitted(existing))
    }

    /// Releases a hold early. Unknown, expired or released tokens are a no-op.
    ///
    /// # Errors
    ///
    /// Never fails today; the signature leaves room for store-backed holds.
    pub async fn release_hold(&self, token: HoldToken) -> Result<()> {
        let Ok(slot) = self.slot_for_token(token).await else {
            return Ok(());
        };
        let mut board = slot.lock().await;
        slot.apply(&mut board, BoardAction::ReleaseHold { token });
        for event in board.take_events() {
            if let BoardEvent::HoldReleased { token, seats } = event {
                HoldMetrics::released();
                tracing::info!(hold_token = %token, seats = ?seats, "Hold released");
            }
        }
        Ok(())
    }

    /// Current state of every seat of a showtime.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::ShowtimeNotFound`] or a storage error.
    pub async fn get_availability(&self, showtime_id: ShowtimeId) -> Result<Availability> {
        let showtime = self.showtime(showtime_id).await?;
        let map = *showtime.seat_map();
        let slot = self.board(&showtime).await;

        let states = {
            let mut board = slot.lock().await;
            let booked = self.env.inventory.list_booked(showtime_id).await?;
            slot.apply(&mut board, BoardAction::SyncBooked { booked });
            board.availability(self.env.clock.now())
        };

        let seats = states
            .into_iter()
            .map(|(seat_number, state)| {
                map.tier_and_price(seat_number).map(|(tier, price)| SeatView {
                    seat_number,
                    tier,
                    price,
                    state,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Availability {
            showtime_id,
            capacity: map.capacity(),
            tier_boundary: map.tier_boundary(),
            seats,
        })
    }

    /// Cancels a booking and returns its seats to `FREE`.
    ///
    /// # Errors
    ///
    /// - [`BookingError::BookingNotFound`]
    /// - [`BookingError::NotPermitted`] unless the actor owns the booking or is an admin
    /// - [`BookingError::AlreadyCancelled`]
    pub async fn cancel_booking(&self, booking_id: BookingId, actor: Actor) -> Result<Booking> {
        let mut booking = self.find_booking(booking_id).await?;
        if !actor.may_act_for(booking.user_id) {
            tracing::warn!(%booking_id, user_id = %actor.user_id, "Cancellation not permitted");
            return Err(BookingError::NotPermitted);
        }
        if !booking.is_confirmed() {
            return Err(BookingError::AlreadyCancelled);
        }

        let slot = self.boards.read().await.get(&booking.showtime_id).cloned();
        let mut board = match &slot {
            Some(slot) => Some(slot.lock().await),
            None => None,
        };

        let cancelled = match self.env.ledger.cancel(booking_id).await {
            Ok(cancelled) => cancelled,
            Err(StoreError::NotFound) => return Err(BookingError::BookingNotFound),
            Err(error) => return Err(error.into()),
        };
        if !cancelled {
            return Err(BookingError::AlreadyCancelled);
        }
        let seats = booking.seat_numbers();
        if let (Some(slot), Some(board)) = (&slot, board.as_mut()) {
            slot.apply(
                board,
                BoardAction::FreeSeats {
                    seats: seats.clone(),
                },
            );
        }
        drop(board);

        CommitMetrics::cancelled();
        tracing::info!(
            %booking_id,
            showtime_id = %booking.showtime_id,
            seats = ?seats,
            by = %actor.user_id,
            "Booking cancelled"
        );
        booking.status = BookingStatus::Cancelled;
        Ok(booking)
    }

    /// Finds a booking.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::BookingNotFound`] or a storage error.
    pub async fn find_booking(&self, booking_id: BookingId) -> Result<Booking> {
        self.env
            .ledger
            .find_by_id(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)
    }

    /// A user's bookings, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the ledger cannot be read.
    pub async fn bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        Ok(self.env.ledger.find_by_user(user_id).await?)
    }

    /// Retires every expired hold across all showtimes.
    ///
    /// Also forgets tokens retired longer ago than the tombstone
    /// retention, and drops the boards of showtimes that have started once
    /// nothing on them is left to track. Returns the number of holds
    /// expired by this sweep.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.env.clock.now();
        let cutoff = now - self.config.tombstone_retention;
        let slots: Vec<(ShowtimeId, BoardSlot)> = self
            .boards
            .read()
            .await
            .iter()
            .map(|(id, slot)| (*id, Arc::clone(slot)))
            .collect();

        let mut expired = 0;
        let mut live = 0;
        let mut forgotten = Vec::new();
        for (showtime_id, slot) in slots {
            let mut board = slot.lock().await;
            slot.apply(&mut board, BoardAction::ExpireHolds);
            slot.apply(&mut board, BoardAction::ForgetRetired { before: cutoff });
            for event in board.take_events() {
                match event {
                    BoardEvent::HoldExpired { token, seats } => {
                        expired += 1;
                        tracing::info!(%showtime_id, hold_token = %token, seats = ?seats, "Hold expired");
                    }
                    BoardEvent::TokenForgotten { token } => forgotten.push(token),
                    _ => {}
                }
            }
            live += board.live_hold_count();
        }

        if !forgotten.is_empty() {
            let mut tokens = self.tokens.write().await;
            for token in &forgotten {
                tokens.remove(token);
            }
        }
        self.evict_started_boards(now).await;

        HoldMetrics::expired(expired);
        HoldMetrics::active(live);
        if expired > 0 {
            tracing::info!(expired, live, "Expiry sweep");
        }
        expired
    }

    /// Number of showtimes with a seat board in memory
    pub async fn board_count(&self) -> usize {
        self.boards.read().await.len()
    }

    /// Effects (confirmations, offer usage) that are still running
    pub async fn pending_effects(&self) -> usize {
        self.boards
            .read()
            .await
            .values()
            .map(|slot| slot.pending_effects())
            .sum()
    }

    async fn evict_started_boards(&self, now: DateTime<Utc>) {
        let mut boards = self.boards.write().await;
        boards.retain(|showtime_id, slot| {
            // Anyone else holding the slot may be about to lock it.
            if Arc::strong_count(slot) > 1 || slot.pending_effects() > 0 {
                return true;
            }
            let Some(board) = slot.try_lock() else {
                return true;
            };
            let evict = board.is_idle() && board.starts_at() <= now;
            if evict {
                tracing::debug!(%showtime_id, "Seat board dropped");
            }
            !evict
        });
    }

    async fn showtime(&self, showtime_id: ShowtimeId) -> Result<Showtime> {
        self.env
            .catalog
            .get(showtime_id)
            .await?
            .ok_or(BookingError::ShowtimeNotFound)
    }

    async fn active_showtime(&self, showtime_id: ShowtimeId) -> Result<Showtime> {
        let showtime = self.showtime(showtime_id).await?;
        if showtime.is_active() {
            Ok(showtime)
        } else {
            Err(BookingError::ShowtimeInactive)
        }
    }

    async fn resolve_offer(
        &self,
        showtime: &Showtime,
        quote: &Quote,
        code: &str,
    ) -> Result<(String, Money)> {
        let code = normalize_code(code);
        let offer = match self.env.offers.lookup(&code).await {
            Ok(Some(offer)) => offer,
            Ok(None) => return Err(OfferRejection::NotFound.into()),
            Err(error) => {
                tracing::warn!(offer_code = %code, %error, "Offer lookup failed");
                return Err(OfferRejection::Unavailable.into());
            }
        };
        let context = quote.offer_context(showtime, self.env.clock.now().date_naive());
        let discount = offer.evaluate(&context)?;
        Ok((offer.code, discount))
    }

    async fn board(&self, showtime: &Showtime) -> BoardSlot {
        if let Some(slot) = self.boards.read().await.get(&showtime.id) {
            return Arc::clone(slot);
        }
        let mut boards = self.boards.write().await;
        let slot = boards.entry(showtime.id).or_insert_with(|| {
            tracing::debug!(showtime_id = %showtime.id, "Seat board created");
            let board = SeatBoard::new(
                showtime.id,
                showtime.seat_map().capacity(),
                showtime.starts_at,
            );
            let env = BoardEnvironment {
                clock: Arc::clone(&self.env.clock),
                offers: Arc::clone(&self.env.offers),
                notifier: Arc::clone(&self.env.notifier),
            };
            Arc::new(Store::new(board, SeatBoardReducer, env))
        });
        Arc::clone(slot)
    }

    async fn slot_for_token(&self, token: HoldToken) -> Result<BoardSlot> {
        let showtime_id = self
            .tokens
            .read()
            .await
            .get(&token)
            .copied()
            .ok_or(BookingError::HoldNotFound)?;
        self.boards
            .read()
            .await
            .get(&showtime_id)
            .cloned()
            .ok_or(BookingError::HoldNotFound)
    }
}

fn live_hold(board: &mut SeatBoard, token: HoldToken, now: DateTime<Utc>) -> Result<&Hold> {
    match board.status(token, now) {
        HoldStatus::Live(hold) => Ok(hold),
        HoldStatus::Expired => Err(BookingError::HoldExpired),
        HoldStatus::Released | HoldStatus::Committed(_) | HoldStatus::Unknown => {
            Err(BookingError::HoldNotFound)
        }
    }
}

/// Whether `existing` is the booking this hold's own write produced
fn is_commit_of(existing: &Booking, hold: &Hold, order: &GatewayOrder) -> bool {
    existing.payment.order_id == order.order_id
        && existing.showtime_id == hold.showtime_id
        && existing.user_id == hold.user_id
        && existing.seat_numbers() == hold.seats()
}

fn booking_from_hold(
    hold: &Hold,
    proof: &PaymentProof,
    order: &GatewayOrder,
    verified_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Booking {
    let seats: Vec<BookingSeat> = hold.quote.lines.clone();
    Booking {
        id: BookingId::new(),
        user_id: hold.user_id,
        showtime_id: hold.showtime_id,
        seats,
        original_amount: hold.quote.gross,
        discount: hold.quote.discount,
        total_amount: hold.quote.total,
        offer_code: hold.quote.offer_code.clone(),
        status: BookingStatus::Confirmed,
        created_at: now,
        payment: Payment {
            order_id: proof.order_id.clone(),
            payment_id: proof.payment_id.clone(),
            amount: hold.quote.total,
            currency: order.currency.clone(),
            verified_at,
        },
    }
}
