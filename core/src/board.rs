//! Per-showtime seat board: the `FREE → HELD → BOOKED` state machine.
//!
//! A [`SeatBoard`] is the state of a [`SeatBoardReducer`]. The runtime
//! owns one per showtime inside a store whose mutex serializes every
//! reduction, so each check-and-mutate below is one atomic step with
//! respect to other callers on the same showtime.
//!
//! Expiry is lazy: an expired hold keeps its seats in the maps until the
//! next operation touching them (or an [`BoardAction::ExpireHolds`] sweep)
//! retires it, but it never counts as a conflict.
//!
//! Reductions record what happened as [`BoardEvent`]s in the board; the
//! caller drains them with [`SeatBoard::take_events`].

use crate::effect::Effect;
use crate::environment::Clock;
use crate::error::BookingError;
use crate::notification::{BookingConfirmation, NotificationDispatcher};
use crate::offer::OfferService;
use crate::payment::GatewayOrder;
use crate::pricing::Quote;
use crate::reducer::{Effects, Reducer};
use crate::types::{
    Booking, BookingId, HoldToken, OrderId, Recipient, SeatNumber, SeatState, ShowtimeId, UserId,
};
use chrono::{DateTime, Utc};
use smallvec::{SmallVec, smallvec};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// A time-boxed, exclusive claim on seats during checkout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hold {
    /// Hold token
    pub token: HoldToken,
    /// Showtime the seats belong to
    pub showtime_id: ShowtimeId,
    /// User checking out
    pub user_id: UserId,
    /// Where to send the confirmation
    pub recipient: Recipient,
    /// Price of the held seats
    pub quote: Quote,
    /// Gateway order, once created
    pub order: Option<GatewayOrder>,
    /// Showtime start, carried for the confirmation
    pub starts_at: DateTime<Utc>,
    /// When the hold was placed
    pub created_at: DateTime<Utc>,
    /// When the hold stops excluding other callers
    pub expires_at: DateTime<Utc>,
}

impl Hold {
    /// Whether the TTL has elapsed
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Held seats, ascending
    #[must_use]
    pub fn seats(&self) -> Vec<SeatNumber> {
        self.quote.seat_numbers()
    }
}

/// How a hold left the board
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Retired {
    Expired { at: DateTime<Utc> },
    Released { at: DateTime<Utc> },
    Committed { booking_id: BookingId, at: DateTime<Utc> },
}

impl Retired {
    const fn at(&self) -> DateTime<Utc> {
        match self {
            Self::Expired { at } | Self::Released { at } | Self::Committed { at, .. } => *at,
        }
    }
}

/// What the board knows about a token
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HoldStatus<'a> {
    /// Live and unexpired
    Live(&'a Hold),
    /// Past its TTL (retired on observation)
    Expired,
    /// Released earlier
    Released,
    /// Already committed into a booking
    Committed(BookingId),
    /// Never seen, or forgotten after retention
    Unknown,
}

/// Inputs to the seat board.
#[derive(Clone, Debug)]
pub enum BoardAction {
    /// Replace the booked set with the store's view
    SyncBooked {
        /// Every confirmed seat
        booked: BTreeSet<SeatNumber>,
    },
    /// Align `seats` with the store: those in `taken` are booked, the rest are not
    SyncSeats {
        /// Seats checked
        seats: Vec<SeatNumber>,
        /// Seats the store reports as booked
        taken: Vec<SeatNumber>,
    },
    /// Hold seats, all or nothing
    PlaceHold {
        /// The hold to place
        hold: Hold,
    },
    /// Attach the gateway order to a live hold
    AttachOrder {
        /// Hold
        token: HoldToken,
        /// Order created for the hold's total
        order: GatewayOrder,
    },
    /// Book the hold's seats after the booking was written, and send the
    /// confirmation and offer usage as effects
    CommitHold {
        /// Hold snapshot taken before verification
        hold: Hold,
        /// Booking as written to the ledger
        booking: Booking,
    },
    /// Seats were booked elsewhere: mark them and drop the hold
    RejectCommit {
        /// Hold
        token: HoldToken,
        /// Seats found booked
        taken: Vec<SeatNumber>,
    },
    /// Release a live hold; a no-op for any other token
    ReleaseHold {
        /// Hold
        token: HoldToken,
    },
    /// Retire every hold past its TTL
    ExpireHolds,
    /// Forget tombstones retired before `before`
    ForgetRetired {
        /// Retention cutoff
        before: DateTime<Utc>,
    },
    /// Return seats of a cancelled booking to `FREE`
    FreeSeats {
        /// Seats freed
        seats: Vec<SeatNumber>,
    },
}

/// Facts recorded by reductions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    /// A hold was placed
    HoldPlaced {
        /// Hold
        token: HoldToken,
        /// Seats held
        seats: Vec<SeatNumber>,
        /// Expiry
        expires_at: DateTime<Utc>,
    },
    /// A hold was refused because seats were taken
    HoldRejected {
        /// Conflicting seats, ascending
        seats: Vec<SeatNumber>,
    },
    /// A gateway order was attached
    OrderAttached {
        /// Hold
        token: HoldToken,
        /// Order
        order_id: OrderId,
    },
    /// A command could not be applied
    Rejected {
        /// Why
        error: BookingError,
    },
    /// A hold became a booking
    HoldCommitted {
        /// Hold
        token: HoldToken,
        /// Booking
        booking_id: BookingId,
    },
    /// A hold was released by its owner or because its seats were lost
    HoldReleased {
        /// Hold
        token: HoldToken,
        /// Seats freed
        seats: Vec<SeatNumber>,
    },
    /// A hold passed its TTL
    HoldExpired {
        /// Hold
        token: HoldToken,
        /// Seats freed
        seats: Vec<SeatNumber>,
    },
    /// A tombstone was dropped
    TokenForgotten {
        /// Hold
        token: HoldToken,
    },
}

/// Seat state for a single showtime.
#[derive(Clone, Debug)]
pub struct SeatBoard {
    showtime_id: ShowtimeId,
    capacity: u32,
    starts_at: DateTime<Utc>,
    booked: BTreeSet<SeatNumber>,
    held: HashMap<SeatNumber, HoldToken>,
    holds: HashMap<HoldToken, Hold>,
    retired: HashMap<HoldToken, Retired>,
    events: Vec<BoardEvent>,
}

impl SeatBoard {
    /// Empty board for a showtime with `capacity` seats
    #[must_use]
    pub fn new(showtime_id: ShowtimeId, capacity: u32, starts_at: DateTime<Utc>) -> Self {
        Self {
            showtime_id,
            capacity,
            starts_at,
            booked: BTreeSet::new(),
            held: HashMap::new(),
            holds: HashMap::new(),
            retired: HashMap::new(),
            events: Vec::new(),
        }
    }

    /// Showtime this board tracks
    #[must_use]
    pub const fn showtime_id(&self) -> ShowtimeId {
        self.showtime_id
    }

    /// Scheduled start of the showtime
    #[must_use]
    pub const fn starts_at(&self) -> DateTime<Utc> {
        self.starts_at
    }

    /// Drains the events recorded since the last call
    pub fn take_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    /// Current state of one seat
    #[must_use]
    pub fn state_of(&self, seat: SeatNumber, now: DateTime<Utc>) -> SeatState {
        if self.booked.contains(&seat) {
            SeatState::Booked
        } else if self.live_holder(seat, now).is_some() {
            SeatState::Held
        } else {
            SeatState::Free
        }
    }

    /// State of every seat, ascending
    #[must_use]
    pub fn availability(&self, now: DateTime<Utc>) -> BTreeMap<SeatNumber, SeatState> {
        (1..=self.capacity)
            .map(SeatNumber::new)
            .map(|seat| (seat, self.state_of(seat, now)))
            .collect()
    }

    /// Seats in `seats` that are booked or held by a live hold other than `allowed`.
    #[must_use]
    pub fn conflicts(
        &self,
        seats: &[SeatNumber],
        now: DateTime<Utc>,
        allowed: Option<HoldToken>,
    ) -> Vec<SeatNumber> {
        let mut conflicts: Vec<SeatNumber> = seats
            .iter()
            .copied()
            .filter(|seat| {
                self.booked.contains(seat)
                    || self
                        .live_holder(*seat, now)
                        .is_some_and(|holder| Some(holder) != allowed)
            })
            .collect();
        conflicts.sort_unstable();
        conflicts.dedup();
        conflicts
    }

    /// Status of a token, retiring it first if it has expired
    pub fn status(&mut self, token: HoldToken, now: DateTime<Utc>) -> HoldStatus<'_> {
        if self.holds.get(&token).is_some_and(|hold| hold.is_expired(now)) {
            self.retire(token, Retired::Expired { at: now });
        }
        if let Some(hold) = self.holds.get(&token) {
            return HoldStatus::Live(hold);
        }
        match self.retired.get(&token) {
            Some(Retired::Expired { .. }) => HoldStatus::Expired,
            Some(Retired::Released { .. }) => HoldStatus::Released,
            Some(Retired::Committed { booking_id, .. }) => HoldStatus::Committed(*booking_id),
            None => HoldStatus::Unknown,
        }
    }

    /// Re-checks a hold whose payment has already verified.
    ///
    /// Returns `Ok(None)` if every seat is still free or held by this
    /// token, or `Ok(Some(booking_id))` if the token was already committed.
    /// A hold that expired while the payment was verified is still
    /// committable as long as nobody booked or re-held its seats.
    ///
    /// # Errors
    ///
    /// - [`BookingError::HoldNotFound`] if released or unknown
    /// - [`BookingError::SeatConflict`] if a seat was taken meanwhile
    pub fn commit_check(
        &mut self,
        token: HoldToken,
        seats: &[SeatNumber],
        now: DateTime<Utc>,
    ) -> Result<Option<BookingId>, BookingError> {
        match self.status(token, now) {
            HoldStatus::Live(_) | HoldStatus::Expired => {}
            HoldStatus::Committed(booking_id) => return Ok(Some(booking_id)),
            HoldStatus::Released | HoldStatus::Unknown => return Err(BookingError::HoldNotFound),
        }
        let conflicts = self.conflicts(seats, now, Some(token));
        if conflicts.is_empty() {
            Ok(None)
        } else {
            Err(BookingError::SeatConflict { seats: conflicts })
        }
    }

    /// Number of holds not yet retired (including expired, unswept ones)
    #[must_use]
    pub fn live_hold_count(&self) -> usize {
        self.holds.len()
    }

    /// Whether the board tracks no holds and no tombstones
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.holds.is_empty() && self.retired.is_empty()
    }

    fn sync_seats(&mut self, seats: &[SeatNumber], taken: &[SeatNumber]) {
        for seat in seats {
            if taken.contains(seat) {
                self.booked.insert(*seat);
            } else {
                self.booked.remove(seat);
            }
        }
    }

    fn place(&mut self, hold: Hold, now: DateTime<Utc>) -> Result<(), Vec<SeatNumber>> {
        let seats = hold.seats();
        let conflicts = self.conflicts(&seats, now, None);
        if !conflicts.is_empty() {
            return Err(conflicts);
        }

        let stale: BTreeSet<HoldToken> = seats
            .iter()
            .filter_map(|seat| self.held.get(seat).copied())
            .collect();
        for token in stale {
            if let Some(expired) = self.retire(token, Retired::Expired { at: now }) {
                self.events.push(BoardEvent::HoldExpired {
                    token,
                    seats: expired.seats(),
                });
            }
        }

        for seat in &seats {
            self.held.insert(*seat, hold.token);
        }
        self.holds.insert(hold.token, hold);
        Ok(())
    }

    fn attach_order(
        &mut self,
        token: HoldToken,
        order: GatewayOrder,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        match self.status(token, now) {
            HoldStatus::Live(_) => {}
            HoldStatus::Expired => return Err(BookingError::HoldExpired),
            HoldStatus::Released | HoldStatus::Committed(_) | HoldStatus::Unknown => {
                return Err(BookingError::HoldNotFound);
            }
        }
        let hold = self
            .holds
            .get_mut(&token)
            .ok_or(BookingError::HoldNotFound)?;
        hold.order = Some(order);
        Ok(())
    }

    fn complete_commit(
        &mut self,
        token: HoldToken,
        seats: &[SeatNumber],
        booking_id: BookingId,
        now: DateTime<Utc>,
    ) {
        self.booked.extend(seats.iter().copied());
        let committed = Retired::Committed { booking_id, at: now };
        self.retire(token, committed);
        // An expired hold has no live entry left; the tombstone still moves to committed.
        self.retired.insert(token, committed);
    }

    fn release(&mut self, token: HoldToken, now: DateTime<Utc>) -> Option<Hold> {
        if self.holds.contains_key(&token) {
            self.retire(token, Retired::Released { at: now })
        } else {
            None
        }
    }

    fn sweep(&mut self, now: DateTime<Utc>) -> Vec<Hold> {
        let expired: Vec<HoldToken> = self
            .holds
            .values()
            .filter(|hold| hold.is_expired(now))
            .map(|hold| hold.token)
            .collect();
        expired
            .into_iter()
            .filter_map(|token| self.retire(token, Retired::Expired { at: now }))
            .collect()
    }

    fn prune_retired(&mut self, before: DateTime<Utc>) -> Vec<HoldToken> {
        let stale: Vec<HoldToken> = self
            .retired
            .iter()
            .filter(|(_, retired)| retired.at() < before)
            .map(|(token, _)| *token)
            .collect();
        for token in &stale {
            self.retired.remove(token);
        }
        stale
    }

    fn live_holder(&self, seat: SeatNumber, now: DateTime<Utc>) -> Option<HoldToken> {
        let token = self.held.get(&seat)?;
        self.holds
            .get(token)
            .filter(|hold| !hold.is_expired(now))
            .map(|hold| hold.token)
    }

    fn retire(&mut self, token: HoldToken, how: Retired) -> Option<Hold> {
        let hold = self.holds.remove(&token)?;
        for seat in hold.seats() {
            if self.held.get(&seat) == Some(&token) {
                self.held.remove(&seat);
            }
        }
        self.retired.insert(token, how);
        Some(hold)
    }
}

/// Dependencies of the seat board reducer.
#[derive(Clone)]
pub struct BoardEnvironment {
    /// Time source for expiry
    pub clock: Arc<dyn Clock>,
    /// Offer usage counters
    pub offers: Arc<dyn OfferService>,
    /// Confirmation delivery
    pub notifier: Arc<dyn NotificationDispatcher>,
}

/// Reducer over a showtime's [`SeatBoard`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SeatBoardReducer;

impl SeatBoardReducer {
    fn commit_effects(hold: &Hold, booking: &Booking, env: &BoardEnvironment) -> Effects<BoardAction> {
        let details = BookingConfirmation {
            showtime_id: booking.showtime_id,
            starts_at: hold.starts_at,
            seats: booking.seat_numbers(),
            total_amount: booking.total_amount,
            discount: booking.discount,
            offer_code: booking.offer_code.clone(),
        };
        let booking_id = booking.id;
        let delivery = env
            .notifier
            .notify_booking_confirmed(booking_id, hold.recipient.clone(), details);
        let mut effects: Effects<BoardAction> = smallvec![Effect::future(async move {
            if let Err(error) = delivery.await {
                tracing::error!(%booking_id, %error, "Booking confirmation not delivered");
            }
            None
        })];

        if let Some(code) = booking.offer_code.clone() {
            let offers = Arc::clone(&env.offers);
            effects.push(Effect::future(async move {
                if let Err(error) = offers.increment_usage(&code).await {
                    tracing::error!(%booking_id, offer_code = %code, %error, "Offer usage not recorded");
                }
                None
            }));
        }
        effects
    }
}

impl Reducer for SeatBoardReducer {
    type State = SeatBoard;
    type Action = BoardAction;
    type Environment = BoardEnvironment;

    fn reduce(
        &self,
        state: &mut SeatBoard,
        action: BoardAction,
        env: &BoardEnvironment,
    ) -> Effects<BoardAction> {
        let now = env.clock.now();
        match action {
            BoardAction::SyncBooked { booked } => {
                state.booked = booked;
            }
            BoardAction::SyncSeats { seats, taken } => {
                state.sync_seats(&seats, &taken);
            }
            BoardAction::PlaceHold { hold } => {
                let token = hold.token;
                let seats = hold.seats();
                let expires_at = hold.expires_at;
                match state.place(hold, now) {
                    Ok(()) => state.events.push(BoardEvent::HoldPlaced {
                        token,
                        seats,
                        expires_at,
                    }),
                    Err(conflicts) => {
                        state.events.push(BoardEvent::HoldRejected { seats: conflicts });
                    }
                }
            }
            BoardAction::AttachOrder { token, order } => {
                let order_id = order.order_id.clone();
                match state.attach_order(token, order, now) {
                    Ok(()) => state.events.push(BoardEvent::OrderAttached { token, order_id }),
                    Err(error) => state.events.push(BoardEvent::Rejected { error }),
                }
            }
            BoardAction::CommitHold { hold, booking } => {
                state.complete_commit(hold.token, &booking.seat_numbers(), booking.id, now);
                state.events.push(BoardEvent::HoldCommitted {
                    token: hold.token,
                    booking_id: booking.id,
                });
                return Self::commit_effects(&hold, &booking, env);
            }
            BoardAction::RejectCommit { token, taken } => {
                state.booked.extend(taken.iter().copied());
                if let Some(hold) = state.release(token, now) {
                    state.events.push(BoardEvent::HoldReleased {
                        token,
                        seats: hold.seats(),
                    });
                }
            }
            BoardAction::ReleaseHold { token } => {
                if let Some(hold) = state.release(token, now) {
                    state.events.push(BoardEvent::HoldReleased {
                        token,
                        seats: hold.seats(),
                    });
                }
            }
            BoardAction::ExpireHolds => {
                for hold in state.sweep(now) {
                    let seats = hold.seats();
                    state.events.push(BoardEvent::HoldExpired {
                        token: hold.token,
                        seats,
                    });
                }
            }
            BoardAction::ForgetRetired { before } => {
                for token in state.prune_retired(before) {
                    state.events.push(BoardEvent::TokenForgotten { token });
                }
            }
            BoardAction::FreeSeats { seats } => {
                for seat in &seats {
                    state.booked.remove(seat);
                }
            }
        }
        SmallVec::new()
    }
}
