//! Domain types for the seat inventory and booking core.
//!
//! Identifiers, the money value object, seat classification and the
//! records that the booking ledger persists (bookings, per-seat snapshots
//! and payments).

use crate::seat_map::SeatMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            #[doc = concat!("Creates a new random `", stringify!($name), "`")]
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            #[doc = concat!("Creates a `", stringify!($name), "` from a `Uuid`")]
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Get the inner UUID
            #[must_use]
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(
    /// Unique identifier for a showtime (movie + screen + date + time)
    ShowtimeId
);
uuid_id!(
    /// Unique identifier for a movie
    MovieId
);
uuid_id!(
    /// Unique identifier for a theatre
    TheatreId
);
uuid_id!(
    /// Unique identifier for a screen inside a theatre
    ScreenId
);
uuid_id!(
    /// Unique identifier for a user
    UserId
);
uuid_id!(
    /// Unique identifier for a confirmed booking
    BookingId
);
uuid_id!(
    /// Opaque token identifying a live hold on a set of seats
    HoldToken
);

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Creates a `", stringify!($name), "` from the gateway's string form")]
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Order identifier issued by the payment gateway
    OrderId
);
string_id!(
    /// Payment identifier issued by the payment gateway once the customer pays
    GatewayPaymentId
);

/// Seat number within a screen, numbered from 1
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeatNumber(u32);

impl SeatNumber {
    /// Creates a seat number
    #[must_use]
    pub const fn new(number: u32) -> Self {
        Self(number)
    }

    /// Returns the raw seat number
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for SeatNumber {
    fn from(number: u32) -> Self {
        Self(number)
    }
}

impl fmt::Display for SeatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Formats seat numbers as a comma-separated list ("3, 4, 7").
#[must_use]
pub fn format_seats(seats: &[SeatNumber]) -> String {
    seats
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// ============================================================================
// Money Value Object
// ============================================================================

/// Amount of money in whole currency units (rupees).
///
/// Ticket prices, fees and discounts are whole units; the gateway is
/// charged in minor units via [`Money::minor_units`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(u64);

impl Money {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Creates a `Money` value from whole currency units
    #[must_use]
    pub const fn new(units: u64) -> Self {
        Self(units)
    }

    /// Returns the amount in whole currency units
    #[must_use]
    pub const fn units(self) -> u64 {
        self.0
    }

    /// Returns the amount in minor units (paise), saturating on overflow
    #[must_use]
    pub const fn minor_units(self) -> u64 {
        self.0.saturating_mul(100)
    }

    /// Checks if the amount is zero
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Adds two amounts, saturating on overflow
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtracts two amounts, never going below zero
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    /// Percentage of this amount, truncated to whole units
    #[must_use]
    pub const fn percent(self, percent: u32) -> Self {
        Self(self.0.saturating_mul(percent as u64) / 100)
    }

    /// Returns the smaller of two amounts
    #[must_use]
    pub const fn min(self, other: Self) -> Self {
        if self.0 <= other.0 { self } else { other }
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "₹{}", self.0)
    }
}

// ============================================================================
// Seats
// ============================================================================

/// Seat classification by position relative to the tier boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Seats `1..=boundary`
    Normal,
    /// Seats `boundary+1..=capacity`
    Vip,
}

impl Tier {
    /// Database/wire representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Vip => "vip",
        }
    }

    /// Parses the database/wire representation
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "vip" => Some(Self::Vip),
            _ => None,
        }
    }
}

/// Observable state of a single seat for one showtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeatState {
    /// Neither held nor booked
    Free,
    /// Claimed by a live, unexpired hold
    Held,
    /// Covered by a confirmed booking
    Booked,
}

// ============================================================================
// Showtime
// ============================================================================

/// Lifecycle status of a showtime
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowtimeStatus {
    /// Open for booking
    Active,
    /// Closed for booking
    Inactive,
}

impl ShowtimeStatus {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    /// Parses the database representation
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }
}

/// A scheduled screening of a movie on a screen.
///
/// The seat map (and with it the tier boundary) is captured when the
/// showtime is created. Later edits to the screen never reclassify seats
/// of an existing showtime.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Showtime {
    /// Showtime ID
    pub id: ShowtimeId,
    /// Movie being screened
    pub movie_id: MovieId,
    /// Theatre hosting the screen
    pub theatre_id: TheatreId,
    /// Screen the showtime runs on
    pub screen_id: ScreenId,
    /// Scheduled start
    pub starts_at: DateTime<Utc>,
    /// Lifecycle status
    pub status: ShowtimeStatus,
    seat_map: SeatMap,
}

impl Showtime {
    /// Creates an active showtime with the given seat map
    #[must_use]
    pub fn new(
        movie_id: MovieId,
        theatre_id: TheatreId,
        screen_id: ScreenId,
        starts_at: DateTime<Utc>,
        seat_map: SeatMap,
    ) -> Self {
        Self {
            id: ShowtimeId::new(),
            movie_id,
            theatre_id,
            screen_id,
            starts_at,
            status: ShowtimeStatus::Active,
            seat_map,
        }
    }

    /// Rebuilds a showtime from persisted parts
    #[must_use]
    pub const fn from_parts(
        id: ShowtimeId,
        movie_id: MovieId,
        theatre_id: TheatreId,
        screen_id: ScreenId,
        starts_at: DateTime<Utc>,
        status: ShowtimeStatus,
        seat_map: SeatMap,
    ) -> Self {
        Self {
            id,
            movie_id,
            theatre_id,
            screen_id,
            starts_at,
            status,
            seat_map,
        }
    }

    /// Returns the same showtime with a different status
    #[must_use]
    pub const fn with_status(mut self, status: ShowtimeStatus) -> Self {
        self.status = status;
        self
    }

    /// Seat map fixed at creation time
    #[must_use]
    pub const fn seat_map(&self) -> &SeatMap {
        &self.seat_map
    }

    /// Whether the showtime accepts new holds
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ShowtimeStatus::Active
    }
}

// ============================================================================
// Bookings and payments
// ============================================================================

/// Booking status
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    /// Paid and holding its seats
    Confirmed,
    /// Cancelled; its seats are free again
    Cancelled,
}

impl BookingStatus {
    /// Database representation
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses the database representation
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "confirmed" => Some(Self::Confirmed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Per-seat snapshot of tier and price at booking time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingSeat {
    /// Seat number
    pub seat_number: SeatNumber,
    /// Tier at booking time
    pub tier: Tier,
    /// Price charged for this seat
    pub price: Money,
}

/// Verified payment backing a booking
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Gateway order the customer paid against
    pub order_id: OrderId,
    /// Gateway payment ID (unique across all payments)
    pub payment_id: GatewayPaymentId,
    /// Amount charged
    pub amount: Money,
    /// ISO currency code
    pub currency: String,
    /// When the signature was verified
    pub verified_at: DateTime<Utc>,
}

/// A confirmed purchase of seats for one showtime.
///
/// Immutable after creation apart from the `Confirmed → Cancelled`
/// status transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    /// Booking ID
    pub id: BookingId,
    /// Purchasing user
    pub user_id: UserId,
    /// Showtime booked
    pub showtime_id: ShowtimeId,
    /// Seats in ascending order, non-empty and without duplicates
    pub seats: Vec<BookingSeat>,
    /// Subtotal plus convenience fee, before discount
    pub original_amount: Money,
    /// Discount applied
    pub discount: Money,
    /// Amount charged
    pub total_amount: Money,
    /// Offer code applied, if any
    pub offer_code: Option<String>,
    /// Status
    pub status: BookingStatus,
    /// When the booking was committed
    pub created_at: DateTime<Utc>,
    /// Payment backing this booking
    pub payment: Payment,
}

impl Booking {
    /// Seat numbers covered by this booking
    #[must_use]
    pub fn seat_numbers(&self) -> Vec<SeatNumber> {
        self.seats.iter().map(|seat| seat.seat_number).collect()
    }

    /// Whether the booking still claims its seats
    #[must_use]
    pub fn is_confirmed(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

// ============================================================================
// Callers
// ============================================================================

/// Where a booking confirmation should be delivered
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Email address
    pub email: String,
    /// Display name
    pub name: Option<String>,
}

/// Authorization role, resolved once when the account is provisioned
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular customer
    Customer,
    /// Operator allowed to act on any booking
    Admin,
}

/// The caller of an operation that needs authorization
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Calling user
    pub user_id: UserId,
    /// Role of the calling user
    pub role: Role,
}

impl Actor {
    /// Customer actor
    #[must_use]
    pub const fn customer(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Customer,
        }
    }

    /// Admin actor
    #[must_use]
    pub const fn admin(user_id: UserId) -> Self {
        Self {
            user_id,
            role: Role::Admin,
        }
    }

    /// Whether this actor may act on a booking owned by `owner`
    #[must_use]
    pub fn may_act_for(&self, owner: UserId) -> bool {
        self.role == Role::Admin || self.user_id == owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_percent_truncates() {
        assert_eq!(Money::new(600).percent(5), Money::new(30));
        assert_eq!(Money::new(610).percent(5), Money::new(30));
        assert_eq!(Money::new(630).percent(20), Money::new(126));
    }

    #[test]
    fn money_minor_units() {
        assert_eq!(Money::new(530).minor_units(), 53_000);
        assert_eq!(Money::new(u64::MAX).minor_units(), u64::MAX);
    }

    #[test]
    fn money_never_negative() {
        assert_eq!(Money::new(10).saturating_sub(Money::new(25)), Money::ZERO);
    }

    #[test]
    fn format_seats_joins_with_commas() {
        let seats = [SeatNumber::new(3), SeatNumber::new(4), SeatNumber::new(7)];
        assert_eq!(format_seats(&seats), "3, 4, 7");
    }

    #[test]
    fn seat_state_wire_format() {
        let json = serde_json::to_string(&SeatState::Booked).unwrap_or_default();
        assert_eq!(json, "\"BOOKED\"");
    }

    #[test]
    fn admin_may_act_for_anyone() {
        let owner = UserId::new();
        assert!(Actor::customer(owner).may_act_for(owner));
        assert!(!Actor::customer(UserId::new()).may_act_for(owner));
        assert!(Actor::admin(UserId::new()).may_act_for(owner));
    }
}
