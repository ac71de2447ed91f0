//! Seat tier and price derivation.
//!
//! A screen's seats are numbered `1..=capacity`. The first 80% (rounded
//! down) are Normal tier, the remainder VIP.

use crate::error::BookingError;
use crate::types::{Money, SeatNumber, Tier};
use serde::{Deserialize, Serialize};

/// Seat boundary for a given capacity: `floor(capacity * 0.8)`.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // result is at most `capacity`
pub const fn tier_boundary(capacity: u32) -> u32 {
    ((capacity as u64 * 4) / 5) as u32
}

/// Derives tier and price for a seat from the screen capacity.
///
/// # Errors
///
/// Returns [`BookingError::SeatOutOfRange`] if `seat` is outside `1..=capacity`.
pub fn tier_and_price(
    seat: SeatNumber,
    capacity: u32,
    normal_price: Money,
    vip_price: Money,
) -> Result<(Tier, Money), BookingError> {
    classify(seat, capacity, tier_boundary(capacity), normal_price, vip_price)
}

fn classify(
    seat: SeatNumber,
    capacity: u32,
    boundary: u32,
    normal_price: Money,
    vip_price: Money,
) -> Result<(Tier, Money), BookingError> {
    if seat.get() == 0 || seat.get() > capacity {
        return Err(BookingError::SeatOutOfRange { seat, capacity });
    }
    if seat.get() <= boundary {
        Ok((Tier::Normal, normal_price))
    } else {
        Ok((Tier::Vip, vip_price))
    }
}

/// Seat layout and prices captured for one showtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatMap {
    capacity: u32,
    tier_boundary: u32,
    normal_price: Money,
    vip_price: Money,
}

impl SeatMap {
    /// Creates a seat map, computing the tier boundary from `capacity`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidShowtime`] if capacity is zero or a price is zero.
    pub fn new(capacity: u32, normal_price: Money, vip_price: Money) -> Result<Self, BookingError> {
        Self::with_boundary(capacity, tier_boundary(capacity), normal_price, vip_price)
    }

    /// Restores a seat map whose boundary was computed earlier.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::InvalidShowtime`] if the parts are inconsistent.
    pub fn with_boundary(
        capacity: u32,
        tier_boundary: u32,
        normal_price: Money,
        vip_price: Money,
    ) -> Result<Self, BookingError> {
        if capacity == 0 {
            return Err(BookingError::InvalidShowtime(
                "capacity must be at least 1".to_string(),
            ));
        }
        if tier_boundary > capacity {
            return Err(BookingError::InvalidShowtime(format!(
                "tier boundary {tier_boundary} exceeds capacity {capacity}"
            )));
        }
        if normal_price.is_zero() || vip_price.is_zero() {
            return Err(BookingError::InvalidShowtime(
                "ticket prices must be positive".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            tier_boundary,
            normal_price,
            vip_price,
        })
    }

    /// Number of seats
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Last Normal-tier seat
    #[must_use]
    pub const fn tier_boundary(&self) -> u32 {
        self.tier_boundary
    }

    /// Normal-tier ticket price
    #[must_use]
    pub const fn normal_price(&self) -> Money {
        self.normal_price
    }

    /// VIP-tier ticket price
    #[must_use]
    pub const fn vip_price(&self) -> Money {
        self.vip_price
    }

    /// Tier and price for `seat` using the stored boundary.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::SeatOutOfRange`] if `seat` is outside `1..=capacity`.
    pub fn tier_and_price(&self, seat: SeatNumber) -> Result<(Tier, Money), BookingError> {
        classify(
            seat,
            self.capacity,
            self.tier_boundary,
            self.normal_price,
            self.vip_price,
        )
    }

    /// All seat numbers in ascending order
    pub fn seats(&self) -> impl Iterator<Item = SeatNumber> {
        (1..=self.capacity).map(SeatNumber::new)
    }
}
