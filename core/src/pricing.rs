//! Checkout price computation.
//!
//! `subtotal = Σ seat price`, `fee = subtotal * fee% (truncated)`,
//! `total = subtotal + fee - discount`, never negative.

use crate::error::{BookingError, OfferRejection};
use crate::offer::OfferContext;
use crate::seat_map::SeatMap;
use crate::types::{BookingSeat, Money, SeatNumber, Showtime};
use chrono::NaiveDate;
use std::collections::BTreeSet;

/// Default convenience fee
pub const DEFAULT_CONVENIENCE_FEE_PERCENT: u32 = 5;

/// Fee settings applied to every checkout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricingPolicy {
    /// Convenience fee as a percentage of the subtotal
    pub convenience_fee_percent: u32,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            convenience_fee_percent: DEFAULT_CONVENIENCE_FEE_PERCENT,
        }
    }
}

/// Priced seat selection, with or without an offer applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    /// Per-seat tier and price, ascending by seat number
    pub lines: Vec<BookingSeat>,
    /// Sum of seat prices
    pub subtotal: Money,
    /// Convenience fee
    pub convenience_fee: Money,
    /// `subtotal + convenience_fee`
    pub gross: Money,
    /// Discount applied
    pub discount: Money,
    /// Amount to charge
    pub total: Money,
    /// Code of the applied offer
    pub offer_code: Option<String>,
    /// Why a supplied code was not applied
    pub offer_rejection: Option<OfferRejection>,
}

/// Checks a seat selection and returns it sorted.
///
/// # Errors
///
/// - [`BookingError::EmptySelection`] if `seats` is empty
/// - [`BookingError::DuplicateSeat`] if a seat appears twice
/// - [`BookingError::SeatOutOfRange`] if a seat is outside the screen
pub fn validate_selection(map: &SeatMap, seats: &[SeatNumber]) -> Result<Vec<SeatNumber>, BookingError> {
    if seats.is_empty() {
        return Err(BookingError::EmptySelection);
    }
    let mut unique = BTreeSet::new();
    for seat in seats {
        map.tier_and_price(*seat)?;
        if !unique.insert(*seat) {
            return Err(BookingError::DuplicateSeat(*seat));
        }
    }
    Ok(unique.into_iter().collect())
}

impl PricingPolicy {
    /// Prices a seat selection without any discount.
    ///
    /// # Errors
    ///
    /// See [`validate_selection`].
    pub fn price(&self, map: &SeatMap, seats: &[SeatNumber]) -> Result<Quote, BookingError> {
        let sorted = validate_selection(map, seats)?;
        let lines = sorted
            .into_iter()
            .map(|seat_number| {
                map.tier_and_price(seat_number)
                    .map(|(tier, price)| BookingSeat {
                        seat_number,
                        tier,
                        price,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let subtotal: Money = lines.iter().map(|line| line.price).sum();
        let convenience_fee = subtotal.percent(self.convenience_fee_percent);
        let gross = subtotal.saturating_add(convenience_fee);

        Ok(Quote {
            lines,
            subtotal,
            convenience_fee,
            gross,
            discount: Money::ZERO,
            total: gross,
            offer_code: None,
            offer_rejection: None,
        })
    }
}

impl Quote {
    /// Context for evaluating an offer against this quote
    #[must_use]
    pub const fn offer_context(&self, showtime: &Showtime, today: NaiveDate) -> OfferContext {
        OfferContext {
            theatre_id: showtime.theatre_id,
            movie_id: showtime.movie_id,
            today,
            subtotal: self.subtotal,
            gross: self.gross,
        }
    }

    /// Applies a validated discount
    #[must_use]
    pub fn with_discount(mut self, code: String, discount: Money) -> Self {
        self.discount = discount.min(self.gross);
        self.total = self.gross.saturating_sub(self.discount);
        self.offer_code = Some(code);
        self.offer_rejection = None;
        self
    }

    /// Records that a supplied code was not applied
    #[must_use]
    pub fn with_rejection(mut self, rejection: OfferRejection) -> Self {
        self.discount = Money::ZERO;
        self.total = self.gross;
        self.offer_code = None;
        self.offer_rejection = Some(rejection);
        self
    }

    /// Seat numbers in ascending order
    #[must_use]
    pub fn seat_numbers(&self) -> Vec<SeatNumber> {
        self.lines.iter().map(|line| line.seat_number).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::types::Tier;
    use proptest::prelude::*;

    fn screen() -> SeatMap {
        SeatMap::new(60, Money::new(200), Money::new(300)).unwrap()
    }

    fn seats(numbers: &[u32]) -> Vec<SeatNumber> {
        numbers.iter().copied().map(SeatNumber::new).collect()
    }

    #[test]
    fn three_normal_seats() {
        let quote = PricingPolicy::default()
            .price(&screen(), &seats(&[1, 2, 3]))
            .unwrap();
        assert_eq!(quote.subtotal, Money::new(600));
        assert_eq!(quote.convenience_fee, Money::new(30));
        assert_eq!(quote.total, Money::new(630));
    }

    #[test]
    fn discount_capped_example() {
        let quote = PricingPolicy::default()
            .price(&screen(), &seats(&[1, 2, 3]))
            .unwrap()
            .with_discount("SAVE20".into(), Money::new(100));
        assert_eq!(quote.total, Money::new(530));
        assert_eq!(quote.offer_code.as_deref(), Some("SAVE20"));
    }

    #[test]
    fn mixed_tiers_sorted() {
        let quote = PricingPolicy::default()
            .price(&screen(), &seats(&[49, 48]))
            .unwrap();
        assert_eq!(quote.seat_numbers(), seats(&[48, 49]));
        assert_eq!(quote.lines[0].tier, Tier::Normal);
        assert_eq!(quote.lines[1].tier, Tier::Vip);
        assert_eq!(quote.subtotal, Money::new(500));
        assert_eq!(quote.convenience_fee, Money::new(25));
    }

    #[test]
    fn fee_truncates() {
        let map = SeatMap::new(10, Money::new(199), Money::new(299)).unwrap();
        let quote = PricingPolicy::default().price(&map, &seats(&[1])).unwrap();
        assert_eq!(quote.convenience_fee, Money::new(9));
    }

    #[test]
    fn selection_errors() {
        let policy = PricingPolicy::default();
        assert_eq!(
            policy.price(&screen(), &[]),
            Err(BookingError::EmptySelection)
        );
        assert_eq!(
            policy.price(&screen(), &seats(&[4, 5, 4])),
            Err(BookingError::DuplicateSeat(SeatNumber::new(4)))
        );
        assert!(matches!(
            policy.price(&screen(), &seats(&[61])),
            Err(BookingError::SeatOutOfRange { .. })
        ));
    }

    #[test]
    fn rejection_clears_discount() {
        let quote = PricingPolicy::default()
            .price(&screen(), &seats(&[1]))
            .unwrap()
            .with_discount("X".into(), Money::new(50))
            .with_rejection(OfferRejection::Expired(
                NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            ));
        assert_eq!(quote.discount, Money::ZERO);
        assert_eq!(quote.total, quote.gross);
        assert!(quote.offer_code.is_none());
    }

    proptest! {
        #[test]
        fn pricing_is_deterministic(selection in proptest::collection::btree_set(1u32..=60, 1..20)) {
            let seats: Vec<SeatNumber> = selection.iter().copied().map(SeatNumber::new).collect();
            let mut reversed = seats.clone();
            reversed.reverse();
            let policy = PricingPolicy::default();
            let a = policy.price(&screen(), &seats).unwrap();
            let b = policy.price(&screen(), &reversed).unwrap();
            prop_assert_eq!(&a, &b);
            let expected: u64 = selection.iter().map(|s| if *s <= 48 { 200 } else { 300 }).sum();
            prop_assert_eq!(a.subtotal, Money::new(expected));
            prop_assert_eq!(a.total, Money::new(expected + expected * 5 / 100));
        }
    }
}
