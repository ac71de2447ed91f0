//! Offer codes: applicability rules, validity and discount arithmetic.
//!
//! Offers are read-only from the booking core's perspective. The only
//! write is [`OfferService::increment_usage`], which runs after a commit
//! and whose failure never affects the booking.

use crate::error::{OfferRejection, StoreError};
use crate::types::{Money, MovieId, TheatreId};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// How an offer reduces the price
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscountKind {
    /// Percentage of the amount, optionally capped
    Percentage {
        /// Percent in `1..=100`
        percent: u32,
        /// Maximum discount; `None` means uncapped
        max_discount: Option<Money>,
    },
    /// Fixed amount off, never more than the ticket subtotal
    Fixed {
        /// Amount off
        amount: Money,
    },
}

/// Which showtimes an offer covers
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "applicable_to", rename_all = "snake_case")]
pub enum OfferScope {
    /// Every showtime
    All,
    /// Showtimes in one theatre
    Theatre {
        /// Theatre covered
        theatre: TheatreId,
    },
    /// Showtimes in any of several theatres
    Theatres {
        /// Theatres covered
        theatres: Vec<TheatreId>,
    },
    /// Showtimes of specific movies, in any theatre
    Movies {
        /// Movies covered
        movies: Vec<MovieId>,
    },
    /// Specific movies in one theatre
    TheatreMovies {
        /// Theatre covered
        theatre: TheatreId,
        /// Movies covered in that theatre
        movies: Vec<MovieId>,
    },
}

impl OfferScope {
    /// Whether the scope covers the given theatre and movie
    #[must_use]
    pub fn covers(&self, theatre_id: TheatreId, movie_id: MovieId) -> bool {
        match self {
            Self::All => true,
            Self::Theatre { theatre } => *theatre == theatre_id,
            Self::Theatres { theatres } => theatres.contains(&theatre_id),
            Self::Movies { movies } => movies.contains(&movie_id),
            Self::TheatreMovies { theatre, movies } => {
                *theatre == theatre_id && movies.contains(&movie_id)
            }
        }
    }
}

/// A discount code
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    /// Code customers type in (stored upper-case)
    pub code: String,
    /// Human-readable description
    pub description: String,
    /// Discount arithmetic
    pub kind: DiscountKind,
    /// Minimum amount (subtotal + fee) for the offer to apply
    pub min_purchase: Money,
    /// Maximum redemptions; 0 means unlimited
    pub usage_limit: u32,
    /// Redemptions so far
    pub usage_count: u32,
    /// First valid day (inclusive)
    pub valid_from: NaiveDate,
    /// Last valid day (inclusive)
    pub valid_until: NaiveDate,
    /// Applicability rule
    pub scope: OfferScope,
    /// Whether the offer is switched on
    pub active: bool,
}

/// The checkout an offer is evaluated against
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OfferContext {
    /// Theatre of the showtime
    pub theatre_id: TheatreId,
    /// Movie of the showtime
    pub movie_id: MovieId,
    /// Today's date
    pub today: NaiveDate,
    /// Sum of seat prices
    pub subtotal: Money,
    /// Subtotal plus convenience fee
    pub gross: Money,
}

/// Canonical form of a user-entered code
#[must_use]
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

impl Offer {
    /// Checks validity in order and computes the discount.
    ///
    /// The first failing rule decides the rejection: active, start date,
    /// end date, usage limit, minimum purchase, then scope.
    ///
    /// # Errors
    ///
    /// Returns the [`OfferRejection`] of the first failing rule.
    pub fn evaluate(&self, context: &OfferContext) -> Result<Money, OfferRejection> {
        if !self.active {
            return Err(OfferRejection::Inactive);
        }
        if context.today < self.valid_from {
            return Err(OfferRejection::NotYetValid(self.valid_from));
        }
        if context.today > self.valid_until {
            return Err(OfferRejection::Expired(self.valid_until));
        }
        if self.usage_limit > 0 && self.usage_count >= self.usage_limit {
            return Err(OfferRejection::UsageExhausted);
        }
        if context.gross < self.min_purchase {
            return Err(OfferRejection::BelowMinimum {
                required: self.min_purchase,
            });
        }
        if !self.scope.covers(context.theatre_id, context.movie_id) {
            return Err(OfferRejection::NotApplicable);
        }
        Ok(self.discount_for(context))
    }

    fn discount_for(&self, context: &OfferContext) -> Money {
        let discount = match &self.kind {
            DiscountKind::Percentage {
                percent,
                max_discount,
            } => {
                let raw = context.gross.percent((*percent).min(100));
                match max_discount {
                    Some(cap) if !cap.is_zero() => raw.min(*cap),
                    _ => raw,
                }
            }
            DiscountKind::Fixed { amount } => (*amount).min(context.subtotal),
        };
        discount.min(context.gross)
    }
}

/// An offer that applies to a checkout, with the discount it would give
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicableOffer {
    /// The offer
    pub offer: Offer,
    /// Discount it gives on this checkout
    pub discount: Money,
}

/// Offers valid for the checkout, largest discount first.
#[must_use]
pub fn applicable_offers(offers: &[Offer], context: &OfferContext) -> Vec<ApplicableOffer> {
    let mut applicable: Vec<ApplicableOffer> = offers
        .iter()
        .filter_map(|offer| {
            offer.evaluate(context).ok().map(|discount| ApplicableOffer {
                offer: offer.clone(),
                discount,
            })
        })
        .collect();
    applicable.sort_by(|a, b| {
        b.discount
            .cmp(&a.discount)
            .then_with(|| a.offer.code.cmp(&b.offer.code))
    });
    applicable
}

/// Offer lookup and usage accounting.
pub trait OfferService: Send + Sync {
    /// Looks up an offer by (normalized) code.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the offer store cannot be read.
    fn lookup(&self, code: &str) -> BoxFuture<'_, Result<Option<Offer>, StoreError>>;

    /// Records one redemption.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the counter cannot be updated.
    fn increment_usage(&self, code: &str) -> BoxFuture<'_, Result<(), StoreError>>;

    /// Returns every active offer.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the offer store cannot be read.
    fn list_offers(&self) -> BoxFuture<'_, Result<Vec<Offer>, StoreError>>;
}
