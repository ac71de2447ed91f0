//! Error taxonomy for seat inventory and booking.

use crate::types::{GatewayPaymentId, Money, SeatNumber, format_seats};
use chrono::NaiveDate;
use thiserror::Error;

/// Why an offer code was not applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OfferRejection {
    /// No offer with that code exists
    #[error("offer code not found")]
    NotFound,

    /// Offer has been deactivated
    #[error("offer is not active")]
    Inactive,

    /// Offer window has not started
    #[error("offer is valid from {0}")]
    NotYetValid(NaiveDate),

    /// Offer window has ended
    #[error("offer expired on {0}")]
    Expired(NaiveDate),

    /// Usage limit reached
    #[error("offer usage limit reached")]
    UsageExhausted,

    /// Purchase amount below the offer's minimum
    #[error("minimum purchase of {required} required")]
    BelowMinimum {
        /// Minimum purchase amount
        required: Money,
    },

    /// Offer does not cover this theatre or movie
    #[error("offer is not applicable to this showtime")]
    NotApplicable,

    /// Offer service could not be consulted
    #[error("offers are temporarily unavailable")]
    Unavailable,
}

/// Errors from the durable stores (inventory, ledger, catalog, offers).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Store temporarily unreachable; the operation may be retried
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A seat is already covered by a confirmed booking
    #[error("seats already booked: {}", format_seats(.seats))]
    SeatConflict {
        /// Conflicting seats
        seats: Vec<SeatNumber>,
    },

    /// A payment with this gateway payment id is already recorded
    #[error("payment {payment_id} already recorded")]
    DuplicatePayment {
        /// Gateway payment id
        payment_id: GatewayPaymentId,
    },

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Permanent database failure
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Whether retrying the same operation may succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Errors from the payment gateway adapter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The payment proof's signature does not verify
    #[error("payment signature invalid")]
    SignatureInvalid,

    /// Gateway unreachable or timed out
    #[error("payment gateway unavailable: {0}")]
    Unavailable(String),

    /// Gateway refused the request
    #[error("payment gateway rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status returned by the gateway
        status: u16,
        /// Gateway error description
        message: String,
    },

    /// Adapter configuration is unusable (e.g. empty key)
    #[error("payment gateway misconfigured: {0}")]
    Misconfigured(String),
}

/// Errors from reservation and booking operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BookingError {
    /// Seat number outside `1..=capacity`
    #[error("seat {seat} is outside 1..={capacity}")]
    SeatOutOfRange {
        /// Offending seat
        seat: SeatNumber,
        /// Screen capacity
        capacity: u32,
    },

    /// Seats held or booked by someone else
    #[error("seats {} are already taken", format_seats(.seats))]
    SeatConflict {
        /// Conflicting seats
        seats: Vec<SeatNumber>,
    },

    /// Hold passed its TTL
    #[error("hold has expired")]
    HoldExpired,

    /// Token unknown, released, or swept long ago
    #[error("hold not found")]
    HoldNotFound,

    /// Payment verification failed
    #[error("payment signature invalid")]
    SignatureInvalid,

    /// Offer code rejected
    #[error("offer invalid: {0}")]
    OfferInvalid(OfferRejection),

    /// No seats requested
    #[error("no seats selected")]
    EmptySelection,

    /// Same seat requested twice
    #[error("seat {0} selected more than once")]
    DuplicateSeat(SeatNumber),

    /// Unknown showtime
    #[error("showtime not found")]
    ShowtimeNotFound,

    /// Showtime closed for booking
    #[error("showtime is not open for booking")]
    ShowtimeInactive,

    /// Showtime definition rejected
    #[error("invalid showtime: {0}")]
    InvalidShowtime(String),

    /// Proof refers to an order other than the one created for the hold
    #[error("payment order does not match hold")]
    OrderMismatch,

    /// Unknown booking
    #[error("booking not found")]
    BookingNotFound,

    /// Actor may not act on this booking
    #[error("not permitted")]
    NotPermitted,

    /// Booking was already cancelled
    #[error("booking already cancelled")]
    AlreadyCancelled,

    /// Gateway failure other than an invalid signature
    #[error(transparent)]
    Gateway(GatewayError),

    /// Store failure
    #[error(transparent)]
    Storage(StoreError),
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::SeatConflict { seats } => Self::SeatConflict { seats },
            other => Self::Storage(other),
        }
    }
}

impl From<GatewayError> for BookingError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::SignatureInvalid => Self::SignatureInvalid,
            other => Self::Gateway(other),
        }
    }
}

impl From<OfferRejection> for BookingError {
    fn from(rejection: OfferRejection) -> Self {
        Self::OfferInvalid(rejection)
    }
}

/// Result alias for booking operations
pub type Result<T> = std::result::Result<T, BookingError>;
