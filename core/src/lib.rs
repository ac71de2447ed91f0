//! # Boxoffice Core
//!
//! Domain types and pure logic for the seat inventory and booking core.
//!
//! This crate guarantees, at the model level, that a seat for a showtime
//! is claimed by at most one live hold or one confirmed booking at a time.
//! It performs no I/O: persistence, payment verification and notification
//! are collaborator traits implemented elsewhere and injected into the
//! coordinator in `boxoffice-runtime`.
//!
//! ## Modules
//!
//! - [`seat_map`]: tier boundary and per-seat price
//! - [`pricing`]: subtotal, convenience fee and discount arithmetic
//! - [`offer`]: offer-code validity and applicability rules
//! - [`board`]: the per-showtime `FREE → HELD → BOOKED` state machine,
//!   driven as a [`reducer::Reducer`] over board actions
//! - [`reducer`], [`effect`]: the reducer trait and effect descriptions
//! - [`error`]: the error taxonomy surfaced to callers
//! - [`environment`], [`inventory`], [`ledger`], [`catalog`], [`payment`],
//!   [`notification`]: collaborator traits
//!
//! ## Example
//!
//! ```
//! use boxoffice_core::pricing::PricingPolicy;
//! use boxoffice_core::seat_map::SeatMap;
//! use boxoffice_core::types::{Money, SeatNumber};
//!
//! let map = SeatMap::new(60, Money::new(200), Money::new(300))?;
//! let seats = [SeatNumber::new(1), SeatNumber::new(2), SeatNumber::new(3)];
//! let quote = PricingPolicy::default().price(&map, &seats)?;
//! assert_eq!(quote.total, Money::new(630));
//! # Ok::<(), boxoffice_core::error::BookingError>(())
//! ```

pub mod board;
pub mod catalog;
pub mod effect;
pub mod environment;
pub mod error;
pub mod inventory;
pub mod ledger;
pub mod notification;
pub mod offer;
pub mod payment;
pub mod pricing;
pub mod reducer;
pub mod seat_map;
pub mod types;

pub use error::{BookingError, GatewayError, OfferRejection, StoreError};
