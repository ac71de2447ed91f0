//! HTTP request handlers.
//!
//! This module contains all HTTP handlers organized by resource.

pub mod bookings;
pub mod health;
pub mod holds;
pub mod showtimes;

pub use health::health_check;
