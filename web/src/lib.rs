//! HTTP surface for the box office.
//!
//! Thin axum handlers over [`ReservationCoordinator`](boxoffice_runtime::ReservationCoordinator):
//! each handler parses the request, makes one coordinator call and maps the
//! result (or its [`BookingError`](boxoffice_core::error::BookingError)) onto
//! a JSON response.
//!
//! # Example
//!
//! ```ignore
//! use boxoffice_web::{AppState, build_router};
//!
//! let app = build_router(AppState::new(coordinator));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::Config;
pub use error::AppError;
pub use routes::build_router;
pub use state::AppState;

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
