//! Error types for web handlers.
//!
//! Bridges [`BookingError`] onto HTTP responses with a stable error code
//! and a JSON body `{"code": ..., "message": ...}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use boxoffice_core::error::{BookingError, GatewayError, StoreError};
use serde::Serialize;
use std::fmt;

/// Application error type for web handlers.
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Error message (user-facing)
    message: String,
    /// Error code (for client error handling)
    code: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub const fn new(status: StatusCode, message: String, code: String) -> Self {
        Self {
            status,
            message,
            code,
            source: None,
        }
    }

    fn coded(status: StatusCode, code: &str, message: impl Into<String>) -> Self {
        Self::new(status, message.into(), code.to_string())
    }

    /// Create a new error with a source error.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::coded(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::coded(
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{resource} with id {id} not found"),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::coded(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR", message)
    }

    /// Create a 503 Service Unavailable error.
    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::coded(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
    }

    /// HTTP status
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Stable error code
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error code (for client error handling).
    code: String,
    /// Human-readable error message.
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    code = %self.code,
                    message = %self.message,
                    "Internal server error"
                );
            }
        }

        let body = ErrorResponse {
            code: self.code,
            message: self.message,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        let (status, code) = match &err {
            BookingError::SeatOutOfRange { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "SEAT_OUT_OF_RANGE")
            }
            BookingError::EmptySelection => (StatusCode::UNPROCESSABLE_ENTITY, "EMPTY_SELECTION"),
            BookingError::DuplicateSeat(_) => (StatusCode::UNPROCESSABLE_ENTITY, "DUPLICATE_SEAT"),
            BookingError::InvalidShowtime(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_SHOWTIME")
            }
            BookingError::OfferInvalid(_) => (StatusCode::UNPROCESSABLE_ENTITY, "OFFER_INVALID"),
            BookingError::SeatConflict { .. } => (StatusCode::CONFLICT, "SEAT_CONFLICT"),
            BookingError::ShowtimeInactive => (StatusCode::CONFLICT, "SHOWTIME_INACTIVE"),
            BookingError::AlreadyCancelled => (StatusCode::CONFLICT, "ALREADY_CANCELLED"),
            BookingError::HoldExpired => (StatusCode::GONE, "HOLD_EXPIRED"),
            BookingError::HoldNotFound => (StatusCode::NOT_FOUND, "HOLD_NOT_FOUND"),
            BookingError::ShowtimeNotFound => (StatusCode::NOT_FOUND, "SHOWTIME_NOT_FOUND"),
            BookingError::BookingNotFound => (StatusCode::NOT_FOUND, "BOOKING_NOT_FOUND"),
            BookingError::SignatureInvalid | BookingError::Gateway(GatewayError::SignatureInvalid) => {
                (StatusCode::BAD_REQUEST, "SIGNATURE_INVALID")
            }
            BookingError::OrderMismatch => (StatusCode::BAD_REQUEST, "ORDER_MISMATCH"),
            BookingError::NotPermitted => (StatusCode::FORBIDDEN, "NOT_PERMITTED"),
            BookingError::Gateway(GatewayError::Unavailable(_))
            | BookingError::Storage(StoreError::Unavailable(_)) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            BookingError::Gateway(GatewayError::Rejected { .. }) => {
                (StatusCode::BAD_GATEWAY, "PAYMENT_GATEWAY_REJECTED")
            }
            BookingError::Gateway(GatewayError::Misconfigured(_)) | BookingError::Storage(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_SERVER_ERROR")
            }
        };

        if status.is_server_error() {
            Self::coded(status, code, "The request could not be completed")
                .with_source(anyhow::Error::new(err))
        } else {
            Self::coded(status, code, message)
        }
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal("An internal error occurred").with_source(err)
    }
}
