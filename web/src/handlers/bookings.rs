//! Booking lookup and cancellation.

use crate::WebResult;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use boxoffice_core::types::{Actor, Booking, BookingId, Role, UserId};
use serde::Deserialize;

/// Who is cancelling.
#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    /// Acting user
    pub user_id: UserId,
    /// Role resolved by the caller
    #[serde(default = "customer")]
    pub role: Role,
}

const fn customer() -> Role {
    Role::Customer
}

/// One booking.
pub async fn get_booking(
    Path(booking_id): Path<BookingId>,
    State(state): State<AppState>,
) -> WebResult<Json<Booking>> {
    Ok(Json(state.coordinator.find_booking(booking_id).await?))
}

/// A user's bookings, newest first.
pub async fn user_bookings(
    Path(user_id): Path<UserId>,
    State(state): State<AppState>,
) -> WebResult<Json<Vec<Booking>>> {
    Ok(Json(state.coordinator.bookings_for_user(user_id).await?))
}

/// Cancels a booking and frees its seats.
pub async fn cancel_booking(
    Path(booking_id): Path<BookingId>,
    State(state): State<AppState>,
    Json(request): Json<CancelRequest>,
) -> WebResult<Json<Booking>> {
    let actor = Actor {
        user_id: request.user_id,
        role: request.role,
    };
    Ok(Json(state.coordinator.cancel_booking(booking_id, actor).await?))
}
