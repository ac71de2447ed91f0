//! Seat map, pricing and hold endpoints for one showtime.
//!
//! - `GET  /api/showtimes/:id/availability`
//! - `POST /api/showtimes/:id/quote`
//! - `POST /api/showtimes/:id/offers`
//! - `POST /api/showtimes/:id/holds`

use crate::WebResult;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use boxoffice_core::offer::ApplicableOffer;
use boxoffice_core::pricing::Quote;
use boxoffice_core::types::{
    BookingSeat, HoldToken, Money, Recipient, SeatNumber, ShowtimeId, UserId,
};
use boxoffice_runtime::{Availability, HoldRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Priced seat selection as returned to clients.
#[derive(Debug, Serialize)]
pub struct QuoteView {
    /// Seat lines, ascending
    pub lines: Vec<BookingSeat>,
    /// Sum of seat prices
    pub subtotal: Money,
    /// Convenience fee
    pub convenience_fee: Money,
    /// Subtotal plus fee
    pub gross: Money,
    /// Discount applied
    pub discount: Money,
    /// Amount payable
    pub total: Money,
    /// Offer code applied
    pub offer_code: Option<String>,
    /// Why a supplied offer code was not applied
    pub offer_rejection: Option<String>,
}

impl From<Quote> for QuoteView {
    fn from(quote: Quote) -> Self {
        Self {
            lines: quote.lines,
            subtotal: quote.subtotal,
            convenience_fee: quote.convenience_fee,
            gross: quote.gross,
            discount: quote.discount,
            total: quote.total,
            offer_code: quote.offer_code,
            offer_rejection: quote.offer_rejection.map(|r| r.to_string()),
        }
    }
}

/// Body of a quote request.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    /// Seats to price
    pub seats: Vec<SeatNumber>,
    /// Offer code to apply
    #[serde(default)]
    pub offer_code: Option<String>,
}

/// Body of an applicable-offers request.
#[derive(Debug, Deserialize)]
pub struct OffersRequest {
    /// Seats the offers are evaluated against
    pub seats: Vec<SeatNumber>,
}

/// Body of a hold request.
#[derive(Debug, Deserialize)]
pub struct CreateHoldRequest {
    /// Customer placing the hold
    pub user_id: UserId,
    /// Where the confirmation goes
    pub email: String,
    /// Customer name for the confirmation
    #[serde(default)]
    pub name: Option<String>,
    /// Seats to hold
    pub seats: Vec<SeatNumber>,
    /// Offer code to apply
    #[serde(default)]
    pub offer_code: Option<String>,
    /// Requested hold lifetime, clamped by the server
    #[serde(default)]
    pub ttl_secs: Option<i64>,
}

/// A placed hold.
#[derive(Debug, Serialize)]
pub struct HoldView {
    /// Token for the order, commit and release calls
    pub hold_token: HoldToken,
    /// Showtime held
    pub showtime_id: ShowtimeId,
    /// When the seats are released unless committed
    pub expires_at: DateTime<Utc>,
    /// Price of the held seats
    pub quote: QuoteView,
}

/// Seat map with live seat states.
///
/// ```bash
/// curl http://localhost:8080/api/showtimes/550e8400-e29b-41d4-a716-446655440000/availability
/// ```
pub async fn get_availability(
    Path(showtime_id): Path<ShowtimeId>,
    State(state): State<AppState>,
) -> WebResult<Json<Availability>> {
    let availability = state.coordinator.get_availability(showtime_id).await?;
    Ok(Json(availability))
}

/// Prices a selection without holding it. A rejected offer code fails
/// the request so the client can re-prompt.
pub async fn quote(
    Path(showtime_id): Path<ShowtimeId>,
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> WebResult<Json<QuoteView>> {
    let quote = state
        .coordinator
        .quote(showtime_id, &request.seats, request.offer_code.as_deref())
        .await?;
    Ok(Json(quote.into()))
}

/// Offers valid for a selection, largest discount first.
pub async fn applicable_offers(
    Path(showtime_id): Path<ShowtimeId>,
    State(state): State<AppState>,
    Json(request): Json<OffersRequest>,
) -> WebResult<Json<Vec<ApplicableOffer>>> {
    let offers = state
        .coordinator
        .applicable_offers(showtime_id, &request.seats)
        .await?;
    Ok(Json(offers))
}

/// Holds seats for checkout.
///
/// Returns 201 with the hold token, or 409 naming every conflicting seat.
pub async fn create_hold(
    Path(showtime_id): Path<ShowtimeId>,
    State(state): State<AppState>,
    Json(request): Json<CreateHoldRequest>,
) -> WebResult<(StatusCode, Json<HoldView>)> {
    let email = request.email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::bad_request("A valid email address is required"));
    }

    let ttl = match request.ttl_secs {
        Some(secs) => Some(
            chrono::Duration::try_seconds(secs)
                .ok_or_else(|| AppError::bad_request("ttl_secs is out of range"))?,
        ),
        None => None,
    };

    let receipt = state
        .coordinator
        .create_hold(HoldRequest {
            showtime_id,
            user_id: request.user_id,
            recipient: Recipient {
                email: email.to_string(),
                name: request.name,
            },
            seats: request.seats,
            offer_code: request.offer_code,
            ttl,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(HoldView {
            hold_token: receipt.token,
            showtime_id: receipt.showtime_id,
            expires_at: receipt.expires_at,
            quote: receipt.quote.into(),
        }),
    ))
}
