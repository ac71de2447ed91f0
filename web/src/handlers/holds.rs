//! Checkout endpoints for a placed hold.

use crate::WebResult;
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use boxoffice_core::payment::PaymentProof;
use boxoffice_core::types::{Booking, HoldToken, OrderId};
use boxoffice_runtime::CommitOutcome;
use serde::Serialize;

/// Gateway order the client pays against.
#[derive(Debug, Serialize)]
pub struct OrderView {
    /// Gateway order id
    pub order_id: OrderId,
    /// Amount in minor units
    pub amount_minor_units: u64,
    /// ISO currency code
    pub currency: String,
    /// Public key for the gateway's checkout widget
    pub key_id: Option<String>,
}

/// Releases a hold. Idempotent.
pub async fn release_hold(
    Path(token): Path<HoldToken>,
    State(state): State<AppState>,
) -> WebResult<StatusCode> {
    state.coordinator.release_hold(token).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Creates (or returns the existing) gateway order for a hold.
pub async fn create_order(
    Path(token): Path<HoldToken>,
    State(state): State<AppState>,
) -> WebResult<Json<OrderView>> {
    let order = state.coordinator.create_order(token).await?;
    Ok(Json(OrderView {
        order_id: order.order_id,
        amount_minor_units: order.amount_minor_units,
        currency: order.currency,
        key_id: state.checkout_key.clone(),
    }))
}

/// Commits a hold with a payment proof.
///
/// 201 with the new booking, 200 with the existing one when the same
/// payment was already committed.
pub async fn commit_hold(
    Path(token): Path<HoldToken>,
    State(state): State<AppState>,
    Json(proof): Json<PaymentProof>,
) -> WebResult<(StatusCode, Json<Booking>)> {
    let outcome = state.coordinator.commit_hold(token, &proof).await?;
    let status = match outcome {
        CommitOutcome::Committed(_) => StatusCode::CREATED,
        CommitOutcome::AlreadyCommitted(_) => StatusCode::OK,
    };
    Ok((status, Json(outcome.into_booking())))
}
