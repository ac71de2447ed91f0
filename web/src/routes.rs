//! Router configuration.

use crate::handlers::{bookings, health::health_check, holds, showtimes};
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Seat map and checkout
        .route(
            "/showtimes/:id/availability",
            get(showtimes::get_availability),
        )
        .route("/showtimes/:id/quote", post(showtimes::quote))
        .route("/showtimes/:id/offers", post(showtimes::applicable_offers))
        .route("/showtimes/:id/holds", post(showtimes::create_hold))
        // Holds
        .route("/holds/:token", delete(holds::release_hold))
        .route("/holds/:token/order", post(holds::create_order))
        .route("/holds/:token/commit", post(holds::commit_hold))
        // Bookings
        .route("/bookings/:id", get(bookings::get_booking))
        .route("/bookings/:id/cancel", post(bookings::cancel_booking))
        .route("/users/:id/bookings", get(bookings::user_bookings));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
