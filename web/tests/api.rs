//! HTTP API over the in-memory box office.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use boxoffice_core::types::{GatewayPaymentId, OrderId, ShowtimeId, UserId};
use boxoffice_testing::fixtures::Harness;
use boxoffice_testing::gateway::StubGateway;
use boxoffice_web::{AppState, build_router};
use chrono::Duration;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn app() -> (Harness, Router) {
    let harness = Harness::new().await;
    let state = AppState::new(harness.coordinator.clone()).with_checkout_key("rzp_test_key");
    let router = build_router(state);
    (harness, router)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    };
    (status, value)
}

fn hold_body(user_id: UserId, seats: &[u32]) -> Value {
    json!({
        "user_id": user_id,
        "email": "guest@example.com",
        "name": "Guest",
        "seats": seats,
    })
}

/// Places a hold and creates its order; returns (token, order_id).
async fn hold_and_order(h: &Harness, app: &Router, user_id: UserId, seats: &[u32]) -> (String, String) {
    let uri = format!("/api/showtimes/{}/holds", h.showtime.id);
    let (status, hold) = send(app, Method::POST, &uri, Some(hold_body(user_id, seats))).await;
    assert_eq!(status, StatusCode::CREATED, "{hold}");
    let token = hold["hold_token"].as_str().unwrap().to_string();

    let (status, order) = send(app, Method::POST, &format!("/api/holds/{token}/order"), None).await;
    assert_eq!(status, StatusCode::OK, "{order}");
    (token, order["order_id"].as_str().unwrap().to_string())
}

fn proof(order_id: &str, payment_id: &str) -> Value {
    let signature = StubGateway::sign(&OrderId::new(order_id), &GatewayPaymentId::new(payment_id));
    json!({"order_id": order_id, "payment_id": payment_id, "signature": signature})
}

#[tokio::test]
async fn test_health() {
    let (_h, app) = app().await;
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_checkout_flow() {
    let (h, app) = app().await;
    let user_id = UserId::new();

    let uri = format!("/api/showtimes/{}/holds", h.showtime.id);
    let (status, hold) = send(&app, Method::POST, &uri, Some(hold_body(user_id, &[1, 2, 3]))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(hold["quote"]["subtotal"], 600);
    assert_eq!(hold["quote"]["convenience_fee"], 30);
    assert_eq!(hold["quote"]["total"], 630);
    let token = hold["hold_token"].as_str().unwrap().to_string();

    let (status, order) = send(&app, Method::POST, &format!("/api/holds/{token}/order"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["amount_minor_units"], 63_000);
    assert_eq!(order["currency"], "INR");
    assert_eq!(order["key_id"], "rzp_test_key");
    let order_id = order["order_id"].as_str().unwrap();

    let commit_uri = format!("/api/holds/{token}/commit");
    let payment = proof(order_id, "pay_web_1");
    let (status, booking) = send(&app, Method::POST, &commit_uri, Some(payment.clone())).await;
    assert_eq!(status, StatusCode::CREATED, "{booking}");
    assert_eq!(booking["status"], "confirmed");
    assert_eq!(booking["total_amount"], 630);

    // Retried proof returns the same booking.
    let (status, replay) = send(&app, Method::POST, &commit_uri, Some(payment)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["id"], booking["id"]);

    let uri = format!("/api/showtimes/{}/availability", h.showtime.id);
    let (status, availability) = send(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(availability["capacity"], 60);
    assert_eq!(availability["tier_boundary"], 48);
    let booked: Vec<u64> = availability["seats"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|seat| seat["state"] == "BOOKED")
        .map(|seat| seat["seat_number"].as_u64().unwrap())
        .collect();
    assert_eq!(booked, vec![1, 2, 3]);

    let booking_id = booking["id"].as_str().unwrap();
    let (status, fetched) = send(&app, Method::GET, &format!("/api/bookings/{booking_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], booking["id"]);

    let (status, mine) = send(&app, Method::GET, &format!("/api/users/{user_id}/bookings"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mine.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_conflicting_hold_is_409() {
    let (h, app) = app().await;
    hold_and_order(&h, &app, UserId::new(), &[10, 11]).await;

    let uri = format!("/api/showtimes/{}/holds", h.showtime.id);
    let (status, body) = send(&app, Method::POST, &uri, Some(hold_body(UserId::new(), &[11, 12]))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "SEAT_CONFLICT");
    assert!(body["message"].as_str().unwrap().contains("11"));
}

#[tokio::test]
async fn test_forged_signature_is_rejected() {
    let (h, app) = app().await;
    let (token, order_id) = hold_and_order(&h, &app, UserId::new(), &[7]).await;

    let forged = json!({"order_id": order_id, "payment_id": "pay_x", "signature": "deadbeef"});
    let (status, body) = send(&app, Method::POST, &format!("/api/holds/{token}/commit"), Some(forged)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "SIGNATURE_INVALID");
    assert!(h.store.all_bookings().is_empty());
}

#[tokio::test]
async fn test_expired_hold_is_gone() {
    let (h, app) = app().await;
    let (token, order_id) = hold_and_order(&h, &app, UserId::new(), &[8]).await;
    h.advance(Duration::seconds(601));

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/holds/{token}/commit"),
        Some(proof(&order_id, "pay_late")),
    )
    .await;
    assert_eq!(status, StatusCode::GONE);
    assert_eq!(body["code"], "HOLD_EXPIRED");
}

#[tokio::test]
async fn test_release_then_commit_is_404() {
    let (h, app) = app().await;
    let (token, order_id) = hold_and_order(&h, &app, UserId::new(), &[9]).await;

    let (status, _) = send(&app, Method::DELETE, &format!("/api/holds/{token}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, &format!("/api/holds/{token}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(
        &app,
        Method::POST,
        &format!("/api/holds/{token}/commit"),
        Some(proof(&order_id, "pay_released")),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "HOLD_NOT_FOUND");
}

#[tokio::test]
async fn test_quote_and_offers() {
    let (h, app) = app().await;
    h.store
        .put_offer(boxoffice_testing::fixtures::percent_offer("SAVE20", 20, Some(100)));
    let uri = format!("/api/showtimes/{}/quote", h.showtime.id);

    let (status, quote) = send(&app, Method::POST, &uri, Some(json!({"seats": [1, 2, 3]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["total"], 630);
    assert_eq!(quote["offer_rejection"], Value::Null);

    let (status, quote) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({"seats": [1, 2, 3], "offer_code": "save20"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(quote["discount"], 100);
    assert_eq!(quote["total"], 530);

    let (status, body) = send(
        &app,
        Method::POST,
        &uri,
        Some(json!({"seats": [1], "offer_code": "BOGUS"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "OFFER_INVALID");

    let offers_uri = format!("/api/showtimes/{}/offers", h.showtime.id);
    let (status, offers) = send(&app, Method::POST, &offers_uri, Some(json!({"seats": [1, 2, 3]}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(offers.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_hold_absorbs_unknown_offer() {
    let (h, app) = app().await;
    let uri = format!("/api/showtimes/{}/holds", h.showtime.id);
    let mut body = hold_body(UserId::new(), &[4]);
    body["offer_code"] = json!("BOGUS");

    let (status, hold) = send(&app, Method::POST, &uri, Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(hold["quote"]["discount"], 0);
    assert_eq!(hold["quote"]["offer_rejection"], "offer code not found");
}

#[tokio::test]
async fn test_invalid_requests() {
    let (h, app) = app().await;
    let uri = format!("/api/showtimes/{}/holds", h.showtime.id);

    let (status, body) = send(&app, Method::POST, &uri, Some(hold_body(UserId::new(), &[61]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "SEAT_OUT_OF_RANGE");

    let mut no_email = hold_body(UserId::new(), &[1]);
    no_email["email"] = json!("");
    let (status, body) = send(&app, Method::POST, &uri, Some(no_email)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let unknown = format!("/api/showtimes/{}/availability", ShowtimeId::new());
    let (status, body) = send(&app, Method::GET, &unknown, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "SHOWTIME_NOT_FOUND");
}

#[tokio::test]
async fn test_out_of_range_ttl_is_rejected() {
    let (h, app) = app().await;
    let uri = format!("/api/showtimes/{}/holds", h.showtime.id);

    let mut huge = hold_body(UserId::new(), &[1]);
    huge["ttl_secs"] = json!(i64::MAX);
    let (status, body) = send(&app, Method::POST, &uri, Some(huge)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");

    let mut long = hold_body(UserId::new(), &[1]);
    long["ttl_secs"] = json!(100_000);
    let (status, body) = send(&app, Method::POST, &uri, Some(long)).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
}

#[tokio::test]
async fn test_cancellation_rules() {
    let (h, app) = app().await;
    let owner = UserId::new();
    let (token, order_id) = hold_and_order(&h, &app, owner, &[30]).await;
    let (_, booking) = send(
        &app,
        Method::POST,
        &format!("/api/holds/{token}/commit"),
        Some(proof(&order_id, "pay_cancel")),
    )
    .await;
    let cancel_uri = format!("/api/bookings/{}/cancel", booking["id"].as_str().unwrap());

    let (status, body) = send(&app, Method::POST, &cancel_uri, Some(json!({"user_id": UserId::new()}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "NOT_PERMITTED");

    let (status, cancelled) = send(&app, Method::POST, &cancel_uri, Some(json!({"user_id": owner}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["status"], "cancelled");

    let (status, body) = send(
        &app,
        Method::POST,
        &cancel_uri,
        Some(json!({"user_id": UserId::new(), "role": "admin"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "ALREADY_CANCELLED");
}
