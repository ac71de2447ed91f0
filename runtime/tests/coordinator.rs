//! Reservation coordinator behavior over in-memory collaborators.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use boxoffice_core::catalog::ShowtimeCatalog;
use boxoffice_core::error::{BookingError, OfferRejection};
use boxoffice_core::types::{
    Actor, BookingStatus, Money, SeatState, ShowtimeId, ShowtimeStatus, UserId,
};
use boxoffice_runtime::{CommitOutcome, CoordinatorConfig, RetryPolicy};
use boxoffice_testing::fixtures::{Harness, percent_offer, seats, showtime_60};
use boxoffice_testing::gateway::StubGateway;
use boxoffice_testing::notifier::FailingNotifier;
use chrono::Duration;
use std::sync::Arc;
use std::time::Duration as StdDuration;

#[tokio::test]
async fn hold_then_commit_books_seats() {
    let h = Harness::new().await;
    let request = h.hold_request(&[1, 2, 3]);
    let user_id = request.user_id;
    let (receipt, proof) = h.checkout(request, "pay_1").await.unwrap();

    assert_eq!(receipt.quote.subtotal, Money::new(600));
    assert_eq!(receipt.quote.convenience_fee, Money::new(30));
    assert_eq!(receipt.quote.total, Money::new(630));

    let outcome = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();
    let booking = match outcome {
        CommitOutcome::Committed(booking) => booking,
        CommitOutcome::AlreadyCommitted(_) => panic!("first commit must create a booking"),
    };
    assert_eq!(booking.user_id, user_id);
    assert_eq!(booking.seat_numbers(), seats(&[1, 2, 3]));
    assert_eq!(booking.total_amount, Money::new(630));
    assert_eq!(booking.payment.payment_id.as_str(), "pay_1");
    assert_eq!(booking.payment.currency, "INR");

    let availability = h.coordinator.get_availability(h.showtime.id).await.unwrap();
    assert_eq!(availability.seats_in(SeatState::Booked), seats(&[1, 2, 3]));
    assert_eq!(availability.tier_boundary, 48);

    assert!(h.notifier.wait_for(1, StdDuration::from_secs(1)).await);
    let sent = h.notifier.sent();
    assert_eq!(sent[0].booking_id, booking.id);
    assert_eq!(sent[0].details.seats, seats(&[1, 2, 3]));
}

#[tokio::test]
async fn gateway_order_charged_in_minor_units() {
    let h = Harness::new().await;
    let receipt = h.coordinator.create_hold(h.hold_request(&[49])).await.unwrap();
    let order = h.coordinator.create_order(receipt.token).await.unwrap();

    // 300 + 5% fee = 315 rupees
    assert_eq!(order.amount_minor_units, 31_500);
    assert_eq!(order.currency, "INR");

    let again = h.coordinator.create_order(receipt.token).await.unwrap();
    assert_eq!(again, order);
    assert_eq!(h.gateway.orders_created(), 1);
}

#[tokio::test]
async fn overlapping_hold_names_conflicting_seats() {
    let h = Harness::new().await;
    h.coordinator.create_hold(h.hold_request(&[10, 11, 12])).await.unwrap();

    let result = h.coordinator.create_hold(h.hold_request(&[12, 13, 11])).await;
    assert_eq!(
        result.unwrap_err(),
        BookingError::SeatConflict { seats: seats(&[11, 12]) }
    );

    let availability = h.coordinator.get_availability(h.showtime.id).await.unwrap();
    assert_eq!(availability.seats_in(SeatState::Held), seats(&[10, 11, 12]));
}

#[tokio::test]
async fn booked_seats_conflict_with_new_holds() {
    let h = Harness::new().await;
    let (receipt, proof) = h.checkout(h.hold_request(&[5]), "pay_5").await.unwrap();
    h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();

    let result = h.coordinator.create_hold(h.hold_request(&[4, 5])).await;
    assert_eq!(
        result.unwrap_err(),
        BookingError::SeatConflict { seats: seats(&[5]) }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_holds_on_one_seat_admit_exactly_one() {
    let h = Harness::new().await;
    let attempts = (0..24).map(|_| {
        let coordinator = Arc::clone(&h.coordinator);
        let request = h.hold_request(&[30, 31]);
        tokio::spawn(async move { coordinator.create_hold(request).await })
    });

    let results = futures::future::join_all(attempts).await;
    let placed = results.iter().filter(|r| matches!(r, Ok(Ok(_)))).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(BookingError::SeatConflict { .. }))))
        .count();
    assert_eq!(placed, 1);
    assert_eq!(conflicts, 23);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn adversarial_checkouts_never_double_book() {
    let h = Harness::new().await;
    let selections: Vec<Vec<u32>> = (0..40u32)
        .map(|i| vec![1 + i % 10, 1 + (i * 3) % 10, 1 + (i * 7 + 1) % 10])
        .map(|mut v| {
            v.sort_unstable();
            v.dedup();
            v
        })
        .collect();

    let harness = Arc::new(h);
    let tasks = selections.into_iter().enumerate().map(|(i, selection)| {
        let h = Arc::clone(&harness);
        tokio::spawn(async move {
            let Ok((receipt, proof)) = h.checkout(h.hold_request(&selection), &format!("pay_{i}")).await else {
                return;
            };
            let _ = h.coordinator.commit_hold(receipt.token, &proof).await;
        })
    });
    futures::future::join_all(tasks).await;

    let bookings = harness.store.all_bookings();
    assert!(!bookings.is_empty());
    let mut claimed = std::collections::BTreeSet::new();
    for booking in bookings.iter().filter(|b| b.is_confirmed()) {
        for seat in booking.seat_numbers() {
            assert!(claimed.insert(seat), "seat {seat} booked twice");
        }
    }
}

#[tokio::test]
async fn invalid_signature_leaves_inventory_untouched() {
    let h = Harness::new().await;
    let receipt = h.coordinator.create_hold(h.hold_request(&[7, 8])).await.unwrap();
    let order = h.coordinator.create_order(receipt.token).await.unwrap();

    let forged = StubGateway::forged_proof_for(&order, "pay_x");
    let result = h.coordinator.commit_hold(receipt.token, &forged).await;
    assert_eq!(result.unwrap_err(), BookingError::SignatureInvalid);

    assert!(h.store.all_bookings().is_empty());
    assert_eq!(h.store.payment_count(), 0);
    let availability = h.coordinator.get_availability(h.showtime.id).await.unwrap();
    assert_eq!(availability.seats_in(SeatState::Held), seats(&[7, 8]));
    assert!(h.notifier.sent().is_empty());

    // The hold survives and can still be paid.
    let proof = StubGateway::proof_for(&order, "pay_x");
    assert!(h.coordinator.commit_hold(receipt.token, &proof).await.is_ok());
}

#[tokio::test]
async fn repeated_commit_returns_same_booking() {
    let h = Harness::new().await;
    let (receipt, proof) = h.checkout(h.hold_request(&[20]), "pay_20").await.unwrap();

    let first = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();
    let second = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();

    assert!(!first.is_replay());
    assert!(second.is_replay());
    assert_eq!(first.booking().id, second.booking().id);
    assert_eq!(h.store.payment_count(), 1);
    assert_eq!(h.store.all_bookings().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_retries_of_one_proof_create_one_booking() {
    let h = Harness::new().await;
    let (receipt, proof) = h.checkout(h.hold_request(&[21, 22]), "pay_21").await.unwrap();

    let commits = (0..8).map(|_| {
        let coordinator = Arc::clone(&h.coordinator);
        let proof = proof.clone();
        tokio::spawn(async move { coordinator.commit_hold(receipt.token, &proof).await })
    });
    let results = futures::future::join_all(commits).await;

    let ids: std::collections::HashSet<_> = results
        .into_iter()
        .map(|r| r.unwrap().unwrap().booking().id)
        .collect();
    assert_eq!(ids.len(), 1);
    assert_eq!(h.store.payment_count(), 1);
}

#[tokio::test]
async fn expired_hold_frees_seats_and_cannot_commit() {
    let h = Harness::new().await;
    let (receipt, proof) = h.checkout(h.hold_request(&[40, 41]), "pay_40").await.unwrap();
    assert_eq!(receipt.expires_at - h.now(), Duration::seconds(600));

    h.advance(Duration::seconds(600));

    let availability = h.coordinator.get_availability(h.showtime.id).await.unwrap();
    assert!(availability.seats_in(SeatState::Held).is_empty());

    let second = h.coordinator.create_hold(h.hold_request(&[41])).await;
    assert!(second.is_ok());

    let result = h.coordinator.commit_hold(receipt.token, &proof).await;
    assert_eq!(result.unwrap_err(), BookingError::HoldExpired);
    assert!(h.store.all_bookings().is_empty());
}

#[tokio::test]
async fn hold_lapsing_during_verification_still_commits() {
    let h = Harness::new().await;
    let (receipt, proof) = h.checkout(h.hold_request(&[40, 41]), "pay_slow_verify").await.unwrap();
    h.gateway
        .advance_clock_on_verify(Arc::clone(&h.clock), Duration::seconds(601));

    let outcome = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();
    assert!(!outcome.is_replay());
    assert!(h.now() > receipt.expires_at);
    assert_eq!(outcome.booking().seat_numbers(), seats(&[40, 41]));

    let availability = h.coordinator.get_availability(h.showtime.id).await.unwrap();
    assert_eq!(availability.seats_in(SeatState::Booked), seats(&[40, 41]));
    assert!(h.notifier.wait_for(1, StdDuration::from_secs(1)).await);

    let again = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();
    assert!(again.is_replay());
}

#[tokio::test]
async fn hold_lapsing_during_verification_loses_reheld_seats() {
    let h = Harness::builder()
        .gateway(StubGateway::with_verify_delay(StdDuration::from_millis(100)))
        .build()
        .await;
    let (receipt, proof) = h.checkout(h.hold_request(&[40, 41]), "pay_lost").await.unwrap();
    h.gateway
        .advance_clock_on_verify(Arc::clone(&h.clock), Duration::seconds(601));

    let coordinator = Arc::clone(&h.coordinator);
    let commit = tokio::spawn(async move { coordinator.commit_hold(receipt.token, &proof).await });
    tokio::time::sleep(StdDuration::from_millis(20)).await;

    // The hold has lapsed while the payment is verified; seat 41 goes to someone else.
    h.coordinator.create_hold(h.hold_request(&[41])).await.unwrap();

    let result = commit.await.unwrap();
    assert_eq!(result.unwrap_err(), BookingError::SeatConflict { seats: seats(&[41]) });
    assert!(h.store.all_bookings().is_empty());

    let availability = h.coordinator.get_availability(h.showtime.id).await.unwrap();
    assert_eq!(availability.seats_in(SeatState::Held), seats(&[41]));
    assert!(availability.seats_in(SeatState::Booked).is_empty());
}

#[tokio::test]
async fn lost_write_acknowledgement_completes_the_commit() {
    let h = Harness::new().await;
    h.store.put_offer(percent_offer("SAVE20", 20, Some(100)));
    h.store.lose_next_insert_acks(1);

    let mut request = h.hold_request(&[7, 8]);
    request.offer_code = Some("SAVE20".to_string());
    let (receipt, proof) = h.checkout(request, "pay_lost_ack").await.unwrap();

    let outcome = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();
    assert!(!outcome.is_replay());
    assert_eq!(h.store.payment_count(), 1);
    assert_eq!(h.store.all_bookings().len(), 1);
    assert_eq!(h.store.all_bookings()[0].id, outcome.booking().id);

    assert!(h.notifier.wait_for(1, StdDuration::from_secs(1)).await);
    assert!(h.settle().await);
    assert_eq!(h.store.offer("SAVE20").unwrap().usage_count, 1);

    // The token is committed, so releasing it cannot free the seats.
    h.coordinator.release_hold(receipt.token).await.unwrap();
    let availability = h.coordinator.get_availability(h.showtime.id).await.unwrap();
    assert_eq!(availability.seats_in(SeatState::Booked), seats(&[7, 8]));
    let again = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();
    assert!(again.is_replay());
}

#[tokio::test]
async fn boards_of_started_showtimes_are_dropped_when_idle() {
    let h = Harness::new().await;
    let receipt = h.coordinator.create_hold(h.hold_request(&[1])).await.unwrap();
    h.coordinator.release_hold(receipt.token).await.unwrap();
    assert_eq!(h.coordinator.board_count().await, 1);

    // Before the show starts the board stays.
    h.advance(Duration::hours(2));
    h.coordinator.sweep_expired().await;
    assert_eq!(h.coordinator.board_count().await, 1);

    h.advance(Duration::hours(24));
    h.coordinator.sweep_expired().await;
    assert_eq!(h.coordinator.board_count().await, 0);
}

#[tokio::test]
async fn boards_with_live_tombstones_are_kept() {
    let h = Harness::new().await;
    let receipt = h.coordinator.create_hold(h.hold_request(&[1])).await.unwrap();
    h.advance(Duration::hours(24));
    h.coordinator.release_hold(receipt.token).await.unwrap();

    h.coordinator.sweep_expired().await;
    assert_eq!(h.coordinator.board_count().await, 1);
}

#[tokio::test]
async fn sweep_counts_expired_holds() {
    let h = Harness::new().await;
    h.coordinator.create_hold(h.hold_request(&[1])).await.unwrap();
    h.coordinator.create_hold(h.hold_request(&[2])).await.unwrap();

    assert_eq!(h.coordinator.sweep_expired().await, 0);
    h.advance(Duration::seconds(601));
    assert_eq!(h.coordinator.sweep_expired().await, 2);
    assert_eq!(h.coordinator.sweep_expired().await, 0);
}

#[tokio::test]
async fn ttl_is_clamped_to_window() {
    let h = Harness::new().await;
    let mut short = h.hold_request(&[1]);
    short.ttl = Some(Duration::seconds(10));
    let mut long = h.hold_request(&[2]);
    long.ttl = Some(Duration::hours(2));

    let short = h.coordinator.create_hold(short).await.unwrap();
    let long = h.coordinator.create_hold(long).await.unwrap();
    assert_eq!(short.expires_at - h.now(), Duration::seconds(300));
    assert_eq!(long.expires_at - h.now(), Duration::seconds(900));
}

#[tokio::test]
async fn release_is_idempotent_and_frees_seats() {
    let h = Harness::new().await;
    let (receipt, proof) = h.checkout(h.hold_request(&[15]), "pay_15").await.unwrap();

    h.coordinator.release_hold(receipt.token).await.unwrap();
    h.coordinator.release_hold(receipt.token).await.unwrap();

    let availability = h.coordinator.get_availability(h.showtime.id).await.unwrap();
    assert!(availability.seats_in(SeatState::Held).is_empty());
    assert_eq!(
        h.coordinator.commit_hold(receipt.token, &proof).await.unwrap_err(),
        BookingError::HoldNotFound
    );
}

#[tokio::test]
async fn proof_for_another_order_rejected() {
    let h = Harness::new().await;
    let (first, _) = h.checkout(h.hold_request(&[1]), "pay_a").await.unwrap();
    let (_, other_proof) = h.checkout(h.hold_request(&[2]), "pay_b").await.unwrap();

    let result = h.coordinator.commit_hold(first.token, &other_proof).await;
    assert_eq!(result.unwrap_err(), BookingError::OrderMismatch);
    assert_eq!(h.gateway.verifications(), 0);
}

#[tokio::test]
async fn commit_without_order_rejected() {
    let h = Harness::new().await;
    let receipt = h.coordinator.create_hold(h.hold_request(&[1])).await.unwrap();
    let (_, proof) = h.checkout(h.hold_request(&[2]), "pay_b").await.unwrap();

    let result = h.coordinator.commit_hold(receipt.token, &proof).await;
    assert_eq!(result.unwrap_err(), BookingError::OrderMismatch);
}

#[tokio::test]
async fn transient_write_failures_are_retried() {
    let h = Harness::new().await;
    let (receipt, proof) = h.checkout(h.hold_request(&[33]), "pay_33").await.unwrap();
    h.store.fail_next_inserts(2);

    let outcome = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();
    assert!(!outcome.is_replay());
    assert_eq!(h.store.insert_attempts(), 3);
    assert_eq!(h.store.payment_count(), 1);
}

#[tokio::test]
async fn exhausted_retries_keep_hold_for_client_retry() {
    let config = CoordinatorConfig {
        retry: RetryPolicy::builder()
            .max_retries(1)
            .initial_delay(StdDuration::from_millis(1))
            .build(),
        ..CoordinatorConfig::default()
    };
    let h = Harness::builder().config(config).build().await;
    let (receipt, proof) = h.checkout(h.hold_request(&[34]), "pay_34").await.unwrap();
    h.store.fail_next_inserts(5);

    let result = h.coordinator.commit_hold(receipt.token, &proof).await;
    assert!(matches!(result, Err(BookingError::Storage(_))));
    assert!(h.store.all_bookings().is_empty());

    h.store.fail_next_inserts(0);
    let outcome = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();
    assert_eq!(outcome.booking().seat_numbers(), seats(&[34]));
}

#[tokio::test]
async fn owner_and_admin_may_cancel() {
    let h = Harness::new().await;
    let request = h.hold_request(&[50, 51]);
    let owner = request.user_id;
    let (receipt, proof) = h.checkout(request, "pay_50").await.unwrap();
    let booking = h
        .coordinator
        .commit_hold(receipt.token, &proof)
        .await
        .unwrap()
        .into_booking();

    let stranger = Actor::customer(UserId::new());
    assert_eq!(
        h.coordinator.cancel_booking(booking.id, stranger).await.unwrap_err(),
        BookingError::NotPermitted
    );

    let cancelled = h
        .coordinator
        .cancel_booking(booking.id, Actor::customer(owner))
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
    assert_eq!(
        h.coordinator
            .cancel_booking(booking.id, Actor::admin(UserId::new()))
            .await
            .unwrap_err(),
        BookingError::AlreadyCancelled
    );

    let availability = h.coordinator.get_availability(h.showtime.id).await.unwrap();
    assert!(availability.seats_in(SeatState::Booked).is_empty());
    assert!(h.coordinator.create_hold(h.hold_request(&[50, 51])).await.is_ok());
}

#[tokio::test]
async fn admin_cancels_any_booking() {
    let h = Harness::new().await;
    let (receipt, proof) = h.checkout(h.hold_request(&[9]), "pay_9").await.unwrap();
    let booking = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap().into_booking();

    let cancelled = h
        .coordinator
        .cancel_booking(booking.id, Actor::admin(UserId::new()))
        .await
        .unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);
}

#[tokio::test]
async fn offer_discount_is_capped_and_usage_counted() {
    let h = Harness::new().await;
    h.store.put_offer(percent_offer("SAVE20", 20, Some(100)));

    let mut request = h.hold_request(&[1, 2, 3]);
    request.offer_code = Some("save20".to_string());
    let (receipt, proof) = h.checkout(request, "pay_offer").await.unwrap();

    assert_eq!(receipt.quote.discount, Money::new(100));
    assert_eq!(receipt.quote.total, Money::new(530));

    let booking = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap().into_booking();
    assert_eq!(booking.original_amount, Money::new(630));
    assert_eq!(booking.discount, Money::new(100));
    assert_eq!(booking.total_amount, Money::new(530));
    assert_eq!(booking.offer_code.as_deref(), Some("SAVE20"));
    assert!(h.settle().await);
    assert_eq!(h.store.offer("SAVE20").unwrap().usage_count, 1);
}

#[tokio::test]
async fn invalid_offer_does_not_fail_hold() {
    let h = Harness::new().await;
    let mut offer = percent_offer("OLD", 10, None);
    offer.active = false;
    h.store.put_offer(offer);

    let mut request = h.hold_request(&[1]);
    request.offer_code = Some("OLD".to_string());
    let receipt = h.coordinator.create_hold(request).await.unwrap();
    assert_eq!(receipt.quote.discount, Money::ZERO);
    assert_eq!(receipt.quote.offer_rejection, Some(OfferRejection::Inactive));

    let mut unknown = h.hold_request(&[2]);
    unknown.offer_code = Some("NOPE".to_string());
    let receipt = h.coordinator.create_hold(unknown).await.unwrap();
    assert_eq!(receipt.quote.offer_rejection, Some(OfferRejection::NotFound));
}

#[tokio::test]
async fn quote_reports_offer_rejection() {
    let h = Harness::new().await;
    let mut offer = percent_offer("BIG", 10, None);
    offer.min_purchase = Money::new(1000);
    h.store.put_offer(offer);

    let result = h
        .coordinator
        .quote(h.showtime.id, &seats(&[1, 2, 3]), Some("BIG"))
        .await;
    assert_eq!(
        result.unwrap_err(),
        BookingError::OfferInvalid(OfferRejection::BelowMinimum {
            required: Money::new(1000)
        })
    );

    let quote = h.coordinator.quote(h.showtime.id, &seats(&[48, 49]), None).await.unwrap();
    assert_eq!(quote.total, Money::new(525));
}

#[tokio::test]
async fn offer_outage_is_absorbed() {
    let h = Harness::new().await;
    h.store.put_offer(percent_offer("SAVE20", 20, Some(100)));
    h.store.set_offers_unavailable(true);

    let mut request = h.hold_request(&[1]);
    request.offer_code = Some("SAVE20".to_string());
    let receipt = h.coordinator.create_hold(request).await.unwrap();
    assert_eq!(receipt.quote.offer_rejection, Some(OfferRejection::Unavailable));
}

#[tokio::test]
async fn usage_increment_failure_does_not_fail_booking() {
    let h = Harness::new().await;
    h.store.put_offer(percent_offer("SAVE20", 20, Some(100)));
    h.store.set_usage_increment_failing(true);

    let mut request = h.hold_request(&[1, 2, 3]);
    request.offer_code = Some("SAVE20".to_string());
    let (receipt, proof) = h.checkout(request, "pay_u").await.unwrap();

    let outcome = h.coordinator.commit_hold(receipt.token, &proof).await;
    assert!(outcome.is_ok());
    assert!(h.settle().await);
    assert_eq!(h.store.offer("SAVE20").unwrap().usage_count, 0);
}

#[tokio::test]
async fn applicable_offers_lists_valid_codes() {
    let h = Harness::new().await;
    h.store.put_offer(percent_offer("SAVE20", 20, Some(100)));
    h.store.put_offer(percent_offer("TEN", 10, None));
    let mut expired = percent_offer("GONE", 50, None);
    expired.valid_until = chrono::NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
    h.store.put_offer(expired);

    let offers = h
        .coordinator
        .applicable_offers(h.showtime.id, &seats(&[1, 2, 3]))
        .await
        .unwrap();
    let codes: Vec<_> = offers.iter().map(|o| o.offer.code.as_str()).collect();
    assert_eq!(codes, vec!["SAVE20", "TEN"]);
}

#[tokio::test]
async fn notification_failure_does_not_fail_booking() {
    let h = Harness::builder()
        .notifier(Arc::new(FailingNotifier))
        .build()
        .await;
    let (receipt, proof) = h.checkout(h.hold_request(&[3]), "pay_n").await.unwrap();

    let outcome = h.coordinator.commit_hold(receipt.token, &proof).await.unwrap();
    assert!(!outcome.is_replay());
    assert_eq!(h.store.all_bookings().len(), 1);
}

#[tokio::test]
async fn unknown_and_inactive_showtimes_rejected() {
    let h = Harness::new().await;
    let mut request = h.hold_request(&[1]);
    request.showtime_id = ShowtimeId::new();
    assert_eq!(
        h.coordinator.create_hold(request).await.unwrap_err(),
        BookingError::ShowtimeNotFound
    );

    h.store
        .set_status(h.showtime.id, ShowtimeStatus::Inactive)
        .await
        .unwrap();
    assert_eq!(
        h.coordinator.create_hold(h.hold_request(&[1])).await.unwrap_err(),
        BookingError::ShowtimeInactive
    );
}

#[tokio::test]
async fn invalid_selections_rejected() {
    let h = Harness::new().await;
    assert_eq!(
        h.coordinator.create_hold(h.hold_request(&[])).await.unwrap_err(),
        BookingError::EmptySelection
    );
    assert!(matches!(
        h.coordinator.create_hold(h.hold_request(&[0])).await,
        Err(BookingError::SeatOutOfRange { .. })
    ));
    assert!(matches!(
        h.coordinator.create_hold(h.hold_request(&[61])).await,
        Err(BookingError::SeatOutOfRange { .. })
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn slow_verification_does_not_block_the_showtime() {
    let h = Harness::builder()
        .gateway(StubGateway::with_verify_delay(StdDuration::from_millis(300)))
        .build()
        .await;
    let (receipt, proof) = h.checkout(h.hold_request(&[1]), "pay_slow").await.unwrap();

    let coordinator = Arc::clone(&h.coordinator);
    let commit = tokio::spawn(async move { coordinator.commit_hold(receipt.token, &proof).await });
    tokio::time::sleep(StdDuration::from_millis(20)).await;

    let started = std::time::Instant::now();
    h.coordinator.create_hold(h.hold_request(&[2])).await.unwrap();
    assert!(started.elapsed() < StdDuration::from_millis(200));

    assert!(commit.await.unwrap().is_ok());
}

#[tokio::test]
async fn boundary_fixed_when_showtime_created() {
    let showtime = showtime_60();
    let h = Harness::builder().showtime(showtime).build().await;
    let quote = h.coordinator.quote(h.showtime.id, &seats(&[48, 49]), None).await.unwrap();
    assert_eq!(quote.lines[0].price, Money::new(200));
    assert_eq!(quote.lines[1].price, Money::new(300));
}
