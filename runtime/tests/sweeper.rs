//! Background expiry sweeper.

#![allow(clippy::unwrap_used)]

use boxoffice_runtime::spawn_expiry_sweeper;
use boxoffice_testing::fixtures::Harness;
use chrono::Duration;
use std::sync::Arc;
use std::time::Duration as StdDuration;

#[tokio::test]
async fn sweeper_expires_abandoned_holds() {
    let h = Harness::new().await;
    h.coordinator.create_hold(h.hold_request(&[1, 2])).await.unwrap();

    let sweeper = spawn_expiry_sweeper(Arc::clone(&h.coordinator), StdDuration::from_millis(10));
    h.advance(Duration::seconds(601));
    tokio::time::sleep(StdDuration::from_millis(80)).await;

    // Already retired by the background task.
    assert_eq!(h.coordinator.sweep_expired().await, 0);
    sweeper.shutdown().await;
}

#[tokio::test]
async fn dropping_handle_stops_sweeper() {
    let h = Harness::new().await;
    let sweeper = spawn_expiry_sweeper(Arc::clone(&h.coordinator), StdDuration::from_millis(5));
    drop(sweeper);

    h.coordinator.create_hold(h.hold_request(&[3])).await.unwrap();
    h.advance(Duration::seconds(601));
    tokio::time::sleep(StdDuration::from_millis(40)).await;

    assert_eq!(h.coordinator.sweep_expired().await, 1);
}
