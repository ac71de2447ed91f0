//! # Boxoffice Runtime
//!
//! The imperative shell around `boxoffice-core`.
//!
//! ## Core Components
//!
//! - **[`ReservationCoordinator`]**: grants holds, commits them into bookings
//!   exactly once, and cancels bookings, serializing each showtime's seats
//! - **Expiry sweeper**: background task releasing abandoned holds
//! - **[`Store`]**: owns each showtime's seat board and runs the effects
//!   its reducer returns
//! - **Retry**: exponential backoff around the durable booking write
//! - **Metrics**: Prometheus counters for holds, commits and revenue
//!
//! ## Example
//!
//! ```ignore
//! let coordinator = Arc::new(ReservationCoordinator::new(env, CoordinatorConfig::default()));
//! let sweeper = spawn_expiry_sweeper(Arc::clone(&coordinator), Duration::from_secs(30));
//!
//! let receipt = coordinator.create_hold(request).await?;
//! let order = coordinator.create_order(receipt.token).await?;
//! // ... customer pays ...
//! let booking = coordinator.commit_hold(receipt.token, &proof).await?.into_booking();
//! ```

/// Reservation coordinator
pub mod coordinator;

/// Prometheus metrics for observability
pub mod metrics;

/// Log-backed notification dispatcher
pub mod notifier;

/// Retry logic with exponential backoff
pub mod retry;

/// Reducer store
pub mod store;

/// Background hold expiry
pub mod sweeper;

pub use coordinator::{
    Availability, CommitOutcome, CoordinatorConfig, CoordinatorEnvironment, HoldReceipt,
    HoldRequest, ReservationCoordinator, SeatView,
};
pub use notifier::TracingNotifier;
pub use retry::RetryPolicy;
pub use store::Store;
pub use sweeper::{SweeperHandle, spawn_expiry_sweeper};
