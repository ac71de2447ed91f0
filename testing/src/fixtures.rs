//! Ready-made showtimes, offers and a wired coordinator.

use crate::gateway::StubGateway;
use crate::mocks::{ManualClock, test_time};
use crate::notifier::RecordingNotifier;
use crate::store::InMemoryBoxOffice;
use boxoffice_core::environment::Clock;
use boxoffice_core::error::BookingError;
use boxoffice_core::notification::NotificationDispatcher;
use boxoffice_core::offer::{DiscountKind, Offer, OfferScope};
use boxoffice_core::payment::PaymentProof;
use boxoffice_core::seat_map::SeatMap;
use boxoffice_core::types::{
    Money, MovieId, Recipient, ScreenId, SeatNumber, Showtime, TheatreId, UserId,
};
use boxoffice_runtime::{
    CoordinatorConfig, CoordinatorEnvironment, HoldReceipt, HoldRequest, ReservationCoordinator,
    RetryPolicy,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::sync::Arc;

/// Seat numbers from raw integers
#[must_use]
pub fn seats(numbers: &[u32]) -> Vec<SeatNumber> {
    numbers.iter().copied().map(SeatNumber::new).collect()
}

/// Active showtime, 60 seats, Normal 200 / VIP 300, starting a day after [`test_time`]
#[must_use]
pub fn showtime_60() -> Showtime {
    showtime_with(60, 200, 300)
}

/// Active showtime with the given capacity and prices
///
/// # Panics
///
/// Panics if capacity or a price is zero.
#[must_use]
#[allow(clippy::expect_used)]
pub fn showtime_with(capacity: u32, normal: u64, vip: u64) -> Showtime {
    let map = SeatMap::new(capacity, Money::new(normal), Money::new(vip))
        .expect("fixture seat map should be valid");
    Showtime::new(
        MovieId::new(),
        TheatreId::new(),
        ScreenId::new(),
        test_time() + Duration::days(1),
        map,
    )
}

/// Recipient for a user
#[must_use]
pub fn recipient() -> Recipient {
    Recipient {
        email: "guest@example.com".to_string(),
        name: Some("Guest".to_string()),
    }
}

/// Percentage offer valid all of 2026 for every showtime
#[must_use]
pub fn percent_offer(code: &str, percent: u32, max_discount: Option<u64>) -> Offer {
    Offer {
        code: code.to_string(),
        description: format!("{percent}% off"),
        kind: DiscountKind::Percentage {
            percent,
            max_discount: max_discount.map(Money::new),
        },
        min_purchase: Money::ZERO,
        usage_limit: 0,
        usage_count: 0,
        valid_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap_or_default(),
        valid_until: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap_or_default(),
        scope: OfferScope::All,
        active: true,
    }
}

/// Coordinator wired over in-memory collaborators.
pub struct Harness {
    /// Coordinator under test
    pub coordinator: Arc<ReservationCoordinator>,
    /// Store behind every storage trait
    pub store: Arc<InMemoryBoxOffice>,
    /// Payment gateway
    pub gateway: Arc<StubGateway>,
    /// Notification recorder
    pub notifier: RecordingNotifier,
    /// Clock driving expiry
    pub clock: Arc<ManualClock>,
    /// Registered showtime
    pub showtime: Showtime,
}

impl Harness {
    /// Harness with default configuration and a fast retry policy
    pub async fn new() -> Self {
        Self::builder().build().await
    }

    /// Customizable harness
    #[must_use]
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            config: CoordinatorConfig {
                retry: RetryPolicy::builder()
                    .max_retries(3)
                    .initial_delay(std::time::Duration::from_millis(1))
                    .build(),
                ..CoordinatorConfig::default()
            },
            gateway: StubGateway::new(),
            notifier: None,
            showtime: showtime_60(),
        }
    }

    /// Hold request for `numbers` by a fresh user
    #[must_use]
    pub fn hold_request(&self, numbers: &[u32]) -> HoldRequest {
        HoldRequest {
            showtime_id: self.showtime.id,
            user_id: UserId::new(),
            recipient: recipient(),
            seats: seats(numbers),
            offer_code: None,
            ttl: None,
        }
    }

    /// Holds seats, creates the order and returns a valid proof.
    ///
    /// # Errors
    ///
    /// Returns whatever the hold or order step returns.
    pub async fn checkout(
        &self,
        request: HoldRequest,
        payment_id: &str,
    ) -> Result<(HoldReceipt, PaymentProof), BookingError> {
        let receipt = self.coordinator.create_hold(request).await?;
        let order = self.coordinator.create_order(receipt.token).await?;
        Ok((receipt, StubGateway::proof_for(&order, payment_id)))
    }

    /// Advances the clock
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Current time on the harness clock
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Waits (up to a second) for commit effects such as offer usage to finish.
    ///
    /// Returns `false` on timeout.
    pub async fn settle(&self) -> bool {
        for _ in 0..200 {
            if self.coordinator.pending_effects().await == 0 {
                return true;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        false
    }
}

/// Builder for [`Harness`].
pub struct HarnessBuilder {
    config: CoordinatorConfig,
    gateway: StubGateway,
    notifier: Option<Arc<dyn NotificationDispatcher>>,
    showtime: Showtime,
}

impl HarnessBuilder {
    /// Overrides the coordinator configuration
    #[must_use]
    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses the given gateway
    #[must_use]
    pub fn gateway(mut self, gateway: StubGateway) -> Self {
        self.gateway = gateway;
        self
    }

    /// Uses a different notifier instead of the recorder
    #[must_use]
    pub fn notifier(mut self, notifier: Arc<dyn NotificationDispatcher>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Registers a different showtime
    #[must_use]
    pub fn showtime(mut self, showtime: Showtime) -> Self {
        self.showtime = showtime;
        self
    }

    /// Wires the coordinator and registers the showtime
    pub async fn build(self) -> Harness {
        let store = Arc::new(InMemoryBoxOffice::new());
        let gateway = Arc::new(self.gateway);
        let clock = Arc::new(ManualClock::new(test_time()));
        let recorder = RecordingNotifier::new();
        let notifier = self
            .notifier
            .unwrap_or_else(|| Arc::new(recorder.clone()) as Arc<dyn NotificationDispatcher>);

        let env = CoordinatorEnvironment {
            clock: clock.clone(),
            catalog: store.clone(),
            inventory: store.clone(),
            ledger: store.clone(),
            offers: store.clone(),
            gateway: gateway.clone(),
            notifier,
        };
        let coordinator = Arc::new(ReservationCoordinator::new(env, self.config));
        // In-memory catalog writes cannot fail.
        let _ = coordinator.register_showtime(&self.showtime).await;

        Harness {
            coordinator,
            store,
            gateway,
            notifier: recorder,
            clock,
            showtime: self.showtime,
        }
    }
}
