//! Prometheus metrics for holds, commits and bookings.
//!
//! # Example
//!
//! ```rust,no_run
//! use boxoffice_runtime::metrics::MetricsServer;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut server = MetricsServer::new("0.0.0.0:9090".parse()?);
//! server.start()?;
//! // Metrics available at http://localhost:9090/metrics
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Prometheus scrape endpoint.
pub struct MetricsServer {
    addr: SocketAddr,
    started: bool,
}

impl MetricsServer {
    /// Create a new metrics server bound to `addr` once started.
    #[must_use]
    pub const fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            started: false,
        }
    }

    /// Registers metric descriptions and starts the HTTP listener.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the exporter cannot be built or installed.
    pub fn start(&mut self) -> Result<(), MetricsError> {
        let builder = PrometheusBuilder::new()
            .with_http_listener(self.addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )
            .map_err(|e| MetricsError::Build(e.to_string()))?;

        builder
            .install()
            .map_err(|e| MetricsError::Install(e.to_string()))?;
        register_metrics();
        self.started = true;
        tracing::info!(addr = %self.addr, "Metrics available at http://{}/metrics", self.addr);
        Ok(())
    }

    /// Whether the exporter has been installed
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }
}

/// Register all metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "boxoffice_holds_total",
        "Hold attempts by outcome (placed, conflict, released)"
    );
    describe_gauge!(
        "boxoffice_active_holds",
        "Holds not yet committed, released or expired"
    );
    describe_counter!(
        "boxoffice_holds_expired_total",
        "Holds retired because their TTL elapsed"
    );
    describe_counter!(
        "boxoffice_commits_total",
        "Commit attempts by outcome"
    );
    describe_histogram!(
        "boxoffice_commit_duration_seconds",
        "Time from commit request to outcome"
    );
    describe_counter!(
        "boxoffice_seats_booked_total",
        "Seats turned into confirmed bookings"
    );
    describe_counter!(
        "boxoffice_revenue_total",
        "Amount charged for confirmed bookings, in whole currency units"
    );
    describe_counter!(
        "boxoffice_bookings_cancelled_total",
        "Bookings cancelled"
    );
    describe_counter!(
        "boxoffice_retry_attempts_total",
        "Retries of transient store failures"
    );
    describe_counter!(
        "boxoffice_retry_exhausted_total",
        "Operations that ran out of retries"
    );
}

/// Hold lifecycle metrics.
pub struct HoldMetrics;

impl HoldMetrics {
    /// A hold was placed
    pub fn placed() {
        counter!("boxoffice_holds_total", "outcome" => "placed").increment(1);
    }

    /// A hold was refused because seats were taken
    pub fn conflict() {
        counter!("boxoffice_holds_total", "outcome" => "conflict").increment(1);
    }

    /// A hold was released by its owner
    pub fn released() {
        counter!("boxoffice_holds_total", "outcome" => "released").increment(1);
    }

    /// Holds retired by a sweep
    pub fn expired(count: usize) {
        counter!("boxoffice_holds_expired_total").increment(count as u64);
    }

    /// Holds currently tracked across all showtimes
    #[allow(clippy::cast_precision_loss)] // gauge values are f64
    pub fn active(count: usize) {
        gauge!("boxoffice_active_holds").set(count as f64);
    }
}

/// Commit outcome label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcomeLabel {
    /// New booking written
    Committed,
    /// Replay returned the existing booking
    Replayed,
    /// Signature did not verify
    SignatureInvalid,
    /// Hold passed its TTL
    Expired,
    /// Seats taken meanwhile
    Conflict,
    /// Anything else
    Failed,
}

impl CommitOutcomeLabel {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Replayed => "replayed",
            Self::SignatureInvalid => "signature_invalid",
            Self::Expired => "expired",
            Self::Conflict => "conflict",
            Self::Failed => "failed",
        }
    }
}

/// Commit metrics.
pub struct CommitMetrics;

impl CommitMetrics {
    /// Records a commit outcome and its latency
    pub fn record(outcome: CommitOutcomeLabel, duration: Duration) {
        counter!("boxoffice_commits_total", "outcome" => outcome.as_str()).increment(1);
        histogram!("boxoffice_commit_duration_seconds").record(duration.as_secs_f64());
    }

    /// Records seats and revenue of a new booking
    pub fn booked(seats: usize, revenue: u64) {
        counter!("boxoffice_seats_booked_total").increment(seats as u64);
        counter!("boxoffice_revenue_total").increment(revenue);
    }

    /// A booking was cancelled
    pub fn cancelled() {
        counter!("boxoffice_bookings_cancelled_total").increment(1);
    }
}
