//! Clock abstraction injected into the coordinator.

use chrono::{DateTime, Utc};

/// Clock trait for getting the current time.
///
/// Holds expire relative to this clock, and offers are validated against
/// its date, so tests can drive expiry deterministically.
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// System clock using the real current time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
