//! `PostgreSQL` storage for the box office.
//!
//! [`PostgresBoxOffice`] implements every storage trait of
//! `boxoffice-core` over one connection pool:
//!
//! - [`InventoryStore`](boxoffice_core::inventory::InventoryStore): booked seats per showtime
//! - [`BookingLedger`](boxoffice_core::ledger::BookingLedger): bookings, their seats and payments
//! - [`ShowtimeCatalog`](boxoffice_core::catalog::ShowtimeCatalog): showtimes and their seat maps
//! - [`OfferService`](boxoffice_core::offer::OfferService): offer codes and usage counts
//!
//! Two database constraints back the booking guarantees. The payments
//! primary key makes a gateway payment id commit at most once, and a
//! partial unique index on `(showtime_id, seat_number) WHERE status = 'booked'`
//! keeps a seat out of two confirmed bookings.
//!
//! # Example
//!
//! ```no_run
//! use boxoffice_postgres::PostgresBoxOffice;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PostgresBoxOffice::connect("postgres://localhost/boxoffice", 10).await?;
//! store.migrate().await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod catalog;
mod error;
mod inventory;
mod ledger;
mod offers;
mod rows;

pub use error::store_error;

use boxoffice_core::error::StoreError;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;

/// Default time to wait for a pooled connection.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// `PostgreSQL` implementation of the box office storage traits.
#[derive(Clone, Debug)]
pub struct PostgresBoxOffice {
    pool: PgPool,
}

impl PostgresBoxOffice {
    /// Connects a pool of at most `max_connections` connections.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the database cannot be reached.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        Self::connect_with(database_url, max_connections, DEFAULT_ACQUIRE_TIMEOUT).await
    }

    /// Connects with an explicit acquire timeout.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the database cannot be reached.
    pub async fn connect_with(
        database_url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Unavailable(format!("failed to connect: {e}")))?;

        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wraps an existing pool.
    #[must_use]
    pub const fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Underlying pool, for health checks.
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Applies the embedded schema migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if a migration fails.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Migration failed: {e}")))?;
        tracing::info!("Database migrations complete");
        Ok(())
    }

    /// Round-trips a trivial query.
    ///
    /// # Errors
    ///
    /// Returns the mapped database error if the query fails.
    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
