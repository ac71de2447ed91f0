//! Mapping from sqlx errors onto [`StoreError`].

use boxoffice_core::error::StoreError;

/// Unique constraint on the gateway payment id.
pub(crate) const PAYMENT_PKEY: &str = "payments_pkey";
/// Unique constraint on the payment a booking was paid with.
pub(crate) const BOOKING_PAYMENT_KEY: &str = "bookings_payment_id_key";
/// Partial unique index keeping a seat in one confirmed booking.
pub(crate) const BOOKED_SEAT_INDEX: &str = "booking_seats_booked_uniq";

/// Classifies a database error.
///
/// Connection-level failures, serialization failures and deadlocks are
/// [`StoreError::Unavailable`] and therefore retried by callers. Everything
/// else is permanent.
#[must_use]
pub fn store_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::WorkerCrashed => StoreError::Unavailable(err.to_string()),
        sqlx::Error::Database(db) if matches!(db.code().as_deref(), Some("40001" | "40P01")) => {
            StoreError::Unavailable(err.to_string())
        }
        sqlx::Error::RowNotFound => StoreError::NotFound,
        _ => StoreError::Database(err.to_string()),
    }
}

/// Name of the unique constraint an error violated, if any.
pub(crate) fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => db.constraint(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_exhaustion_is_transient() {
        assert!(store_error(sqlx::Error::PoolTimedOut).is_transient());
        assert!(store_error(sqlx::Error::PoolClosed).is_transient());
    }

    #[test]
    fn missing_row_is_not_found() {
        assert_eq!(store_error(sqlx::Error::RowNotFound), StoreError::NotFound);
    }

    #[test]
    fn decode_failures_are_permanent() {
        let err = sqlx::Error::ColumnNotFound("price".to_string());
        assert!(matches!(store_error(err), StoreError::Database(_)));
        assert_eq!(violated_constraint(&sqlx::Error::RowNotFound), None);
    }
}
