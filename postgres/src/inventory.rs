use crate::PostgresBoxOffice;
use crate::error::store_error;
use crate::rows::{seat_from_sql, seats_to_sql};
use boxoffice_core::error::StoreError;
use boxoffice_core::inventory::{InventoryStore, SeatAvailability};
use boxoffice_core::types::{SeatNumber, ShowtimeId};
use futures::future::BoxFuture;
use std::collections::BTreeSet;

impl PostgresBoxOffice {
    /// Seats among `seats` that belong to a confirmed booking.
    pub(crate) async fn taken_seats(
        &self,
        showtime_id: ShowtimeId,
        seats: &[SeatNumber],
    ) -> Result<Vec<SeatNumber>, StoreError> {
        let numbers: Vec<i32> = sqlx::query_scalar(
            r"
            SELECT seat_number FROM booking_seats
            WHERE showtime_id = $1 AND status = 'booked' AND seat_number = ANY($2)
            ORDER BY seat_number
            ",
        )
        .bind(*showtime_id.as_uuid())
        .bind(seats_to_sql(seats)?)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        numbers.into_iter().map(seat_from_sql).collect()
    }
}

impl InventoryStore for PostgresBoxOffice {
    fn list_booked(
        &self,
        showtime_id: ShowtimeId,
    ) -> BoxFuture<'_, Result<BTreeSet<SeatNumber>, StoreError>> {
        Box::pin(async move {
            let numbers: Vec<i32> = sqlx::query_scalar(
                "SELECT seat_number FROM booking_seats WHERE showtime_id = $1 AND status = 'booked'",
            )
            .bind(*showtime_id.as_uuid())
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;

            numbers.into_iter().map(seat_from_sql).collect()
        })
    }

    fn are_seats_free<'a>(
        &'a self,
        showtime_id: ShowtimeId,
        seats: &'a [SeatNumber],
    ) -> BoxFuture<'a, Result<SeatAvailability, StoreError>> {
        Box::pin(async move {
            let taken = self.taken_seats(showtime_id, seats).await?;
            Ok(SeatAvailability::from_conflicts(taken))
        })
    }
}
