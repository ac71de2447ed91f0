use crate::PostgresBoxOffice;
use crate::error::store_error;
use crate::rows::{SHOWTIME_COLUMNS, count_to_sql, money_to_sql, showtime_from_row};
use boxoffice_core::catalog::ShowtimeCatalog;
use boxoffice_core::error::StoreError;
use boxoffice_core::types::{Showtime, ShowtimeId, ShowtimeStatus};
use futures::future::BoxFuture;

impl ShowtimeCatalog for PostgresBoxOffice {
    fn get(&self, id: ShowtimeId) -> BoxFuture<'_, Result<Option<Showtime>, StoreError>> {
        Box::pin(async move {
            let row = sqlx::query(&format!(
                "SELECT {SHOWTIME_COLUMNS} FROM showtimes WHERE id = $1"
            ))
            .bind(*id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(store_error)?;

            row.as_ref().map(showtime_from_row).transpose()
        })
    }

    /// Inserts the showtime, or updates start time and status of an
    /// existing one. The stored seat map is never rewritten.
    fn insert<'a>(&'a self, showtime: &'a Showtime) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let map = showtime.seat_map();
            sqlx::query(
                r"
                INSERT INTO showtimes (
                    id, movie_id, theatre_id, screen_id, starts_at,
                    capacity, tier_boundary, normal_price, vip_price, status
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ON CONFLICT (id) DO UPDATE
                SET starts_at = EXCLUDED.starts_at, status = EXCLUDED.status
                ",
            )
            .bind(*showtime.id.as_uuid())
            .bind(*showtime.movie_id.as_uuid())
            .bind(*showtime.theatre_id.as_uuid())
            .bind(*showtime.screen_id.as_uuid())
            .bind(showtime.starts_at)
            .bind(count_to_sql(map.capacity())?)
            .bind(count_to_sql(map.tier_boundary())?)
            .bind(money_to_sql(map.normal_price())?)
            .bind(money_to_sql(map.vip_price())?)
            .bind(showtime.status.as_str())
            .execute(&self.pool)
            .await
            .map_err(store_error)?;

            tracing::debug!(showtime_id = %showtime.id, capacity = map.capacity(), "Showtime stored");
            Ok(())
        })
    }

    fn set_status(
        &self,
        id: ShowtimeId,
        status: ShowtimeStatus,
    ) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            let result = sqlx::query("UPDATE showtimes SET status = $2 WHERE id = $1")
                .bind(*id.as_uuid())
                .bind(status.as_str())
                .execute(&self.pool)
                .await
                .map_err(store_error)?;

            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
            tracing::info!(showtime_id = %id, status = status.as_str(), "Showtime status changed");
            Ok(())
        })
    }
}
