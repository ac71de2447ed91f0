use crate::PostgresBoxOffice;
use crate::error::{BOOKED_SEAT_INDEX, BOOKING_PAYMENT_KEY, PAYMENT_PKEY, store_error, violated_constraint};
use crate::rows::{BOOKING_SELECT, booking_from_row, money_to_sql, seat_from_row, seats_to_sql};
use boxoffice_core::error::StoreError;
use boxoffice_core::ledger::BookingLedger;
use boxoffice_core::types::{
    Booking, BookingId, BookingSeat, BookingStatus, GatewayPaymentId, UserId,
};
use futures::future::BoxFuture;
use sqlx::Row;
use sqlx::postgres::PgRow;
use std::collections::HashMap;
use uuid::Uuid;

impl PostgresBoxOffice {
    /// Writes payment, booking and seat rows in one transaction.
    ///
    /// The payment row goes first so a replayed commit fails on the
    /// payment key before any seat constraint is evaluated.
    async fn write_booking(&self, booking: &Booking) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let payment = &booking.payment;

        sqlx::query(
            r"
            INSERT INTO payments (gateway_payment_id, order_id, amount, currency, verified_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(payment.payment_id.as_str())
        .bind(payment.order_id.as_str())
        .bind(encode(money_to_sql(payment.amount))?)
        .bind(&payment.currency)
        .bind(payment.verified_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO bookings (
                id, user_id, showtime_id, payment_id, original_amount,
                discount, total_amount, offer_code, status, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(*booking.id.as_uuid())
        .bind(*booking.user_id.as_uuid())
        .bind(*booking.showtime_id.as_uuid())
        .bind(payment.payment_id.as_str())
        .bind(encode(money_to_sql(booking.original_amount))?)
        .bind(encode(money_to_sql(booking.discount))?)
        .bind(encode(money_to_sql(booking.total_amount))?)
        .bind(booking.offer_code.as_deref())
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&mut *tx)
        .await?;

        let numbers = encode(seats_to_sql(&booking.seat_numbers()))?;
        let tiers: Vec<String> = booking
            .seats
            .iter()
            .map(|s| s.tier.as_str().to_string())
            .collect();
        let prices = booking
            .seats
            .iter()
            .map(|s| money_to_sql(s.price))
            .collect::<Result<Vec<i64>, _>>();
        let prices = encode(prices)?;

        sqlx::query(
            r"
            INSERT INTO booking_seats (booking_id, showtime_id, seat_number, tier, price)
            SELECT $1, $2, seat.number, seat.tier, seat.price
            FROM UNNEST($3::int4[], $4::text[], $5::int8[]) AS seat(number, tier, price)
            ",
        )
        .bind(*booking.id.as_uuid())
        .bind(*booking.showtime_id.as_uuid())
        .bind(numbers)
        .bind(tiers)
        .bind(prices)
        .execute(&mut *tx)
        .await?;

        tx.commit().await
    }

    async fn load_seats(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<BookingSeat>>, StoreError> {
        let rows = sqlx::query(
            r"
            SELECT booking_id, seat_number, tier, price
            FROM booking_seats
            WHERE booking_id = ANY($1)
            ORDER BY booking_id, seat_number
            ",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        let mut seats: HashMap<Uuid, Vec<BookingSeat>> = HashMap::new();
        for row in &rows {
            let (booking_id, seat) = seat_from_row(row)?;
            seats.entry(booking_id).or_default().push(seat);
        }
        Ok(seats)
    }

    async fn assemble(&self, rows: &[PgRow]) -> Result<Vec<Booking>, StoreError> {
        let ids = rows
            .iter()
            .map(|row| row.try_get::<Uuid, _>("id").map_err(store_error))
            .collect::<Result<Vec<_>, _>>()?;
        let mut seats = self.load_seats(&ids).await?;

        rows.iter()
            .zip(&ids)
            .map(|(row, id)| booking_from_row(row, seats.remove(id).unwrap_or_default()))
            .collect()
    }

    async fn assemble_one(&self, row: Option<PgRow>) -> Result<Option<Booking>, StoreError> {
        match row {
            Some(row) => Ok(self.assemble(std::slice::from_ref(&row)).await?.pop()),
            None => Ok(None),
        }
    }
}

/// Carries a conversion failure out of a `sqlx::Error` pipeline.
fn encode<T>(value: Result<T, StoreError>) -> Result<T, sqlx::Error> {
    value.map_err(|e| sqlx::Error::Encode(Box::new(e)))
}

impl BookingLedger for PostgresBoxOffice {
    fn insert<'a>(&'a self, booking: &'a Booking) -> BoxFuture<'a, Result<BookingId, StoreError>> {
        Box::pin(async move {
            let Err(err) = self.write_booking(booking).await else {
                tracing::debug!(booking_id = %booking.id, "Booking written");
                return Ok(booking.id);
            };

            match violated_constraint(&err) {
                Some(PAYMENT_PKEY | BOOKING_PAYMENT_KEY) => Err(StoreError::DuplicatePayment {
                    payment_id: booking.payment.payment_id.clone(),
                }),
                Some(BOOKED_SEAT_INDEX) => {
                    let requested = booking.seat_numbers();
                    let mut seats = self.taken_seats(booking.showtime_id, &requested).await?;
                    if seats.is_empty() {
                        // The competing booking was cancelled in between.
                        seats = requested;
                    }
                    tracing::warn!(
                        showtime_id = %booking.showtime_id,
                        seats = ?seats,
                        "Seat constraint rejected booking"
                    );
                    Err(StoreError::SeatConflict { seats })
                }
                _ => Err(store_error(err)),
            }
        })
    }

    fn find_by_id(&self, id: BookingId) -> BoxFuture<'_, Result<Option<Booking>, StoreError>> {
        Box::pin(async move {
            let sql = format!("{BOOKING_SELECT} WHERE b.id = $1");
            let row = sqlx::query(&sql)
                .bind(*id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;
            self.assemble_one(row).await
        })
    }

    fn find_by_user(&self, user_id: UserId) -> BoxFuture<'_, Result<Vec<Booking>, StoreError>> {
        Box::pin(async move {
            let sql = format!("{BOOKING_SELECT} WHERE b.user_id = $1 ORDER BY b.created_at DESC");
            let rows = sqlx::query(&sql)
                .bind(*user_id.as_uuid())
                .fetch_all(&self.pool)
                .await
                .map_err(store_error)?;
            self.assemble(&rows).await
        })
    }

    fn find_by_payment_id<'a>(
        &'a self,
        payment_id: &'a GatewayPaymentId,
    ) -> BoxFuture<'a, Result<Option<Booking>, StoreError>> {
        Box::pin(async move {
            let sql = format!("{BOOKING_SELECT} WHERE b.payment_id = $1");
            let row = sqlx::query(&sql)
                .bind(payment_id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;
            self.assemble_one(row).await
        })
    }

    fn cancel(&self, id: BookingId) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await.map_err(store_error)?;

            let status: Option<String> =
                sqlx::query_scalar("SELECT status FROM bookings WHERE id = $1 FOR UPDATE")
                    .bind(*id.as_uuid())
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(store_error)?;

            match status.as_deref().and_then(BookingStatus::parse) {
                None => return Err(StoreError::NotFound),
                Some(BookingStatus::Cancelled) => return Ok(false),
                Some(BookingStatus::Confirmed) => {}
            }

            sqlx::query("UPDATE bookings SET status = 'cancelled' WHERE id = $1")
                .bind(*id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;
            sqlx::query("UPDATE booking_seats SET status = 'cancelled' WHERE booking_id = $1")
                .bind(*id.as_uuid())
                .execute(&mut *tx)
                .await
                .map_err(store_error)?;

            tx.commit().await.map_err(store_error)?;
            tracing::info!(booking_id = %id, "Booking cancelled in ledger");
            Ok(true)
        })
    }
}
