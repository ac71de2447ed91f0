//! Row decoding and numeric conversions between domain and SQL types.

use crate::error::store_error;
use boxoffice_core::error::StoreError;
use boxoffice_core::offer::{DiscountKind, Offer, OfferScope};
use boxoffice_core::seat_map::SeatMap;
use boxoffice_core::types::{
    Booking, BookingId, BookingSeat, BookingStatus, GatewayPaymentId, Money, MovieId, OrderId,
    Payment, ScreenId, SeatNumber, Showtime, ShowtimeId, ShowtimeStatus, TheatreId, Tier, UserId,
};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{Decode, Postgres, Row, Type};
use uuid::Uuid;

pub(crate) const SHOWTIME_COLUMNS: &str = "id, movie_id, theatre_id, screen_id, starts_at, \
     capacity, tier_boundary, normal_price, vip_price, status";

pub(crate) const BOOKING_SELECT: &str = r"
    SELECT b.id, b.user_id, b.showtime_id, b.original_amount, b.discount, b.total_amount,
           b.offer_code, b.status, b.created_at,
           p.gateway_payment_id, p.order_id, p.amount, p.currency, p.verified_at
    FROM bookings b
    JOIN payments p ON p.gateway_payment_id = b.payment_id
";

pub(crate) const OFFER_COLUMNS: &str = "code, description, kind, scope, min_purchase, \
     usage_limit, usage_count, valid_from, valid_until, active";

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, StoreError>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(name).map_err(store_error)
}

fn corrupt(what: &str, value: impl std::fmt::Display) -> StoreError {
    StoreError::Database(format!("invalid {what} in database: {value}"))
}

pub(crate) fn money_to_sql(amount: Money) -> Result<i64, StoreError> {
    i64::try_from(amount.units()).map_err(|_| corrupt("amount", amount))
}

pub(crate) fn money_from_sql(value: i64) -> Result<Money, StoreError> {
    u64::try_from(value)
        .map(Money::new)
        .map_err(|_| corrupt("amount", value))
}

pub(crate) fn seat_to_sql(seat: SeatNumber) -> Result<i32, StoreError> {
    i32::try_from(seat.get()).map_err(|_| corrupt("seat number", seat))
}

pub(crate) fn seat_from_sql(value: i32) -> Result<SeatNumber, StoreError> {
    u32::try_from(value)
        .map(SeatNumber::new)
        .map_err(|_| corrupt("seat number", value))
}

pub(crate) fn count_to_sql(value: u32) -> Result<i32, StoreError> {
    i32::try_from(value).map_err(|_| corrupt("count", value))
}

fn count_from_sql(value: i32) -> Result<u32, StoreError> {
    u32::try_from(value).map_err(|_| corrupt("count", value))
}

pub(crate) fn seats_to_sql(seats: &[SeatNumber]) -> Result<Vec<i32>, StoreError> {
    seats.iter().copied().map(seat_to_sql).collect()
}

pub(crate) fn showtime_from_row(row: &PgRow) -> Result<Showtime, StoreError> {
    let capacity = count_from_sql(column(row, "capacity")?)?;
    let boundary = count_from_sql(column(row, "tier_boundary")?)?;
    let normal = money_from_sql(column(row, "normal_price")?)?;
    let vip = money_from_sql(column(row, "vip_price")?)?;
    let seat_map = SeatMap::with_boundary(capacity, boundary, normal, vip)
        .map_err(|e| StoreError::Database(e.to_string()))?;

    let status: String = column(row, "status")?;
    let status = ShowtimeStatus::parse(&status).ok_or_else(|| corrupt("showtime status", &status))?;

    Ok(Showtime::from_parts(
        ShowtimeId::from_uuid(column(row, "id")?),
        MovieId::from_uuid(column(row, "movie_id")?),
        TheatreId::from_uuid(column(row, "theatre_id")?),
        ScreenId::from_uuid(column(row, "screen_id")?),
        column(row, "starts_at")?,
        status,
        seat_map,
    ))
}

pub(crate) fn seat_from_row(row: &PgRow) -> Result<(Uuid, BookingSeat), StoreError> {
    let tier: String = column(row, "tier")?;
    let seat = BookingSeat {
        seat_number: seat_from_sql(column(row, "seat_number")?)?,
        tier: Tier::parse(&tier).ok_or_else(|| corrupt("tier", &tier))?,
        price: money_from_sql(column(row, "price")?)?,
    };
    Ok((column(row, "booking_id")?, seat))
}

/// Decodes a [`BOOKING_SELECT`] row; seats are loaded separately.
pub(crate) fn booking_from_row(row: &PgRow, seats: Vec<BookingSeat>) -> Result<Booking, StoreError> {
    let status: String = column(row, "status")?;
    let status = BookingStatus::parse(&status).ok_or_else(|| corrupt("booking status", &status))?;

    Ok(Booking {
        id: BookingId::from_uuid(column(row, "id")?),
        user_id: UserId::from_uuid(column(row, "user_id")?),
        showtime_id: ShowtimeId::from_uuid(column(row, "showtime_id")?),
        seats,
        original_amount: money_from_sql(column(row, "original_amount")?)?,
        discount: money_from_sql(column(row, "discount")?)?,
        total_amount: money_from_sql(column(row, "total_amount")?)?,
        offer_code: column(row, "offer_code")?,
        status,
        created_at: column(row, "created_at")?,
        payment: Payment {
            order_id: OrderId::new(column::<String>(row, "order_id")?),
            payment_id: GatewayPaymentId::new(column::<String>(row, "gateway_payment_id")?),
            amount: money_from_sql(column(row, "amount")?)?,
            currency: column(row, "currency")?,
            verified_at: column(row, "verified_at")?,
        },
    })
}

pub(crate) fn offer_from_row(row: &PgRow) -> Result<Offer, StoreError> {
    let Json(kind): Json<DiscountKind> = column(row, "kind")?;
    let Json(scope): Json<OfferScope> = column(row, "scope")?;

    Ok(Offer {
        code: column(row, "code")?,
        description: column(row, "description")?,
        kind,
        min_purchase: money_from_sql(column(row, "min_purchase")?)?,
        usage_limit: count_from_sql(column(row, "usage_limit")?)?,
        usage_count: count_from_sql(column(row, "usage_count")?)?,
        valid_from: column(row, "valid_from")?,
        valid_until: column(row, "valid_until")?,
        scope,
        active: column(row, "active")?,
    })
}
