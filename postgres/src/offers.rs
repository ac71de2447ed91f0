use crate::PostgresBoxOffice;
use crate::error::store_error;
use crate::rows::{OFFER_COLUMNS, count_to_sql, money_to_sql, offer_from_row};
use boxoffice_core::error::StoreError;
use boxoffice_core::offer::{Offer, OfferService, normalize_code};
use futures::future::BoxFuture;
use sqlx::types::Json;

impl PostgresBoxOffice {
    /// Creates or replaces an offer. Codes are stored upper-case.
    ///
    /// # Errors
    ///
    /// Returns the mapped database error if the write fails.
    pub async fn put_offer(&self, offer: &Offer) -> Result<(), StoreError> {
        sqlx::query(
            r"
            INSERT INTO offers (
                code, description, kind, scope, min_purchase,
                usage_limit, usage_count, valid_from, valid_until, active
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (code) DO UPDATE SET
                description = EXCLUDED.description,
                kind = EXCLUDED.kind,
                scope = EXCLUDED.scope,
                min_purchase = EXCLUDED.min_purchase,
                usage_limit = EXCLUDED.usage_limit,
                usage_count = EXCLUDED.usage_count,
                valid_from = EXCLUDED.valid_from,
                valid_until = EXCLUDED.valid_until,
                active = EXCLUDED.active
            ",
        )
        .bind(normalize_code(&offer.code))
        .bind(&offer.description)
        .bind(Json(&offer.kind))
        .bind(Json(&offer.scope))
        .bind(money_to_sql(offer.min_purchase)?)
        .bind(count_to_sql(offer.usage_limit)?)
        .bind(count_to_sql(offer.usage_count)?)
        .bind(offer.valid_from)
        .bind(offer.valid_until)
        .bind(offer.active)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;
        Ok(())
    }
}

impl OfferService for PostgresBoxOffice {
    fn lookup(&self, code: &str) -> BoxFuture<'_, Result<Option<Offer>, StoreError>> {
        let code = normalize_code(code);
        Box::pin(async move {
            let row = sqlx::query(&format!("SELECT {OFFER_COLUMNS} FROM offers WHERE code = $1"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(store_error)?;
            row.as_ref().map(offer_from_row).transpose()
        })
    }

    fn increment_usage(&self, code: &str) -> BoxFuture<'_, Result<(), StoreError>> {
        let code = normalize_code(code);
        Box::pin(async move {
            let result =
                sqlx::query("UPDATE offers SET usage_count = usage_count + 1 WHERE code = $1")
                    .bind(&code)
                    .execute(&self.pool)
                    .await
                    .map_err(store_error)?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
            tracing::debug!(offer_code = %code, "Offer usage incremented");
            Ok(())
        })
    }

    fn list_offers(&self) -> BoxFuture<'_, Result<Vec<Offer>, StoreError>> {
        Box::pin(async move {
            let rows = sqlx::query(&format!(
                "SELECT {OFFER_COLUMNS} FROM offers WHERE active ORDER BY code"
            ))
            .fetch_all(&self.pool)
            .await
            .map_err(store_error)?;
            rows.iter().map(offer_from_row).collect()
        })
    }
}
