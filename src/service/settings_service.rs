use chrono::{Utc, NaiveDateTime, DateTime};
use sqlx::{SqlitePool, FromRow};

use crate::{
    domain::{amount_to_cents, BillingSettings, UpdateBillingSettingsRequest, MAX_PAYMENT_DURATION_DAYS},
    error::{AppError, Result},
};

#[derive(FromRow)]
struct BillingRow {
    monthly_fee_cents: i64,
    payment_duration_days: i64,
    updated_at: NaiveDateTime,
}

/// Reads and writes the single `billing_settings` row.
pub struct SettingsService {
    pool: SqlitePool,
}

impl SettingsService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_billing(&self) -> Result<BillingSettings> {
        let row = sqlx::query_as::<_, BillingRow>(
            r#"
            SELECT monthly_fee_cents, payment_duration_days, updated_at
            FROM billing_settings
            WHERE id = 1
            "#
        )
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Billing settings not found".to_string()))?;

        Ok(BillingSettings {
            monthly_fee_cents: row.monthly_fee_cents,
            payment_duration_days: row.payment_duration_days,
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    pub async fn update_billing(&self, request: UpdateBillingSettingsRequest) -> Result<BillingSettings> {
        let current = self.get_billing().await?;

        let monthly_fee_cents = match request.monthly_fee {
            Some(fee) => amount_to_cents(fee)
                .ok_or_else(|| AppError::Validation("Monthly fee must be greater than 0".to_string()))?,
            None => current.monthly_fee_cents,
        };

        let payment_duration_days = match request.payment_duration {
            Some(days) if (1..=MAX_PAYMENT_DURATION_DAYS).contains(&days) => days,
            Some(_) => {
                return Err(AppError::Validation(format!(
                    "Payment duration must be between 1 and {} days",
                    MAX_PAYMENT_DURATION_DAYS
                )))
            }
            None => current.payment_duration_days,
        };

        sqlx::query(
            r#"
            UPDATE billing_settings
            SET monthly_fee_cents = ?, payment_duration_days = ?, updated_at = ?
            WHERE id = 1
            "#
        )
        .bind(monthly_fee_cents)
        .bind(payment_duration_days)
        .bind(Utc::now().naive_utc())
        .execute(&self.pool)
        .await?;

        tracing::info!(monthly_fee_cents, payment_duration_days, "Billing settings updated");

        self.get_billing().await
    }
}
