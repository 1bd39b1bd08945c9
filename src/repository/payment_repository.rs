use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    domain::{Payment, PaymentStatus, Settlement},
    error::{AppError, Result},
    repository::PaymentRepository,
};

const PAYMENT_COLUMNS: &str = r#"
    id, shop_id, amount_cents, currency, status, due_date, payment_date,
    payment_method, transaction_id, checkout_request_id, merchant_request_id,
    phone_number, notes, created_at, updated_at
"#;

#[derive(FromRow)]
struct PaymentRow {
    id: String,
    shop_id: Option<String>,
    amount_cents: i64,
    currency: String,
    status: String,
    due_date: NaiveDateTime,
    payment_date: Option<NaiveDateTime>,
    payment_method: Option<String>,
    transaction_id: Option<String>,
    checkout_request_id: Option<String>,
    merchant_request_id: Option<String>,
    phone_number: Option<String>,
    notes: Option<String>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

pub struct SqlitePaymentRepository {
    pool: SqlitePool,
}

impl SqlitePaymentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_payment(row: PaymentRow) -> Result<Payment> {
        let shop_id = match row.shop_id {
            Some(s) => Some(Uuid::parse_str(&s).map_err(|e| AppError::Database(e.to_string()))?),
            None => None,
        };

        Ok(Payment {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            shop_id,
            amount_cents: row.amount_cents,
            currency: row.currency,
            status: PaymentStatus::from_str(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid payment status: {}", row.status)))?,
            due_date: DateTime::from_naive_utc_and_offset(row.due_date, Utc),
            payment_date: row.payment_date.map(|dt| DateTime::from_naive_utc_and_offset(dt, Utc)),
            payment_method: row.payment_method,
            transaction_id: row.transaction_id,
            checkout_request_id: row.checkout_request_id,
            merchant_request_id: row.merchant_request_id,
            phone_number: row.phone_number,
            notes: row.notes,
            created_at: DateTime::from_naive_utc_and_offset(row.created_at, Utc),
            updated_at: DateTime::from_naive_utc_and_offset(row.updated_at, Utc),
        })
    }

    async fn fetch_one_where(&self, clause: &str, value: String) -> Result<Option<Payment>> {
        let sql = format!("SELECT {} FROM payments WHERE {} = ?", PAYMENT_COLUMNS, clause);
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_payment).transpose()
    }
}

#[async_trait]
impl PaymentRepository for SqlitePaymentRepository {
    async fn create(&self, payment: Payment) -> Result<Payment> {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, shop_id, amount_cents, currency, status, due_date, payment_date,
                payment_method, transaction_id, checkout_request_id, merchant_request_id,
                phone_number, notes, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#
        )
        .bind(payment.id.to_string())
        .bind(payment.shop_id.map(|id| id.to_string()))
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(payment.due_date.naive_utc())
        .bind(payment.payment_date.map(|dt| dt.naive_utc()))
        .bind(&payment.payment_method)
        .bind(&payment.transaction_id)
        .bind(&payment.checkout_request_id)
        .bind(&payment.merchant_request_id)
        .bind(&payment.phone_number)
        .bind(&payment.notes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        self.find_by_id(payment.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve created payment".to_string())
        })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>> {
        self.fetch_one_where("id", id.to_string()).await
    }

    async fn find_by_checkout_request_id(&self, checkout_request_id: &str) -> Result<Option<Payment>> {
        self.fetch_one_where("checkout_request_id", checkout_request_id.to_string()).await
    }

    async fn find_by_shop(&self, shop_id: Uuid) -> Result<Vec<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE shop_id = ? ORDER BY due_date DESC, created_at DESC",
            PAYMENT_COLUMNS
        );
        let rows = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(shop_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_payment)
            .collect()
    }

    async fn latest_overdue_for_shop(&self, shop_id: Uuid) -> Result<Option<Payment>> {
        let sql = format!(
            "SELECT {} FROM payments WHERE shop_id = ? AND status = 'overdue' ORDER BY due_date DESC LIMIT 1",
            PAYMENT_COLUMNS
        );
        let row = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(shop_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        row.map(Self::row_to_payment).transpose()
    }

    async fn list(&self, status: Option<PaymentStatus>) -> Result<Vec<Payment>> {
        let rows = match status {
            Some(status) => {
                let sql = format!(
                    "SELECT {} FROM payments WHERE status = ? ORDER BY created_at DESC",
                    PAYMENT_COLUMNS
                );
                sqlx::query_as::<_, PaymentRow>(&sql)
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!("SELECT {} FROM payments ORDER BY created_at DESC", PAYMENT_COLUMNS);
                sqlx::query_as::<_, PaymentRow>(&sql)
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_payment)
            .collect()
    }

    async fn update(&self, payment: Payment, expected_status: PaymentStatus) -> Result<Payment> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"
            UPDATE payments
            SET shop_id = ?,
                amount_cents = ?,
                currency = ?,
                status = ?,
                due_date = ?,
                payment_date = ?,
                payment_method = ?,
                transaction_id = ?,
                phone_number = ?,
                notes = ?,
                updated_at = ?
            WHERE id = ? AND status = ?
            "#
        )
        .bind(payment.shop_id.map(|id| id.to_string()))
        .bind(payment.amount_cents)
        .bind(&payment.currency)
        .bind(payment.status.as_str())
        .bind(payment.due_date.naive_utc())
        .bind(payment.payment_date.map(|dt| dt.naive_utc()))
        .bind(&payment.payment_method)
        .bind(&payment.transaction_id)
        .bind(&payment.phone_number)
        .bind(&payment.notes)
        .bind(now)
        .bind(payment.id.to_string())
        .bind(expected_status.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "Payment {} is no longer {}",
                payment.id, expected_status
            )));
        }

        self.find_by_id(payment.id).await?.ok_or_else(|| {
            AppError::Database("Failed to retrieve updated payment".to_string())
        })
    }

    async fn settle_open(&self, checkout_request_id: &str, settlement: &Settlement) -> Result<Option<Payment>> {
        let now = Utc::now().naive_utc();

        // Redelivered callbacks find no open row and leave the terminal state alone.
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = ?,
                payment_date = ?,
                transaction_id = COALESCE(?, transaction_id),
                phone_number = COALESCE(?, phone_number),
                notes = COALESCE(?, notes),
                updated_at = ?
            WHERE checkout_request_id = ?
              AND status IN ('pending', 'overdue')
            "#
        )
        .bind(settlement.status.as_str())
        .bind(settlement.payment_date.map(|dt| dt.naive_utc()))
        .bind(&settlement.transaction_id)
        .bind(&settlement.phone_number)
        .bind(&settlement.notes)
        .bind(now)
        .bind(checkout_request_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_checkout_request_id(checkout_request_id).await
    }

    async fn mark_overdue(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE payments
            SET status = 'overdue', updated_at = ?
            WHERE status = 'pending' AND due_date < ?
            "#
        )
        .bind(Utc::now().naive_utc())
        .bind(cutoff.naive_utc())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM payments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Payment not found".to_string()));
        }

        Ok(())
    }
}
