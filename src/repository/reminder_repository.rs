use async_trait::async_trait;
use chrono::{DateTime, Utc, NaiveDateTime};
use sqlx::{SqlitePool, FromRow};
use uuid::Uuid;

use crate::{
    domain::{PaymentReminder, ReminderStatus},
    error::{AppError, Result},
    repository::ReminderRepository,
};

#[derive(FromRow)]
struct ReminderRow {
    id: String,
    shop_id: String,
    sent_at: NaiveDateTime,
    status: String,
    message: String,
}

pub struct SqliteReminderRepository {
    pool: SqlitePool,
}

impl SqliteReminderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_reminder(row: ReminderRow) -> Result<PaymentReminder> {
        Ok(PaymentReminder {
            id: Uuid::parse_str(&row.id).map_err(|e| AppError::Database(e.to_string()))?,
            shop_id: Uuid::parse_str(&row.shop_id).map_err(|e| AppError::Database(e.to_string()))?,
            sent_at: DateTime::from_naive_utc_and_offset(row.sent_at, Utc),
            status: ReminderStatus::from_str(&row.status)
                .ok_or_else(|| AppError::Database(format!("Invalid reminder status: {}", row.status)))?,
            message: row.message,
        })
    }
}

#[async_trait]
impl ReminderRepository for SqliteReminderRepository {
    async fn create(&self, reminder: PaymentReminder) -> Result<PaymentReminder> {
        sqlx::query(
            "INSERT INTO payment_reminders (id, shop_id, sent_at, status, message) VALUES (?, ?, ?, ?, ?)"
        )
        .bind(reminder.id.to_string())
        .bind(reminder.shop_id.to_string())
        .bind(reminder.sent_at.naive_utc())
        .bind(reminder.status.as_str())
        .bind(&reminder.message)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(reminder)
    }

    async fn list_by_shop(&self, shop_id: Uuid) -> Result<Vec<PaymentReminder>> {
        let rows = sqlx::query_as::<_, ReminderRow>(
            r#"
            SELECT id, shop_id, sent_at, status, message
            FROM payment_reminders
            WHERE shop_id = ?
            ORDER BY sent_at DESC
            "#
        )
        .bind(shop_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

        rows.into_iter()
            .map(Self::row_to_reminder)
            .collect()
    }
}
