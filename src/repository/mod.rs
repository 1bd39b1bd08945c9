use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;
use crate::domain::*;
use crate::error::Result;

pub mod payment_repository;
pub mod shop_repository;
pub mod reminder_repository;

pub use payment_repository::SqlitePaymentRepository;
pub use shop_repository::SqliteShopRepository;
pub use reminder_repository::SqliteReminderRepository;

#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn create(&self, payment: Payment) -> Result<Payment>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Payment>>;
    async fn find_by_checkout_request_id(&self, checkout_request_id: &str) -> Result<Option<Payment>>;
    async fn find_by_shop(&self, shop_id: Uuid) -> Result<Vec<Payment>>;
    async fn latest_overdue_for_shop(&self, shop_id: Uuid) -> Result<Option<Payment>>;
    async fn list(&self, status: Option<PaymentStatus>) -> Result<Vec<Payment>>;
    /// Writes every mutable column, but only while the stored status still
    /// equals `expected_status`. Fails with `Conflict` otherwise.
    async fn update(&self, payment: Payment, expected_status: PaymentStatus) -> Result<Payment>;
    /// Compare-and-swap finalization of an open payment. Returns `None` when no
    /// open payment carries this checkout request id.
    async fn settle_open(&self, checkout_request_id: &str, settlement: &Settlement) -> Result<Option<Payment>>;
    /// Flags pending payments due before `cutoff` as overdue. Returns the number flagged.
    async fn mark_overdue(&self, cutoff: DateTime<Utc>) -> Result<u64>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait ShopRepository: Send + Sync {
    async fn create(&self, shop: CreateShopRequest) -> Result<Shop>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Shop>>;
    async fn list(&self, filter: &ShopFilter) -> Result<Vec<Shop>>;
    async fn list_billable(&self) -> Result<Vec<Shop>>;
    async fn update_status(&self, id: Uuid, status: ShopStatus) -> Result<Shop>;
    /// Overwrites only the fields present in `changes`.
    async fn update_details(&self, id: Uuid, changes: &UpdateShopRequest) -> Result<Shop>;
    /// Payments and reminders for the shop go with it.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait ReminderRepository: Send + Sync {
    async fn create(&self, reminder: PaymentReminder) -> Result<PaymentReminder>;
    async fn list_by_shop(&self, shop_id: Uuid) -> Result<Vec<PaymentReminder>>;
}
