pub mod activation_service;
pub mod payment_service;
pub mod reminder_service;
pub mod settings_service;
pub mod shop_service;

use chrono::Duration;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::config::Settings;
use crate::notifications::Notifier;
use crate::repository::*;
use activation_service::ActivationService;
use payment_service::PaymentService;
use reminder_service::ReminderService;
use settings_service::SettingsService;
use shop_service::ShopService;

pub use activation_service::SweepReport;

/// One year; longer grace values from config are clamped.
const MAX_OVERDUE_GRACE_MINUTES: i64 = 60 * 24 * 365;

pub struct ServiceContext {
    pub payment_repo: Arc<dyn PaymentRepository>,
    pub shop_repo: Arc<dyn ShopRepository>,
    pub reminder_repo: Arc<dyn ReminderRepository>,
    pub settings_service: Arc<SettingsService>,
    pub activation_service: Arc<ActivationService>,
    pub payment_service: Arc<PaymentService>,
    pub shop_service: Arc<ShopService>,
    pub reminder_service: Arc<ReminderService>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        shop_repo: Arc<dyn ShopRepository>,
        reminder_repo: Arc<dyn ReminderRepository>,
        notifier: Arc<dyn Notifier>,
        db_pool: SqlitePool,
        settings: &Settings,
    ) -> Self {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));

        let activation_service = Arc::new(ActivationService::new(
            shop_repo.clone(),
            payment_repo.clone(),
            settings_service.clone(),
            Duration::minutes(settings.billing.overdue_grace_minutes.clamp(0, MAX_OVERDUE_GRACE_MINUTES)),
        ));

        let payment_service = Arc::new(PaymentService::new(
            payment_repo.clone(),
            shop_repo.clone(),
            activation_service.clone(),
            settings.mpesa.currency.clone(),
        ));
        let shop_service = Arc::new(ShopService::new(shop_repo.clone(), activation_service.clone()));
        let reminder_service = Arc::new(ReminderService::new(
            shop_repo.clone(),
            payment_repo.clone(),
            reminder_repo.clone(),
            notifier,
        ));

        Self {
            payment_repo,
            shop_repo,
            reminder_repo,
            settings_service,
            activation_service,
            payment_service,
            shop_service,
            reminder_service,
            db_pool,
        }
    }

    /// Wires the SQLite repositories onto one pool.
    pub fn with_sqlite(pool: SqlitePool, notifier: Arc<dyn Notifier>, settings: &Settings) -> Self {
        Self::new(
            Arc::new(SqlitePaymentRepository::new(pool.clone())),
            Arc::new(SqliteShopRepository::new(pool.clone())),
            Arc::new(SqliteReminderRepository::new(pool.clone())),
            notifier,
            pool,
            settings,
        )
    }
}
