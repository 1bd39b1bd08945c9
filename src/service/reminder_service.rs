use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    notifications::{Notice, Notifier},
    repository::{PaymentRepository, ReminderRepository, ShopRepository},
};

pub struct ReminderService {
    shop_repo: Arc<dyn ShopRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    reminder_repo: Arc<dyn ReminderRepository>,
    notifier: Arc<dyn Notifier>,
}

fn default_message(shop: &Shop, payment: &Payment) -> String {
    format!(
        "Dear {} owner,\n\n\
         This is a reminder that your payment of {} {} for {} is overdue. \
         Please make your payment as soon as possible to keep your shop active on our platform.\n\n\
         Best regards,\nTeke Teke Admin Team",
        shop.name,
        payment.currency,
        format_amount(payment.amount_cents),
        shop.name
    )
}

impl ReminderService {
    pub fn new(
        shop_repo: Arc<dyn ShopRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        reminder_repo: Arc<dyn ReminderRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            shop_repo,
            payment_repo,
            reminder_repo,
            notifier,
        }
    }

    /// Notifies the owner about the shop's latest overdue payment and records
    /// the attempt. A delivery failure is recorded, not returned.
    pub async fn send_reminder(
        &self,
        shop_id: Uuid,
        custom_message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<PaymentReminder> {
        let shop = self.shop_repo.find_by_id(shop_id).await?
            .ok_or_else(|| AppError::NotFound("Shop not found".to_string()))?;

        let payment = self.payment_repo.latest_overdue_for_shop(shop_id).await?
            .ok_or_else(|| AppError::NotFound("No overdue payment found".to_string()))?;

        let message = custom_message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_message(&shop, &payment));

        let notice = Notice {
            subject: format!("Payment overdue for {}", shop.name),
            body: message.clone(),
        };

        let status = match self.notifier.notify(&shop, &notice).await {
            Ok(()) => ReminderStatus::Sent,
            Err(e) => {
                tracing::warn!(%shop_id, notifier = self.notifier.name(), "Payment reminder not delivered: {}", e);
                ReminderStatus::Failed
            }
        };

        self.reminder_repo
            .create(PaymentReminder {
                id: Uuid::new_v4(),
                shop_id,
                sent_at: now,
                status,
                message,
            })
            .await
    }

    pub async fn history(&self, shop_id: Uuid) -> Result<Vec<PaymentReminder>> {
        self.shop_repo.find_by_id(shop_id).await?
            .ok_or_else(|| AppError::NotFound("Shop not found".to_string()))?;
        self.reminder_repo.list_by_shop(shop_id).await
    }
}
