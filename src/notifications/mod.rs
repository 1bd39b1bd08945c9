use async_trait::async_trait;

use crate::domain::Shop;
use crate::error::{AppError, Result};

pub mod email;

pub use email::EmailNotifier;

/// A message for a shop owner.
#[derive(Debug, Clone)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

/// Delivers notices to shop owners.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;
    async fn notify(&self, shop: &Shop, notice: &Notice) -> Result<()>;
}

/// Fallback used when no email transport is configured: the notice is only logged.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn notify(&self, shop: &Shop, notice: &Notice) -> Result<()> {
        let recipient = shop
            .owner_email
            .as_deref()
            .ok_or_else(|| AppError::Notification(format!("Shop {} has no owner email", shop.id)))?;

        tracing::info!(
            shop_id = %shop.id,
            to = %recipient,
            subject = %notice.subject,
            "Email transport not configured, notice logged only"
        );
        Ok(())
    }
}
