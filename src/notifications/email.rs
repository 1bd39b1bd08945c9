use async_trait::async_trait;
use lettre::{
    message::header::ContentType,
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{
    config::EmailConfig,
    domain::Shop,
    error::{AppError, Result},
    notifications::{Notice, Notifier},
};

pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailNotifier {
    pub fn new(config: &EmailConfig) -> Result<Self> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
            .map_err(|e| AppError::Notification(format!("Invalid SMTP relay: {}", e)))?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, shop: &Shop, notice: &Notice) -> Result<()> {
        let to = shop
            .owner_email
            .as_deref()
            .ok_or_else(|| AppError::Notification(format!("Shop {} has no owner email", shop.id)))?;

        let message = Message::builder()
            .from(self.from_address.parse().map_err(|e| {
                AppError::Notification(format!("Invalid from address: {}", e))
            })?)
            .to(to.parse().map_err(|e| {
                AppError::Notification(format!("Invalid recipient address {}: {}", to, e))
            })?)
            .subject(notice.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(notice.body.clone())
            .map_err(|e| AppError::Notification(format!("Failed to build email: {}", e)))?;

        self.mailer
            .send(message)
            .await
            .map_err(|e| AppError::Notification(format!("SMTP send failed: {}", e)))?;

        tracing::debug!(shop_id = %shop.id, to = %to, "Reminder email sent");
        Ok(())
    }
}
