use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::{PaymentRepository, ShopRepository},
    service::activation_service::ActivationService,
};

fn check_due_date(due_date: DateTime<Utc>) -> Result<()> {
    if is_valid_due_date(due_date) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "Due date must fall between the years {} and {}",
            DUE_DATE_YEARS.start(),
            DUE_DATE_YEARS.end()
        )))
    }
}

/// Admin-side payment bookkeeping: manual invoices and edits. Status changes
/// go through `PaymentStatus::can_transition_to`.
pub struct PaymentService {
    payment_repo: Arc<dyn PaymentRepository>,
    shop_repo: Arc<dyn ShopRepository>,
    activation: Arc<ActivationService>,
    default_currency: String,
}

impl PaymentService {
    pub fn new(
        payment_repo: Arc<dyn PaymentRepository>,
        shop_repo: Arc<dyn ShopRepository>,
        activation: Arc<ActivationService>,
        default_currency: String,
    ) -> Self {
        Self {
            payment_repo,
            shop_repo,
            activation,
            default_currency,
        }
    }

    pub async fn list(&self, status: Option<PaymentStatus>) -> Result<Vec<Payment>> {
        self.payment_repo.list(status).await
    }

    pub async fn get(&self, id: Uuid) -> Result<Payment> {
        self.payment_repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Payment not found".to_string()))
    }

    pub async fn list_for_shop(&self, shop_id: Uuid) -> Result<Vec<Payment>> {
        self.shop_repo.find_by_id(shop_id).await?
            .ok_or_else(|| AppError::NotFound("Shop not found".to_string()))?;
        self.payment_repo.find_by_shop(shop_id).await
    }

    /// Creates a manual invoice in `pending`.
    pub async fn create_invoice(&self, request: CreatePaymentRequest) -> Result<Payment> {
        let amount_cents = amount_to_cents(request.amount)
            .ok_or_else(|| AppError::Validation("Amount must be greater than 0".to_string()))?;
        check_due_date(request.due_date)?;

        self.shop_repo.find_by_id(request.shop_id).await?
            .ok_or_else(|| AppError::Validation(format!("Unknown shop: {}", request.shop_id)))?;

        let now = Utc::now();
        let payment = Payment {
            id: Uuid::new_v4(),
            shop_id: Some(request.shop_id),
            amount_cents,
            currency: request
                .currency
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| self.default_currency.clone()),
            status: PaymentStatus::Pending,
            due_date: request.due_date,
            payment_date: None,
            payment_method: None,
            transaction_id: None,
            checkout_request_id: None,
            merchant_request_id: None,
            phone_number: None,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        let payment = self.payment_repo.create(payment).await?;
        tracing::info!(payment_id = %payment.id, shop_id = ?payment.shop_id, "Invoice created");
        Ok(payment)
    }

    pub async fn update(&self, id: Uuid, request: UpdatePaymentRequest, now: DateTime<Utc>) -> Result<Payment> {
        let current = self.get(id).await?;
        let mut next = current.clone();

        if let Some(amount) = request.amount {
            next.amount_cents = amount_to_cents(amount)
                .ok_or_else(|| AppError::Validation("Amount must be greater than 0".to_string()))?;
        }
        if let Some(currency) = request.currency {
            next.currency = currency;
        }
        if let Some(due_date) = request.due_date {
            check_due_date(due_date)?;
            next.due_date = due_date;
        }
        if request.payment_method.is_some() {
            next.payment_method = request.payment_method;
        }
        if request.transaction_id.is_some() {
            next.transaction_id = request.transaction_id;
        }
        if request.notes.is_some() {
            next.notes = request.notes;
        }

        let target = request.status.unwrap_or(current.status);
        if target != current.status && !current.status.can_transition_to(target) {
            return Err(AppError::Conflict(format!(
                "Cannot move payment from {} to {}",
                current.status, target
            )));
        }
        next.status = target;

        // payment_date is present exactly when the payment is paid.
        next.payment_date = match (target, request.payment_date) {
            (PaymentStatus::Paid, Some(date)) => Some(date),
            (PaymentStatus::Paid, None) => current.payment_date.or(Some(now)),
            (_, Some(_)) => {
                return Err(AppError::Validation(
                    "Payment date can only be set on a paid payment".to_string(),
                ))
            }
            (_, None) => None,
        };

        let updated = self.payment_repo.update(next, current.status).await?;

        if updated.status != current.status {
            tracing::info!(payment_id = %id, from = %current.status, to = %updated.status, "Payment status changed");
            self.refresh_shop(&updated, now).await;
        }

        Ok(updated)
    }

    pub async fn mark_paid(&self, id: Uuid, request: MarkPaidRequest, now: DateTime<Utc>) -> Result<Payment> {
        let update = UpdatePaymentRequest {
            status: Some(PaymentStatus::Paid),
            payment_method: request.payment_method,
            transaction_id: request.transaction_id,
            ..Default::default()
        };
        self.update(id, update, now).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let payment = self.get(id).await?;
        self.payment_repo.delete(id).await?;
        tracing::info!(payment_id = %id, "Payment deleted");
        self.refresh_shop(&payment, Utc::now()).await;
        Ok(())
    }

    async fn refresh_shop(&self, payment: &Payment, now: DateTime<Utc>) {
        if let Some(shop_id) = payment.shop_id {
            if let Err(e) = self.activation.refresh_shop(shop_id, now).await {
                tracing::error!(%shop_id, "Failed to refresh shop activation: {}", e);
            }
        }
    }
}
