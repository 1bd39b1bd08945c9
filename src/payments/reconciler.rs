use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::{
    domain::{Payment, PaymentStatus, Settlement},
    error::Result,
    payments::{CallbackOutcome, CallbackResult},
    repository::PaymentRepository,
    service::activation_service::ActivationService,
};

/// What a callback should do to the payment it names.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Settle(Settlement),
    AlreadyFinal(PaymentStatus),
}

/// Pure transition step: current payment + gateway result -> next state.
///
/// `payment_date` is the reconciliation time `now`, not the gateway's
/// `TransactionDate`, so that all stored timestamps share one clock.
pub fn decide(current: &Payment, outcome: &CallbackOutcome, now: DateTime<Utc>) -> Decision {
    let next = match outcome {
        CallbackOutcome::Paid(_) => PaymentStatus::Paid,
        CallbackOutcome::Failed { .. } => PaymentStatus::Failed,
    };

    if !current.status.can_transition_to(next) {
        return Decision::AlreadyFinal(current.status);
    }

    let settlement = match outcome {
        CallbackOutcome::Paid(details) => Settlement {
            status: PaymentStatus::Paid,
            payment_date: Some(now),
            transaction_id: Some(details.receipt_number.clone()),
            phone_number: details.phone_number.clone(),
            notes: None,
        },
        CallbackOutcome::Failed { reason, .. } => Settlement {
            status: PaymentStatus::Failed,
            payment_date: None,
            transaction_id: None,
            phone_number: None,
            notes: Some(reason.clone()),
        },
    };

    Decision::Settle(settlement)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Settled(Payment),
    /// Redelivery for a payment that is already final.
    Duplicate(PaymentStatus),
    /// No payment carries the checkout request id (yet).
    UnknownCheckout,
    Malformed,
    Failed,
}

/// Applies gateway result callbacks to pending payments.
pub struct CallbackReconciler {
    payment_repo: Arc<dyn PaymentRepository>,
    activation: Arc<ActivationService>,
}

impl CallbackReconciler {
    pub fn new(payment_repo: Arc<dyn PaymentRepository>, activation: Arc<ActivationService>) -> Self {
        Self { payment_repo, activation }
    }

    /// Entry point for the webhook. Never returns an error: the gateway is
    /// acknowledged regardless, and every failure is logged here.
    pub async fn handle(&self, body: &[u8]) -> ReconcileOutcome {
        self.handle_at(body, Utc::now()).await
    }

    pub async fn handle_at(&self, body: &[u8], now: DateTime<Utc>) -> ReconcileOutcome {
        let callback = match CallbackResult::parse(body) {
            Ok(callback) => callback,
            Err(e) => {
                tracing::error!("Discarding STK callback: {}", e);
                return ReconcileOutcome::Malformed;
            }
        };

        match self.reconcile(&callback, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(
                    checkout_request_id = %callback.checkout_request_id,
                    merchant_request_id = %callback.merchant_request_id,
                    "Failed to reconcile STK callback: {}",
                    e
                );
                ReconcileOutcome::Failed
            }
        }
    }

    pub async fn reconcile(&self, callback: &CallbackResult, now: DateTime<Utc>) -> Result<ReconcileOutcome> {
        let checkout_id = callback.checkout_request_id.as_str();

        let Some(current) = self.payment_repo.find_by_checkout_request_id(checkout_id).await? else {
            // The initiator's insert may not have landed; the gateway redelivers.
            tracing::warn!(checkout_request_id = %checkout_id, "No payment found for STK callback");
            return Ok(ReconcileOutcome::UnknownCheckout);
        };

        let settlement = match decide(&current, &callback.outcome, now) {
            Decision::Settle(settlement) => settlement,
            Decision::AlreadyFinal(status) => {
                tracing::info!(
                    checkout_request_id = %checkout_id,
                    status = %status,
                    "Ignoring duplicate STK callback"
                );
                return Ok(ReconcileOutcome::Duplicate(status));
            }
        };

        let Some(payment) = self.payment_repo.settle_open(checkout_id, &settlement).await? else {
            // Lost a race with another delivery or an admin edit.
            let status = self.payment_repo
                .find_by_checkout_request_id(checkout_id)
                .await?
                .map(|p| p.status)
                .unwrap_or(current.status);
            tracing::info!(checkout_request_id = %checkout_id, status = %status, "STK callback already applied");
            return Ok(ReconcileOutcome::Duplicate(status));
        };

        match &callback.outcome {
            CallbackOutcome::Paid(details) => {
                tracing::info!(
                    checkout_request_id = %checkout_id,
                    merchant_request_id = %callback.merchant_request_id,
                    receipt = %details.receipt_number,
                    transaction_date = ?details.transaction_date,
                    "M-Pesa payment successful"
                );

                if let Some(shop_id) = payment.shop_id {
                    if let Err(e) = self.activation.refresh_shop(shop_id, now).await {
                        tracing::error!(%shop_id, "Failed to refresh shop activation after payment: {}", e);
                    }
                }
            }
            CallbackOutcome::Failed { result_code, reason } => {
                tracing::info!(
                    checkout_request_id = %checkout_id,
                    result_code,
                    "M-Pesa payment failed: {}",
                    reason
                );
            }
        }

        Ok(ReconcileOutcome::Settled(payment))
    }
}
