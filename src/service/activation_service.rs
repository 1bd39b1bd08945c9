use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::{Payment, PaymentStatus, Shop, ShopStatus},
    error::{AppError, Result},
    repository::{PaymentRepository, ShopRepository},
    service::settings_service::SettingsService,
};

/// End of the coverage window a payment grants, if it grants one. A window
/// running past the representable range never ends.
pub fn coverage_end(payment: &Payment, coverage: Duration) -> Option<DateTime<Utc>> {
    (payment.status == PaymentStatus::Paid).then(|| {
        payment
            .due_date
            .checked_add_signed(coverage)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    })
}

/// A shop is covered while any paid payment's window is still open.
pub fn is_covered(payments: &[Payment], coverage: Duration, now: DateTime<Utc>) -> bool {
    payments
        .iter()
        .filter_map(|p| coverage_end(p, coverage))
        .any(|end| end > now)
}

/// Status a billable shop should move to, or `None` to leave it as is.
///
/// Moderation states (`pending`, `rejected`) are never touched. An approved
/// shop that has never been covered keeps waiting for its first payment.
pub fn next_status(current: ShopStatus, covered: bool) -> Option<ShopStatus> {
    match (current, covered) {
        (ShopStatus::Approved | ShopStatus::Inactive, true) => Some(ShopStatus::Active),
        (ShopStatus::Active, false) => Some(ShopStatus::Inactive),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub overdue_marked: u64,
    pub activated: Vec<Uuid>,
    pub deactivated: Vec<Uuid>,
    pub dry_run: bool,
}

/// Derives shop visibility from payment coverage.
pub struct ActivationService {
    shop_repo: Arc<dyn ShopRepository>,
    payment_repo: Arc<dyn PaymentRepository>,
    settings_service: Arc<SettingsService>,
    overdue_grace: Duration,
}

impl ActivationService {
    pub fn new(
        shop_repo: Arc<dyn ShopRepository>,
        payment_repo: Arc<dyn PaymentRepository>,
        settings_service: Arc<SettingsService>,
        overdue_grace: Duration,
    ) -> Self {
        Self {
            shop_repo,
            payment_repo,
            settings_service,
            overdue_grace,
        }
    }

    async fn evaluate(&self, shop: &Shop, coverage: Duration, now: DateTime<Utc>) -> Result<Option<ShopStatus>> {
        if !shop.status.is_billable() {
            return Ok(None);
        }
        let payments = self.payment_repo.find_by_shop(shop.id).await?;
        Ok(next_status(shop.status, is_covered(&payments, coverage, now)))
    }

    /// Re-evaluates one shop and persists the change, if any.
    pub async fn refresh_shop(&self, shop_id: Uuid, now: DateTime<Utc>) -> Result<Shop> {
        let shop = self.shop_repo.find_by_id(shop_id).await?
            .ok_or_else(|| AppError::NotFound("Shop not found".to_string()))?;
        let coverage = self.settings_service.get_billing().await?.coverage();

        match self.evaluate(&shop, coverage, now).await? {
            Some(next) => {
                tracing::info!(shop_id = %shop.id, from = %shop.status, to = %next, "Shop activation changed");
                self.shop_repo.update_status(shop.id, next).await
            }
            None => Ok(shop),
        }
    }

    /// Flags lapsed pending payments as overdue, then re-evaluates every
    /// billable shop. With `dry_run` nothing is written.
    pub async fn sweep(&self, now: DateTime<Utc>, dry_run: bool) -> Result<SweepReport> {
        let cutoff = now
            .checked_sub_signed(self.overdue_grace)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let overdue_marked = if dry_run {
            self.payment_repo
                .list(Some(PaymentStatus::Pending))
                .await?
                .iter()
                .filter(|p| p.due_date < cutoff)
                .count() as u64
        } else {
            self.payment_repo.mark_overdue(cutoff).await?
        };

        let coverage = self.settings_service.get_billing().await?.coverage();
        let mut report = SweepReport {
            overdue_marked,
            dry_run,
            ..SweepReport::default()
        };

        for shop in self.shop_repo.list_billable().await? {
            let next = match self.evaluate(&shop, coverage, now).await {
                Ok(Some(next)) => next,
                Ok(None) => continue,
                Err(e) => {
                    tracing::error!(shop_id = %shop.id, "Failed to evaluate shop activation: {}", e);
                    continue;
                }
            };

            if !dry_run {
                if let Err(e) = self.shop_repo.update_status(shop.id, next).await {
                    tracing::error!(shop_id = %shop.id, "Failed to update shop status: {}", e);
                    continue;
                }
            }

            match next {
                ShopStatus::Active => report.activated.push(shop.id),
                _ => report.deactivated.push(shop.id),
            }
        }

        tracing::info!(
            overdue = report.overdue_marked,
            activated = report.activated.len(),
            deactivated = report.deactivated.len(),
            dry_run,
            "Billing sweep finished"
        );

        Ok(report)
    }
}
