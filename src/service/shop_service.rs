use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain::*,
    error::{AppError, Result},
    repository::ShopRepository,
    service::activation_service::ActivationService,
};

pub struct ShopService {
    repo: Arc<dyn ShopRepository>,
    activation: Arc<ActivationService>,
}

impl ShopService {
    pub fn new(repo: Arc<dyn ShopRepository>, activation: Arc<ActivationService>) -> Self {
        Self { repo, activation }
    }

    pub async fn register(&self, request: CreateShopRequest) -> Result<Shop> {
        let fields = [
            ("name", &request.name),
            ("industry", &request.industry),
            ("shopNumber", &request.shop_number),
            ("city", &request.city),
            ("mall", &request.mall),
            ("contactNumber", &request.contact_number),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let shop = self.repo.create(request).await?;
        tracing::info!(shop_id = %shop.id, name = %shop.name, "Shop registered");
        Ok(shop)
    }

    pub async fn get(&self, id: Uuid) -> Result<Shop> {
        self.repo.find_by_id(id).await?
            .ok_or_else(|| AppError::NotFound("Shop not found".to_string()))
    }

    pub async fn list(&self, filter: &ShopFilter) -> Result<Vec<Shop>> {
        self.repo.list(filter).await
    }

    /// Edits listing details. Any field that is present must be non-blank.
    pub async fn update(&self, id: Uuid, changes: UpdateShopRequest) -> Result<Shop> {
        let fields = [
            ("name", &changes.name),
            ("logoUrl", &changes.logo_url),
            ("industry", &changes.industry),
            ("shopNumber", &changes.shop_number),
            ("city", &changes.city),
            ("mall", &changes.mall),
            ("contactNumber", &changes.contact_number),
            ("ownerEmail", &changes.owner_email),
        ];
        let blank: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.as_deref().is_some_and(|v| v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();
        if !blank.is_empty() {
            return Err(AppError::Validation(format!(
                "Fields cannot be blank: {}",
                blank.join(", ")
            )));
        }

        let shop = self.repo.update_details(id, &changes).await?;
        tracing::info!(shop_id = %id, "Shop details updated");
        Ok(shop)
    }

    pub async fn delete(&self, id: Uuid) -> Result<()> {
        self.repo.delete(id).await?;
        tracing::info!(shop_id = %id, "Shop deleted");
        Ok(())
    }

    /// Shops a shopper may browse. A `status` filter outside the listed set is ignored.
    pub async fn list_public(&self, mut filter: ShopFilter) -> Result<Vec<Shop>> {
        if !filter.status.map(|s| s.is_listed()).unwrap_or(false) {
            filter.status = None;
        }
        let shops = self.repo.list(&filter).await?;
        Ok(shops.into_iter().filter(|s| s.status.is_listed()).collect())
    }

    /// Moves a pending shop to approved, then lets billing decide whether it is active.
    pub async fn approve(&self, id: Uuid) -> Result<Shop> {
        self.moderate(id, ShopStatus::Approved).await?;
        self.activation.refresh_shop(id, Utc::now()).await
    }

    pub async fn reject(&self, id: Uuid) -> Result<Shop> {
        self.moderate(id, ShopStatus::Rejected).await
    }

    async fn moderate(&self, id: Uuid, decision: ShopStatus) -> Result<Shop> {
        let shop = self.get(id).await?;
        if shop.status != ShopStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Shop is {}, only pending shops can be moderated",
                shop.status
            )));
        }

        let updated = self.repo.update_status(id, decision).await?;
        tracing::info!(shop_id = %id, status = %decision, "Shop moderated");
        Ok(updated)
    }
}
