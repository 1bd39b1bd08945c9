use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shop {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub industry: String,
    pub shop_number: String,
    pub city: String,
    pub mall: String,
    pub contact_number: String,
    pub owner_email: Option<String>,
    pub status: ShopStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShopStatus {
    Pending,
    Approved,
    Rejected,
    Active,
    Inactive,
}

impl ShopStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShopStatus::Pending => "pending",
            ShopStatus::Approved => "approved",
            ShopStatus::Rejected => "rejected",
            ShopStatus::Active => "active",
            ShopStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ShopStatus::Pending),
            "approved" => Some(ShopStatus::Approved),
            "rejected" => Some(ShopStatus::Rejected),
            "active" => Some(ShopStatus::Active),
            "inactive" => Some(ShopStatus::Inactive),
            _ => None,
        }
    }

    /// Shops past moderation, whose visibility follows billing.
    pub fn is_billable(&self) -> bool {
        matches!(self, ShopStatus::Approved | ShopStatus::Active | ShopStatus::Inactive)
    }

    /// Statuses a shopper may browse.
    pub fn is_listed(&self) -> bool {
        matches!(self, ShopStatus::Approved | ShopStatus::Active)
    }
}

impl std::fmt::Display for ShopStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShopRequest {
    pub owner_id: Uuid,
    pub name: String,
    pub logo_url: Option<String>,
    pub industry: String,
    pub shop_number: String,
    pub city: String,
    pub mall: String,
    pub contact_number: String,
    pub owner_email: Option<String>,
}

/// Partial edit of a shop's listing details. Status moves only through
/// moderation and billing, so it is not editable here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShopRequest {
    pub name: Option<String>,
    pub logo_url: Option<String>,
    pub industry: Option<String>,
    pub shop_number: Option<String>,
    pub city: Option<String>,
    pub mall: Option<String>,
    pub contact_number: Option<String>,
    pub owner_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopFilter {
    pub owner_id: Option<Uuid>,
    pub status: Option<ShopStatus>,
    pub city: Option<String>,
    pub mall: Option<String>,
    pub industry: Option<String>,
}
