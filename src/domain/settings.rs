use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Subscription pricing and coverage, editable by admins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillingSettings {
    pub monthly_fee_cents: i64,
    /// Length of the coverage window a paid payment grants, in days.
    pub payment_duration_days: i64,
    pub updated_at: DateTime<Utc>,
}

/// Longest coverage window an admin may configure, ten years.
pub const MAX_PAYMENT_DURATION_DAYS: i64 = 3650;

impl BillingSettings {
    /// Clamped so a hand-edited row cannot overflow date arithmetic.
    pub fn coverage(&self) -> Duration {
        Duration::days(self.payment_duration_days.clamp(0, MAX_PAYMENT_DURATION_DAYS))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillingSettingsRequest {
    pub monthly_fee: Option<f64>,
    pub payment_duration: Option<i64>,
}
