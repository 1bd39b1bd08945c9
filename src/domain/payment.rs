use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One billing obligation for one shop.
///
/// `payment_date` is set exactly when `status` is `Paid`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: Uuid,
    pub shop_id: Option<Uuid>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub due_date: DateTime<Utc>,
    pub payment_date: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub checkout_request_id: Option<String>,
    pub merchant_request_id: Option<String>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
    Overdue,
}

pub const MPESA_PAYMENT_METHOD: &str = "M-Pesa";

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Overdue => "overdue",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(PaymentStatus::Pending),
            "paid" => Some(PaymentStatus::Paid),
            "failed" => Some(PaymentStatus::Failed),
            "refunded" => Some(PaymentStatus::Refunded),
            "overdue" => Some(PaymentStatus::Overdue),
            _ => None,
        }
    }

    /// Open payments are still awaiting settlement.
    pub fn is_open(&self) -> bool {
        matches!(self, PaymentStatus::Pending | PaymentStatus::Overdue)
    }

    /// Guarded transition table. Staying in the same state is not a transition.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        match (self, next) {
            (Pending, Paid | Failed | Overdue) => true,
            (Overdue, Paid | Failed) => true,
            (Paid, Refunded) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Minor units to a display amount, e.g. 500000 -> "5000.00".
pub fn format_amount(amount_cents: i64) -> String {
    let sign = if amount_cents < 0 { "-" } else { "" };
    let abs = amount_cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Due dates outside these years are rejected on input.
pub const DUE_DATE_YEARS: std::ops::RangeInclusive<i32> = 2000..=9999;

pub fn is_valid_due_date(due_date: DateTime<Utc>) -> bool {
    DUE_DATE_YEARS.contains(&due_date.year())
}

/// Major-unit JSON amount to minor units. Rejects non-finite and non-positive values.
pub fn amount_to_cents(amount: f64) -> Option<i64> {
    if !amount.is_finite() || amount <= 0.0 {
        return None;
    }
    let cents = (amount * 100.0).round();
    if cents < 1.0 || cents > i64::MAX as f64 {
        return None;
    }
    Some(cents as i64)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub shop_id: Uuid,
    pub amount: f64,
    pub currency: Option<String>,
    pub due_date: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    pub amount: Option<f64>,
    pub currency: Option<String>,
    pub status: Option<PaymentStatus>,
    pub payment_date: Option<DateTime<Utc>>,
    pub due_date: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MarkPaidRequest {
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
}

/// Fields written when an open payment is finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    pub status: PaymentStatus,
    pub payment_date: Option<DateTime<Utc>>,
    pub transaction_id: Option<String>,
    pub phone_number: Option<String>,
    pub notes: Option<String>,
}
