use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::MpesaConfig,
    domain::{Payment, PaymentStatus, MPESA_PAYMENT_METHOD},
    error::{AppError, Result},
    payments::{MpesaCredentials, MpesaGateway},
    repository::{PaymentRepository, ShopRepository},
};

const TRANSACTION_TYPE: &str = "CustomerPayBillOnline";
const SUCCESS_CODE: &str = "0";

/// Inbound body of `POST /api/payments/stk-push`. Every field is optional at
/// the serde level so that absent fields surface as validation errors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StkPushRequest {
    pub phone_number: Option<String>,
    pub amount: Option<f64>,
    pub shop_name: Option<String>,
    pub account_reference: Option<String>,
    pub transaction_desc: Option<String>,
    pub shop_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq)]
struct ValidatedPush {
    phone_number: String,
    amount: i64,
    shop_name: String,
    account_reference: String,
    transaction_desc: String,
    shop_id: Option<Uuid>,
}

/// Body sent to the Daraja `processrequest` endpoint.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushPayload {
    pub business_short_code: String,
    pub password: String,
    pub timestamp: String,
    pub transaction_type: String,
    pub amount: i64,
    pub party_a: String,
    pub party_b: String,
    pub phone_number: String,
    #[serde(rename = "CallBackURL")]
    pub callback_url: String,
    pub account_reference: String,
    pub transaction_desc: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID", default)]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID", default)]
    pub checkout_request_id: String,
    #[serde(rename = "ResponseCode")]
    pub response_code: String,
    #[serde(rename = "ResponseDescription", default)]
    pub response_description: String,
    #[serde(rename = "CustomerMessage", default)]
    pub customer_message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StkPushAccepted {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub customer_message: String,
}

/// Kenyan mobile number in international form: `254` then nine digits.
pub fn is_valid_phone_number(phone: &str) -> bool {
    phone.len() == 12
        && phone.starts_with("254")
        && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Daraja request timestamp, `YYYYMMDDHHMMSS`.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// base64(short code + passkey + timestamp), as Daraja verifies it.
pub fn password(business_short_code: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{}{}{}", business_short_code, passkey, timestamp))
}

fn required(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl StkPushRequest {
    fn validate(&self) -> Result<ValidatedPush> {
        let phone_number = required(&self.phone_number);
        let shop_name = required(&self.shop_name);
        let account_reference = required(&self.account_reference);
        let transaction_desc = required(&self.transaction_desc);

        let mut missing = Vec::new();
        if phone_number.is_none() {
            missing.push("phoneNumber");
        }
        if self.amount.is_none() {
            missing.push("amount");
        }
        if shop_name.is_none() {
            missing.push("shopName");
        }
        if account_reference.is_none() {
            missing.push("accountReference");
        }
        if transaction_desc.is_none() {
            missing.push("transactionDesc");
        }
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let phone_number = phone_number.unwrap_or_default();
        if !is_valid_phone_number(&phone_number) {
            return Err(AppError::Validation("Invalid phone number format".to_string()));
        }

        let amount = self.amount.unwrap_or_default();
        if !amount.is_finite() || amount <= 0.0 {
            return Err(AppError::Validation("Amount must be greater than 0".to_string()));
        }
        // The gateway only accepts whole currency units.
        let rounded = amount.round();
        if rounded < 1.0 || rounded > (i64::MAX / 100) as f64 {
            return Err(AppError::Validation("Amount must be at least 1 after rounding".to_string()));
        }

        Ok(ValidatedPush {
            phone_number,
            amount: rounded as i64,
            shop_name: shop_name.unwrap_or_default(),
            account_reference: account_reference.unwrap_or_default(),
            transaction_desc: transaction_desc.unwrap_or_default(),
            shop_id: self.shop_id,
        })
    }
}

/// Sends the STK prompt and books the matching pending payment.
pub struct StkPushService {
    gateway: Arc<dyn MpesaGateway>,
    payment_repo: Arc<dyn PaymentRepository>,
    shop_repo: Arc<dyn ShopRepository>,
    config: MpesaConfig,
}

impl StkPushService {
    pub fn new(
        gateway: Arc<dyn MpesaGateway>,
        payment_repo: Arc<dyn PaymentRepository>,
        shop_repo: Arc<dyn ShopRepository>,
        config: MpesaConfig,
    ) -> Self {
        Self {
            gateway,
            payment_repo,
            shop_repo,
            config,
        }
    }

    pub async fn initiate(&self, request: StkPushRequest) -> Result<StkPushAccepted> {
        self.initiate_at(request, Utc::now()).await
    }

    pub async fn initiate_at(&self, request: StkPushRequest, now: DateTime<Utc>) -> Result<StkPushAccepted> {
        let push = request.validate()?;

        if let Some(shop_id) = push.shop_id {
            if self.shop_repo.find_by_id(shop_id).await?.is_none() {
                return Err(AppError::Validation(format!("Unknown shop: {}", shop_id)));
            }
        }

        let credentials = MpesaCredentials::from_config(&self.config)?;

        let access_token = self.gateway.access_token(&credentials).await?;

        let timestamp = timestamp(now);
        let payload = StkPushPayload {
            business_short_code: credentials.business_short_code.clone(),
            password: password(&credentials.business_short_code, &credentials.passkey, &timestamp),
            timestamp,
            transaction_type: TRANSACTION_TYPE.to_string(),
            amount: push.amount,
            party_a: push.phone_number.clone(),
            party_b: credentials.business_short_code.clone(),
            phone_number: push.phone_number.clone(),
            callback_url: credentials.callback_url.clone(),
            account_reference: push.account_reference.clone(),
            transaction_desc: push.transaction_desc.clone(),
        };

        let response = self.gateway.stk_push(&access_token, &payload).await?;

        if response.response_code != SUCCESS_CODE {
            tracing::warn!(
                shop = %push.shop_name,
                code = %response.response_code,
                "STK push rejected: {}",
                response.response_description
            );
            let message = if response.response_description.is_empty() {
                "Payment request failed".to_string()
            } else {
                response.response_description
            };
            return Err(AppError::PaymentRejected(message));
        }

        if response.merchant_request_id.trim().is_empty() || response.checkout_request_id.trim().is_empty() {
            tracing::error!(
                shop = %push.shop_name,
                "STK push accepted without request identifiers"
            );
            return Err(AppError::Upstream(
                "STK push response is missing request identifiers".to_string(),
            ));
        }

        tracing::info!(
            shop = %push.shop_name,
            checkout_request_id = %response.checkout_request_id,
            amount = push.amount,
            "STK push accepted by gateway"
        );

        self.record_pending(&push, &response, now).await;

        Ok(StkPushAccepted {
            merchant_request_id: response.merchant_request_id,
            checkout_request_id: response.checkout_request_id,
            customer_message: response.customer_message,
        })
    }

    /// The prompt is already on the customer's phone, so a failed insert is
    /// logged for manual reconciliation and never fails the request.
    async fn record_pending(&self, push: &ValidatedPush, response: &StkPushResponse, now: DateTime<Utc>) {
        let payment = Payment {
            id: Uuid::new_v4(),
            shop_id: push.shop_id,
            amount_cents: push.amount * 100,
            currency: self.config.currency.clone(),
            status: PaymentStatus::Pending,
            due_date: now,
            payment_date: None,
            payment_method: Some(MPESA_PAYMENT_METHOD.to_string()),
            transaction_id: None,
            checkout_request_id: Some(response.checkout_request_id.clone()),
            merchant_request_id: Some(response.merchant_request_id.clone()),
            phone_number: Some(push.phone_number.clone()),
            notes: Some(push.transaction_desc.clone()),
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.payment_repo.create(payment).await {
            tracing::error!(
                checkout_request_id = %response.checkout_request_id,
                merchant_request_id = %response.merchant_request_id,
                phone = %push.phone_number,
                amount = push.amount,
                "Failed to store pending M-Pesa payment: {}",
                e
            );
        }
    }
}
