//! Typed schema for the Daraja STK result callback.
//!
//! ```json
//! {"Body":{"stkCallback":{"MerchantRequestID":"..","CheckoutRequestID":"..",
//!   "ResultCode":0,"ResultDesc":"..",
//!   "CallbackMetadata":{"Item":[{"Name":"MpesaReceiptNumber","Value":"ABC123"}]}}}}
//! ```

use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{AppError, Result};

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "Body")]
    body: Body,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(rename = "stkCallback")]
    stk_callback: StkCallback,
}

#[derive(Debug, Deserialize)]
struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: String,
    #[serde(rename = "ResultCode", deserialize_with = "result_code")]
    result_code: i64,
    #[serde(rename = "ResultDesc", default)]
    result_desc: String,
    #[serde(rename = "CallbackMetadata")]
    callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Deserialize)]
struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    items: Vec<CallbackItem>,
}

#[derive(Debug, Deserialize)]
struct CallbackItem {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Value", default)]
    value: Option<Value>,
}

/// Daraja sends `ResultCode` as a number; some sandboxes send a string.
fn result_code<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(code) => Ok(code),
        Raw::Str(s) => s.trim().parse().map_err(de::Error::custom),
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Settlement facts reported by the gateway for a successful push.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementDetails {
    pub receipt_number: String,
    /// Gateway-local `YYYYMMDDHHMMSS`; kept for logging only.
    pub transaction_date: Option<String>,
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallbackOutcome {
    Paid(SettlementDetails),
    Failed { result_code: i64, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct CallbackResult {
    pub merchant_request_id: String,
    pub checkout_request_id: String,
    pub outcome: CallbackOutcome,
}

impl CallbackResult {
    /// Parses and validates a raw webhook body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("Malformed STK callback: {}", e)))?;
        let callback = envelope.body.stk_callback;

        if callback.checkout_request_id.trim().is_empty() {
            return Err(AppError::BadRequest("STK callback has an empty CheckoutRequestID".to_string()));
        }

        let outcome = if callback.result_code == 0 {
            let items = callback
                .callback_metadata
                .map(|m| m.items)
                .unwrap_or_default();
            let find = |name: &str| {
                items
                    .iter()
                    .find(|item| item.name == name)
                    .and_then(|item| item.value.as_ref())
                    .and_then(value_to_string)
            };

            let receipt_number = find("MpesaReceiptNumber").ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Successful STK callback {} carries no MpesaReceiptNumber",
                    callback.checkout_request_id
                ))
            })?;

            CallbackOutcome::Paid(SettlementDetails {
                receipt_number,
                transaction_date: find("TransactionDate"),
                phone_number: find("PhoneNumber"),
            })
        } else {
            CallbackOutcome::Failed {
                result_code: callback.result_code,
                reason: callback.result_desc,
            }
        };

        Ok(Self {
            merchant_request_id: callback.merchant_request_id,
            checkout_request_id: callback.checkout_request_id,
            outcome,
        })
    }
}
