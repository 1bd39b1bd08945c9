//! M-Pesa (Daraja) STK push payments: initiation, the gateway client, and
//! reconciliation of the asynchronous result callback.

use async_trait::async_trait;

use crate::{
    config::MpesaConfig,
    error::{AppError, Result},
};

pub mod callback;
pub mod mpesa_client;
pub mod reconciler;
pub mod stk_push;

pub use callback::{CallbackOutcome, CallbackResult, SettlementDetails};
pub use mpesa_client::DarajaClient;
pub use reconciler::{CallbackReconciler, Decision, ReconcileOutcome};
pub use stk_push::{StkPushAccepted, StkPushPayload, StkPushRequest, StkPushResponse, StkPushService};

/// The five deployment secrets a push needs, resolved from configuration.
#[derive(Debug, Clone)]
pub struct MpesaCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub business_short_code: String,
    pub passkey: String,
    pub callback_url: String,
}

impl MpesaCredentials {
    pub fn from_config(config: &MpesaConfig) -> Result<Self> {
        fn present(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        let mut missing = Vec::new();
        let mut take = |name: &'static str, value: &Option<String>| {
            let value = present(value);
            if value.is_none() {
                missing.push(name);
            }
            value.unwrap_or_default()
        };

        let credentials = Self {
            consumer_key: take("consumer_key", &config.consumer_key),
            consumer_secret: take("consumer_secret", &config.consumer_secret),
            business_short_code: take("business_short_code", &config.business_short_code),
            passkey: take("passkey", &config.passkey),
            callback_url: take("callback_url", &config.callback_url),
        };

        if !missing.is_empty() {
            return Err(AppError::Configuration(format!(
                "Missing M-Pesa configuration: {}",
                missing.join(", ")
            )));
        }

        Ok(credentials)
    }
}

/// Outbound calls to the mobile-money gateway.
#[async_trait]
pub trait MpesaGateway: Send + Sync {
    /// OAuth client-credentials exchange for a short-lived bearer token.
    async fn access_token(&self, credentials: &MpesaCredentials) -> Result<String>;

    async fn stk_push(&self, access_token: &str, payload: &StkPushPayload) -> Result<StkPushResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_credentials_are_named() {
        let config = MpesaConfig {
            consumer_key: Some("key".to_string()),
            consumer_secret: Some("  ".to_string()),
            business_short_code: Some("174379".to_string()),
            passkey: None,
            callback_url: Some("https://example.com/cb".to_string()),
            ..MpesaConfig::default()
        };

        match MpesaCredentials::from_config(&config) {
            Err(AppError::Configuration(msg)) => {
                assert!(msg.contains("consumer_secret"));
                assert!(msg.contains("passkey"));
                assert!(!msg.contains("consumer_key"));
            }
            other => panic!("expected configuration error, got {:?}", other),
        }
    }
}
