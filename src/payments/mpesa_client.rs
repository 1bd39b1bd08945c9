use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use std::time::Duration;

use crate::{
    config::MpesaConfig,
    error::{AppError, Result},
    payments::{MpesaCredentials, MpesaGateway, StkPushPayload, StkPushResponse},
};

const TOKEN_PATH: &str = "/oauth/v1/generate?grant_type=client_credentials";
const STK_PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    // Daraja sends this as a string ("3599").
    #[allow(dead_code)]
    expires_in: Option<serde_json::Value>,
}

/// reqwest client for the Safaricom Daraja API. Every call is bounded by the
/// configured timeout; expiry surfaces as `AppError::Upstream`.
pub struct DarajaClient {
    http: reqwest::Client,
    base_url: String,
}

impl DarajaClient {
    pub fn new(config: &MpesaConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl MpesaGateway for DarajaClient {
    async fn access_token(&self, credentials: &MpesaCredentials) -> Result<String> {
        let basic = STANDARD.encode(format!(
            "{}:{}",
            credentials.consumer_key, credentials.consumer_secret
        ));

        let response = self.http
            .get(format!("{}{}", self.base_url, TOKEN_PATH))
            .header(reqwest::header::AUTHORIZATION, format!("Basic {}", basic))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!(
                "Failed to get M-Pesa access token: HTTP {}",
                status
            )));
        }

        let token: AccessTokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed token response: {}", e)))?;

        Ok(token.access_token)
    }

    async fn stk_push(&self, access_token: &str, payload: &StkPushPayload) -> Result<StkPushResponse> {
        let response = self.http
            .post(format!("{}{}", self.base_url, STK_PUSH_PATH))
            .bearer_auth(access_token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "STK push request returned an error status");
            return Err(AppError::Upstream(format!(
                "Failed to initiate M-Pesa STK Push: HTTP {}",
                status
            )));
        }

        response
            .json::<StkPushResponse>()
            .await
            .map_err(|e| AppError::Upstream(format!("Malformed STK push response: {}", e)))
    }
}
