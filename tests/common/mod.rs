#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

use teketeke::{
    api::state::AppState,
    config::Settings,
    domain::{CreateShopRequest, Payment, PaymentStatus, Settlement, Shop, ShopStatus},
    error::{AppError, Result},
    notifications::LogNotifier,
    payments::{
        CallbackReconciler, MpesaCredentials, MpesaGateway, StkPushPayload, StkPushResponse,
        StkPushService,
    },
    repository::{PaymentRepository, ShopRepository},
    service::ServiceContext,
};

pub const ADMIN_TOKEN: &str = "test-admin-token";

/// Single connection so every query sees the same in-memory database.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    pool
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.auth.admin_token = ADMIN_TOKEN.to_string();
    settings.mpesa.consumer_key = Some("consumer-key".to_string());
    settings.mpesa.consumer_secret = Some("consumer-secret".to_string());
    settings.mpesa.business_short_code = Some("174379".to_string());
    settings.mpesa.passkey = Some("passkey".to_string());
    settings.mpesa.callback_url = Some("https://example.test/api/payments/stk-push".to_string());
    settings
}

/// Records every push and answers with a canned response, or fails every
/// call with `outage` when set.
pub struct StubGateway {
    pub response: StkPushResponse,
    pub outage: Option<String>,
    pub pushes: Mutex<Vec<StkPushPayload>>,
    pub token_calls: AtomicUsize,
}

impl StubGateway {
    pub fn accepting(checkout_request_id: &str) -> Self {
        Self::with_response(StkPushResponse {
            merchant_request_id: "29115-34620561-1".to_string(),
            checkout_request_id: checkout_request_id.to_string(),
            response_code: "0".to_string(),
            response_description: "Success. Request accepted for processing".to_string(),
            customer_message: "Success. Request accepted for processing".to_string(),
        })
    }

    pub fn rejecting(code: &str, description: &str) -> Self {
        Self::with_response(StkPushResponse {
            response_code: code.to_string(),
            response_description: description.to_string(),
            ..StkPushResponse::default()
        })
    }

    /// Says yes but leaves out the identifiers a callback would need.
    pub fn accepting_without_ids() -> Self {
        Self::with_response(StkPushResponse {
            response_code: "0".to_string(),
            response_description: "Success. Request accepted for processing".to_string(),
            ..StkPushResponse::default()
        })
    }

    pub fn unreachable(cause: &str) -> Self {
        Self {
            outage: Some(cause.to_string()),
            ..Self::with_response(StkPushResponse::default())
        }
    }

    fn with_response(response: StkPushResponse) -> Self {
        Self {
            response,
            outage: None,
            pushes: Mutex::new(Vec::new()),
            token_calls: AtomicUsize::new(0),
        }
    }

    pub fn push_count(&self) -> usize {
        self.pushes.lock().unwrap().len()
    }

    pub fn token_count(&self) -> usize {
        self.token_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MpesaGateway for StubGateway {
    async fn access_token(&self, _credentials: &MpesaCredentials) -> Result<String> {
        self.token_calls.fetch_add(1, Ordering::SeqCst);
        match &self.outage {
            Some(cause) => Err(AppError::Upstream(cause.clone())),
            None => Ok("stub-access-token".to_string()),
        }
    }

    async fn stk_push(&self, _access_token: &str, payload: &StkPushPayload) -> Result<StkPushResponse> {
        self.pushes.lock().unwrap().push(payload.clone());
        match &self.outage {
            Some(cause) => Err(AppError::Upstream(cause.clone())),
            None => Ok(self.response.clone()),
        }
    }
}

/// A payment store whose every call fails, for persistence-failure paths.
pub struct FailingPaymentRepository;

fn unavailable<T>() -> Result<T> {
    Err(AppError::Database("database is unavailable".to_string()))
}

#[async_trait]
impl PaymentRepository for FailingPaymentRepository {
    async fn create(&self, _payment: Payment) -> Result<Payment> {
        unavailable()
    }
    async fn find_by_id(&self, _id: Uuid) -> Result<Option<Payment>> {
        unavailable()
    }
    async fn find_by_checkout_request_id(&self, _checkout_request_id: &str) -> Result<Option<Payment>> {
        unavailable()
    }
    async fn find_by_shop(&self, _shop_id: Uuid) -> Result<Vec<Payment>> {
        unavailable()
    }
    async fn latest_overdue_for_shop(&self, _shop_id: Uuid) -> Result<Option<Payment>> {
        unavailable()
    }
    async fn list(&self, _status: Option<PaymentStatus>) -> Result<Vec<Payment>> {
        unavailable()
    }
    async fn update(&self, _payment: Payment, _expected_status: PaymentStatus) -> Result<Payment> {
        unavailable()
    }
    async fn settle_open(&self, _checkout_request_id: &str, _settlement: &Settlement) -> Result<Option<Payment>> {
        unavailable()
    }
    async fn mark_overdue(&self, _cutoff: DateTime<Utc>) -> Result<u64> {
        unavailable()
    }
    async fn delete(&self, _id: Uuid) -> Result<()> {
        unavailable()
    }
}

pub fn shop_request(name: &str) -> CreateShopRequest {
    CreateShopRequest {
        owner_id: Uuid::new_v4(),
        name: name.to_string(),
        logo_url: None,
        industry: "Fashion".to_string(),
        shop_number: "A12".to_string(),
        city: "Nairobi".to_string(),
        mall: "Sarit Centre".to_string(),
        contact_number: "254712345678".to_string(),
        owner_email: Some("owner@example.com".to_string()),
    }
}

/// Inserts a shop and moves it straight to `status`.
pub async fn seed_shop(repo: &dyn ShopRepository, name: &str, status: ShopStatus) -> Shop {
    let shop = repo.create(shop_request(name)).await.expect("create shop");
    if status == ShopStatus::Pending {
        return shop;
    }
    repo.update_status(shop.id, status).await.expect("set shop status")
}

pub fn payment(shop_id: Option<Uuid>, status: PaymentStatus, due_date: DateTime<Utc>) -> Payment {
    Payment {
        id: Uuid::new_v4(),
        shop_id,
        amount_cents: 100_000,
        currency: "KES".to_string(),
        status,
        due_date,
        payment_date: (status == PaymentStatus::Paid).then_some(due_date),
        payment_method: None,
        transaction_id: None,
        checkout_request_id: None,
        merchant_request_id: None,
        phone_number: None,
        notes: None,
        created_at: due_date,
        updated_at: due_date,
    }
}

pub fn success_callback(checkout_request_id: &str, receipt: &str) -> Vec<u8> {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout_request_id,
                "ResultCode": 0,
                "ResultDesc": "The service request is processed successfully.",
                "CallbackMetadata": {
                    "Item": [
                        { "Name": "Amount", "Value": 5000 },
                        { "Name": "MpesaReceiptNumber", "Value": receipt },
                        { "Name": "TransactionDate", "Value": 20240101120000u64 },
                        { "Name": "PhoneNumber", "Value": 254712345678u64 }
                    ]
                }
            }
        }
    })
    .to_string()
    .into_bytes()
}

pub fn failure_callback(checkout_request_id: &str, code: i64, reason: &str) -> Vec<u8> {
    json!({
        "Body": {
            "stkCallback": {
                "MerchantRequestID": "29115-34620561-1",
                "CheckoutRequestID": checkout_request_id,
                "ResultCode": code,
                "ResultDesc": reason
            }
        }
    })
    .to_string()
    .into_bytes()
}

/// Everything the HTTP layer needs, wired onto one in-memory database.
pub struct TestApp {
    pub pool: SqlitePool,
    pub context: Arc<ServiceContext>,
    pub gateway: Arc<StubGateway>,
    pub stk_push: Arc<StkPushService>,
    pub reconciler: Arc<CallbackReconciler>,
    pub settings: Settings,
}

impl TestApp {
    pub async fn new(gateway: StubGateway) -> Self {
        Self::with_settings(gateway, test_settings()).await
    }

    pub async fn with_settings(gateway: StubGateway, settings: Settings) -> Self {
        let pool = test_pool().await;
        let context = Arc::new(ServiceContext::with_sqlite(
            pool.clone(),
            Arc::new(LogNotifier),
            &settings,
        ));
        let gateway = Arc::new(gateway);
        let stk_push = Arc::new(StkPushService::new(
            gateway.clone(),
            context.payment_repo.clone(),
            context.shop_repo.clone(),
            settings.mpesa.clone(),
        ));
        let reconciler = Arc::new(CallbackReconciler::new(
            context.payment_repo.clone(),
            context.activation_service.clone(),
        ));

        Self {
            pool,
            context,
            gateway,
            stk_push,
            reconciler,
            settings,
        }
    }

    pub fn state(&self) -> AppState {
        AppState::new(
            self.context.clone(),
            self.stk_push.clone(),
            self.reconciler.clone(),
            Arc::new(self.settings.clone()),
        )
    }

    pub fn router(&self) -> axum::Router {
        teketeke::api::create_app(self.state())
    }
}
