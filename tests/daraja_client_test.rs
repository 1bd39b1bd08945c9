use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, Uri},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Value};

use teketeke::{
    config::MpesaConfig,
    error::AppError,
    payments::{DarajaClient, MpesaCredentials, MpesaGateway, StkPushPayload},
};

const TOKEN_ROUTE: &str = "/oauth/v1/generate";
const PUSH_ROUTE: &str = "/mpesa/stkpush/v1/processrequest";

/// What the fake Daraja saw: request target and Authorization header.
#[derive(Clone, Default)]
struct Seen(Arc<Mutex<Vec<(String, String)>>>);

impl Seen {
    fn record(&self, uri: &Uri, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.0.lock().unwrap().push((uri.to_string(), auth));
    }

    fn requests(&self) -> Vec<(String, String)> {
        self.0.lock().unwrap().clone()
    }
}

async fn token(State(seen): State<Seen>, uri: Uri, headers: HeaderMap) -> Json<Value> {
    seen.record(&uri, &headers);
    Json(json!({ "access_token": "daraja-token", "expires_in": "3599" }))
}

async fn accept_push(State(seen): State<Seen>, uri: Uri, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    seen.record(&uri, &headers);
    assert_eq!(body["BusinessShortCode"], "174379");
    assert_eq!(body["Amount"], 5000);
    Json(json!({
        "MerchantRequestID": "29115-34620561-1",
        "CheckoutRequestID": "ws_CO_live",
        "ResponseCode": "0",
        "ResponseDescription": "Success. Request accepted for processing",
        "CustomerMessage": "Success. Request accepted for processing"
    }))
}

async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(base_url: String, timeout_secs: u64) -> DarajaClient {
    DarajaClient::new(&MpesaConfig {
        base_url,
        timeout_secs,
        ..MpesaConfig::default()
    })
    .expect("client")
}

fn credentials() -> MpesaCredentials {
    MpesaCredentials {
        consumer_key: "consumer-key".to_string(),
        consumer_secret: "consumer-secret".to_string(),
        business_short_code: "174379".to_string(),
        passkey: "passkey".to_string(),
        callback_url: "https://example.test/api/payments/stk-push".to_string(),
    }
}

fn payload() -> StkPushPayload {
    StkPushPayload {
        business_short_code: "174379".to_string(),
        password: "cGFzc3dvcmQ=".to_string(),
        timestamp: "20240101120000".to_string(),
        transaction_type: "CustomerPayBillOnline".to_string(),
        amount: 5000,
        party_a: "254712345678".to_string(),
        party_b: "174379".to_string(),
        phone_number: "254712345678".to_string(),
        callback_url: "https://example.test/api/payments/stk-push".to_string(),
        account_reference: "SUB-2024-01".to_string(),
        transaction_desc: "Monthly subscription".to_string(),
    }
}

#[tokio::test]
async fn test_token_and_push_use_expected_auth() -> anyhow::Result<()> {
    let seen = Seen::default();
    let router = Router::new()
        .route(TOKEN_ROUTE, get(token))
        .route(PUSH_ROUTE, post(accept_push))
        .with_state(seen.clone());
    // Trailing slash must not produce a double slash in the request path.
    let client = client(format!("{}/", spawn(router).await), 5);

    let access_token = client.access_token(&credentials()).await?;
    assert_eq!(access_token, "daraja-token");

    let response = client.stk_push(&access_token, &payload()).await?;
    assert_eq!(response.response_code, "0");
    assert_eq!(response.checkout_request_id, "ws_CO_live");
    assert_eq!(response.merchant_request_id, "29115-34620561-1");

    let requests = seen.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].0, "/oauth/v1/generate?grant_type=client_credentials");
    assert_eq!(
        requests[0].1,
        format!("Basic {}", STANDARD.encode("consumer-key:consumer-secret"))
    );
    assert_eq!(requests[1].0, PUSH_ROUTE);
    assert_eq!(requests[1].1, "Bearer daraja-token");

    Ok(())
}

#[tokio::test]
async fn test_error_statuses_are_upstream_errors() {
    let router = Router::new()
        .route(TOKEN_ROUTE, get(|| async { (StatusCode::UNAUTHORIZED, "invalid credentials") }))
        .route(PUSH_ROUTE, post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }));
    let client = client(spawn(router).await, 5);

    let token = client.access_token(&credentials()).await;
    assert!(matches!(token, Err(AppError::Upstream(ref m)) if m.contains("401")), "got {:?}", token);

    let push = client.stk_push("daraja-token", &payload()).await;
    assert!(matches!(push, Err(AppError::Upstream(ref m)) if m.contains("500")), "got {:?}", push);
}

#[tokio::test]
async fn test_malformed_bodies_are_upstream_errors() {
    let router = Router::new()
        .route(TOKEN_ROUTE, get(|| async { Json(json!({ "expires_in": "3599" })) }))
        .route(PUSH_ROUTE, post(|| async { Json(json!({})) }));
    let client = client(spawn(router).await, 5);

    assert!(matches!(client.access_token(&credentials()).await, Err(AppError::Upstream(_))));
    assert!(matches!(client.stk_push("daraja-token", &payload()).await, Err(AppError::Upstream(_))));
}

#[tokio::test]
async fn test_slow_gateway_times_out() {
    let router = Router::new().route(
        TOKEN_ROUTE,
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Json(json!({ "access_token": "late", "expires_in": "3599" }))
        }),
    );
    let client = client(spawn(router).await, 1);

    let result = client.access_token(&credentials()).await;
    assert!(matches!(result, Err(AppError::Upstream(ref m)) if m.contains("timed out")), "got {:?}", result);
}

#[tokio::test]
async fn test_unreachable_host_is_upstream_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = client(format!("http://{}", addr), 2);

    assert!(matches!(client.access_token(&credentials()).await, Err(AppError::Upstream(_))));
}
