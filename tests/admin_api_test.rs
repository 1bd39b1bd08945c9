mod common;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use teketeke::domain::ShopStatus;

use common::{seed_shop, StubGateway, TestApp, ADMIN_TOKEN};

async fn send(app: &TestApp, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = TestApp::new(StubGateway::accepting("unused")).await;

    let (status, body) = send(&app, "GET", "/admin/payments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, "GET", "/admin/payments", Some("wrong-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, "GET", "/admin/payments", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payments"], json!([]));

    // Public surfaces stay open.
    let (status, _) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/public/shops", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_billing_settings_round_trip() {
    let app = TestApp::new(StubGateway::accepting("unused")).await;

    let (status, body) = send(&app, "GET", "/admin/settings/billing", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["monthlyFee"], 1000.0);
    assert_eq!(body["settings"]["paymentDuration"], 30);

    let (status, body) = send(
        &app,
        "PUT",
        "/admin/settings/billing",
        Some(ADMIN_TOKEN),
        Some(json!({ "monthlyFee": 1500, "paymentDuration": 31 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["settings"]["monthlyFeeDisplay"], "1500.00");
    assert_eq!(body["settings"]["paymentDuration"], 31);

    let (status, _) = send(
        &app,
        "PUT",
        "/admin/settings/billing",
        Some(ADMIN_TOKEN),
        Some(json!({ "paymentDuration": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_shop_moderation_and_public_listing() {
    let app = TestApp::new(StubGateway::accepting("unused")).await;

    let (status, body) = send(
        &app,
        "POST",
        "/admin/shops",
        Some(ADMIN_TOKEN),
        Some(json!({
            "ownerId": uuid::Uuid::new_v4(),
            "name": "Fashion Hub",
            "industry": "Fashion",
            "shopNumber": "B4",
            "city": "Nairobi",
            "mall": "Westgate",
            "contactNumber": "254712345678"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let shop_id = body["shop"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["shop"]["status"], "pending");

    let (_, body) = send(&app, "GET", "/public/shops", None, None).await;
    assert_eq!(body["shops"], json!([]));

    let (status, body) = send(&app, "POST", &format!("/admin/shops/{}/approve", shop_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (status, _) = send(&app, "POST", &format!("/admin/shops/{}/reject", shop_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, "GET", "/public/shops?mall=Westgate", None, None).await;
    assert_eq!(body["shops"].as_array().unwrap().len(), 1);
    let (_, body) = send(&app, "GET", "/public/shops?mall=Sarit", None, None).await;
    assert_eq!(body["shops"], json!([]));

    let (status, _) = send(&app, "GET", &format!("/admin/shops/{}", uuid::Uuid::new_v4()), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_invoice_lifecycle_over_http() {
    let app = TestApp::new(StubGateway::accepting("unused")).await;
    let shop = seed_shop(app.context.shop_repo.as_ref(), "Fashion Hub", ShopStatus::Approved).await;

    let (status, body) = send(
        &app,
        "POST",
        "/admin/payments",
        Some(ADMIN_TOKEN),
        Some(json!({
            "shopId": shop.id,
            "amount": 1000,
            "dueDate": "2024-06-01T00:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["payment"]["status"], "pending");
    assert_eq!(body["payment"]["amountCents"], 100_000);
    let payment_id = body["payment"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "POST",
        &format!("/admin/payments/{}/mark-paid", payment_id),
        Some(ADMIN_TOKEN),
        Some(json!({ "transactionId": "CASH-001", "paymentMethod": "Cash" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["payment"]["status"], "paid");
    assert_eq!(body["payment"]["transactionId"], "CASH-001");
    assert!(body["payment"]["paymentDate"].is_string());

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/admin/payments/{}", payment_id),
        Some(ADMIN_TOKEN),
        Some(json!({ "status": "pending" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = send(&app, "GET", &format!("/admin/shops/{}/payments", shop.id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(body["payments"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/admin/payments?status=paid", Some(ADMIN_TOKEN), None).await;
    assert_eq!(body["payments"].as_array().unwrap().len(), 1);

    let (status, _) = send(&app, "DELETE", &format!("/admin/payments/{}", payment_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/admin/payments/{}", payment_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sweep_and_reminder_endpoints() {
    let app = TestApp::new(StubGateway::accepting("unused")).await;
    let shop = seed_shop(app.context.shop_repo.as_ref(), "Late Payer", ShopStatus::Active).await;

    let (status, _) = send(
        &app,
        "POST",
        "/admin/payments",
        Some(ADMIN_TOKEN),
        Some(json!({
            "shopId": shop.id,
            "amount": 1000,
            "dueDate": "2020-01-01T00:00:00Z"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(&app, "POST", "/admin/sweep", Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["overdueMarked"], 1);
    assert_eq!(body["deactivated"], json!([shop.id]));

    let (status, body) = send(
        &app,
        "POST",
        &format!("/admin/shops/{}/send-reminder", shop.id),
        Some(ADMIN_TOKEN),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["reminder"]["status"], "sent");

    let (_, body) = send(&app, "GET", &format!("/admin/shops/{}/reminders", shop.id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(body["reminders"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_owner_shop_views_edit_and_delete() {
    let app = TestApp::new(StubGateway::accepting("unused")).await;
    let shops = app.context.shop_repo.as_ref();
    let mine = seed_shop(shops, "Fashion Hub", ShopStatus::Active).await;
    seed_shop(shops, "Someone Else", ShopStatus::Active).await;

    let (status, body) = send(&app, "GET", &format!("/admin/shops?ownerId={}", mine.owner_id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body["shops"].as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], json!(mine.id));

    let (status, body) = send(
        &app,
        "PUT",
        &format!("/admin/shops/{}", mine.id),
        Some(ADMIN_TOKEN),
        Some(json!({ "name": "Fashion Hub Westgate", "mall": "Westgate", "status": "rejected" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["shop"]["name"], "Fashion Hub Westgate");
    assert_eq!(body["shop"]["mall"], "Westgate");
    assert_eq!(body["shop"]["city"], "Nairobi");
    assert_eq!(body["shop"]["status"], "active");

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/admin/shops/{}", mine.id),
        Some(ADMIN_TOKEN),
        Some(json!({ "name": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        "/admin/payments",
        Some(ADMIN_TOKEN),
        Some(json!({ "shopId": mine.id, "amount": 1000, "dueDate": "2024-06-01T00:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, "DELETE", &format!("/admin/shops/{}", mine.id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/admin/shops/{}", mine.id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, "DELETE", &format!("/admin/shops/{}", mine.id), Some(ADMIN_TOKEN), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The shop's invoices go with it.
    let (_, body) = send(&app, "GET", "/admin/payments", Some(ADMIN_TOKEN), None).await;
    assert_eq!(body["payments"], json!([]));
}
