use axum::{http::StatusCode, Json, response::IntoResponse};
use serde_json::json;

pub async fn root() -> impl IntoResponse {
    Json(json!({
        "name": "Teke Teke API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Shop subscription billing with M-Pesa STK push",
        "status": "operational",
        "endpoints": {
            "health": "/health",
            "stkPush": "/api/payments/stk-push",
            "public": "/public/shops",
            "admin": "/admin"
        }
    }))
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}
