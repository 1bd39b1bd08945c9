use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{CreatePaymentRequest, MarkPaidRequest, Payment, PaymentStatus, UpdatePaymentRequest},
    error::{AppError, Result},
    payments::StkPushRequest,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentDto {
    id: Uuid,
    shop_id: Option<Uuid>,
    amount: f64,
    amount_cents: i64,
    currency: String,
    status: PaymentStatus,
    due_date: String,
    payment_date: Option<String>,
    payment_method: Option<String>,
    transaction_id: Option<String>,
    checkout_request_id: Option<String>,
    merchant_request_id: Option<String>,
    phone_number: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl From<Payment> for PaymentDto {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            shop_id: payment.shop_id,
            amount: payment.amount_cents as f64 / 100.0,
            amount_cents: payment.amount_cents,
            currency: payment.currency,
            status: payment.status,
            due_date: payment.due_date.to_rfc3339(),
            payment_date: payment.payment_date.map(|dt| dt.to_rfc3339()),
            payment_method: payment.payment_method,
            transaction_id: payment.transaction_id,
            checkout_request_id: payment.checkout_request_id,
            merchant_request_id: payment.merchant_request_id,
            phone_number: payment.phone_number,
            notes: payment.notes,
            created_at: payment.created_at.to_rfc3339(),
            updated_at: payment.updated_at.to_rfc3339(),
        }
    }
}

/// `POST /api/payments/stk-push`
pub async fn stk_push(
    State(state): State<AppState>,
    payload: std::result::Result<Json<StkPushRequest>, JsonRejection>,
) -> Result<Json<Value>> {
    let Json(request) = payload
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e.body_text())))?;

    let accepted = state.stk_push.initiate(request).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Payment request sent successfully",
        "data": accepted,
    })))
}

/// `PUT /api/payments/stk-push`, the gateway's result webhook. Always
/// acknowledged so the gateway does not redeliver on our own failures.
pub async fn stk_callback(State(state): State<AppState>, body: Bytes) -> Json<Value> {
    let outcome = state.reconciler.handle(&body).await;
    tracing::debug!(?outcome, "STK callback processed");
    Json(json!({ "success": true }))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    status: Option<PaymentStatus>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>> {
    let payments = state.service_context.payment_service
        .list(params.status)
        .await?;

    let payments: Vec<PaymentDto> = payments.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "payments": payments })))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PaymentDto>> {
    let payment = state.service_context.payment_service.get(id).await?;
    Ok(Json(payment.into()))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let payment = state.service_context.payment_service
        .create_invoice(request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "payment": PaymentDto::from(payment) })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePaymentRequest>,
) -> Result<Json<Value>> {
    let payment = state.service_context.payment_service
        .update(id, request, Utc::now())
        .await?;

    Ok(Json(json!({ "success": true, "payment": PaymentDto::from(payment) })))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<MarkPaidRequest>>,
) -> Result<Json<Value>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let payment = state.service_context.payment_service
        .mark_paid(id, request, Utc::now())
        .await?;

    Ok(Json(json!({ "success": true, "payment": PaymentDto::from(payment) })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service_context.payment_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_by_shop(
    State(state): State<AppState>,
    Path(shop_id): Path<Uuid>,
) -> Result<Json<Value>> {
    let payments = state.service_context.payment_service
        .list_for_shop(shop_id)
        .await?;

    let payments: Vec<PaymentDto> = payments.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "payments": payments })))
}
