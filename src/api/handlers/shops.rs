use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{
        CreateShopRequest, PaymentReminder, ReminderStatus, Shop, ShopFilter, ShopStatus,
        UpdateShopRequest,
    },
    error::Result,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopDto {
    id: Uuid,
    owner_id: Uuid,
    name: String,
    logo_url: Option<String>,
    industry: String,
    shop_number: String,
    city: String,
    mall: String,
    contact_number: String,
    status: ShopStatus,
    created_at: String,
    updated_at: String,
}

impl From<Shop> for ShopDto {
    fn from(shop: Shop) -> Self {
        Self {
            id: shop.id,
            owner_id: shop.owner_id,
            name: shop.name,
            logo_url: shop.logo_url,
            industry: shop.industry,
            shop_number: shop.shop_number,
            city: shop.city,
            mall: shop.mall,
            contact_number: shop.contact_number,
            status: shop.status,
            created_at: shop.created_at.to_rfc3339(),
            updated_at: shop.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDto {
    id: Uuid,
    shop_id: Uuid,
    sent_at: String,
    status: ReminderStatus,
    message: String,
}

impl From<PaymentReminder> for ReminderDto {
    fn from(reminder: PaymentReminder) -> Self {
        Self {
            id: reminder.id,
            shop_id: reminder.shop_id,
            sent_at: reminder.sent_at.to_rfc3339(),
            status: reminder.status,
            message: reminder.message,
        }
    }
}

fn shops_json(shops: Vec<Shop>) -> Json<Value> {
    let shops: Vec<ShopDto> = shops.into_iter().map(Into::into).collect();
    Json(json!({ "shops": shops }))
}

/// `GET /public/shops`
pub async fn list_public(
    State(state): State<AppState>,
    Query(filter): Query<ShopFilter>,
) -> Result<Json<Value>> {
    let shops = state.service_context.shop_service.list_public(filter).await?;
    Ok(shops_json(shops))
}

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ShopFilter>,
) -> Result<Json<Value>> {
    let shops = state.service_context.shop_service.list(&filter).await?;
    Ok(shops_json(shops))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShopDto>> {
    let shop = state.service_context.shop_service.get(id).await?;
    Ok(Json(shop.into()))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<CreateShopRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let shop = state.service_context.shop_service.register(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "shop": ShopDto::from(shop) })),
    ))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateShopRequest>,
) -> Result<Json<Value>> {
    let shop = state.service_context.shop_service.update(id, request).await?;
    Ok(Json(json!({ "success": true, "shop": ShopDto::from(shop) })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service_context.shop_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn approve(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShopDto>> {
    let shop = state.service_context.shop_service.approve(id).await?;
    Ok(Json(shop.into()))
}

pub async fn reject(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ShopDto>> {
    let shop = state.service_context.shop_service.reject(id).await?;
    Ok(Json(shop.into()))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReminderRequest {
    custom_message: Option<String>,
}

pub async fn send_reminder(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    request: Option<Json<SendReminderRequest>>,
) -> Result<Json<Value>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let reminder = state.service_context.reminder_service
        .send_reminder(id, request.custom_message, Utc::now())
        .await?;

    let sent = reminder.status == ReminderStatus::Sent;
    Ok(Json(json!({
        "success": sent,
        "reminder": ReminderDto::from(reminder),
        "message": if sent {
            "Payment reminder sent successfully"
        } else {
            "Failed to send payment reminder"
        },
    })))
}

pub async fn reminder_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let reminders = state.service_context.reminder_service.history(id).await?;
    let reminders: Vec<ReminderDto> = reminders.into_iter().map(Into::into).collect();
    Ok(Json(json!({ "reminders": reminders })))
}
