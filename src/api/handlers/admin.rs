use axum::{
    extract::State,
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use crate::{
    api::state::AppState,
    domain::{format_amount, BillingSettings, UpdateBillingSettingsRequest},
    error::Result,
    service::SweepReport,
};

fn billing_json(settings: BillingSettings) -> Value {
    json!({
        "monthlyFee": settings.monthly_fee_cents as f64 / 100.0,
        "monthlyFeeDisplay": format_amount(settings.monthly_fee_cents),
        "paymentDuration": settings.payment_duration_days,
        "updatedAt": settings.updated_at.to_rfc3339(),
    })
}

/// `POST /admin/sweep`: marks overdue payments and re-derives shop activation.
pub async fn sweep(State(state): State<AppState>) -> Result<Json<SweepReport>> {
    let report = state.service_context.activation_service
        .sweep(Utc::now(), false)
        .await?;
    Ok(Json(report))
}

pub async fn get_billing_settings(State(state): State<AppState>) -> Result<Json<Value>> {
    let settings = state.service_context.settings_service.get_billing().await?;
    Ok(Json(json!({ "settings": billing_json(settings) })))
}

pub async fn update_billing_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateBillingSettingsRequest>,
) -> Result<Json<Value>> {
    let settings = state.service_context.settings_service
        .update_billing(request)
        .await?;
    Ok(Json(json!({ "success": true, "settings": billing_json(settings) })))
}
