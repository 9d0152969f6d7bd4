use axum::extract::State;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthUser;
use crate::domain::aggregates::AppliedCoupon;
use crate::domain::value_objects::Money;
use crate::error::Result;
use crate::extract::{Json, Path, Query, ValidJson};
use crate::services::checkout::{self as service, CheckoutQuote, RawCheckoutRequest};
use crate::services::coupons;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub coupon: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCouponRequest {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(range(min = 0))]
    pub order_amount: i64,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub configuration_id: Uuid,
    #[validate(length(max = 32))]
    pub coupon_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingOrderResponse {
    pub order_id: Uuid,
    pub amount: Money,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub url: String,
}

pub async fn quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<QuoteParams>,
) -> Result<Json<CheckoutQuote>> {
    Ok(Json(service::quote_configuration(&state, id, params.coupon.as_deref()).await?))
}

pub async fn validate_coupon(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<ValidateCouponRequest>,
) -> Result<Json<AppliedCoupon>> {
    let applied = coupons::validate_coupon(&state, &req.code, Money::from_cents(req.order_amount)).await?;
    Ok(Json(applied))
}

pub async fn save_pending_order(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(req): ValidJson<CheckoutRequest>,
) -> Result<Json<PendingOrderResponse>> {
    let order = service::save_pending_order(&state, &user, req.configuration_id, req.coupon_code.as_deref()).await?;
    Ok(Json(PendingOrderResponse { order_id: order.id, amount: order.amount }))
}

pub async fn create_session(
    State(state): State<AppState>,
    user: AuthUser,
    ValidJson(req): ValidJson<CheckoutRequest>,
) -> Result<Json<SessionResponse>> {
    let url = service::create_checkout_session(&state, &user, req.configuration_id, req.coupon_code.as_deref()).await?;
    Ok(Json(SessionResponse { url }))
}

pub async fn raw_session(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<RawCheckoutRequest>,
) -> Result<Json<SessionResponse>> {
    let url = service::create_raw_session(&state, &user, req).await?;
    Ok(Json(SessionResponse { url }))
}

/// The paid order, or `false` while payment is pending.
pub async fn payment_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>> {
    let body = match service::payment_status(&state, &user, id).await? {
        Some(order) => json!(order),
        None => Value::Bool(false),
    };
    Ok(Json(body))
}
