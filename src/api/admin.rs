//! Administrator dashboard endpoints. Every handler requires [`AdminUser`].

use axum::{extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::domain::aggregates::{Coupon, CouponChanges, NewCoupon, SupportTicket};
use crate::domain::value_objects::{CouponCode, DiscountPercent, Money};
use crate::error::Result;
use crate::extract::{Json, Path, Query, ValidJson};
use crate::pagination::PageQuery;
use crate::services::customers::{self, CustomerPage, CustomerParams};
use crate::services::orders::{self, AdminOrderParams, AdminOrderRow, Dashboard, OrderPage, OrderView};
use crate::services::{coupons, support};
use crate::state::AppState;

/// Distinguishes an absent field from an explicit `null`.
fn nullable<'de, D, T>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCouponRequest {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(range(min = 0, max = 100))]
    pub discount: i32,
    pub description: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[validate(range(min = 0))]
    pub max_uses: Option<i32>,
    #[validate(range(min = 0))]
    pub min_amount: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCouponRequest {
    pub code: Option<String>,
    pub discount: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub valid_from: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub valid_until: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable")]
    pub max_uses: Option<Option<i32>>,
    #[serde(default, deserialize_with = "nullable")]
    pub min_amount: Option<Option<i64>>,
}

impl UpdateCouponRequest {
    fn into_changes(self) -> Result<CouponChanges> {
        Ok(CouponChanges {
            code: self.code.map(CouponCode::new).transpose()?,
            discount: self.discount.map(DiscountPercent::new).transpose()?,
            description: self.description,
            is_active: self.is_active,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            max_uses: self.max_uses,
            min_amount: self.min_amount.map(|m| m.map(Money::from_cents)),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TicketParams {
    pub page: Option<i64>,
    pub status: Option<String>,
}

pub async fn dashboard(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Dashboard>> {
    Ok(Json(orders::dashboard(&state).await?))
}

pub async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<AdminOrderParams>,
) -> Result<Json<OrderPage<AdminOrderRow>>> {
    Ok(Json(orders::list_orders(&state, params).await?))
}

pub async fn get_order(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> Result<Json<OrderView>> {
    Ok(Json(orders::get_order(&state, id).await?))
}

pub async fn change_order_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Value>> {
    let order = orders::change_status(&state, id, &req.status).await?;
    Ok(Json(json!({ "order": order })))
}

pub async fn list_coupons(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<Coupon>>> {
    Ok(Json(coupons::list_coupons(&state).await?))
}

pub async fn create_coupon(
    State(state): State<AppState>,
    _admin: AdminUser,
    ValidJson(req): ValidJson<CreateCouponRequest>,
) -> Result<(StatusCode, Json<Coupon>)> {
    let new = NewCoupon {
        code: CouponCode::new(&req.code)?,
        discount: DiscountPercent::new(req.discount)?,
        description: req.description.filter(|d| !d.trim().is_empty()),
        valid_from: req.valid_from,
        valid_until: req.valid_until,
        max_uses: req.max_uses,
        min_amount: req.min_amount.map(Money::from_cents),
    };
    let coupon = coupons::create_coupon(&state, new).await?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

pub async fn update_coupon(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateCouponRequest>,
) -> Result<Json<Coupon>> {
    Ok(Json(coupons::update_coupon(&state, id, req.into_changes()?).await?))
}

pub async fn delete_coupon(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> Result<StatusCode> {
    coupons::delete_coupon(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_customers(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<CustomerParams>,
) -> Result<Json<CustomerPage>> {
    Ok(Json(customers::list_customers(&state, params).await?))
}

pub async fn list_tickets(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(params): Query<TicketParams>,
) -> Result<Json<support::TicketPage>> {
    let page = PageQuery { page: params.page };
    Ok(Json(support::admin_list_tickets(&state, params.status.as_deref(), page).await?))
}

pub async fn get_ticket(State(state): State<AppState>, _admin: AdminUser, Path(id): Path<Uuid>) -> Result<Json<Value>> {
    let ticket = support::admin_get_ticket(&state, id).await?;
    Ok(Json(json!({ "ticket": ticket })))
}

pub async fn reply(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let message = support::admin_reply(&state, id, &req.message).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}

pub async fn set_ticket_status(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<Value>> {
    let ticket: SupportTicket = support::set_status(&state, id, &req.status).await?;
    Ok(Json(json!({ "ticket": ticket })))
}
