//! Fulfillment for the administrator and order views for customers.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::aggregates::{
    Address, CaseColor, CaseFinish, CaseMaterial, Configuration, Order, OrderStatus, PhoneModel,
};
use crate::domain::value_objects::{CouponCode, DiscountPercent, Money};
use crate::error::{AppError, Result};
use crate::pagination::{PageQuery, Pagination, ORDERS_PER_PAGE};
use crate::state::AppState;
use crate::store::{AdminOrderQuery, CustomerOrderScope, OrderListing, OrderSort, SortOrder};

pub const WEEKLY_REVENUE_GOAL: Money = Money::from_cents(50_000);
pub const MONTHLY_REVENUE_GOAL: Money = Money::from_cents(250_000);
const DASHBOARD_LATEST: i64 = 5;

/// An order with its customer and configuration, as the pages show it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    pub id: Uuid,
    pub short_id: String,
    pub user_id: String,
    pub customer_email: String,
    pub configuration_id: Uuid,
    pub amount: Money,
    pub subtotal: Money,
    pub coupon_code: Option<CouponCode>,
    pub discount: DiscountPercent,
    pub is_paid: bool,
    pub status: OrderStatus,
    pub status_label: &'static str,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub configuration: Option<Configuration>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderView {
    pub fn new(order: Order, customer_email: String, configuration: Option<Configuration>) -> Self {
        Self {
            short_id: order.short_id(),
            status_label: order.status.label(),
            id: order.id,
            user_id: order.user_id,
            customer_email,
            configuration_id: order.configuration_id,
            amount: order.amount,
            subtotal: order.subtotal,
            coupon_code: order.coupon_code,
            discount: order.discount,
            is_paid: order.is_paid,
            status: order.status,
            shipping_address: order.shipping_address,
            billing_address: order.billing_address,
            configuration,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

impl From<OrderListing> for OrderView {
    fn from(listing: OrderListing) -> Self {
        OrderView::new(listing.order, listing.customer_email, listing.configuration)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSummary {
    pub model: Option<PhoneModel>,
    pub color: Option<CaseColor>,
    pub material: Option<CaseMaterial>,
    pub finish: Option<CaseFinish>,
    pub image_url: String,
}

/// One row of the administrator's order table.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderRow {
    pub id: Uuid,
    pub order_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub purchase_date: DateTime<Utc>,
    pub amount: Money,
    pub configuration: Option<ConfigurationSummary>,
}

impl From<OrderListing> for AdminOrderRow {
    fn from(listing: OrderListing) -> Self {
        let order = listing.order;
        Self {
            id: order.id,
            order_id: order.short_id(),
            customer_name: order.shipping_address.map_or_else(|| "N/A".to_string(), |a| a.name),
            customer_email: listing.customer_email,
            status: order.status,
            purchase_date: order.created_at,
            amount: order.amount,
            configuration: listing.configuration.map(|c| ConfigurationSummary {
                image_url: c.display_image().to_string(),
                model: c.model,
                color: c.color,
                material: c.material,
                finish: c.finish,
            }),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderParams {
    pub page: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage<T> {
    pub orders: Vec<T>,
    pub pagination: Pagination,
}

pub async fn list_orders(state: &AppState, params: AdminOrderParams) -> Result<OrderPage<AdminOrderRow>> {
    let page = PageQuery { page: params.page };
    let query = AdminOrderQuery {
        search: params.search.filter(|s| !s.trim().is_empty()),
        // An unknown status filter is ignored rather than rejected.
        status: params.status.as_deref().and_then(|s| s.parse().ok()),
        sort: OrderSort::from_param(params.sort_by.as_deref()),
        order: SortOrder::from_param(params.sort_order.as_deref()),
        offset: page.offset(ORDERS_PER_PAGE),
        limit: ORDERS_PER_PAGE,
    };
    let (listings, total) = state.store.list_paid_orders(&query).await?;
    Ok(OrderPage {
        orders: listings.into_iter().map(AdminOrderRow::from).collect(),
        pagination: Pagination::new(page.page(), total, ORDERS_PER_PAGE),
    })
}

pub async fn get_order(state: &AppState, id: Uuid) -> Result<OrderView> {
    let order = state.store.get_order(id).await?.ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    let email = state.store.get_user(&order.user_id).await?.map(|u| u.email).unwrap_or_default();
    let configuration = state.store.get_configuration(order.configuration_id).await?;
    Ok(OrderView::new(order, email, configuration))
}

/// Moves a paid order to a new fulfillment status and tells the customer.
pub async fn change_status(state: &AppState, id: Uuid, new_status: &str) -> Result<Order> {
    let status: OrderStatus = new_status.parse()?;
    let mut order = state.store.get_order(id).await?.ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    order.change_status(status)?;
    state.store.update_order_status(&order).await?;
    tracing::info!(order_id = %order.id, status = %status, "Order status changed");
    state.events.publish_all(order.take_events()).await;

    if let Some(customer) = state.store.get_user(&order.user_id).await? {
        if let Err(e) = state.email.send_order_status(&customer.email, &order.id.to_string(), status).await {
            tracing::warn!(order_id = %order.id, error = %e, "Failed to send status update");
        }
    }
    Ok(order)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueGoal {
    pub sum: Money,
    pub goal: Money,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub latest_orders: Vec<OrderView>,
    pub last_week: RevenueGoal,
    pub last_month: RevenueGoal,
}

pub async fn dashboard(state: &AppState) -> Result<Dashboard> {
    let now = Utc::now();
    let (latest, _) = state
        .store
        .list_paid_orders(&AdminOrderQuery { limit: DASHBOARD_LATEST, ..AdminOrderQuery::default() })
        .await?;
    Ok(Dashboard {
        latest_orders: latest.into_iter().map(OrderView::from).collect(),
        last_week: RevenueGoal {
            sum: state.store.paid_revenue_since(now - Duration::days(7)).await?,
            goal: WEEKLY_REVENUE_GOAL,
        },
        last_month: RevenueGoal {
            sum: state.store.paid_revenue_since(now - Duration::days(30)).await?,
            goal: MONTHLY_REVENUE_GOAL,
        },
    })
}

async fn customer_page(
    state: &AppState,
    user: &AuthUser,
    scope: CustomerOrderScope,
    page: PageQuery,
) -> Result<OrderPage<OrderView>> {
    let (listings, total) = state
        .store
        .customer_orders(&user.id, scope, page.offset(ORDERS_PER_PAGE), ORDERS_PER_PAGE)
        .await?;
    Ok(OrderPage {
        orders: listings.into_iter().map(OrderView::from).collect(),
        pagination: Pagination::new(page.page(), total, ORDERS_PER_PAGE),
    })
}

/// Paid orders that have not been fulfilled yet.
pub async fn active_orders(state: &AppState, user: &AuthUser, page: PageQuery) -> Result<OrderPage<OrderView>> {
    customer_page(state, user, CustomerOrderScope::Active, page).await
}

pub async fn pending_orders(state: &AppState, user: &AuthUser, page: PageQuery) -> Result<OrderPage<OrderView>> {
    customer_page(state, user, CustomerOrderScope::Pending, page).await
}

/// Paid orders from the last seven days.
pub async fn recent_orders(state: &AppState, user: &AuthUser) -> Result<Vec<OrderView>> {
    let since = Utc::now() - Duration::days(7);
    let (listings, _) = state
        .store
        .customer_orders(&user.id, CustomerOrderScope::PaidSince(since), 0, i64::MAX)
        .await?;
    Ok(listings.into_iter().map(OrderView::from).collect())
}

pub async fn track_order(state: &AppState, user: &AuthUser, order_id: Uuid) -> Result<OrderView> {
    let order = state
        .store
        .get_order(order_id)
        .await?
        .filter(|o| o.user_id == user.id && o.is_paid)
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    let configuration = state.store.get_configuration(order.configuration_id).await?;
    Ok(OrderView::new(order, user.email.clone(), configuration))
}
