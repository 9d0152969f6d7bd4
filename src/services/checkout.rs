//! Pricing, pending orders and the hand-off to the hosted checkout page.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{configurations, coupons, orders::OrderView};
use crate::auth::AuthUser;
use crate::domain::aggregates::{AppliedCoupon, Configuration, ConfigurationError, Order};
use crate::domain::pricing::{self, DiscountedPrice, PriceQuote};
use crate::domain::value_objects::DiscountPercent;
use crate::error::{AppError, Result};
use crate::payments::{CheckoutSessionRequest, CompletedCheckout, LineItem, WebhookEvent};
use crate::state::AppState;

pub const LINE_ITEM_NAME: &str = "Custom iPhone Case";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutQuote {
    pub quote: PriceQuote,
    pub price: DiscountedPrice,
    pub coupon: Option<AppliedCoupon>,
}

/// Prices a configuration, applying the coupon if one is given. A coupon
/// that does not validate fails the whole request.
pub async fn price_configuration(
    state: &AppState,
    configuration: &Configuration,
    coupon_code: Option<&str>,
) -> Result<CheckoutQuote> {
    let quote = pricing::quote(configuration);
    let coupon = match coupon_code.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Some(coupons::validate_coupon(state, code, quote.subtotal).await?),
        None => None,
    };
    let percent = coupon.as_ref().map_or(DiscountPercent::NONE, |c| c.discount);
    Ok(CheckoutQuote { quote, price: pricing::apply_discount(quote.subtotal, percent), coupon })
}

pub async fn quote_configuration(
    state: &AppState,
    configuration_id: Uuid,
    coupon_code: Option<&str>,
) -> Result<CheckoutQuote> {
    let configuration = configurations::get_configuration(state, configuration_id).await?;
    price_configuration(state, &configuration, coupon_code).await
}

async fn upsert_pending(state: &AppState, user: &AuthUser, configuration_id: Uuid, priced: &CheckoutQuote) -> Result<Order> {
    let coupon = priced.coupon.as_ref();

    if let Some(mut order) = state.store.find_pending_order(&user.id, configuration_id).await? {
        order.reprice(&priced.price, coupon)?;
        state.store.update_pending_order(&order).await?;
        state.events.publish_all(order.take_events()).await;
        return Ok(order);
    }

    let mut order = Order::pending(user.id.clone(), configuration_id, &priced.price, coupon);
    if state.store.insert_order(&order).await? {
        state.events.publish_all(order.take_events()).await;
        return Ok(order);
    }

    // Lost a race with a concurrent request for the same configuration.
    let mut existing = state
        .store
        .find_pending_order(&user.id, configuration_id)
        .await?
        .ok_or_else(|| AppError::Conflict("Pending order changed concurrently".into()))?;
    existing.reprice(&priced.price, coupon)?;
    state.store.update_pending_order(&existing).await?;
    state.events.publish_all(existing.take_events()).await;
    Ok(existing)
}

/// Creates or refreshes the caller's single unpaid order for a configuration.
pub async fn save_pending_order(
    state: &AppState,
    user: &AuthUser,
    configuration_id: Uuid,
    coupon_code: Option<&str>,
) -> Result<Order> {
    let configuration = configurations::get_configuration(state, configuration_id).await?;
    state.store.insert_user(&user.to_user()).await?;
    let priced = price_configuration(state, &configuration, coupon_code).await?;
    let order = upsert_pending(state, user, configuration_id, &priced).await?;
    tracing::info!(order_id = %order.id, user_id = %user.id, amount = order.amount.cents(), "Pending order saved");
    Ok(order)
}

pub async fn create_checkout_session(
    state: &AppState,
    user: &AuthUser,
    configuration_id: Uuid,
    coupon_code: Option<&str>,
) -> Result<String> {
    let configuration = configurations::get_configuration(state, configuration_id).await?;
    if !configuration.is_complete() {
        return Err(ConfigurationError::Incomplete.into());
    }
    state.store.insert_user(&user.to_user()).await?;
    let priced = price_configuration(state, &configuration, coupon_code).await?;
    let mut order = upsert_pending(state, user, configuration_id, &priced).await?;

    let base = &state.config.public_url;
    let request = CheckoutSessionRequest {
        line_items: vec![LineItem::Custom {
            name: LINE_ITEM_NAME.to_string(),
            image: configuration.cropped_image_url.clone(),
            unit_amount: order.amount.cents(),
            quantity: 1,
        }],
        success_url: format!("{base}/thank-you?orderId={}", order.id),
        cancel_url: format!("{base}/configure/preview?id={configuration_id}"),
        metadata: BTreeMap::from([
            ("userId".to_string(), user.id.clone()),
            ("orderId".to_string(), order.id.to_string()),
        ]),
        shipping_countries: state.config.shipping_countries.clone(),
    };

    let session = state.payments.create_session(&request).await?;
    order.attach_checkout_session(session.id.clone());
    state.store.update_pending_order(&order).await?;
    tracing::info!(order_id = %order.id, session_id = %session.id, "Checkout session created");

    session.url.ok_or_else(|| AppError::Payment("checkout session has no url".into()))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCheckoutRequest {
    pub user_id: Option<String>,
    pub order_id: Option<String>,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

/// Opens a session for caller-supplied line items.
pub async fn create_raw_session(state: &AppState, user: &AuthUser, request: RawCheckoutRequest) -> Result<String> {
    let (Some(user_id), Some(order_id)) = (
        request.user_id.filter(|v| !v.is_empty()),
        request.order_id.filter(|v| !v.is_empty()),
    ) else {
        return Err(AppError::BadRequest("Missing userId or orderId".into()));
    };
    if user_id != user.id {
        return Err(AppError::Forbidden("userId does not match the signed-in user".into()));
    }

    let session = state
        .payments
        .create_session(&CheckoutSessionRequest {
            line_items: request.line_items,
            success_url: request.success_url,
            cancel_url: request.cancel_url,
            metadata: BTreeMap::from([("userId".to_string(), user_id), ("orderId".to_string(), order_id)]),
            shipping_countries: vec![],
        })
        .await?;
    session.url.ok_or_else(|| AppError::Payment("checkout session has no url".into()))
}

/// The caller's order once paid, `None` while payment is outstanding.
pub async fn payment_status(state: &AppState, user: &AuthUser, order_id: Uuid) -> Result<Option<OrderView>> {
    let order = state
        .store
        .get_order(order_id)
        .await?
        .filter(|o| o.user_id == user.id)
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;
    if !order.is_paid {
        return Ok(None);
    }
    let configuration = state.store.get_configuration(order.configuration_id).await?;
    Ok(Some(OrderView::new(order, user.email.clone(), configuration)))
}

/// Applies a verified provider webhook.
pub async fn handle_webhook(state: &AppState, event: WebhookEvent) -> Result<()> {
    match event {
        WebhookEvent::CheckoutCompleted(done) => complete_checkout(state, done).await,
        WebhookEvent::Ignored(kind) => {
            tracing::debug!(kind = %kind, "Ignoring webhook event");
            Ok(())
        }
    }
}

pub async fn complete_checkout(state: &AppState, done: CompletedCheckout) -> Result<()> {
    let (Some(order_id), Some(user_id)) = (done.order_id.as_deref(), done.user_id.as_deref()) else {
        return Err(AppError::BadRequest("Invalid request metadata".into()));
    };
    let order_id: Uuid = order_id
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid request metadata".into()))?;

    let mut order = state
        .store
        .get_order(order_id)
        .await?
        .filter(|o| o.user_id == user_id)
        .ok_or_else(|| AppError::NotFound("Order not found".into()))?;

    if order.is_paid {
        tracing::info!(order_id = %order.id, "Order already paid, ignoring redelivery");
        return Ok(());
    }

    order.mark_paid(done.shipping_address, done.billing_address)?;
    if !state.store.mark_order_paid(&order).await? {
        tracing::info!(order_id = %order.id, "Order paid concurrently, ignoring redelivery");
        return Ok(());
    }
    tracing::info!(order_id = %order.id, session_id = %done.session_id, amount = order.amount.cents(), "Order paid");
    state.events.publish_all(order.take_events()).await;

    // The payment is committed; nothing below may fail the delivery.
    match state.store.get_user(&order.user_id).await {
        Ok(Some(customer)) => {
            if let Err(e) = state.email.send_order_received(&customer.email, &order).await {
                tracing::warn!(order_id = %order.id, error = %e, "Failed to send order confirmation");
            }
        }
        Ok(None) => tracing::warn!(order_id = %order.id, "No customer record for paid order"),
        Err(e) => tracing::warn!(order_id = %order.id, error = %e, "Failed to load customer for paid order"),
    }
    Ok(())
}
