//! HTTP surface.

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::extract::Json;
use crate::state::AppState;

mod admin;
mod checkout;
mod configurations;
mod orders;
mod support;
mod webhooks;

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "case-storefront" }))
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/configurations", post(configurations::create))
        .route("/api/configurations/:id", get(configurations::get))
        .route("/api/configurations/:id/design", put(configurations::save_design))
        .route("/api/configurations/:id/quote", get(checkout::quote))
        .route("/api/coupons/validate", post(checkout::validate_coupon))
        .route("/api/orders/pending", post(checkout::save_pending_order))
        .route("/api/orders/:id/payment-status", get(checkout::payment_status))
        .route("/api/checkout", post(checkout::raw_session))
        .route("/api/checkout/session", post(checkout::create_session))
        .route("/api/webhooks/stripe", post(webhooks::stripe))
        .route("/api/user/orders/active", get(orders::active))
        .route("/api/user/orders/pending", get(orders::pending))
        .route("/api/user/orders/recent", get(orders::recent))
        .route("/api/user/orders/:id/track", get(orders::track))
        .route("/api/support/tickets", get(support::list).post(support::create))
        .route(
            "/api/support/tickets/:id",
            get(support::get).post(support::reply).patch(support::mark_read),
        )
        .route("/api/support/notifications", get(support::notifications))
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/orders", get(admin::list_orders))
        .route("/api/admin/orders/:id", get(admin::get_order))
        .route("/api/admin/orders/:id/status", patch(admin::change_order_status))
        .route("/api/admin/coupons", get(admin::list_coupons).post(admin::create_coupon))
        .route("/api/admin/coupons/:id", patch(admin::update_coupon).delete(admin::delete_coupon))
        .route("/api/admin/customers", get(admin::list_customers))
        .route("/api/admin/support", get(admin::list_tickets))
        .route(
            "/api/admin/support/:id",
            get(admin::get_ticket).post(admin::reply).patch(admin::set_ticket_status),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
