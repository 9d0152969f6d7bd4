mod common;

use common::*;

use case_storefront::domain::aggregates::{CaseFinish, CaseMaterial, CouponChanges, NewCoupon, OrderStatus};
use case_storefront::domain::value_objects::{CouponCode, DiscountPercent};
use case_storefront::pagination::PageQuery;
use case_storefront::services::customers::{self, CustomerParams};
use case_storefront::services::orders::{self, AdminOrderParams, MONTHLY_REVENUE_GOAL, WEEKLY_REVENUE_GOAL};
use case_storefront::services::{checkout, coupons};
use case_storefront::store::Store;
use case_storefront::AppError;

fn new_coupon(code: &str) -> NewCoupon {
    NewCoupon {
        code: CouponCode::new(code).unwrap(),
        discount: DiscountPercent::new(15).unwrap(),
        description: Some("Spring sale".into()),
        valid_from: None,
        valid_until: None,
        max_uses: Some(100),
        min_amount: None,
    }
}

#[tokio::test]
async fn test_coupon_crud() {
    let app = TestApp::new();
    let coupon = coupons::create_coupon(&app.state, new_coupon("SPRING")).await.unwrap();

    let err = coupons::create_coupon(&app.state, new_coupon("spring")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let other = coupons::create_coupon(&app.state, new_coupon("SUMMER")).await.unwrap();
    let clash = CouponChanges { code: Some(CouponCode::new("SPRING").unwrap()), ..CouponChanges::default() };
    let err = coupons::update_coupon(&app.state, other.id, clash).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let changes = CouponChanges {
        is_active: Some(false),
        description: Some(None),
        max_uses: Some(None),
        ..CouponChanges::default()
    };
    let updated = coupons::update_coupon(&app.state, coupon.id, changes).await.unwrap();
    assert!(!updated.is_active);
    assert_eq!(updated.description, None);
    assert_eq!(updated.max_uses, None);

    let listed = coupons::list_coupons(&app.state).await.unwrap();
    assert_eq!(listed.len(), 2);

    coupons::delete_coupon(&app.state, coupon.id).await.unwrap();
    let err = coupons::delete_coupon(&app.state, coupon.id).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_inactive_coupon_rejected() {
    let app = TestApp::new();
    let coupon = coupons::create_coupon(&app.state, new_coupon("PAUSED")).await.unwrap();
    let changes = CouponChanges { is_active: Some(false), ..CouponChanges::default() };
    coupons::update_coupon(&app.state, coupon.id, changes).await.unwrap();

    let err = coupons::validate_coupon(&app.state, "PAUSED", cents(5000)).await.unwrap_err();
    assert_eq!(err.to_string(), "This coupon is not active");
}

#[tokio::test]
async fn test_admin_order_listing() {
    let app = TestApp::new();
    let configuration = app.configuration(CaseMaterial::Silicone, CaseFinish::Smooth).await;
    let alice = customer("alice");
    let bob = customer("bob");

    let paid = app.paid_order(&alice, configuration.id, None).await;
    checkout::save_pending_order(&app.state, &bob, configuration.id, None).await.unwrap();

    let page = orders::list_orders(&app.state, AdminOrderParams::default()).await.unwrap();
    assert_eq!(page.pagination.total_count, 1);
    assert_eq!(page.orders[0].id, paid);
    assert_eq!(page.orders[0].customer_name, "Jane Doe");
    assert_eq!(page.orders[0].customer_email, "alice@example.test");
    assert!(page.orders[0].order_id.ends_with("..."));

    let by_email = orders::list_orders(
        &app.state,
        AdminOrderParams { search: Some("ALICE@".into()), ..AdminOrderParams::default() },
    )
    .await
    .unwrap();
    assert_eq!(by_email.orders.len(), 1);

    let nobody = orders::list_orders(
        &app.state,
        AdminOrderParams { search: Some("carol".into()), ..AdminOrderParams::default() },
    )
    .await
    .unwrap();
    assert!(nobody.orders.is_empty());

    let bogus_status = orders::list_orders(
        &app.state,
        AdminOrderParams { status: Some("lost".into()), ..AdminOrderParams::default() },
    )
    .await
    .unwrap();
    assert_eq!(bogus_status.orders.len(), 1);

    let shipped_only = orders::list_orders(
        &app.state,
        AdminOrderParams { status: Some("shipped".into()), ..AdminOrderParams::default() },
    )
    .await
    .unwrap();
    assert!(shipped_only.orders.is_empty());
}

#[tokio::test]
async fn test_order_sorting_by_amount() {
    let app = TestApp::new();
    let cheap = app.configuration(CaseMaterial::Silicone, CaseFinish::Smooth).await;
    let pricey = app.configuration(CaseMaterial::Polycarbonate, CaseFinish::Textured).await;
    let user = customer("alice");
    app.paid_order(&user, cheap.id, None).await;
    app.paid_order(&user, pricey.id, None).await;

    let asc = orders::list_orders(
        &app.state,
        AdminOrderParams { sort_by: Some("amount".into()), sort_order: Some("asc".into()), ..AdminOrderParams::default() },
    )
    .await
    .unwrap();
    let amounts: Vec<i64> = asc.orders.iter().map(|o| o.amount.cents()).collect();
    assert_eq!(amounts, vec![1400, 2200]);
}

#[tokio::test]
async fn test_change_status() {
    let app = TestApp::new();
    let configuration = app.configuration(CaseMaterial::Silicone, CaseFinish::Smooth).await;
    let user = customer("alice");
    let pending = checkout::save_pending_order(&app.state, &user, configuration.id, None).await.unwrap();

    let err = orders::change_status(&app.state, pending.id, "shipped").await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let paid = app.paid_order(&user, configuration.id, None).await;
    let err = orders::change_status(&app.state, paid, "teleported").await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let order = orders::change_status(&app.state, paid, "shipped").await.unwrap();
    assert_eq!(order.status, OrderStatus::Shipped);
    let stored = app.store.get_order(paid).await.unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Shipped);

    let err = orders::change_status(&app.state, uuid::Uuid::new_v4(), "shipped").await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_dashboard_revenue() {
    let app = TestApp::new();
    let configuration = app.configuration(CaseMaterial::Polycarbonate, CaseFinish::Smooth).await;
    let user = customer("alice");
    app.paid_order(&user, configuration.id, None).await;
    checkout::save_pending_order(&app.state, &customer("bob"), configuration.id, None).await.unwrap();

    let dashboard = orders::dashboard(&app.state).await.unwrap();
    assert_eq!(dashboard.latest_orders.len(), 1);
    assert_eq!(dashboard.last_week.sum, cents(1900));
    assert_eq!(dashboard.last_week.goal, WEEKLY_REVENUE_GOAL);
    assert_eq!(dashboard.last_month.sum, cents(1900));
    assert_eq!(dashboard.last_month.goal, MONTHLY_REVENUE_GOAL);
}

#[tokio::test]
async fn test_customer_totals() {
    let app = TestApp::new();
    let configuration = app.configuration(CaseMaterial::Silicone, CaseFinish::Smooth).await;
    let big = app.configuration(CaseMaterial::Polycarbonate, CaseFinish::Textured).await;
    let alice = customer("alice");
    let bob = customer("bob");
    app.paid_order(&alice, configuration.id, None).await;
    app.paid_order(&alice, big.id, None).await;
    app.paid_order(&bob, configuration.id, None).await;

    let page = customers::list_customers(
        &app.state,
        CustomerParams { sort_by: Some("totalSpent".into()), ..CustomerParams::default() },
    )
    .await
    .unwrap();
    assert_eq!(page.pagination.total_count, 2);
    assert_eq!(page.customers[0].id, "alice");
    assert_eq!(page.customers[0].total_orders, 2);
    assert_eq!(page.customers[0].total_spent, cents(3600));

    let search = customers::list_customers(
        &app.state,
        CustomerParams { search: Some("BOB".into()), ..CustomerParams::default() },
    )
    .await
    .unwrap();
    assert_eq!(search.customers.len(), 1);
    assert_eq!(search.customers[0].total_spent, cents(1400));
}

#[tokio::test]
async fn test_customer_order_views() {
    let app = TestApp::new();
    let configuration = app.configuration(CaseMaterial::Silicone, CaseFinish::Smooth).await;
    let other = app.configuration(CaseMaterial::Silicone, CaseFinish::Textured).await;
    let user = customer("alice");

    let paid = app.paid_order(&user, configuration.id, None).await;
    checkout::save_pending_order(&app.state, &user, other.id, None).await.unwrap();

    let active = orders::active_orders(&app.state, &user, PageQuery::default()).await.unwrap();
    assert_eq!(active.orders.len(), 1);
    assert_eq!(active.orders[0].id, paid);

    let pending = orders::pending_orders(&app.state, &user, PageQuery::default()).await.unwrap();
    assert_eq!(pending.orders.len(), 1);
    assert_eq!(pending.orders[0].amount, cents(1700));

    assert_eq!(orders::recent_orders(&app.state, &user).await.unwrap().len(), 1);

    let tracked = orders::track_order(&app.state, &user, paid).await.unwrap();
    assert_eq!(tracked.status_label, "Awaiting Shipment");

    orders::change_status(&app.state, paid, "fulfilled").await.unwrap();
    let active = orders::active_orders(&app.state, &user, PageQuery::default()).await.unwrap();
    assert!(active.orders.is_empty());

    let err = orders::track_order(&app.state, &customer("mallory"), paid).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}
