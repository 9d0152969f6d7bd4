#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use case_storefront::auth::{issue_token, AuthUser};
use case_storefront::domain::aggregates::{
    Address, CaseColor, CaseFinish, CaseMaterial, Configuration, Design, NewCoupon, PhoneModel,
};
use case_storefront::domain::value_objects::{CouponCode, DiscountPercent, Money};
use case_storefront::email::EmailService;
use case_storefront::payments::{stripe, CheckoutProvider, CheckoutSession, CheckoutSessionRequest, CompletedCheckout, WebhookEvent};
use case_storefront::publisher::EventPublisher;
use case_storefront::services::{checkout, coupons};
use case_storefront::store::{MemoryStore, Store};
use case_storefront::{AppState, Config, Result};

pub const JWT_SECRET: &str = "test-secret";
pub const ADMIN_EMAIL: &str = "owner@casestore.test";

/// Records every session request; accepts the signature `valid`.
#[derive(Default)]
pub struct FakeCheckout {
    pub requests: Mutex<Vec<CheckoutSessionRequest>>,
}

#[async_trait]
impl CheckoutProvider for FakeCheckout {
    async fn create_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(CheckoutSession { url: Some(format!("https://checkout.test/{id}")), id })
    }

    fn verify_webhook(&self, _payload: &[u8], signature: &str) -> Result<bool> {
        Ok(signature == "valid")
    }

    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookEvent> {
        stripe::parse_event(payload)
    }
}

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub payments: Arc<FakeCheckout>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let payments = Arc::new(FakeCheckout::default());
        let config = Config {
            admin_email: Some(ADMIN_EMAIL.to_string()),
            auth_jwt_secret: JWT_SECRET.to_string(),
            public_url: "https://shop.test".to_string(),
            ..Config::default()
        };
        let state = AppState::new(
            config,
            store.clone(),
            payments.clone(),
            EmailService::disabled(),
            EventPublisher::default(),
        );
        Self { state, store, payments }
    }

    pub async fn configuration(&self, material: CaseMaterial, finish: CaseFinish) -> Configuration {
        let mut configuration = Configuration::upload("https://img.test/raw.png", 600, 1200).unwrap();
        configuration
            .apply_design(Design {
                model: PhoneModel::IPhone14Pro,
                color: CaseColor::Black,
                material,
                finish,
                cropped_image_url: "https://img.test/cropped.png".into(),
            })
            .unwrap();
        self.store.insert_configuration(&configuration).await.unwrap();
        configuration
    }

    pub async fn coupon(&self, code: &str, percent: i32) -> Uuid {
        self.coupon_with(NewCoupon {
            code: CouponCode::new(code).unwrap(),
            discount: DiscountPercent::new(percent).unwrap(),
            description: None,
            valid_from: None,
            valid_until: None,
            max_uses: None,
            min_amount: None,
        })
        .await
    }

    pub async fn coupon_with(&self, new: NewCoupon) -> Uuid {
        coupons::create_coupon(&self.state, new).await.unwrap().id
    }

    /// Runs a configuration through pending order and payment.
    pub async fn paid_order(&self, user: &AuthUser, configuration_id: Uuid, coupon: Option<&str>) -> Uuid {
        let order = checkout::save_pending_order(&self.state, user, configuration_id, coupon).await.unwrap();
        checkout::complete_checkout(&self.state, completed(user, order.id, "Jane Doe")).await.unwrap();
        order.id
    }
}

pub fn customer(id: &str) -> AuthUser {
    AuthUser { id: id.to_string(), email: format!("{id}@example.test"), is_admin: false }
}

pub fn token(user_id: &str, email: &str) -> String {
    issue_token(JWT_SECRET, user_id, email, chrono::Duration::hours(1)).unwrap()
}

pub fn shipping(name: &str) -> Address {
    Address {
        name: name.to_string(),
        street: "1 Harbour Way".into(),
        city: "Hamburg".into(),
        postal_code: "20457".into(),
        country: "DE".into(),
        state: None,
        phone: None,
    }
}

pub fn completed(user: &AuthUser, order_id: Uuid, name: &str) -> CompletedCheckout {
    CompletedCheckout {
        session_id: "cs_test".into(),
        order_id: Some(order_id.to_string()),
        user_id: Some(user.id.clone()),
        shipping_address: Some(shipping(name)),
        billing_address: Some(shipping(name)),
    }
}

pub fn cents(value: i64) -> Money {
    Money::from_cents(value)
}
