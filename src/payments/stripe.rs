use std::collections::BTreeMap;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::{CheckoutProvider, CheckoutSession, CheckoutSessionRequest, CompletedCheckout, LineItem, WebhookEvent};
use crate::domain::aggregates::Address;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const CHECKOUT_SESSIONS_URL: &str = "https://api.stripe.com/v1/checkout/sessions";

/// Webhooks older than this are rejected.
const WEBHOOK_TOLERANCE_SECS: i64 = 300;
const WEBHOOK_FUTURE_SKEW_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(secret_key: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self { client: Client::new(), secret_key: secret_key.into(), webhook_secret: webhook_secret.into() }
    }
}

/// Flattens a session request into Stripe's bracketed form encoding.
fn session_form(request: &CheckoutSessionRequest) -> Vec<(String, String)> {
    let mut form = vec![
        ("mode".to_string(), "payment".to_string()),
        ("payment_method_types[0]".to_string(), "card".to_string()),
        ("success_url".to_string(), request.success_url.clone()),
        ("cancel_url".to_string(), request.cancel_url.clone()),
    ];

    for (i, item) in request.line_items.iter().enumerate() {
        let key = |field: &str| format!("line_items[{i}]{field}");
        match item {
            LineItem::Price { price, quantity } => {
                form.push((key("[price]"), price.clone()));
                form.push((key("[quantity]"), quantity.to_string()));
            }
            LineItem::Custom { name, image, unit_amount, quantity } => {
                form.push((key("[price_data][currency]"), "usd".to_string()));
                form.push((key("[price_data][unit_amount]"), unit_amount.to_string()));
                form.push((key("[price_data][product_data][name]"), name.clone()));
                if let Some(image) = image {
                    form.push((key("[price_data][product_data][images][0]"), image.clone()));
                }
                form.push((key("[quantity]"), quantity.to_string()));
            }
        }
    }

    for (i, country) in request.shipping_countries.iter().enumerate() {
        form.push((format!("shipping_address_collection[allowed_countries][{i}]"), country.clone()));
    }

    for (k, v) in &request.metadata {
        form.push((format!("metadata[{k}]"), v.clone()));
    }

    form
}

/// Verifies a `t=<unix>,v1=<hex>` signature header at the given instant.
fn verify_signature(secret: &str, payload: &[u8], header: &str, now: i64) -> Result<bool> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        if let Some(t) = part.trim().strip_prefix("t=") {
            timestamp = Some(t);
        } else if let Some(s) = part.trim().strip_prefix("v1=") {
            signatures.push(s);
        }
    }

    let raw_timestamp = timestamp.ok_or_else(|| AppError::BadRequest("invalid signature header".into()))?;
    if signatures.is_empty() {
        return Err(AppError::BadRequest("invalid signature header".into()));
    }
    let timestamp: i64 = raw_timestamp
        .parse()
        .map_err(|_| AppError::BadRequest("invalid signature timestamp".into()))?;

    let in_window = now
        .checked_sub(timestamp)
        .is_some_and(|age| (-WEBHOOK_FUTURE_SKEW_SECS..=WEBHOOK_TOLERANCE_SECS).contains(&age));
    if !in_window {
        tracing::warn!(timestamp, "Stripe webhook timestamp outside tolerance");
        return Ok(false);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| AppError::Internal("invalid webhook secret".into()))?;
    mac.update(raw_timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    Ok(signatures
        .iter()
        .any(|s| s.len() == expected.len() && bool::from(expected.as_bytes().ct_eq(s.as_bytes()))))
}

#[async_trait]
impl CheckoutProvider for StripeClient {
    async fn create_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession> {
        let response = self
            .client
            .post(CHECKOUT_SESSIONS_URL)
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&session_form(request))
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Stripe API error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!("Stripe API error: {status} - {body}")));
        }

        let session: CreateSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("Failed to parse Stripe response: {e}")))?;

        Ok(CheckoutSession { id: session.id, url: session.url })
    }

    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<bool> {
        verify_signature(&self.webhook_secret, payload, signature, chrono::Utc::now().timestamp())
    }

    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookEvent> {
        parse_event(payload)
    }
}

#[derive(Debug, Deserialize)]
struct StripeEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct StripeCheckoutSession {
    id: String,
    #[serde(default)]
    metadata: BTreeMap<String, String>,
    customer_details: Option<StripeCustomerDetails>,
    shipping_details: Option<StripeShippingDetails>,
    collected_information: Option<StripeCollectedInformation>,
}

#[derive(Debug, Deserialize)]
struct StripeCustomerDetails {
    name: Option<String>,
    phone: Option<String>,
    address: Option<StripeAddress>,
}

#[derive(Debug, Deserialize)]
struct StripeCollectedInformation {
    shipping_details: Option<StripeShippingDetails>,
}

#[derive(Debug, Deserialize)]
struct StripeShippingDetails {
    name: Option<String>,
    address: Option<StripeAddress>,
}

#[derive(Debug, Deserialize)]
struct StripeAddress {
    line1: Option<String>,
    line2: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    state: Option<String>,
}

impl StripeAddress {
    fn into_address(self, name: Option<String>, phone: Option<String>) -> Address {
        let street = match (self.line1, self.line2) {
            (Some(l1), Some(l2)) if !l2.is_empty() => format!("{l1}, {l2}"),
            (l1, _) => l1.unwrap_or_default(),
        };
        Address {
            name: name.unwrap_or_default(),
            street,
            city: self.city.unwrap_or_default(),
            postal_code: self.postal_code.unwrap_or_default(),
            country: self.country.unwrap_or_default(),
            state: self.state,
            phone,
        }
    }
}

pub fn parse_event(payload: &[u8]) -> Result<WebhookEvent> {
    let event: StripeEvent =
        serde_json::from_slice(payload).map_err(|e| AppError::BadRequest(format!("invalid webhook payload: {e}")))?;

    if event.event_type != "checkout.session.completed" {
        return Ok(WebhookEvent::Ignored(event.event_type));
    }

    let session: StripeCheckoutSession = serde_json::from_value(event.data.object)
        .map_err(|e| AppError::BadRequest(format!("invalid checkout session: {e}")))?;

    let (customer_name, phone, billing) = match session.customer_details {
        Some(c) => (c.name, c.phone, c.address),
        None => (None, None, None),
    };
    let shipping = session
        .collected_information
        .and_then(|c| c.shipping_details)
        .or(session.shipping_details)
        .and_then(|s| s.address.map(|a| a.into_address(s.name, phone.clone())));
    let billing = billing.map(|a| a.into_address(customer_name, phone));

    Ok(WebhookEvent::CheckoutCompleted(CompletedCheckout {
        session_id: session.id,
        order_id: session.metadata.get("orderId").cloned(),
        user_id: session.metadata.get("userId").cloned(),
        shipping_address: shipping,
        billing_address: billing,
    }))
}
