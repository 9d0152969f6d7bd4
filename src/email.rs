//! Transactional email through the Resend API.
//!
//! Without an API key the service logs and skips. Delivery is a single
//! attempt; callers decide whether a failure matters.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::{Address, Order, OrderStatus};
use crate::error::{AppError, Result};

const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailSendResult {
    Sent,
    /// No API key configured.
    Disabled,
}

#[derive(Debug, Serialize)]
struct ResendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: String,
}

#[derive(Debug, Deserialize)]
struct ResendEmailResponse {
    #[allow(dead_code)]
    id: String,
}

#[derive(Clone)]
pub struct EmailService {
    api_key: Option<String>,
    from: String,
    /// Storefront base URL used for links in the message body.
    public_url: String,
    http_client: Client,
}

impl EmailService {
    pub fn new(api_key: Option<String>, from: impl Into<String>, public_url: impl Into<String>) -> Self {
        Self { api_key, from: from.into(), public_url: public_url.into(), http_client: Client::new() }
    }

    pub fn disabled() -> Self {
        Self::new(None, "", "")
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub async fn send_order_received(&self, to: &str, order: &Order) -> Result<EmailSendResult> {
        let html = order_received_html(order, &self.public_url);
        self.send(to, "Thanks for your order!", html).await
    }

    pub async fn send_order_status(&self, to: &str, order_id: &str, status: OrderStatus) -> Result<EmailSendResult> {
        let html = order_status_html(order_id, status, &self.public_url);
        self.send(to, "Order Status Update", html).await
    }

    async fn send(&self, to: &str, subject: &str, html: String) -> Result<EmailSendResult> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::debug!(subject, "Email disabled, skipping");
            return Ok(EmailSendResult::Disabled);
        };

        let request = ResendEmailRequest { from: &self.from, to: [to], subject, html };
        let response = self
            .http_client
            .post(RESEND_API_URL)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Email service error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Internal(format!("Email service error: {status} - {body}")));
        }

        let _sent: ResendEmailResponse = response
            .json()
            .await
            .map_err(|e| AppError::Internal(format!("Email service response error: {e}")))?;
        tracing::info!(subject, "Email sent");
        Ok(EmailSendResult::Sent)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

fn address_line(address: &Address) -> String {
    let state = address.state.as_deref().map(|s| format!("{s} ")).unwrap_or_default();
    escape(&format!(
        "{}, {}, {}{}, {}",
        address.street, address.city, state, address.postal_code, address.country
    ))
}

fn order_received_html(order: &Order, public_url: &str) -> String {
    let shipping = order
        .shipping_address
        .as_ref()
        .map(|a| format!("<p><strong>Shipping to: {}</strong><br>{}</p>", escape(&a.name), address_line(a)))
        .unwrap_or_default();
    format!(
        "<h1>Thank you for your order!</h1>\
         <p>Your order has been received and is now being processed. \
         We'll send you an email with a tracking number when your order ships.</p>\
         {shipping}\
         <p><strong>Order Number</strong><br>{id}</p>\
         <p><strong>Order Date</strong><br>{date}</p>\
         <p><a href=\"{public_url}/track?orderId={id}\">Track your order</a></p>",
        id = order.id,
        date = order.created_at.format("%B %-d, %Y"),
    )
}

fn order_status_html(order_id: &str, status: OrderStatus, public_url: &str) -> String {
    format!(
        "<h1>Your order has been updated</h1>\
         <p>Order <strong>{id}</strong> is now <strong>{label}</strong>.</p>\
         <p><a href=\"{public_url}/track?orderId={id}\">Track your order</a></p>",
        id = escape(order_id),
        label = status.label(),
    )
}
