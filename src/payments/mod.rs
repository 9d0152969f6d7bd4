//! Hosted checkout providers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::Address;
use crate::error::Result;

pub mod stripe;

pub use stripe::StripeClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LineItem {
    /// A product priced in the provider's own catalog.
    Price { price: String, quantity: u32 },
    /// An ad-hoc item priced by us, amount in cents.
    #[serde(rename_all = "camelCase")]
    Custom {
        name: String,
        image: Option<String>,
        unit_amount: i64,
        quantity: u32,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub line_items: Vec<LineItem>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: BTreeMap<String, String>,
    /// Empty means no shipping address is collected.
    pub shipping_countries: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// A paid checkout as reported by the provider's webhook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletedCheckout {
    pub session_id: String,
    pub order_id: Option<String>,
    pub user_id: Option<String>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    CheckoutCompleted(CompletedCheckout),
    Ignored(String),
}

#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_session(&self, request: &CheckoutSessionRequest) -> Result<CheckoutSession>;

    /// Checks the signature header against the raw body.
    fn verify_webhook(&self, payload: &[u8], signature: &str) -> Result<bool>;

    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookEvent>;
}

/// Stand-in used when no payment provider is configured.
pub struct DisabledProvider;

#[async_trait]
impl CheckoutProvider for DisabledProvider {
    async fn create_session(&self, _request: &CheckoutSessionRequest) -> Result<CheckoutSession> {
        Err(crate::error::AppError::Payment("payments are not configured".into()))
    }

    fn verify_webhook(&self, _payload: &[u8], _signature: &str) -> Result<bool> {
        Ok(false)
    }

    fn parse_webhook(&self, payload: &[u8]) -> Result<WebhookEvent> {
        stripe::parse_event(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_item_accepts_catalog_prices() {
        let items: Vec<LineItem> = serde_json::from_str(r#"[{"price":"price_123","quantity":2}]"#).unwrap();
        assert_eq!(items, vec![LineItem::Price { price: "price_123".into(), quantity: 2 }]);
    }

    #[tokio::test]
    async fn test_disabled_provider_refuses() {
        let provider = DisabledProvider;
        assert!(provider.create_session(&CheckoutSessionRequest::default()).await.is_err());
        assert!(!provider.verify_webhook(b"{}", "t=1,v1=00").unwrap());
    }
}
