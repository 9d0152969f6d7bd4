//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use super::coupon::AppliedCoupon;
use crate::domain::events::{CouponEvent, DomainEvent, OrderEvent};
use crate::domain::pricing::DiscountedPrice;
use crate::domain::value_objects::{CouponCode, DiscountPercent, Money};

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: String,
    pub configuration_id: Uuid,
    pub amount: Money,
    pub subtotal: Money,
    pub coupon_code: Option<CouponCode>,
    /// Coupon the price was computed with; redemption counts against this id.
    #[serde(skip)]
    pub coupon_id: Option<Uuid>,
    pub discount: DiscountPercent,
    pub is_paid: bool,
    pub status: OrderStatus,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub name: String,
    pub street: String,
    pub city: String,
    pub postal_code: String,
    pub country: String,
    pub state: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] AwaitingShipment, Shipped, Fulfilled }

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [Self::AwaitingShipment, Self::Shipped, Self::Fulfilled];

    pub fn as_str(&self) -> &'static str {
        match self { Self::AwaitingShipment => "awaiting_shipment", Self::Shipped => "shipped", Self::Fulfilled => "fulfilled" }
    }

    /// Customer-facing label.
    pub fn label(&self) -> &'static str {
        match self { Self::AwaitingShipment => "Awaiting Shipment", Self::Shipped => "Shipped", Self::Fulfilled => "Fulfilled" }
    }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl Order {
    /// A new unpaid order for a configuration at the given price.
    pub fn pending(user_id: impl Into<String>, configuration_id: Uuid, price: &DiscountedPrice, coupon: Option<&AppliedCoupon>) -> Self {
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::new_v4(), user_id: user_id.into(), configuration_id,
            amount: price.total, subtotal: price.subtotal,
            coupon_code: coupon.map(|c| c.code.clone()), coupon_id: coupon.map(|c| c.id), discount: price.percent,
            is_paid: false, status: OrderStatus::AwaitingShipment, shipping_address: None, billing_address: None,
            checkout_session_id: None, created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::PendingCreated { order_id: order.id, user_id: order.user_id.clone(), amount: order.amount }));
        order
    }

    /// Brings a pending order in line with the latest computed price.
    pub fn reprice(&mut self, price: &DiscountedPrice, coupon: Option<&AppliedCoupon>) -> Result<(), OrderError> {
        if self.is_paid { return Err(OrderError::AlreadyPaid); }
        let changed = self.amount != price.total;
        self.amount = price.total;
        self.subtotal = price.subtotal;
        self.discount = price.percent;
        self.coupon_code = coupon.map(|c| c.code.clone());
        self.coupon_id = coupon.map(|c| c.id);
        self.touch();
        if changed {
            self.raise_event(DomainEvent::Order(OrderEvent::Repriced { order_id: self.id, amount: self.amount }));
        }
        Ok(())
    }

    pub fn attach_checkout_session(&mut self, session_id: impl Into<String>) {
        self.checkout_session_id = Some(session_id.into());
        self.touch();
    }

    pub fn mark_paid(&mut self, shipping: Option<Address>, billing: Option<Address>) -> Result<(), OrderError> {
        if self.is_paid { return Err(OrderError::AlreadyPaid); }
        self.is_paid = true;
        self.shipping_address = shipping;
        self.billing_address = billing;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Paid { order_id: self.id, amount: self.amount, coupon: self.coupon_code.clone() }));
        if let (Some(coupon_id), Some(code)) = (self.coupon_id, self.coupon_code.clone()) {
            self.raise_event(DomainEvent::Coupon(CouponEvent::Redeemed { coupon_id, code, order_id: self.id }));
        }
        Ok(())
    }

    pub fn change_status(&mut self, status: OrderStatus) -> Result<(), OrderError> {
        if !self.is_paid { return Err(OrderError::NotPaid); }
        self.status = status;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, status }));
        Ok(())
    }

    /// First eight characters of the id, for compact listings.
    pub fn short_id(&self) -> String {
        format!("{}...", &self.id.to_string()[..8])
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrderError {
    #[error("Order is already paid")]
    AlreadyPaid,
    #[error("Order has not been paid")]
    NotPaid,
    #[error("Unknown order status: {0}")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pricing::apply_discount;

    fn applied(code: &str, percent: i32) -> AppliedCoupon {
        AppliedCoupon {
            id: Uuid::new_v4(),
            code: CouponCode::new(code).unwrap(),
            discount: DiscountPercent::new(percent).unwrap(),
            description: None,
        }
    }

    fn price(cents: i64, percent: i32) -> DiscountedPrice {
        apply_discount(Money::from_cents(cents), DiscountPercent::new(percent).unwrap())
    }

    #[test]
    fn test_order_workflow() {
        let mut order = Order::pending("user_1", Uuid::new_v4(), &price(1400, 0), None);
        assert!(!order.is_paid);
        assert_eq!(order.status, OrderStatus::AwaitingShipment);
        assert_eq!(order.change_status(OrderStatus::Shipped), Err(OrderError::NotPaid));

        order.mark_paid(Some(Address { name: "Ada".into(), ..Default::default() }), None).unwrap();
        assert_eq!(order.mark_paid(None, None), Err(OrderError::AlreadyPaid));
        order.change_status(OrderStatus::Shipped).unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);
        assert_eq!(order.take_events().len(), 3);
    }

    #[test]
    fn test_reprice_only_while_pending() {
        let mut order = Order::pending("user_1", Uuid::new_v4(), &price(2200, 0), None);
        order.take_events();
        let ten = applied("TEN", 10);
        order.reprice(&price(2200, 10), Some(&ten)).unwrap();
        assert_eq!(order.amount.cents(), 1980);
        assert_eq!(order.subtotal.cents(), 2200);
        assert_eq!(order.coupon_id, Some(ten.id));
        assert_eq!(order.take_events().len(), 1);

        order.reprice(&price(2200, 10), Some(&ten)).unwrap();
        assert!(order.take_events().is_empty());

        order.mark_paid(None, None).unwrap();
        assert_eq!(order.reprice(&price(1400, 0), None), Err(OrderError::AlreadyPaid));
    }

    #[test]
    fn test_paying_with_coupon_raises_redemption() {
        let ten = applied("TEN", 10);
        let mut order = Order::pending("user_1", Uuid::new_v4(), &price(2200, 10), Some(&ten));
        order.take_events();
        order.mark_paid(None, None).unwrap();
        let events = order.take_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[1],
            DomainEvent::Coupon(CouponEvent::Redeemed { coupon_id, .. }) if *coupon_id == ten.id
        ));

        let mut plain = Order::pending("user_1", Uuid::new_v4(), &price(1400, 0), None);
        plain.take_events();
        plain.mark_paid(None, None).unwrap();
        assert_eq!(plain.take_events().len(), 1);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("fulfilled".parse::<OrderStatus>().unwrap(), OrderStatus::Fulfilled);
        assert!("delivered".parse::<OrderStatus>().is_err());
        assert_eq!(OrderStatus::AwaitingShipment.label(), "Awaiting Shipment");
    }
}
