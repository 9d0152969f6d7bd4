//! Domain events
use crate::domain::aggregates::{OrderStatus, SupportTicketStatus};
use crate::domain::value_objects::{CouponCode, Money};
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Coupon(CouponEvent),
    Support(SupportEvent),
}

impl DomainEvent {
    /// Subject suffix the event is published under.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::PendingCreated { .. }) => "order.pending_created",
            Self::Order(OrderEvent::Repriced { .. }) => "order.repriced",
            Self::Order(OrderEvent::Paid { .. }) => "order.paid",
            Self::Order(OrderEvent::StatusChanged { .. }) => "order.status_changed",
            Self::Coupon(CouponEvent::Created { .. }) => "coupon.created",
            Self::Coupon(CouponEvent::Redeemed { .. }) => "coupon.redeemed",
            Self::Support(SupportEvent::TicketOpened { .. }) => "support.ticket_opened",
            Self::Support(SupportEvent::StatusChanged { .. }) => "support.status_changed",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    PendingCreated { order_id: Uuid, user_id: String, amount: Money },
    Repriced { order_id: Uuid, amount: Money },
    Paid { order_id: Uuid, amount: Money, coupon: Option<CouponCode> },
    StatusChanged { order_id: Uuid, status: OrderStatus },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CouponEvent {
    Created { coupon_id: Uuid, code: CouponCode },
    Redeemed { coupon_id: Uuid, code: CouponCode, order_id: Uuid },
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SupportEvent {
    TicketOpened { ticket_id: Uuid, user_id: String },
    StatusChanged { ticket_id: Uuid, status: SupportTicketStatus },
}
