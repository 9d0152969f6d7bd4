//! Persistence boundary.
//!
//! Services talk to a [`Store`]; [`PgStore`] backs it with PostgreSQL and
//! [`MemoryStore`] keeps everything in process for tests and local runs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::{
    Configuration, Coupon, Order, OrderStatus, SupportMessage, SupportTicket, SupportTicketStatus, User,
};
use crate::domain::value_objects::{CouponCode, Money};
use crate::error::Result;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Anything but an explicit `asc` sorts descending.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("asc") => Self::Asc,
            _ => Self::Desc,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OrderSort {
    #[default]
    CreatedAt,
    Amount,
    Status,
}

impl OrderSort {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("amount") => Self::Amount,
            Some("status") => Self::Status,
            _ => Self::CreatedAt,
        }
    }
}

/// Filters for the administrator's order table. Only paid orders are listed.
#[derive(Clone, Debug, Default)]
pub struct AdminOrderQuery {
    pub search: Option<String>,
    pub status: Option<OrderStatus>,
    pub sort: OrderSort,
    pub order: SortOrder,
    pub offset: i64,
    pub limit: i64,
}

/// An order joined with its customer and configuration.
#[derive(Clone, Debug)]
pub struct OrderListing {
    pub order: Order,
    pub customer_email: String,
    pub configuration: Option<Configuration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CustomerOrderScope {
    /// Paid and not yet fulfilled, newest first.
    Active,
    /// Unpaid, most recently touched first.
    Pending,
    /// Paid since the given instant, newest first.
    PaidSince(DateTime<Utc>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerTotals {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub total_orders: i64,
    pub total_spent: Money,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TicketViewer {
    Customer(String),
    Admin,
}

impl TicketViewer {
    /// Unread messages are the ones written by the other side.
    pub fn unread_from_admin(&self) -> bool {
        matches!(self, Self::Customer(_))
    }
}

#[derive(Clone, Debug)]
pub struct TicketQuery {
    pub viewer: TicketViewer,
    pub status: Option<SupportTicketStatus>,
    pub offset: i64,
    pub limit: i64,
}

#[derive(Clone, Debug)]
pub struct TicketSummary {
    pub ticket: SupportTicket,
    pub unread_count: i64,
    pub message_count: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn get_user(&self, id: &str) -> Result<Option<User>>;
    /// Inserts the user unless a row with the same id already exists.
    async fn insert_user(&self, user: &User) -> Result<()>;
    async fn customer_totals(&self, email_search: Option<&str>) -> Result<Vec<CustomerTotals>>;

    async fn insert_configuration(&self, configuration: &Configuration) -> Result<()>;
    async fn get_configuration(&self, id: Uuid) -> Result<Option<Configuration>>;
    async fn update_configuration(&self, configuration: &Configuration) -> Result<()>;

    async fn get_coupon(&self, id: Uuid) -> Result<Option<Coupon>>;
    async fn find_coupon_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>>;
    async fn list_coupons(&self) -> Result<Vec<Coupon>>;
    async fn insert_coupon(&self, coupon: &Coupon) -> Result<()>;
    async fn update_coupon(&self, coupon: &Coupon) -> Result<()>;
    async fn delete_coupon(&self, id: Uuid) -> Result<bool>;

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn find_pending_order(&self, user_id: &str, configuration_id: Uuid) -> Result<Option<Order>>;
    /// Returns `false` when an unpaid order for the same user and
    /// configuration already exists.
    async fn insert_order(&self, order: &Order) -> Result<bool>;
    /// Writes price and checkout fields of an order that is still unpaid.
    async fn update_pending_order(&self, order: &Order) -> Result<()>;
    /// Flips the order to paid and counts one use of its coupon, all or
    /// nothing. Returns `false` if it was already paid.
    async fn mark_order_paid(&self, order: &Order) -> Result<bool>;
    async fn update_order_status(&self, order: &Order) -> Result<()>;
    async fn list_paid_orders(&self, query: &AdminOrderQuery) -> Result<(Vec<OrderListing>, i64)>;
    async fn customer_orders(
        &self,
        user_id: &str,
        scope: CustomerOrderScope,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<OrderListing>, i64)>;
    async fn paid_revenue_since(&self, since: DateTime<Utc>) -> Result<Money>;

    async fn insert_ticket(&self, ticket: &SupportTicket, first_message: &SupportMessage) -> Result<()>;
    async fn get_ticket(&self, id: Uuid) -> Result<Option<SupportTicket>>;
    async fn update_ticket(&self, ticket: &SupportTicket) -> Result<()>;
    async fn list_tickets(&self, query: &TicketQuery) -> Result<(Vec<TicketSummary>, i64)>;
    async fn ticket_messages(&self, ticket_id: Uuid) -> Result<Vec<SupportMessage>>;
    async fn insert_message(&self, message: &SupportMessage) -> Result<()>;
    /// Marks unread messages from one side of the conversation as read.
    async fn mark_messages_read(&self, ticket_id: Uuid, from_admin: bool) -> Result<u64>;
    async fn unread_admin_messages(&self, user_id: &str) -> Result<i64>;
}
