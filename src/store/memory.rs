//! In-process store. Same contract as the PostgreSQL store, held in maps
//! behind a single lock.

use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AdminOrderQuery, CustomerOrderScope, CustomerTotals, OrderListing, OrderSort, SortOrder, Store, TicketQuery,
    TicketSummary, TicketViewer,
};
use crate::domain::aggregates::{Configuration, Coupon, Order, OrderStatus, SupportMessage, SupportTicket, User};
use crate::domain::value_objects::{CouponCode, Money};
use crate::error::{AppError, Result};

#[derive(Default)]
struct Inner {
    users: HashMap<String, User>,
    configurations: HashMap<Uuid, Configuration>,
    coupons: HashMap<Uuid, Coupon>,
    orders: HashMap<Uuid, Order>,
    tickets: HashMap<Uuid, SupportTicket>,
    messages: Vec<SupportMessage>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn page<T>(items: Vec<T>, offset: i64, limit: i64) -> Vec<T> {
    items
        .into_iter()
        .skip(usize::try_from(offset).unwrap_or(0))
        .take(usize::try_from(limit).unwrap_or(0))
        .collect()
}

fn directed(ordering: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

fn status_rank(status: OrderStatus) -> &'static str {
    status.as_str()
}

impl Inner {
    fn listing(&self, order: &Order) -> OrderListing {
        OrderListing {
            order: order.clone(),
            customer_email: self.users.get(&order.user_id).map(|u| u.email.clone()).unwrap_or_default(),
            configuration: self.configurations.get(&order.configuration_id).cloned(),
        }
    }

    fn unread(&self, ticket_id: Uuid, from_admin: bool) -> i64 {
        self.messages
            .iter()
            .filter(|m| m.ticket_id == ticket_id && m.is_from_admin == from_admin && !m.is_read)
            .count() as i64
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.inner.read().await.users.get(id).cloned())
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        self.inner.write().await.users.entry(user.id.clone()).or_insert_with(|| user.clone());
        Ok(())
    }

    async fn customer_totals(&self, email_search: Option<&str>) -> Result<Vec<CustomerTotals>> {
        let inner = self.inner.read().await;
        let search = email_search.map(str::trim).filter(|s| !s.is_empty());
        let mut totals: Vec<CustomerTotals> = inner
            .users
            .values()
            .filter(|u| search.map_or(true, |s| contains_ignore_case(&u.email, s)))
            .map(|u| {
                let paid: Vec<&Order> = inner.orders.values().filter(|o| o.user_id == u.id && o.is_paid).collect();
                CustomerTotals {
                    id: u.id.clone(),
                    email: u.email.clone(),
                    created_at: u.created_at,
                    total_orders: paid.len() as i64,
                    total_spent: paid.iter().fold(Money::ZERO, |acc, o| acc.add(o.amount)),
                }
            })
            .collect();
        totals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(totals)
    }

    async fn insert_configuration(&self, configuration: &Configuration) -> Result<()> {
        self.inner.write().await.configurations.insert(configuration.id, configuration.clone());
        Ok(())
    }

    async fn get_configuration(&self, id: Uuid) -> Result<Option<Configuration>> {
        Ok(self.inner.read().await.configurations.get(&id).cloned())
    }

    async fn update_configuration(&self, configuration: &Configuration) -> Result<()> {
        self.inner.write().await.configurations.insert(configuration.id, configuration.clone());
        Ok(())
    }

    async fn get_coupon(&self, id: Uuid) -> Result<Option<Coupon>> {
        Ok(self.inner.read().await.coupons.get(&id).cloned())
    }

    async fn find_coupon_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>> {
        Ok(self.inner.read().await.coupons.values().find(|c| &c.code == code).cloned())
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        let mut coupons: Vec<Coupon> = self.inner.read().await.coupons.values().cloned().collect();
        coupons.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(coupons)
    }

    async fn insert_coupon(&self, coupon: &Coupon) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.coupons.values().any(|c| c.code == coupon.code) {
            return Err(AppError::Conflict("Coupon code already exists".into()));
        }
        let mut stored = coupon.clone();
        stored.events.clear();
        inner.coupons.insert(stored.id, stored);
        Ok(())
    }

    async fn update_coupon(&self, coupon: &Coupon) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.coupons.values().any(|c| c.code == coupon.code && c.id != coupon.id) {
            return Err(AppError::Conflict("Coupon code already exists".into()));
        }
        if let Some(existing) = inner.coupons.get_mut(&coupon.id) {
            let used_count = existing.used_count;
            *existing = coupon.clone();
            existing.used_count = used_count;
            existing.events.clear();
        }
        Ok(())
    }

    async fn delete_coupon(&self, id: Uuid) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if inner.coupons.remove(&id).is_none() {
            return Ok(false);
        }
        for order in inner.orders.values_mut().filter(|o| o.coupon_id == Some(id)) {
            order.coupon_id = None;
        }
        Ok(true)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.inner.read().await.orders.get(&id).cloned())
    }

    async fn find_pending_order(&self, user_id: &str, configuration_id: Uuid) -> Result<Option<Order>> {
        Ok(self
            .inner
            .read()
            .await
            .orders
            .values()
            .find(|o| o.user_id == user_id && o.configuration_id == configuration_id && !o.is_paid)
            .cloned())
    }

    async fn insert_order(&self, order: &Order) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let duplicate = inner
            .orders
            .values()
            .any(|o| o.user_id == order.user_id && o.configuration_id == order.configuration_id && !o.is_paid);
        if duplicate && !order.is_paid {
            return Ok(false);
        }
        let mut stored = order.clone();
        stored.events.clear();
        inner.orders.insert(stored.id, stored);
        Ok(true)
    }

    async fn update_pending_order(&self, order: &Order) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.orders.get_mut(&order.id) {
            Some(existing) if !existing.is_paid => {
                existing.amount = order.amount;
                existing.subtotal = order.subtotal;
                existing.coupon_code = order.coupon_code.clone();
                existing.coupon_id = order.coupon_id;
                existing.discount = order.discount;
                existing.checkout_session_id = order.checkout_session_id.clone();
                existing.updated_at = order.updated_at;
                Ok(())
            }
            _ => Err(AppError::Conflict("Order is already paid".into())),
        }
    }

    async fn mark_order_paid(&self, order: &Order) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let coupon_id = match inner.orders.get_mut(&order.id) {
            Some(existing) if !existing.is_paid => {
                existing.is_paid = true;
                existing.shipping_address = order.shipping_address.clone();
                existing.billing_address = order.billing_address.clone();
                existing.updated_at = order.updated_at;
                existing.coupon_id
            }
            _ => return Ok(false),
        };
        if let Some(coupon) = coupon_id.and_then(|id| inner.coupons.get_mut(&id)) {
            coupon.used_count += 1;
            coupon.updated_at = Utc::now();
        }
        Ok(true)
    }

    async fn update_order_status(&self, order: &Order) -> Result<()> {
        if let Some(existing) = self.inner.write().await.orders.get_mut(&order.id) {
            existing.status = order.status;
            existing.updated_at = order.updated_at;
        }
        Ok(())
    }

    async fn list_paid_orders(&self, query: &AdminOrderQuery) -> Result<(Vec<OrderListing>, i64)> {
        let inner = self.inner.read().await;
        let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let mut listings: Vec<OrderListing> = inner
            .orders
            .values()
            .filter(|o| o.is_paid)
            .filter(|o| query.status.map_or(true, |s| o.status == s))
            .map(|o| inner.listing(o))
            .filter(|l| {
                search.map_or(true, |s| {
                    contains_ignore_case(&l.order.id.to_string(), s)
                        || contains_ignore_case(&l.customer_email, s)
                        || l.order.shipping_address.as_ref().is_some_and(|a| contains_ignore_case(&a.name, s))
                })
            })
            .collect();
        listings.sort_by(|a, b| {
            let primary = match query.sort {
                OrderSort::CreatedAt => a.order.created_at.cmp(&b.order.created_at),
                OrderSort::Amount => a.order.amount.cmp(&b.order.amount),
                OrderSort::Status => status_rank(a.order.status).cmp(status_rank(b.order.status)),
            };
            directed(primary, query.order).then_with(|| b.order.created_at.cmp(&a.order.created_at))
        });
        let total = listings.len() as i64;
        Ok((page(listings, query.offset, query.limit), total))
    }

    async fn customer_orders(
        &self,
        user_id: &str,
        scope: CustomerOrderScope,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<OrderListing>, i64)> {
        let inner = self.inner.read().await;
        let mut listings: Vec<OrderListing> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .filter(|o| match scope {
                CustomerOrderScope::Active => o.is_paid && o.status != OrderStatus::Fulfilled,
                CustomerOrderScope::Pending => !o.is_paid,
                CustomerOrderScope::PaidSince(since) => o.is_paid && o.created_at >= since,
            })
            .map(|o| inner.listing(o))
            .collect();
        match scope {
            CustomerOrderScope::Pending => listings.sort_by(|a, b| b.order.updated_at.cmp(&a.order.updated_at)),
            _ => listings.sort_by(|a, b| b.order.created_at.cmp(&a.order.created_at)),
        }
        let total = listings.len() as i64;
        Ok((page(listings, offset, limit), total))
    }

    async fn paid_revenue_since(&self, since: DateTime<Utc>) -> Result<Money> {
        Ok(self
            .inner
            .read()
            .await
            .orders
            .values()
            .filter(|o| o.is_paid && o.created_at >= since)
            .fold(Money::ZERO, |acc, o| acc.add(o.amount)))
    }

    async fn insert_ticket(&self, ticket: &SupportTicket, first_message: &SupportMessage) -> Result<()> {
        let mut inner = self.inner.write().await;
        let mut stored = ticket.clone();
        stored.events.clear();
        inner.tickets.insert(stored.id, stored);
        inner.messages.push(first_message.clone());
        Ok(())
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<SupportTicket>> {
        Ok(self.inner.read().await.tickets.get(&id).cloned())
    }

    async fn update_ticket(&self, ticket: &SupportTicket) -> Result<()> {
        if let Some(existing) = self.inner.write().await.tickets.get_mut(&ticket.id) {
            existing.status = ticket.status;
            existing.updated_at = ticket.updated_at;
        }
        Ok(())
    }

    async fn list_tickets(&self, query: &TicketQuery) -> Result<(Vec<TicketSummary>, i64)> {
        let inner = self.inner.read().await;
        let from_admin = query.viewer.unread_from_admin();
        let mut summaries: Vec<TicketSummary> = inner
            .tickets
            .values()
            .filter(|t| match &query.viewer {
                TicketViewer::Customer(user_id) => &t.user_id == user_id,
                TicketViewer::Admin => true,
            })
            .filter(|t| query.status.map_or(true, |s| t.status == s))
            .map(|t| TicketSummary {
                ticket: t.clone(),
                unread_count: inner.unread(t.id, from_admin),
                message_count: inner.messages.iter().filter(|m| m.ticket_id == t.id).count() as i64,
            })
            .collect();
        summaries.sort_by(|a, b| b.ticket.updated_at.cmp(&a.ticket.updated_at));
        let total = summaries.len() as i64;
        Ok((page(summaries, query.offset, query.limit), total))
    }

    async fn ticket_messages(&self, ticket_id: Uuid) -> Result<Vec<SupportMessage>> {
        let mut messages: Vec<SupportMessage> =
            self.inner.read().await.messages.iter().filter(|m| m.ticket_id == ticket_id).cloned().collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn insert_message(&self, message: &SupportMessage) -> Result<()> {
        self.inner.write().await.messages.push(message.clone());
        Ok(())
    }

    async fn mark_messages_read(&self, ticket_id: Uuid, from_admin: bool) -> Result<u64> {
        let mut marked = 0;
        for m in self.inner.write().await.messages.iter_mut() {
            if m.ticket_id == ticket_id && m.is_from_admin == from_admin && !m.is_read {
                m.is_read = true;
                marked += 1;
            }
        }
        Ok(marked)
    }

    async fn unread_admin_messages(&self, user_id: &str) -> Result<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .tickets
            .values()
            .filter(|t| t.user_id == user_id)
            .map(|t| inner.unread(t.id, true))
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::NewCoupon;
    use crate::domain::pricing::apply_discount;
    use crate::domain::value_objects::DiscountPercent;

    async fn store_with_coupon() -> (MemoryStore, Coupon) {
        let store = MemoryStore::new();
        let coupon = Coupon::create(NewCoupon {
            code: CouponCode::new("TEN").unwrap(),
            discount: DiscountPercent::new(10).unwrap(),
            description: None,
            valid_from: None,
            valid_until: None,
            max_uses: None,
            min_amount: None,
        })
        .unwrap();
        store.insert_coupon(&coupon).await.unwrap();
        (store, coupon)
    }

    #[tokio::test]
    async fn test_mark_paid_counts_coupon_once() {
        let (store, coupon) = store_with_coupon().await;
        let price = apply_discount(Money::from_cents(1400), coupon.discount);
        let mut order = Order::pending("user_1", Uuid::new_v4(), &price, Some(&coupon.applied()));
        store.insert_order(&order).await.unwrap();
        order.mark_paid(None, None).unwrap();

        assert!(store.mark_order_paid(&order).await.unwrap());
        assert!(!store.mark_order_paid(&order).await.unwrap());

        assert_eq!(store.get_coupon(coupon.id).await.unwrap().unwrap().used_count, 1);
        assert!(store.get_order(order.id).await.unwrap().unwrap().is_paid);
    }

    #[tokio::test]
    async fn test_deleting_coupon_detaches_orders() {
        let (store, coupon) = store_with_coupon().await;
        let price = apply_discount(Money::from_cents(1400), coupon.discount);
        let order = Order::pending("user_1", Uuid::new_v4(), &price, Some(&coupon.applied()));
        store.insert_order(&order).await.unwrap();

        assert!(store.delete_coupon(coupon.id).await.unwrap());
        let stored = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.coupon_id, None);
        assert_eq!(stored.coupon_code.as_ref().map(CouponCode::as_str), Some("TEN"));
    }
}
