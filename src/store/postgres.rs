//! PostgreSQL-backed store.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::{FromRow, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{
    AdminOrderQuery, CustomerOrderScope, CustomerTotals, OrderListing, OrderSort, Store, TicketQuery, TicketSummary,
    TicketViewer,
};
use crate::domain::aggregates::{
    Address, Configuration, Coupon, Order, SupportMessage, SupportTicket, User,
};
use crate::domain::value_objects::{CouponCode, DiscountPercent, Money};
use crate::error::{AppError, Result};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    async fn with_configurations(&self, rows: Vec<OrderListingRow>) -> Result<Vec<OrderListing>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.order.configuration_id).collect();
        let configurations = sqlx::query_as::<_, ConfigurationRow>("SELECT * FROM configurations WHERE id = ANY($1)")
            .bind(&ids[..])
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(|row| Configuration::try_from(row).map(|c| (c.id, c)))
            .collect::<Result<HashMap<_, _>>>()?;

        rows.into_iter()
            .map(|row| -> Result<OrderListing> {
                Ok(OrderListing {
                    configuration: configurations.get(&row.order.configuration_id).cloned(),
                    customer_email: row.customer_email,
                    order: row.order.try_into()?,
                })
            })
            .collect()
    }
}

fn corrupt(what: &str, detail: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("corrupt {what} row: {detail}"))
}

fn conflict_on_unique(e: sqlx::Error, message: &str) -> AppError {
    let unique = e.as_database_error().and_then(|d| d.code()).as_deref() == Some("23505");
    if unique {
        AppError::Conflict(message.to_string())
    } else {
        AppError::Database(e)
    }
}

/// `%term%` with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        User { id: r.id, email: r.email, created_at: r.created_at, updated_at: r.updated_at }
    }
}

#[derive(FromRow)]
struct ConfigurationRow {
    id: Uuid,
    image_url: String,
    width: i32,
    height: i32,
    cropped_image_url: Option<String>,
    model: Option<String>,
    color: Option<String>,
    material: Option<String>,
    finish: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ConfigurationRow> for Configuration {
    type Error = AppError;
    fn try_from(r: ConfigurationRow) -> Result<Self> {
        Ok(Configuration {
            id: r.id,
            image_url: r.image_url,
            width: r.width,
            height: r.height,
            cropped_image_url: r.cropped_image_url,
            model: r.model.as_deref().map(str::parse).transpose().map_err(|e| corrupt("configuration", e))?,
            color: r.color.as_deref().map(str::parse).transpose().map_err(|e| corrupt("configuration", e))?,
            material: r.material.as_deref().map(str::parse).transpose().map_err(|e| corrupt("configuration", e))?,
            finish: r.finish.as_deref().map(str::parse).transpose().map_err(|e| corrupt("configuration", e))?,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(FromRow)]
struct CouponRow {
    id: Uuid,
    code: String,
    discount: i16,
    description: Option<String>,
    is_active: bool,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
    max_uses: Option<i32>,
    used_count: i32,
    min_amount: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CouponRow> for Coupon {
    type Error = AppError;
    fn try_from(r: CouponRow) -> Result<Self> {
        Ok(Coupon {
            id: r.id,
            code: CouponCode::new(&r.code).map_err(|e| corrupt("coupon", e))?,
            discount: DiscountPercent::new(i32::from(r.discount)).map_err(|e| corrupt("coupon", e))?,
            description: r.description,
            is_active: r.is_active,
            valid_from: r.valid_from,
            valid_until: r.valid_until,
            max_uses: r.max_uses,
            used_count: r.used_count,
            min_amount: r.min_amount.map(Money::from_cents),
            created_at: r.created_at,
            updated_at: r.updated_at,
            events: vec![],
        })
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: String,
    configuration_id: Uuid,
    amount: i64,
    subtotal: i64,
    coupon_code: Option<String>,
    coupon_id: Option<Uuid>,
    discount: i16,
    is_paid: bool,
    status: String,
    shipping_address: Option<Json<Address>>,
    billing_address: Option<Json<Address>>,
    checkout_session_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;
    fn try_from(r: OrderRow) -> Result<Self> {
        Ok(Order {
            id: r.id,
            user_id: r.user_id,
            configuration_id: r.configuration_id,
            amount: Money::from_cents(r.amount),
            subtotal: Money::from_cents(r.subtotal),
            coupon_code: r.coupon_code.as_deref().map(CouponCode::new).transpose().map_err(|e| corrupt("order", e))?,
            coupon_id: r.coupon_id,
            discount: DiscountPercent::new(i32::from(r.discount)).map_err(|e| corrupt("order", e))?,
            is_paid: r.is_paid,
            status: r.status.parse().map_err(|e| corrupt("order", e))?,
            shipping_address: r.shipping_address.map(|j| j.0),
            billing_address: r.billing_address.map(|j| j.0),
            checkout_session_id: r.checkout_session_id,
            created_at: r.created_at,
            updated_at: r.updated_at,
            events: vec![],
        })
    }
}

#[derive(FromRow)]
struct OrderListingRow {
    #[sqlx(flatten)]
    order: OrderRow,
    customer_email: String,
}

#[derive(FromRow)]
struct TicketRow {
    id: Uuid,
    user_id: String,
    email: String,
    name: String,
    subject: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TicketRow> for SupportTicket {
    type Error = AppError;
    fn try_from(r: TicketRow) -> Result<Self> {
        Ok(SupportTicket {
            id: r.id,
            user_id: r.user_id,
            email: r.email,
            name: r.name,
            subject: r.subject,
            status: r.status.parse().map_err(|e| corrupt("support ticket", e))?,
            created_at: r.created_at,
            updated_at: r.updated_at,
            events: vec![],
        })
    }
}

#[derive(FromRow)]
struct TicketSummaryRow {
    #[sqlx(flatten)]
    ticket: TicketRow,
    unread_count: i64,
    message_count: i64,
}

#[derive(FromRow)]
struct MessageRow {
    id: Uuid,
    ticket_id: Uuid,
    message: String,
    is_from_admin: bool,
    is_read: bool,
    created_at: DateTime<Utc>,
}

impl From<MessageRow> for SupportMessage {
    fn from(r: MessageRow) -> Self {
        SupportMessage {
            id: r.id,
            ticket_id: r.ticket_id,
            message: r.message,
            is_from_admin: r.is_from_admin,
            is_read: r.is_read,
            created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct CustomerTotalsRow {
    id: String,
    email: String,
    created_at: DateTime<Utc>,
    total_orders: i64,
    total_spent: i64,
}

fn push_admin_order_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &AdminOrderQuery) {
    qb.push(" WHERE o.is_paid = TRUE");
    if let Some(status) = query.status {
        qb.push(" AND o.status = ").push_bind(status.as_str());
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (o.id::TEXT ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR u.email ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR o.shipping_address->>'name' ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

fn push_customer_scope(qb: &mut QueryBuilder<'_, Postgres>, user_id: &str, scope: CustomerOrderScope) {
    qb.push(" WHERE o.user_id = ").push_bind(user_id.to_string());
    match scope {
        CustomerOrderScope::Active => {
            qb.push(" AND o.is_paid = TRUE AND o.status <> 'fulfilled'");
        }
        CustomerOrderScope::Pending => {
            qb.push(" AND o.is_paid = FALSE");
        }
        CustomerOrderScope::PaidSince(since) => {
            qb.push(" AND o.is_paid = TRUE AND o.created_at >= ").push_bind(since);
        }
    }
}

fn push_ticket_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &TicketQuery) {
    qb.push(" WHERE TRUE");
    if let TicketViewer::Customer(user_id) = &query.viewer {
        qb.push(" AND t.user_id = ").push_bind(user_id.clone());
    }
    if let Some(status) = query.status {
        qb.push(" AND t.status = ").push_bind(status.as_str());
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(User::from))
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        sqlx::query("INSERT INTO users (id, email, created_at, updated_at) VALUES ($1, $2, $3, $4) ON CONFLICT (id) DO NOTHING")
            .bind(&user.id)
            .bind(&user.email)
            .bind(user.created_at)
            .bind(user.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn customer_totals(&self, email_search: Option<&str>) -> Result<Vec<CustomerTotals>> {
        let pattern = email_search.map(str::trim).filter(|s| !s.is_empty()).map(like_pattern);
        let rows = sqlx::query_as::<_, CustomerTotalsRow>(
            "SELECT u.id, u.email, u.created_at, COUNT(o.id) AS total_orders, COALESCE(SUM(o.amount), 0)::BIGINT AS total_spent \
             FROM users u LEFT JOIN orders o ON o.user_id = u.id AND o.is_paid = TRUE \
             WHERE ($1::TEXT IS NULL OR u.email ILIKE $1) \
             GROUP BY u.id, u.email, u.created_at ORDER BY u.created_at DESC",
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| CustomerTotals {
                id: r.id,
                email: r.email,
                created_at: r.created_at,
                total_orders: r.total_orders,
                total_spent: Money::from_cents(r.total_spent),
            })
            .collect())
    }

    async fn insert_configuration(&self, c: &Configuration) -> Result<()> {
        sqlx::query(
            "INSERT INTO configurations (id, image_url, width, height, cropped_image_url, model, color, material, finish, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(c.id)
        .bind(&c.image_url)
        .bind(c.width)
        .bind(c.height)
        .bind(&c.cropped_image_url)
        .bind(c.model.map(|m| m.as_str()))
        .bind(c.color.map(|m| m.as_str()))
        .bind(c.material.map(|m| m.as_str()))
        .bind(c.finish.map(|m| m.as_str()))
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_configuration(&self, id: Uuid) -> Result<Option<Configuration>> {
        sqlx::query_as::<_, ConfigurationRow>("SELECT * FROM configurations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Configuration::try_from)
            .transpose()
    }

    async fn update_configuration(&self, c: &Configuration) -> Result<()> {
        sqlx::query(
            "UPDATE configurations SET cropped_image_url = $2, model = $3, color = $4, material = $5, finish = $6, updated_at = $7 WHERE id = $1",
        )
        .bind(c.id)
        .bind(&c.cropped_image_url)
        .bind(c.model.map(|m| m.as_str()))
        .bind(c.color.map(|m| m.as_str()))
        .bind(c.material.map(|m| m.as_str()))
        .bind(c.finish.map(|m| m.as_str()))
        .bind(c.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_coupon(&self, id: Uuid) -> Result<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Coupon::try_from)
            .transpose()
    }

    async fn find_coupon_by_code(&self, code: &CouponCode) -> Result<Option<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons WHERE code = $1")
            .bind(code.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Coupon::try_from)
            .transpose()
    }

    async fn list_coupons(&self) -> Result<Vec<Coupon>> {
        sqlx::query_as::<_, CouponRow>("SELECT * FROM coupons ORDER BY created_at DESC")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Coupon::try_from)
            .collect()
    }

    async fn insert_coupon(&self, c: &Coupon) -> Result<()> {
        sqlx::query(
            "INSERT INTO coupons (id, code, discount, description, is_active, valid_from, valid_until, max_uses, used_count, min_amount, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(c.id)
        .bind(c.code.as_str())
        .bind(i16::from(c.discount.value()))
        .bind(&c.description)
        .bind(c.is_active)
        .bind(c.valid_from)
        .bind(c.valid_until)
        .bind(c.max_uses)
        .bind(c.used_count)
        .bind(c.min_amount.map(|m| m.cents()))
        .bind(c.created_at)
        .bind(c.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Coupon code already exists"))?;
        Ok(())
    }

    async fn update_coupon(&self, c: &Coupon) -> Result<()> {
        sqlx::query(
            "UPDATE coupons SET code = $2, discount = $3, description = $4, is_active = $5, valid_from = $6, valid_until = $7, \
             max_uses = $8, min_amount = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(c.id)
        .bind(c.code.as_str())
        .bind(i16::from(c.discount.value()))
        .bind(&c.description)
        .bind(c.is_active)
        .bind(c.valid_from)
        .bind(c.valid_until)
        .bind(c.max_uses)
        .bind(c.min_amount.map(|m| m.cents()))
        .bind(c.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Coupon code already exists"))?;
        Ok(())
    }

    async fn delete_coupon(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM coupons WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn find_pending_order(&self, user_id: &str, configuration_id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>("SELECT * FROM orders WHERE user_id = $1 AND configuration_id = $2 AND is_paid = FALSE")
            .bind(user_id)
            .bind(configuration_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn insert_order(&self, o: &Order) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO orders (id, user_id, configuration_id, amount, subtotal, coupon_code, coupon_id, discount, is_paid, status, \
             shipping_address, billing_address, checkout_session_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) \
             ON CONFLICT (user_id, configuration_id) WHERE is_paid = FALSE DO NOTHING",
        )
        .bind(o.id)
        .bind(&o.user_id)
        .bind(o.configuration_id)
        .bind(o.amount.cents())
        .bind(o.subtotal.cents())
        .bind(o.coupon_code.as_ref().map(|c| c.as_str()))
        .bind(o.coupon_id)
        .bind(i16::from(o.discount.value()))
        .bind(o.is_paid)
        .bind(o.status.as_str())
        .bind(o.shipping_address.as_ref().map(Json))
        .bind(o.billing_address.as_ref().map(Json))
        .bind(&o.checkout_session_id)
        .bind(o.created_at)
        .bind(o.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn update_pending_order(&self, o: &Order) -> Result<()> {
        let result = sqlx::query(
            "UPDATE orders SET amount = $2, subtotal = $3, coupon_code = $4, coupon_id = $5, discount = $6, \
             checkout_session_id = $7, updated_at = $8 WHERE id = $1 AND is_paid = FALSE",
        )
        .bind(o.id)
        .bind(o.amount.cents())
        .bind(o.subtotal.cents())
        .bind(o.coupon_code.as_ref().map(|c| c.as_str()))
        .bind(o.coupon_id)
        .bind(i16::from(o.discount.value()))
        .bind(&o.checkout_session_id)
        .bind(o.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::Conflict("Order is already paid".into()));
        }
        Ok(())
    }

    async fn mark_order_paid(&self, o: &Order) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let paid: Option<Option<Uuid>> = sqlx::query_scalar(
            "UPDATE orders SET is_paid = TRUE, shipping_address = $2, billing_address = $3, updated_at = $4 \
             WHERE id = $1 AND is_paid = FALSE RETURNING coupon_id",
        )
        .bind(o.id)
        .bind(o.shipping_address.as_ref().map(Json))
        .bind(o.billing_address.as_ref().map(Json))
        .bind(o.updated_at)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(coupon_id) = paid else {
            return Ok(false);
        };
        if let Some(coupon_id) = coupon_id {
            sqlx::query("UPDATE coupons SET used_count = used_count + 1, updated_at = NOW() WHERE id = $1")
                .bind(coupon_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(true)
    }

    async fn update_order_status(&self, o: &Order) -> Result<()> {
        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(o.id)
            .bind(o.status.as_str())
            .bind(o.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_paid_orders(&self, query: &AdminOrderQuery) -> Result<(Vec<OrderListing>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o JOIN users u ON u.id = o.user_id");
        push_admin_order_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut list = QueryBuilder::<Postgres>::new(
            "SELECT o.*, u.email AS customer_email FROM orders o JOIN users u ON u.id = o.user_id",
        );
        push_admin_order_filters(&mut list, query);
        let column = match query.sort {
            OrderSort::CreatedAt => "o.created_at",
            OrderSort::Amount => "o.amount",
            OrderSort::Status => "o.status",
        };
        list.push(format!(" ORDER BY {} {}, o.created_at DESC", column, query.order.as_sql()));
        list.push(" LIMIT ").push_bind(query.limit).push(" OFFSET ").push_bind(query.offset);
        let rows = list.build_query_as::<OrderListingRow>().fetch_all(&self.pool).await?;

        Ok((self.with_configurations(rows).await?, total))
    }

    async fn customer_orders(
        &self,
        user_id: &str,
        scope: CustomerOrderScope,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<OrderListing>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM orders o");
        push_customer_scope(&mut count, user_id, scope);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut list = QueryBuilder::<Postgres>::new(
            "SELECT o.*, u.email AS customer_email FROM orders o JOIN users u ON u.id = o.user_id",
        );
        push_customer_scope(&mut list, user_id, scope);
        list.push(match scope {
            CustomerOrderScope::Pending => " ORDER BY o.updated_at DESC",
            _ => " ORDER BY o.created_at DESC",
        });
        list.push(" LIMIT ").push_bind(limit).push(" OFFSET ").push_bind(offset);
        let rows = list.build_query_as::<OrderListingRow>().fetch_all(&self.pool).await?;

        Ok((self.with_configurations(rows).await?, total))
    }

    async fn paid_revenue_since(&self, since: DateTime<Utc>) -> Result<Money> {
        let cents: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM orders WHERE is_paid = TRUE AND created_at >= $1",
        )
        .bind(since)
        .fetch_one(&self.pool)
        .await?;
        Ok(Money::from_cents(cents))
    }

    async fn insert_ticket(&self, t: &SupportTicket, first: &SupportMessage) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO support_tickets (id, user_id, email, name, subject, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(t.id)
        .bind(&t.user_id)
        .bind(&t.email)
        .bind(&t.name)
        .bind(&t.subject)
        .bind(t.status.as_str())
        .bind(t.created_at)
        .bind(t.updated_at)
        .execute(&mut *tx)
        .await?;
        sqlx::query(
            "INSERT INTO support_messages (id, ticket_id, message, is_from_admin, is_read, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(first.id)
        .bind(first.ticket_id)
        .bind(&first.message)
        .bind(first.is_from_admin)
        .bind(first.is_read)
        .bind(first.created_at)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<SupportTicket>> {
        sqlx::query_as::<_, TicketRow>("SELECT * FROM support_tickets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(SupportTicket::try_from)
            .transpose()
    }

    async fn update_ticket(&self, t: &SupportTicket) -> Result<()> {
        sqlx::query("UPDATE support_tickets SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(t.id)
            .bind(t.status.as_str())
            .bind(t.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_tickets(&self, query: &TicketQuery) -> Result<(Vec<TicketSummary>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM support_tickets t");
        push_ticket_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut list = QueryBuilder::<Postgres>::new(
            "SELECT t.*, (SELECT COUNT(*) FROM support_messages m WHERE m.ticket_id = t.id AND m.is_read = FALSE AND m.is_from_admin = ",
        );
        list.push_bind(query.viewer.unread_from_admin());
        list.push(") AS unread_count, (SELECT COUNT(*) FROM support_messages m WHERE m.ticket_id = t.id) AS message_count FROM support_tickets t");
        push_ticket_filters(&mut list, query);
        list.push(" ORDER BY t.updated_at DESC LIMIT ")
            .push_bind(query.limit)
            .push(" OFFSET ")
            .push_bind(query.offset);
        let rows = list.build_query_as::<TicketSummaryRow>().fetch_all(&self.pool).await?;

        let summaries = rows
            .into_iter()
            .map(|r| -> Result<TicketSummary> {
                Ok(TicketSummary {
                    ticket: r.ticket.try_into()?,
                    unread_count: r.unread_count,
                    message_count: r.message_count,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok((summaries, total))
    }

    async fn ticket_messages(&self, ticket_id: Uuid) -> Result<Vec<SupportMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>("SELECT * FROM support_messages WHERE ticket_id = $1 ORDER BY created_at ASC")
            .bind(ticket_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(SupportMessage::from).collect())
    }

    async fn insert_message(&self, m: &SupportMessage) -> Result<()> {
        sqlx::query(
            "INSERT INTO support_messages (id, ticket_id, message, is_from_admin, is_read, created_at) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(m.id)
        .bind(m.ticket_id)
        .bind(&m.message)
        .bind(m.is_from_admin)
        .bind(m.is_read)
        .bind(m.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn mark_messages_read(&self, ticket_id: Uuid, from_admin: bool) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE support_messages SET is_read = TRUE WHERE ticket_id = $1 AND is_from_admin = $2 AND is_read = FALSE",
        )
        .bind(ticket_id)
        .bind(from_admin)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn unread_admin_messages(&self, user_id: &str) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM support_messages m JOIN support_tickets t ON t.id = m.ticket_id \
             WHERE t.user_id = $1 AND m.is_from_admin = TRUE AND m.is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ada"), "%ada%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
