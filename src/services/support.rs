//! Help-desk threads between customers and the administrator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::domain::aggregates::{SupportMessage, SupportTicket, SupportTicketStatus};
use crate::error::{AppError, Result};
use crate::pagination::{PageQuery, Pagination, TICKETS_PER_PAGE};
use crate::state::AppState;
use crate::store::{TicketQuery, TicketSummary, TicketViewer};

#[derive(Debug, Deserialize)]
pub struct NewTicket {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketListItem {
    pub id: Uuid,
    pub subject: String,
    pub status: SupportTicketStatus,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub unread_count: i64,
    pub message_count: i64,
}

impl From<TicketSummary> for TicketListItem {
    fn from(summary: TicketSummary) -> Self {
        let t = summary.ticket;
        Self {
            id: t.id,
            subject: t.subject,
            status: t.status,
            email: t.email,
            name: t.name,
            created_at: t.created_at,
            updated_at: t.updated_at,
            unread_count: summary.unread_count,
            message_count: summary.message_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TicketPage {
    pub tickets: Vec<TicketListItem>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
pub struct TicketThread {
    #[serde(flatten)]
    pub ticket: SupportTicket,
    pub messages: Vec<SupportMessage>,
}

async fn load_ticket(state: &AppState, id: Uuid) -> Result<SupportTicket> {
    state.store.get_ticket(id).await?.ok_or_else(|| AppError::NotFound("Ticket not found".into()))
}

async fn owned_ticket(state: &AppState, user: &AuthUser, id: Uuid) -> Result<SupportTicket> {
    let ticket = load_ticket(state, id).await?;
    if !ticket.is_owned_by(&user.id) {
        return Err(AppError::Forbidden("Ticket belongs to another user".into()));
    }
    Ok(ticket)
}

async fn list(state: &AppState, viewer: TicketViewer, status: Option<SupportTicketStatus>, page: PageQuery) -> Result<TicketPage> {
    let query = TicketQuery { viewer, status, offset: page.offset(TICKETS_PER_PAGE), limit: TICKETS_PER_PAGE };
    let (summaries, total) = state.store.list_tickets(&query).await?;
    Ok(TicketPage {
        tickets: summaries.into_iter().map(TicketListItem::from).collect(),
        pagination: Pagination::new(page.page(), total, TICKETS_PER_PAGE),
    })
}

async fn add_reply(state: &AppState, mut ticket: SupportTicket, message: &str, from_admin: bool) -> Result<SupportMessage> {
    let message = SupportMessage::new(ticket.id, message, from_admin)?;
    state.store.insert_message(&message).await?;
    ticket.record_reply(from_admin);
    state.store.update_ticket(&ticket).await?;
    state.events.publish_all(ticket.take_events()).await;
    Ok(message)
}

pub async fn create_ticket(state: &AppState, user: &AuthUser, new: NewTicket) -> Result<TicketThread> {
    let (mut ticket, first) = SupportTicket::open(user.id.clone(), new.email, new.name, new.subject, new.message)?;
    state.store.insert_user(&user.to_user()).await?;
    state.store.insert_ticket(&ticket, &first).await?;
    tracing::info!(ticket_id = %ticket.id, user_id = %user.id, "Support ticket opened");
    state.events.publish_all(ticket.take_events()).await;
    Ok(TicketThread { ticket, messages: vec![first] })
}

pub async fn list_tickets(state: &AppState, user: &AuthUser, page: PageQuery) -> Result<TicketPage> {
    list(state, TicketViewer::Customer(user.id.clone()), None, page).await
}

pub async fn get_ticket(state: &AppState, user: &AuthUser, id: Uuid) -> Result<TicketThread> {
    let ticket = owned_ticket(state, user, id).await?;
    let messages = state.store.ticket_messages(id).await?;
    Ok(TicketThread { ticket, messages })
}

pub async fn reply(state: &AppState, user: &AuthUser, id: Uuid, message: &str) -> Result<SupportMessage> {
    let ticket = owned_ticket(state, user, id).await?;
    add_reply(state, ticket, message, false).await
}

/// Marks the administrator's replies on the ticket as read.
pub async fn mark_read(state: &AppState, user: &AuthUser, id: Uuid) -> Result<u64> {
    owned_ticket(state, user, id).await?;
    state.store.mark_messages_read(id, true).await
}

/// Unread administrator replies across all of the user's tickets. Never
/// fails: anonymous callers and store errors both count as zero.
pub async fn notification_count(state: &AppState, user: Option<&AuthUser>) -> i64 {
    let Some(user) = user else { return 0 };
    match state.store.unread_admin_messages(&user.id).await {
        Ok(count) => count,
        Err(e) => {
            tracing::warn!(user_id = %user.id, error = %e, "Failed to count notifications");
            0
        }
    }
}

/// Administrator view of all tickets. An unknown status filter is ignored.
pub async fn admin_list_tickets(state: &AppState, status: Option<&str>, page: PageQuery) -> Result<TicketPage> {
    let status = status.and_then(|s| s.parse().ok());
    list(state, TicketViewer::Admin, status, page).await
}

/// Opening a ticket as administrator marks the customer's messages read.
pub async fn admin_get_ticket(state: &AppState, id: Uuid) -> Result<TicketThread> {
    let ticket = load_ticket(state, id).await?;
    state.store.mark_messages_read(id, false).await?;
    let messages = state.store.ticket_messages(id).await?;
    Ok(TicketThread { ticket, messages })
}

pub async fn admin_reply(state: &AppState, id: Uuid, message: &str) -> Result<SupportMessage> {
    let ticket = load_ticket(state, id).await?;
    add_reply(state, ticket, message, true).await
}

pub async fn set_status(state: &AppState, id: Uuid, status: &str) -> Result<SupportTicket> {
    let status: SupportTicketStatus = status.parse()?;
    let mut ticket = load_ticket(state, id).await?;
    ticket.set_status(status);
    state.store.update_ticket(&ticket).await?;
    tracing::info!(ticket_id = %ticket.id, status = %status, "Support ticket status changed");
    state.events.publish_all(ticket.take_events()).await;
    Ok(ticket)
}
