//! Support tickets and their message threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, SupportEvent};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupportTicketStatus { #[default] Open, InProgress, Resolved, Closed }

impl SupportTicketStatus {
    pub const ALL: [SupportTicketStatus; 4] = [Self::Open, Self::InProgress, Self::Resolved, Self::Closed];

    pub fn as_str(&self) -> &'static str {
        match self { Self::Open => "open", Self::InProgress => "in_progress", Self::Resolved => "resolved", Self::Closed => "closed" }
    }
}

impl FromStr for SupportTicketStatus {
    type Err = SupportError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|st| st.as_str() == s).ok_or_else(|| SupportError::UnknownStatus(s.to_string()))
    }
}

impl fmt::Display for SupportTicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportTicket {
    pub id: Uuid,
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub subject: String,
    pub status: SupportTicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub(crate) events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportMessage {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub message: String,
    pub is_from_admin: bool,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl SupportMessage {
    pub fn new(ticket_id: Uuid, message: impl Into<String>, is_from_admin: bool) -> Result<Self, SupportError> {
        let message = message.into();
        if message.trim().is_empty() { return Err(SupportError::EmptyMessage); }
        Ok(Self { id: Uuid::new_v4(), ticket_id, message, is_from_admin, is_read: false, created_at: Utc::now() })
    }
}

impl SupportTicket {
    /// Opens a ticket together with the customer's first message.
    pub fn open(
        user_id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) -> Result<(Self, SupportMessage), SupportError> {
        let (email, name, subject) = (email.into(), name.into(), subject.into());
        if [&email, &name, &subject].iter().any(|f| f.trim().is_empty()) { return Err(SupportError::MissingFields); }
        let now = Utc::now();
        let mut ticket = Self {
            id: Uuid::new_v4(), user_id: user_id.into(), email, name, subject,
            status: SupportTicketStatus::Open, created_at: now, updated_at: now, events: vec![],
        };
        let first = SupportMessage::new(ticket.id, message, false).map_err(|_| SupportError::MissingFields)?;
        ticket.raise_event(DomainEvent::Support(SupportEvent::TicketOpened { ticket_id: ticket.id, user_id: ticket.user_id.clone() }));
        Ok((ticket, first))
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool { self.user_id == user_id }

    /// Records activity on the thread. An admin answering an open ticket
    /// moves it to in progress.
    pub fn record_reply(&mut self, from_admin: bool) {
        if from_admin && self.status == SupportTicketStatus::Open {
            self.set_status(SupportTicketStatus::InProgress);
        } else {
            self.touch();
        }
    }

    pub fn set_status(&mut self, status: SupportTicketStatus) {
        self.status = status;
        self.touch();
        self.raise_event(DomainEvent::Support(SupportEvent::StatusChanged { ticket_id: self.id, status }));
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupportError {
    #[error("All fields are required")]
    MissingFields,
    #[error("Message is required")]
    EmptyMessage,
    #[error("Invalid status")]
    UnknownStatus(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_requires_all_fields() {
        assert_eq!(SupportTicket::open("u1", "a@b.c", "", "Help", "hi").unwrap_err(), SupportError::MissingFields);
        assert_eq!(SupportTicket::open("u1", "a@b.c", "Ada", "Help", "  ").unwrap_err(), SupportError::MissingFields);
        let (ticket, first) = SupportTicket::open("u1", "a@b.c", "Ada", "Help", "My case cracked").unwrap();
        assert_eq!(ticket.status, SupportTicketStatus::Open);
        assert_eq!(first.ticket_id, ticket.id);
        assert!(!first.is_from_admin);
    }

    #[test]
    fn test_admin_reply_moves_open_to_in_progress() {
        let (mut ticket, _) = SupportTicket::open("u1", "a@b.c", "Ada", "Help", "hi").unwrap();
        ticket.record_reply(false);
        assert_eq!(ticket.status, SupportTicketStatus::Open);
        ticket.record_reply(true);
        assert_eq!(ticket.status, SupportTicketStatus::InProgress);

        ticket.set_status(SupportTicketStatus::Resolved);
        ticket.record_reply(true);
        assert_eq!(ticket.status, SupportTicketStatus::Resolved);
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("in_progress".parse::<SupportTicketStatus>().unwrap(), SupportTicketStatus::InProgress);
        assert!("pending".parse::<SupportTicketStatus>().is_err());
    }
}
