mod common;

use common::*;

use case_storefront::domain::aggregates::SupportTicketStatus;
use case_storefront::pagination::PageQuery;
use case_storefront::services::support::{self, NewTicket};
use case_storefront::AppError;

fn ticket_request(message: &str) -> NewTicket {
    NewTicket {
        email: "alice@example.test".into(),
        name: "Alice".into(),
        subject: "Case arrived scratched".into(),
        message: message.into(),
    }
}

#[tokio::test]
async fn test_ticket_requires_all_fields() {
    let app = TestApp::new();
    let err = support::create_ticket(&app.state, &customer("alice"), ticket_request("")).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "All fields are required"));
}

#[tokio::test]
async fn test_conversation_and_unread_counts() {
    let app = TestApp::new();
    let alice = customer("alice");
    let thread = support::create_ticket(&app.state, &alice, ticket_request("Hello")).await.unwrap();
    let id = thread.ticket.id;
    assert_eq!(thread.messages.len(), 1);

    // Admin sees one unread customer message.
    let admin_view = support::admin_list_tickets(&app.state, None, PageQuery::default()).await.unwrap();
    assert_eq!(admin_view.tickets[0].unread_count, 1);

    let opened = support::admin_get_ticket(&app.state, id).await.unwrap();
    assert!(opened.messages.iter().all(|m| m.is_read));

    support::admin_reply(&app.state, id, "Sorry to hear that").await.unwrap();
    let ticket = support::get_ticket(&app.state, &alice, id).await.unwrap();
    assert_eq!(ticket.ticket.status, SupportTicketStatus::InProgress);
    assert_eq!(ticket.messages.len(), 2);

    assert_eq!(support::notification_count(&app.state, Some(&alice)).await, 1);
    let mine = support::list_tickets(&app.state, &alice, PageQuery::default()).await.unwrap();
    assert_eq!(mine.tickets[0].unread_count, 1);
    assert_eq!(mine.tickets[0].message_count, 2);

    assert_eq!(support::mark_read(&app.state, &alice, id).await.unwrap(), 1);
    assert_eq!(support::notification_count(&app.state, Some(&alice)).await, 0);
    assert_eq!(support::notification_count(&app.state, None).await, 0);
}

#[tokio::test]
async fn test_ticket_ownership() {
    let app = TestApp::new();
    let thread = support::create_ticket(&app.state, &customer("alice"), ticket_request("Hi")).await.unwrap();
    let mallory = customer("mallory");

    let err = support::get_ticket(&app.state, &mallory, thread.ticket.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = support::reply(&app.state, &mallory, thread.ticket.id, "me too").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    let err = support::get_ticket(&app.state, &mallory, uuid::Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert!(support::list_tickets(&app.state, &mallory, PageQuery::default()).await.unwrap().tickets.is_empty());
}

#[tokio::test]
async fn test_admin_status_changes() {
    let app = TestApp::new();
    let thread = support::create_ticket(&app.state, &customer("alice"), ticket_request("Hi")).await.unwrap();
    let id = thread.ticket.id;

    let err = support::set_status(&app.state, id, "escalated").await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let ticket = support::set_status(&app.state, id, "resolved").await.unwrap();
    assert_eq!(ticket.status, SupportTicketStatus::Resolved);

    // A reply on a resolved ticket keeps its status.
    support::admin_reply(&app.state, id, "Closing the loop").await.unwrap();
    let resolved = support::admin_list_tickets(&app.state, Some("resolved"), PageQuery::default()).await.unwrap();
    assert_eq!(resolved.tickets.len(), 1);
    let open = support::admin_list_tickets(&app.state, Some("open"), PageQuery::default()).await.unwrap();
    assert!(open.tickets.is_empty());

    let err = support::admin_reply(&app.state, id, "   ").await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
}
