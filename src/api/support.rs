use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{AuthUser, MaybeUser};
use crate::domain::aggregates::SupportMessage;
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::pagination::PageQuery;
use crate::services::support::{self, NewTicket, TicketPage, TicketThread};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    #[serde(default)]
    pub mark_as_read: bool,
}

pub async fn list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<TicketPage>> {
    Ok(Json(support::list_tickets(&state, &user, page).await?))
}

pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<NewTicket>,
) -> Result<(StatusCode, Json<Value>)> {
    let ticket = support::create_ticket(&state, &user, req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "ticket": ticket }))))
}

pub async fn get(State(state): State<AppState>, user: AuthUser, Path(id): Path<Uuid>) -> Result<Json<Value>> {
    let ticket: TicketThread = support::get_ticket(&state, &user, id).await?;
    Ok(Json(json!({ "ticket": ticket })))
}

pub async fn reply(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<ReplyRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let message: SupportMessage = support::reply(&state, &user, id, &req.message).await?;
    Ok((StatusCode::CREATED, Json(json!({ "message": message }))))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<Value>> {
    if req.mark_as_read {
        support::mark_read(&state, &user, id).await?;
    }
    Ok(Json(json!({ "success": true })))
}

pub async fn notifications(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Json<Value> {
    let count = support::notification_count(&state, user.as_ref()).await;
    Json(json!({ "count": count }))
}
