use axum::extract::State;
use uuid::Uuid;

use crate::auth::CustomerUser;
use crate::error::Result;
use crate::extract::{Json, Path, Query};
use crate::pagination::PageQuery;
use crate::services::orders::{self, OrderPage, OrderView};
use crate::state::AppState;

pub async fn active(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<OrderPage<OrderView>>> {
    Ok(Json(orders::active_orders(&state, &user, page).await?))
}

pub async fn pending(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<OrderPage<OrderView>>> {
    Ok(Json(orders::pending_orders(&state, &user, page).await?))
}

pub async fn recent(State(state): State<AppState>, CustomerUser(user): CustomerUser) -> Result<Json<Vec<OrderView>>> {
    Ok(Json(orders::recent_orders(&state, &user).await?))
}

pub async fn track(
    State(state): State<AppState>,
    CustomerUser(user): CustomerUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderView>> {
    Ok(Json(orders::track_order(&state, &user, id).await?))
}
