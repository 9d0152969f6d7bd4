use axum::{body::Bytes, extract::State, http::HeaderMap};
use serde_json::{json, Value};

use crate::error::{AppError, Result};
use crate::extract::Json;
use crate::services::checkout;
use crate::state::AppState;

pub async fn stripe(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Missing stripe-signature header".into()))?;

    if !state.payments.verify_webhook(&body, signature)? {
        return Err(AppError::BadRequest("Invalid signature".into()));
    }

    let event = state.payments.parse_webhook(&body)?;
    checkout::handle_webhook(&state, event).await?;
    Ok(Json(json!({ "received": true })))
}
