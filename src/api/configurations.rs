use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{CaseColor, CaseFinish, CaseMaterial, Configuration, Design, PhoneModel};
use crate::error::Result;
use crate::extract::{Json, Path, ValidJson};
use crate::services::configurations;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UploadRequest {
    #[validate(url)]
    pub image_url: String,
    #[validate(range(min = 1))]
    pub width: i32,
    #[validate(range(min = 1))]
    pub height: i32,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DesignRequest {
    pub model: PhoneModel,
    pub color: CaseColor,
    #[serde(default)]
    pub material: CaseMaterial,
    #[serde(default)]
    pub finish: CaseFinish,
    #[validate(url)]
    pub cropped_image_url: String,
}

pub async fn create(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<UploadRequest>,
) -> Result<(StatusCode, Json<Configuration>)> {
    let configuration = configurations::create_configuration(&state, &req.image_url, req.width, req.height).await?;
    Ok((StatusCode::CREATED, Json(configuration)))
}

pub async fn get(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Configuration>> {
    Ok(Json(configurations::get_configuration(&state, id).await?))
}

pub async fn save_design(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ValidJson(req): ValidJson<DesignRequest>,
) -> Result<Json<Configuration>> {
    let design = Design {
        model: req.model,
        color: req.color,
        material: req.material,
        finish: req.finish,
        cropped_image_url: req.cropped_image_url,
    };
    Ok(Json(configurations::save_design(&state, id, design).await?))
}
