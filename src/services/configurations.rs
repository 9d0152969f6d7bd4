use uuid::Uuid;

use crate::domain::aggregates::{Configuration, Design};
use crate::error::{AppError, Result};
use crate::state::AppState;

pub async fn create_configuration(state: &AppState, image_url: &str, width: i32, height: i32) -> Result<Configuration> {
    let configuration = Configuration::upload(image_url, width, height)?;
    state.store.insert_configuration(&configuration).await?;
    tracing::info!(configuration_id = %configuration.id, "Configuration created");
    Ok(configuration)
}

pub async fn get_configuration(state: &AppState, id: Uuid) -> Result<Configuration> {
    state
        .store
        .get_configuration(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Configuration {id} not found")))
}

pub async fn save_design(state: &AppState, id: Uuid, design: Design) -> Result<Configuration> {
    let mut configuration = get_configuration(state, id).await?;
    configuration.apply_design(design)?;
    state.store.update_configuration(&configuration).await?;
    Ok(configuration)
}
