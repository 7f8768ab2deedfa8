use axum::extract::State;
use axum::Json;
use chrono::Utc;
use kibotos_types::{Prompt, PromptRequirements};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePromptRequest {
    pub id: String,
    pub category: String,
    pub task: String,
    pub scenario: String,
    pub requirements: PromptRequirements,
    pub weight: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

pub async fn create_prompt(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(req): Json<CreatePromptRequest>,
) -> Result<Json<Prompt>, ApiError> {
    let prompt = Prompt {
        id: req.id,
        category: req.category,
        task: req.task,
        scenario: req.scenario,
        requirements: req.requirements,
        weight: req.weight,
        active: req.active,
        created_at: Utc::now(),
    };

    let created = state
        .store
        .create_prompt(&prompt)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;
    Ok(Json(created))
}
