use axum::extract::{Path, Query, State};
use axum::Json;
use kibotos_types::{CategoryCount, KibotosError, Prompt};
use serde::Deserialize;

use crate::error::ApiError;
use crate::middleware::RequestId;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    category: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Prompt>>, ApiError> {
    let prompts = state
        .store
        .list_prompts(query.category.as_deref())
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;
    Ok(Json(prompts))
}

pub async fn get(
    State(state): State<AppState>,
    request_id: RequestId,
    Path(id): Path<String>,
) -> Result<Json<Prompt>, ApiError> {
    let prompt = state
        .store
        .get_prompt(&id)
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?
        .ok_or(KibotosError::NotFound)
        .map_err(|e| ApiError::new(e, request_id))?;
    Ok(Json(prompt))
}

pub async fn categories(
    State(state): State<AppState>,
    request_id: RequestId,
) -> Result<Json<Vec<CategoryCount>>, ApiError> {
    let categories = state
        .store
        .list_prompt_categories()
        .await
        .map_err(|e| ApiError::new(e.into(), request_id))?;
    Ok(Json(categories))
}
