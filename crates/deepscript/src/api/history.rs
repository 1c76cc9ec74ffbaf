use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use deepscript_db::{PromptFilter, PromptRecord, PromptSummary, ScriptRecord};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct PromptList {
    pub prompts: Vec<PromptSummary>,
}

#[derive(Debug, Serialize)]
pub struct PromptDetail {
    pub prompt: PromptRecord,
    pub scripts: Vec<ScriptRecord>,
}

pub async fn list_prompts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<PromptList>, ApiError> {
    let filter = PromptFilter {
        search: params.search.filter(|s| !s.trim().is_empty()),
        limit: params.limit,
        offset: params.offset,
    };

    let prompts = state
        .db
        .prompts()
        .list(&filter)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(PromptList { prompts }))
}

pub async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PromptDetail>, ApiError> {
    let prompt = state
        .db
        .prompts()
        .get(id)
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("Prompt {} not found", id)))?;

    let scripts = state
        .db
        .scripts()
        .list_for_prompt(id)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(PromptDetail { prompt, scripts }))
}
