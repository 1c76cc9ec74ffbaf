use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use deepscript_chat::{ChatError, API_KEY_ENV};
use deepscript_logging::Backend;

use super::{persist, ApiError, AppState};

#[derive(Debug, Default, Deserialize)]
pub struct RemoteGenerateRequest {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RemoteGenerateResponse {
    pub generated_text: String,
    pub prompt_id: Option<i64>,
    pub script_id: Option<i64>,
}

pub async fn generate_remote(
    State(state): State<AppState>,
    payload: Result<Json<RemoteGenerateRequest>, JsonRejection>,
) -> Result<Json<RemoteGenerateResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidParameter(e.body_text()))?;

    let prompt = request.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest(ChatError::EmptyPrompt.to_string()));
    }

    let writer = state
        .writer
        .as_ref()
        .ok_or_else(|| ApiError::RemoteUnavailable(format!("{} is not set", API_KEY_ENV)))?;

    let generated_text = writer.write_script(&prompt).await.map_err(|e| {
        error!("Remote generation failed: {}", e);
        match e {
            ChatError::EmptyPrompt => ApiError::BadRequest(e.to_string()),
            other => ApiError::Remote(other.to_string()),
        }
    })?;

    let (prompt_id, script_id) = persist(&state.db, &prompt, Backend::Remote, &generated_text);

    Ok(Json(RemoteGenerateResponse {
        generated_text,
        prompt_id,
        script_id,
    }))
}
