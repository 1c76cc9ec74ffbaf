use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use deepscript_dialogue::{sanitize_output, DialogueError, DialogueParams, RawParams};
use deepscript_logging::Backend;

use super::{persist, ApiError, AppState};

/// Body of `POST /api/generate-script/`. Knobs stay untyped until
/// [`DialogueParams::from_raw`] validates and clamps them.
#[derive(Debug, Default, Deserialize)]
pub struct GenerateScriptRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(flatten)]
    pub params: RawParams,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateScriptResponse {
    pub generated_text: String,
    pub parameters: serde_json::Value,
    pub prompt_id: Option<i64>,
    pub script_id: Option<i64>,
}

pub async fn generate_script(
    State(state): State<AppState>,
    payload: Result<Json<GenerateScriptRequest>, JsonRejection>,
) -> Result<Json<GenerateScriptResponse>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::InvalidParameter(e.body_text()))?;

    let prompt = request.prompt.trim().to_string();
    if prompt.is_empty() {
        return Err(ApiError::BadRequest("Prompt cannot be empty".to_string()));
    }

    let params = DialogueParams::from_raw(&request.params)
        .map_err(|e| ApiError::InvalidParameter(e.to_string()))?;

    if !state.runner.is_ready() {
        return Err(ApiError::ModelNotInitialized);
    }

    info!(emotion = %params.emotion, num_exchanges = params.num_exchanges, "Generating dialogue");

    let runner = state.runner.clone();
    let (turn_prompt, turn_params) = (prompt.clone(), params.clone());
    let dialogue = tokio::task::spawn_blocking(move || runner.run(&turn_prompt, &turn_params))
        .await
        .map_err(|e| {
            error!("Generation task panicked: {}", e);
            ApiError::GenerationFailed
        })?
        .map_err(|e| match e {
            DialogueError::ModelNotInitialized => ApiError::ModelNotInitialized,
            DialogueError::Generation(err) => {
                error!("Generation error: {}", err);
                ApiError::GenerationFailed
            }
        })?;

    let generated_text = sanitize_output(&dialogue.text);
    let (prompt_id, script_id) = persist(&state.db, &prompt, Backend::Local, &generated_text);

    let parameters =
        serde_json::to_value(&params).map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(GenerateScriptResponse {
        generated_text,
        parameters,
        prompt_id,
        script_id,
    }))
}
