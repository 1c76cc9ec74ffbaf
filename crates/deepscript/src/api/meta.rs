use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use deepscript_dialogue::Emotion;

use super::AppState;

#[derive(Debug, Serialize)]
pub struct EmotionList {
    pub emotions: Vec<&'static str>,
    pub default: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    /// Name of the loaded local model, if any
    pub local_model: Option<String>,
    /// Remote model identifier, if a writer is configured
    pub remote_writer: Option<String>,
}

pub async fn list_emotions() -> Json<EmotionList> {
    Json(EmotionList {
        emotions: Emotion::ALL.iter().map(Emotion::as_str).collect(),
        default: Emotion::default().as_str(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        local_model: state.runner.model_name().map(String::from),
        remote_writer: state.writer.as_ref().map(|w| w.model().to_string()),
    })
}
