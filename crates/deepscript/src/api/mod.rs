mod chat;
mod error;
mod generate;
mod history;
mod meta;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::warn;

use deepscript_chat::ScriptWriter;
use deepscript_db::Database;
use deepscript_dialogue::DialogueRunner;
use deepscript_logging::Backend;

pub use chat::{RemoteGenerateRequest, RemoteGenerateResponse};
pub use error::ApiError;
pub use generate::{GenerateScriptRequest, GenerateScriptResponse};
pub use history::{PromptDetail, PromptList};
pub use meta::{EmotionList, HealthStatus};

#[derive(Clone)]
pub struct AppState {
    pub runner: DialogueRunner,
    /// `None` when no API key was configured
    pub writer: Option<Arc<dyn ScriptWriter>>,
    pub db: Arc<Database>,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/generate-script/", post(generate::generate_script))
        .route("/api/generate/", post(chat::generate_remote))
        .route("/api/emotions", get(meta::list_emotions))
        .route("/api/health", get(meta::health))
        .route("/api/prompts", get(history::list_prompts))
        .route("/api/prompts/{id}", get(history::get_prompt))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Store the prompt and its script. History is best effort: a storage
/// failure is logged and the generated text is still returned.
fn persist(db: &Database, prompt: &str, backend: Backend, text: &str) -> (Option<i64>, Option<i64>) {
    let prompt_record = match db.prompts().create(prompt) {
        Ok(record) => record,
        Err(e) => {
            warn!(error = %e, "Failed to save prompt");
            return (None, None);
        }
    };

    match db.scripts().create(prompt_record.id, backend.as_str(), text) {
        Ok(script) => (Some(prompt_record.id), Some(script.id)),
        Err(e) => {
            warn!(prompt_id = prompt_record.id, error = %e, "Failed to save script");
            (Some(prompt_record.id), None)
        }
    }
}
