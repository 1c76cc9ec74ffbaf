use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("Model not initialized")]
    ModelNotInitialized,

    #[error("Generation failed: {0}")]
    Generation(#[from] deepscript_model::ModelError),
}
