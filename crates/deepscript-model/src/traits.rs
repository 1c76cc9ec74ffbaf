use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or running a language model
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Could not load model from {path}: {reason}")]
    Load { path: PathBuf, reason: String },

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    #[error("Inference failed: {0}")]
    Inference(#[from] candle_core::Error),
}

/// Sampling knobs passed through to the model's decoding loop
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Upper bound on tokens produced per call
    pub max_new_tokens: usize,
    pub temperature: f64,
    pub top_k: usize,
    pub top_p: f64,
    /// 1.0 disables the penalty
    pub repetition_penalty: f32,
    /// 0 disables n-gram blocking
    pub no_repeat_ngram_size: usize,
    /// Fixed RNG seed (None = derive from the clock)
    pub seed: Option<u64>,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 50,
            temperature: 0.7,
            top_k: 40,
            top_p: 0.85,
            repetition_penalty: 1.5,
            no_repeat_ngram_size: 4,
            seed: None,
        }
    }
}

impl SamplingParams {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// The core abstraction over a text-completion model
pub trait TextGenerator: Send + Sync {
    /// Human-readable model name (e.g., "gpt2:emotion_model_new")
    fn name(&self) -> &str;

    /// Continue `prompt` and return only the newly generated text,
    /// with special tokens removed.
    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ModelError>;
}
