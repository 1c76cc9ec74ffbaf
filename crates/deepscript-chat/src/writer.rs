use std::sync::Arc;
use std::time::Instant;

use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
};
use async_openai::Client;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, error};

use deepscript_logging::{Backend, LogEvent, Logger};

use crate::ScreenplayPrompts;

/// Environment variable holding the remote API credential
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Errors from the remote script writer
#[derive(Error, Debug)]
pub enum ChatError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,

    #[error("Prompt cannot be empty.")]
    EmptyPrompt,

    #[error("{0}")]
    Api(#[from] OpenAIError),

    #[error("Remote response contained no text")]
    EmptyResponse,
}

/// Settings for the remote chat-completion call
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub api_key: Option<String>,
    pub model: String,
    /// Override for OpenAI-compatible endpoints
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: None,
            temperature: 0.9,
            max_tokens: 400,
        }
    }
}

impl RemoteConfig {
    /// Defaults with the key read from [`API_KEY_ENV`].
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()),
            ..Default::default()
        }
    }
}

/// Writes a script for a free-text prompt
#[async_trait]
pub trait ScriptWriter: Send + Sync {
    /// Model identifier used for the request
    fn model(&self) -> &str;

    async fn write_script(&self, prompt: &str) -> Result<String, ChatError>;
}

/// [`ScriptWriter`] backed by an OpenAI-compatible chat-completion API
pub struct OpenAiScriptWriter {
    client: Client<OpenAIConfig>,
    config: RemoteConfig,
    logger: Arc<Logger>,
}

impl OpenAiScriptWriter {
    pub fn new(config: RemoteConfig, logger: Arc<Logger>) -> Result<Self, ChatError> {
        let api_key = config.api_key.clone().ok_or(ChatError::MissingApiKey)?;

        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Ok(Self {
            client: Client::with_config(openai_config),
            config,
            logger,
        })
    }
}

#[async_trait]
impl ScriptWriter for OpenAiScriptWriter {
    fn model(&self) -> &str {
        &self.config.model
    }

    async fn write_script(&self, prompt: &str) -> Result<String, ChatError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }

        let started = Instant::now();
        self.logger.log(&LogEvent::RemoteRequested {
            model: self.config.model.clone(),
            prompt_preview: prompt.chars().take(60).collect(),
        });

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.model)
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(ScreenplayPrompts::SYSTEM)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(ScreenplayPrompts::build_user_prompt(prompt))
                    .build()?
                    .into(),
            ])
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build()?;

        debug!(model = %self.config.model, "Sending chat completion request");

        let response = self.client.chat().create(request).await.map_err(|e| {
            error!("Failed to prompt remote model: {}", e);
            self.logger.log(&LogEvent::ErrorEncountered {
                backend: Backend::Remote,
                error: e.to_string(),
            });
            ChatError::Api(e)
        })?;

        let text = extract_content(&response)?;

        self.logger.log(&LogEvent::RemoteCompleted {
            model: self.config.model.clone(),
            chars: text.chars().count(),
            duration_secs: started.elapsed().as_secs_f64(),
        });

        Ok(text)
    }
}

/// Trimmed text of the first choice.
pub fn extract_content(response: &CreateChatCompletionResponse) -> Result<String, ChatError> {
    response
        .choices
        .first()
        .and_then(|choice| choice.message.content.as_deref())
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
        .ok_or(ChatError::EmptyResponse)
}
