//! Remote script generation through a hosted chat-completion API.

mod prompts;
mod writer;

pub use prompts::ScreenplayPrompts;
pub use writer::{
    extract_content, ChatError, OpenAiScriptWriter, RemoteConfig, ScriptWriter, API_KEY_ENV,
};
