//! Local text generation for deepscript.
//!
//! [`TextGenerator`] is the seam the dialogue runner talks to;
//! [`Gpt2Generator`] implements it for a fine-tuned GPT-2 checkpoint
//! using candle.

mod config;
mod generator;
mod gpt2;
mod sampling;
mod traits;

pub use config::Gpt2Config;
pub use generator::{Gpt2Generator, MAX_PROMPT_TOKENS};
pub use gpt2::Gpt2Model;
pub use sampling::{banned_ngram_tokens, TokenSampler};
pub use traits::{ModelError, SamplingParams, TextGenerator};
