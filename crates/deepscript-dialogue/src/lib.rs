//! Two-speaker dialogue generation on top of a local [`TextGenerator`].
//!
//! [`DialogueRunner`] alternates between the fixed speakers, renders the
//! per-turn template, and trims each continuation to a single sentence.
//!
//! [`TextGenerator`]: deepscript_model::TextGenerator

pub mod cleanup;
mod emotion;
mod error;
pub mod params;
mod runner;
pub mod template;

pub use cleanup::{clean_turn, format_dialogue, sanitize_output, MAX_OUTPUT_CHARS};
pub use emotion::Emotion;
pub use error::DialogueError;
pub use params::{DialogueParams, ParamError, RawParams};
pub use runner::{Dialogue, DialogueRunner};
pub use template::SPEAKERS;
