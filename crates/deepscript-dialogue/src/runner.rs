use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use deepscript_logging::{Backend, LogEvent, Logger};
use deepscript_model::TextGenerator;

use crate::cleanup::{clean_turn, format_dialogue};
use crate::error::DialogueError;
use crate::params::DialogueParams;
use crate::template::{build_turn_prompt, history_window, SPEAKERS};

/// A finished dialogue.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialogue {
    /// Formatted lines (`Speaker:text`) joined by newlines
    pub text: String,
    /// Number of generated turns, not counting the opening prompt line
    pub turns: usize,
}

/// Drives the turn-by-turn conversation between the two speakers.
///
/// The generator is optional so a server can start without model weights
/// and still answer with a clear error.
#[derive(Clone)]
pub struct DialogueRunner {
    generator: Option<Arc<dyn TextGenerator>>,
    logger: Arc<Logger>,
}

impl DialogueRunner {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>, logger: Arc<Logger>) -> Self {
        Self { generator, logger }
    }

    pub fn is_ready(&self) -> bool {
        self.generator.is_some()
    }

    pub fn model_name(&self) -> Option<&str> {
        self.generator.as_deref().map(|g| g.name())
    }

    /// Generate a dialogue seeded with `prompt` as the first speaker's line.
    ///
    /// Blocks for the duration of inference.
    pub fn run(&self, prompt: &str, params: &DialogueParams) -> Result<Dialogue, DialogueError> {
        let generator = self
            .generator
            .as_deref()
            .ok_or(DialogueError::ModelNotInitialized)?;

        let started = Instant::now();
        self.logger.log(&LogEvent::DialogueStarted {
            prompt: prompt.to_string(),
            emotion: params.emotion.clone(),
            num_exchanges: params.num_exchanges,
        });

        let sampling = params.sampling();
        let mut dialogue = vec![format!("{}: {}", SPEAKERS[0], prompt)];

        for exchange in 0..params.num_exchanges {
            // Second speaker answers first in every exchange
            for speaker in [SPEAKERS[1], SPEAKERS[0]] {
                let turn_started = Instant::now();
                let turn_prompt =
                    build_turn_prompt(&params.emotion, &history_window(&dialogue), speaker);

                let raw = match generator.generate(&turn_prompt, &sampling) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(exchange, speaker, error = %e, "Turn generation failed");
                        self.logger.log(&LogEvent::ErrorEncountered {
                            backend: Backend::Local,
                            error: e.to_string(),
                        });
                        return Err(e.into());
                    }
                };
                let text = clean_turn(&raw);
                debug!(exchange, speaker, raw = %raw, cleaned = %text, "Turn cleaned");

                self.logger.log(&LogEvent::TurnGenerated {
                    turn: dialogue.len(),
                    speaker: speaker.to_string(),
                    text: text.clone(),
                    duration_secs: turn_started.elapsed().as_secs_f64(),
                });
                dialogue.push(format!("{}: {}", speaker, text));
            }
        }

        let text = format_dialogue(&dialogue, params.num_exchanges);
        let turns = dialogue.len() - 1;

        self.logger.log(&LogEvent::DialogueCompleted {
            turns,
            chars: text.chars().count(),
            duration_secs: started.elapsed().as_secs_f64(),
        });

        Ok(Dialogue { text, turns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepscript_logging::LogFormat;
    use deepscript_model::{ModelError, SamplingParams};
    use std::sync::Mutex;

    use crate::cleanup::FALLBACK_TURN;
    use crate::Emotion;

    /// Replays canned continuations and records every prompt it receives.
    struct ScriptedGenerator {
        replies: Mutex<Vec<String>>,
        prompts: Mutex<Vec<String>>,
        sampling: Mutex<Vec<SamplingParams>>,
    }

    impl ScriptedGenerator {
        fn new(replies: &[&str]) -> Self {
            Self {
                replies: Mutex::new(replies.iter().rev().map(|s| s.to_string()).collect()),
                prompts: Mutex::new(Vec::new()),
                sampling: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for ScriptedGenerator {
        fn name(&self) -> &str {
            "scripted"
        }

        fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ModelError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.sampling.lock().unwrap().push(params.clone());
            Ok(self.replies.lock().unwrap().pop().unwrap_or_default())
        }
    }

    struct FailingGenerator;

    impl TextGenerator for FailingGenerator {
        fn name(&self) -> &str {
            "failing"
        }

        fn generate(&self, _prompt: &str, _params: &SamplingParams) -> Result<String, ModelError> {
            Err(ModelError::Tokenizer("vocabulary missing".to_string()))
        }
    }

    fn logger() -> Arc<Logger> {
        Arc::new(Logger::new(LogFormat::Compact))
    }

    #[test]
    fn test_run_without_model() {
        let runner = DialogueRunner::new(None, logger());
        assert!(!runner.is_ready());

        let err = runner
            .run("hello", &DialogueParams::default())
            .unwrap_err();
        assert!(matches!(err, DialogueError::ModelNotInitialized));
        assert_eq!(err.to_string(), "Model not initialized");
    }

    #[test]
    fn test_run_alternates_speakers() {
        let generator = Arc::new(ScriptedGenerator::new(&[
            " Sure, let me grab my coat. I'll be right back",
            " Great, I will wait here",
            " ok",
            " \"Don't forget the umbrella--it might rain\"",
        ]));
        let runner = DialogueRunner::new(Some(generator.clone()), logger());
        let params = DialogueParams {
            num_exchanges: 2,
            ..Default::default()
        };

        let dialogue = runner.run("Want to go for a walk?", &params).unwrap();

        assert_eq!(dialogue.turns, 4);
        assert_eq!(
            dialogue.text,
            [
                "Alex:Want to go for a walk?",
                "Taylor:Sure, let me grab my coat",
                "Alex:Great, I will wait here",
                "Taylor:...",
                "Alex:Don't forget the umbrella,it might rain",
            ]
            .join("\n")
        );
        assert!(dialogue.text.contains(FALLBACK_TURN));
    }

    #[test]
    fn test_run_uses_free_form_emotion_in_template() {
        let generator = Arc::new(ScriptedGenerator::new(&["ok then", "fine by me"]));
        let runner = DialogueRunner::new(Some(generator.clone()), logger());
        let params = DialogueParams {
            emotion: "happy".to_string(),
            num_exchanges: 1,
            ..Default::default()
        };

        runner.run("Look outside", &params).unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert!(prompts
            .iter()
            .all(|p| p.contains("\n    Current mood: happy\n")));
    }

    #[test]
    fn test_run_feeds_history_and_cue() {
        let generator = Arc::new(ScriptedGenerator::new(&[
            "one two", "three four", "five six", "seven eight", "nine ten", "eleven twelve",
        ]));
        let runner = DialogueRunner::new(Some(generator.clone()), logger());
        let params = DialogueParams {
            emotion: Emotion::Curiosity.to_string(),
            ..Default::default()
        };

        runner.run("What is that noise", &params).unwrap();

        let prompts = generator.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 6);

        // First turn sees only the opening line and cues the second speaker
        assert!(prompts[0].contains("Current mood: curiosity"));
        assert!(prompts[0].contains("    Alex: What is that noise\n    Taylor:"));
        assert!(prompts[1].ends_with("Alex:"));

        // Later turns see at most the last four lines
        assert!(!prompts[5].contains("Alex: What is that noise"));
        assert!(!prompts[5].contains("Taylor: one two"));
        assert!(prompts[5]
            .contains("Alex: three four\nTaylor: five six\nAlex: seven eight\nTaylor: nine ten"));
        assert!(prompts[5].ends_with("Taylor: nine ten\n    Alex:"));
    }

    #[test]
    fn test_run_passes_sampling_params() {
        let generator = Arc::new(ScriptedGenerator::new(&[]));
        let runner = DialogueRunner::new(Some(generator.clone()), logger());
        let params = DialogueParams {
            num_exchanges: 1,
            max_turn_length: 33,
            top_k: 12,
            ..Default::default()
        };

        let dialogue = runner.run("hi", &params).unwrap();
        assert_eq!(dialogue.text, "Alex:hi\nTaylor:...\nAlex:...");

        let sampling = generator.sampling.lock().unwrap();
        assert_eq!(sampling.len(), 2);
        assert!(sampling
            .iter()
            .all(|s| s.max_new_tokens == 33 && s.top_k == 12 && s.no_repeat_ngram_size == 4));
    }

    #[test]
    fn test_run_propagates_generation_error() {
        let runner = DialogueRunner::new(Some(Arc::new(FailingGenerator)), logger());
        let err = runner.run("hi", &DialogueParams::default()).unwrap_err();

        assert!(matches!(err, DialogueError::Generation(_)));
        assert!(err.to_string().contains("vocabulary missing"));
    }
}
