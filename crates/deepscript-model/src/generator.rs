use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::config::Gpt2Config;
use crate::gpt2::Gpt2Model;
use crate::sampling::TokenSampler;
use crate::{ModelError, SamplingParams, TextGenerator};

/// Prompts longer than this are cut down to their trailing tokens.
pub const MAX_PROMPT_TOKENS: usize = 256;

const CONFIG_FILE: &str = "config.json";
const TOKENIZER_FILE: &str = "tokenizer.json";
const WEIGHTS_FILE: &str = "model.safetensors";

/// A fine-tuned GPT-2 checkpoint loaded from a model directory.
pub struct Gpt2Generator {
    name: String,
    model: Gpt2Model,
    tokenizer: Tokenizer,
    config: Gpt2Config,
    device: Device,
}

impl Gpt2Generator {
    /// Load `config.json`, `tokenizer.json` and `model.safetensors` from `model_dir`.
    ///
    /// Runs on CUDA when available, otherwise CPU.
    pub fn load(model_dir: &Path) -> Result<Self, ModelError> {
        let device = Device::cuda_if_available(0).map_err(|e| load_error(model_dir, e))?;
        Self::load_on(model_dir, device)
    }

    pub fn load_on(model_dir: &Path, device: Device) -> Result<Self, ModelError> {
        if !model_dir.is_dir() {
            return Err(ModelError::Load {
                path: model_dir.to_path_buf(),
                reason: "model directory does not exist".to_string(),
            });
        }

        let config = Gpt2Config::load(&model_dir.join(CONFIG_FILE))?;

        let tokenizer_path = model_dir.join(TOKENIZER_FILE);
        let tokenizer =
            Tokenizer::from_file(&tokenizer_path).map_err(|e| load_error(&tokenizer_path, e))?;

        let weights_path = model_dir.join(WEIGHTS_FILE);
        if !weights_path.is_file() {
            return Err(ModelError::Load {
                path: weights_path,
                reason: "weights file not found".to_string(),
            });
        }
        // SAFETY: the file is memory-mapped read-only and not modified while loaded
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[&weights_path], DType::F32, &device)
                .map_err(|e| load_error(&weights_path, e))?
        };
        let model = Gpt2Model::load(vb, &config).map_err(|e| load_error(&weights_path, e))?;

        let name = format!(
            "gpt2:{}",
            model_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "model".to_string())
        );

        info!(
            model = %name,
            layers = config.n_layer,
            device = ?device,
            "Loaded local model"
        );

        Ok(Self::from_parts(name, model, tokenizer, config, device))
    }

    pub(crate) fn from_parts(
        name: String,
        model: Gpt2Model,
        tokenizer: Tokenizer,
        config: Gpt2Config,
        device: Device,
    ) -> Self {
        Self {
            name,
            model,
            tokenizer,
            config,
            device,
        }
    }

    fn encode(&self, prompt: &str) -> Result<Vec<u32>, ModelError> {
        let encoding = self
            .tokenizer
            .encode(prompt, false)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))?;
        Ok(truncate_prompt(encoding.get_ids(), MAX_PROMPT_TOKENS))
    }
}

impl TextGenerator for Gpt2Generator {
    fn name(&self) -> &str {
        &self.name
    }

    fn generate(&self, prompt: &str, params: &SamplingParams) -> Result<String, ModelError> {
        let mut tokens = self.encode(prompt)?;
        let prompt_len = tokens.len();
        let window = self.model.max_positions();
        let mut sampler = TokenSampler::new(params);

        for _ in 0..params.max_new_tokens {
            let start = tokens.len().saturating_sub(window);
            let input = Tensor::new(&tokens[start..], &self.device)?.unsqueeze(0)?;
            let logits = self.model.forward(&input)?.squeeze(0)?;

            let next = sampler.sample(&logits, &tokens)?;
            if next == self.config.eos_token_id {
                break;
            }
            tokens.push(next);
        }

        debug!(
            prompt_tokens = prompt_len,
            new_tokens = tokens.len() - prompt_len,
            "Sampled continuation"
        );

        self.tokenizer
            .decode(&tokens[prompt_len..], true)
            .map_err(|e| ModelError::Tokenizer(e.to_string()))
    }
}

/// Keep at most the last `max` tokens.
fn truncate_prompt(ids: &[u32], max: usize) -> Vec<u32> {
    ids[ids.len().saturating_sub(max)..].to_vec()
}

fn load_error(path: &Path, e: impl std::fmt::Display) -> ModelError {
    ModelError::Load {
        path: PathBuf::from(path),
        reason: e.to_string(),
    }
}
