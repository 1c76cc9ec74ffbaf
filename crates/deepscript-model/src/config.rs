//! GPT-2 hyper-parameters as saved in a model directory's `config.json`.

use serde::Deserialize;
use std::path::Path;

use crate::ModelError;

/// Subset of the Hugging Face GPT-2 config that the network needs.
/// Unknown keys in `config.json` are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Gpt2Config {
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    #[serde(default = "default_n_positions")]
    pub n_positions: usize,
    #[serde(default = "default_n_embd")]
    pub n_embd: usize,
    #[serde(default = "default_n_layer")]
    pub n_layer: usize,
    #[serde(default = "default_n_head")]
    pub n_head: usize,
    #[serde(default = "default_layer_norm_epsilon")]
    pub layer_norm_epsilon: f64,
    #[serde(default = "default_eos_token_id")]
    pub eos_token_id: u32,
}

fn default_vocab_size() -> usize {
    50257
}

fn default_n_positions() -> usize {
    1024
}

fn default_n_embd() -> usize {
    768
}

fn default_n_layer() -> usize {
    12
}

fn default_n_head() -> usize {
    12
}

fn default_layer_norm_epsilon() -> f64 {
    1e-5
}

fn default_eos_token_id() -> u32 {
    50256
}

impl Default for Gpt2Config {
    fn default() -> Self {
        Self {
            vocab_size: default_vocab_size(),
            n_positions: default_n_positions(),
            n_embd: default_n_embd(),
            n_layer: default_n_layer(),
            n_head: default_n_head(),
            layer_norm_epsilon: default_layer_norm_epsilon(),
            eos_token_id: default_eos_token_id(),
        }
    }
}

impl Gpt2Config {
    /// Read and validate `config.json`.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let content = std::fs::read_to_string(path).map_err(|e| ModelError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let config: Gpt2Config = serde_json::from_str(&content).map_err(|e| ModelError::Load {
            path: path.to_path_buf(),
            reason: format!("invalid config.json: {}", e),
        })?;

        if config.n_head == 0 || config.n_embd % config.n_head != 0 {
            return Err(ModelError::Load {
                path: path.to_path_buf(),
                reason: format!(
                    "n_embd ({}) must be divisible by n_head ({})",
                    config.n_embd, config.n_head
                ),
            });
        }

        Ok(config)
    }

    pub fn head_dim(&self) -> usize {
        self.n_embd / self.n_head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_hf_config_ignores_unknown_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "architectures": ["GPT2LMHeadModel"],
                "model_type": "gpt2",
                "n_ctx": 1024,
                "n_embd": 768,
                "n_head": 12,
                "n_layer": 6,
                "n_positions": 1024,
                "vocab_size": 50257,
                "bos_token_id": 50256,
                "eos_token_id": 50256,
                "task_specific_params": {"text-generation": {"do_sample": true}}
            }"#,
        )
        .unwrap();

        let config = Gpt2Config::load(&path).unwrap();
        assert_eq!(config.n_layer, 6);
        assert_eq!(config.head_dim(), 64);
        assert_eq!(config.eos_token_id, 50256);
        assert!((config.layer_norm_epsilon - 1e-5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        let err = Gpt2Config::load(&dir.path().join("config.json")).unwrap_err();
        assert!(matches!(err, ModelError::Load { .. }));
    }

    #[test]
    fn test_rejects_uneven_heads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"n_embd": 100, "n_head": 12}"#).unwrap();

        let err = Gpt2Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("divisible"));
    }
}
