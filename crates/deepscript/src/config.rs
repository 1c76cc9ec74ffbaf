//! Configuration file support for deepscript.
//!
//! Loads `deepscript.toml` from the working directory. Every value is
//! optional; CLI flags and environment variables take precedence.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use deepscript_chat::RemoteConfig;
use deepscript_db::Database;

/// The config file name
pub const CONFIG_FILE_NAME: &str = "deepscript.toml";

/// Environment variable overriding the local model directory
pub const MODEL_PATH_ENV: &str = "LOCAL_MODEL_PATH";

/// Model directory used when nothing else is configured
pub const DEFAULT_MODEL_PATH: &str = "models/emotion_model_new";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;

/// Configuration loaded from `deepscript.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct LocalConfig {
    pub model_path: Option<PathBuf>,
    /// Set to false to skip loading the local model
    pub enabled: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RemoteSection {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Local model directory.
    /// Priority: CLI flag > `LOCAL_MODEL_PATH` > [local].model_path > default
    pub fn model_path(&self, cli: Option<&Path>, env: Option<String>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| env.filter(|v| !v.trim().is_empty()).map(PathBuf::from))
            .or_else(|| self.local.model_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_MODEL_PATH))
    }

    /// Whether to load the local model at all.
    pub fn local_enabled(&self, no_local_flag: bool) -> bool {
        !no_local_flag && self.local.enabled.unwrap_or(true)
    }

    /// Priority: CLI flag > [server].host > default
    pub fn host(&self, cli: Option<&str>) -> String {
        cli.map(String::from)
            .or_else(|| self.server.host.clone())
            .unwrap_or_else(|| DEFAULT_HOST.to_string())
    }

    /// Priority: CLI flag > [server].port > default
    pub fn port(&self, cli: Option<u16>) -> u16 {
        cli.or(self.server.port).unwrap_or(DEFAULT_PORT)
    }

    /// Priority: CLI flag > [database].path > platform data dir
    pub fn database_path(&self, cli: Option<&Path>) -> PathBuf {
        cli.map(Path::to_path_buf)
            .or_else(|| self.database.path.clone())
            .unwrap_or_else(Database::default_path)
    }

    /// Remote writer settings layered over `base`, which carries the
    /// API key from the environment.
    /// Model priority: CLI flag > [remote].model > default
    pub fn remote(&self, base: RemoteConfig, cli_model: Option<&str>) -> RemoteConfig {
        let mut config = base;
        if let Some(model) = cli_model
            .map(String::from)
            .or_else(|| self.remote.model.clone())
        {
            config.model = model;
        }
        if let Some(ref base_url) = self.remote.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(temperature) = self.remote.temperature {
            config.temperature = temperature;
        }
        if let Some(max_tokens) = self.remote.max_tokens {
            config.max_tokens = max_tokens;
        }
        config
    }
}
