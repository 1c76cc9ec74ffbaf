mod history;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing::{error, info, warn};

use deepscript::api::{self, AppState};
use deepscript::config::{AppConfig, MODEL_PATH_ENV};
use deepscript_chat::{ChatError, OpenAiScriptWriter, RemoteConfig, ScriptWriter};
use deepscript_db::Database;
use deepscript_dialogue::{DialogueParams, DialogueRunner, RawParams};
use deepscript_logging::{init_tracing, LogFormat, Logger};
use deepscript_model::{Gpt2Generator, TextGenerator};

use crate::history::{handle_history_command, HistoryAction};

#[derive(Parser, Debug)]
#[command(
    name = "deepscript",
    about = "Emotion-conditioned dialogue and screenplay generation",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Working directory holding deepscript.toml (default: current directory)
    #[arg(short = 'd', long, global = true)]
    working_dir: Option<PathBuf>,

    /// Database file (default: platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Tracing filter when RUST_LOG is unset
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Also append generation events to this file as JSON lines
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        /// Address to bind
        #[arg(long)]
        host: Option<String>,

        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,

        /// Local model directory (config.json, tokenizer.json, model.safetensors)
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Start without loading the local model
        #[arg(long)]
        no_local: bool,

        /// Remote chat model
        #[arg(long)]
        remote_model: Option<String>,
    },

    /// Generate a two-speaker dialogue with the local model
    Generate {
        /// Opening line spoken by the first speaker
        #[arg(short, long)]
        prompt: String,

        #[arg(short, long)]
        emotion: Option<String>,

        #[arg(short = 'n', long)]
        num_exchanges: Option<i64>,

        #[arg(long)]
        max_turn_length: Option<i64>,

        #[arg(short, long)]
        temperature: Option<f64>,

        #[arg(long)]
        top_k: Option<i64>,

        #[arg(long)]
        top_p: Option<f64>,

        #[arg(long)]
        repetition_penalty: Option<f64>,

        /// Local model directory
        #[arg(long)]
        model_path: Option<PathBuf>,

        /// Do not record the result in history
        #[arg(long)]
        no_save: bool,

        /// Output result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a screenplay scene with the remote chat model
    Write {
        #[arg(short, long)]
        prompt: String,

        /// Remote chat model
        #[arg(short, long)]
        model: Option<String>,

        /// Do not record the result in history
        #[arg(long)]
        no_save: bool,
    },

    /// Browse stored prompts and scripts
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);
    let logger = Arc::new(build_logger(log_format, cli.log_file.as_deref())?);

    let working_dir = match cli.working_dir {
        Some(ref dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to get current directory")?,
    };
    let config = AppConfig::load(&working_dir)?.unwrap_or_default();
    let db_path = config.database_path(cli.db.as_deref());

    match cli.command {
        Command::Serve {
            host,
            port,
            model_path,
            no_local,
            remote_model,
        } => {
            let generator = if config.local_enabled(no_local) {
                let path = config.model_path(model_path.as_deref(), model_path_env());
                load_generator(path).await
            } else {
                info!("Local model disabled");
                None
            };

            let remote = config.remote(RemoteConfig::from_env(), remote_model.as_deref());
            let writer: Option<Arc<dyn ScriptWriter>> =
                match OpenAiScriptWriter::new(remote, logger.clone()) {
                    Ok(writer) => Some(Arc::new(writer)),
                    Err(ChatError::MissingApiKey) => {
                        warn!("OPENAI_API_KEY is not set; remote generation disabled");
                        None
                    }
                    Err(e) => return Err(e).context("Failed to configure remote writer"),
                };

            let db = Arc::new(open_database(&db_path)?);
            let state = AppState {
                runner: DialogueRunner::new(generator, logger),
                writer,
                db,
            };

            let host = config.host(host.as_deref());
            let port = config.port(port);
            serve(state, &host, port).await
        }
        Command::Generate {
            prompt,
            emotion,
            num_exchanges,
            max_turn_length,
            temperature,
            top_k,
            top_p,
            repetition_penalty,
            model_path,
            no_save,
            json,
        } => {
            let prompt = prompt.trim().to_string();
            if prompt.is_empty() {
                anyhow::bail!("Prompt cannot be empty");
            }

            let raw = RawParams {
                emotion: emotion.map(serde_json::Value::from),
                num_exchanges: num_exchanges.map(serde_json::Value::from),
                max_turn_length: max_turn_length.map(serde_json::Value::from),
                temperature: temperature.map(serde_json::Value::from),
                top_k: top_k.map(serde_json::Value::from),
                top_p: top_p.map(serde_json::Value::from),
                repetition_penalty: repetition_penalty.map(serde_json::Value::from),
            };
            let params =
                DialogueParams::from_raw(&raw).map_err(|e| anyhow::anyhow!("Invalid parameter: {}", e))?;

            let path = config.model_path(model_path.as_deref(), model_path_env());
            let generator = tokio::task::spawn_blocking(move || Gpt2Generator::load(&path))
                .await
                .context("Model loading task failed")??;
            let runner = DialogueRunner::new(Some(Arc::new(generator)), logger);

            let (run_prompt, run_params) = (prompt.clone(), params.clone());
            let dialogue = tokio::task::spawn_blocking(move || runner.run(&run_prompt, &run_params))
                .await
                .context("Generation task failed")??;

            let (prompt_id, script_id) = if no_save {
                (None, None)
            } else {
                let db = open_database(&db_path)?;
                let prompt_record = db.prompts().create(&prompt)?;
                let script = db.scripts().create(prompt_record.id, "local", &dialogue.text)?;
                (Some(prompt_record.id), Some(script.id))
            };

            if json {
                let output = serde_json::json!({
                    "generated_text": dialogue.text,
                    "parameters": params,
                    "prompt_id": prompt_id,
                    "script_id": script_id,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                println!("{}", dialogue.text);
            }
            Ok(())
        }
        Command::Write {
            prompt,
            model,
            no_save,
        } => {
            let remote = config.remote(RemoteConfig::from_env(), model.as_deref());
            let writer = OpenAiScriptWriter::new(remote, logger)?;
            let text = writer.write_script(&prompt).await?;

            if !no_save {
                let db = open_database(&db_path)?;
                let prompt_record = db.prompts().create(prompt.trim())?;
                db.scripts().create(prompt_record.id, "remote", &text)?;
            }

            println!("{}", text);
            Ok(())
        }
        Command::History { action } => {
            let db = open_database(&db_path)?;
            handle_history_command(action, &db)
        }
    }
}

fn build_logger(format: LogFormat, log_file: Option<&Path>) -> Result<Logger> {
    match log_file {
        Some(path) => Logger::with_file(format, path)
            .with_context(|| format!("Failed to open log file {}", path.display())),
        None => Ok(Logger::new(format)),
    }
}

fn model_path_env() -> Option<String> {
    std::env::var(MODEL_PATH_ENV).ok()
}

fn open_database(path: &Path) -> Result<Database> {
    Database::open_at(path)
        .with_context(|| format!("Failed to open database at {}", path.display()))
}

/// Load the local model, or log why the server is running without one.
async fn load_generator(path: PathBuf) -> Option<Arc<dyn TextGenerator>> {
    info!(path = %path.display(), "Loading local model");
    match tokio::task::spawn_blocking(move || Gpt2Generator::load(&path)).await {
        Ok(Ok(generator)) => Some(Arc::new(generator)),
        Ok(Err(e)) => {
            error!("Model initialization failed: {}", e);
            None
        }
        Err(e) => {
            error!("Model loading task failed: {}", e);
            None
        }
    }
}

async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let router = api::create_router(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", addr))?;

    eprintln!();
    eprintln!(
        "  {} {}",
        "->".bright_green(),
        format!("Listening on http://{}", addr).bold()
    );
    eprintln!("  {} Press {} to stop", "->".dimmed(), "Ctrl+C".bold());
    eprintln!();

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        return;
    }
    eprintln!("\nShutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepscript_logging::{Backend, LogEvent};

    #[test]
    fn test_log_file_flag_writes_json_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");
        let path_arg = path.to_string_lossy().to_string();

        let cli = Cli::try_parse_from([
            "deepscript",
            "history",
            "list",
            "--log-file",
            path_arg.as_str(),
            "--log-format",
            "compact",
        ])
        .unwrap();
        assert_eq!(cli.log_file.as_deref(), Some(path.as_path()));

        let logger = build_logger(cli.log_format.into(), cli.log_file.as_deref()).unwrap();
        logger.log(&LogEvent::ErrorEncountered {
            backend: Backend::Local,
            error: "out of memory".to_string(),
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(line["event"], "error_encountered");
        assert_eq!(line["error"], "out of memory");
    }

    #[test]
    fn test_logger_without_file() {
        let cli = Cli::try_parse_from(["deepscript", "history", "list"]).unwrap();
        assert!(cli.log_file.is_none());
        assert!(build_logger(LogFormat::Pretty, None).is_ok());
    }
}
