use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// Which generation backend produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    Local,
    Remote,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Local => "local",
            Backend::Remote => "remote",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured log events for dialogue generation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    DialogueStarted {
        prompt: String,
        emotion: String,
        num_exchanges: usize,
    },
    TurnGenerated {
        turn: usize,
        speaker: String,
        text: String,
        duration_secs: f64,
    },
    DialogueCompleted {
        turns: usize,
        chars: usize,
        duration_secs: f64,
    },
    RemoteRequested {
        model: String,
        prompt_preview: String,
    },
    RemoteCompleted {
        model: String,
        chars: usize,
        duration_secs: f64,
    },
    ErrorEncountered {
        backend: Backend,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for generation events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        let json = event.with_timestamp();
        let _ = writeln!(std::io::stderr(), "{}", json);
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::DialogueStarted {
                prompt,
                emotion,
                num_exchanges,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {} {}",
                    "▶".bright_cyan(),
                    "DIALOGUE".bright_cyan().bold(),
                    format!("({}, {} exchanges)", emotion, num_exchanges).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    "Prompt:".dimmed(),
                    truncate(prompt, 60).dimmed()
                );
            }
            LogEvent::TurnGenerated {
                turn,
                speaker,
                text,
                duration_secs,
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} {} {}",
                    format!("{:>2}", turn).dimmed(),
                    format!("{}:", speaker).bold(),
                    text,
                    format!("({:.1}s)", duration_secs).dimmed()
                );
            }
            LogEvent::DialogueCompleted {
                turns,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Done: {} turns ({:.1}s)",
                    "✓".bright_green(),
                    turns,
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            LogEvent::RemoteRequested {
                model,
                prompt_preview,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} {} {}",
                    "▶".bright_magenta(),
                    "REMOTE".bright_magenta().bold(),
                    model.dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    "Prompt:".dimmed(),
                    prompt_preview.dimmed()
                );
            }
            LogEvent::RemoteCompleted {
                chars,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Done: {} chars ({:.1}s)",
                    "✓".bright_green(),
                    chars,
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            LogEvent::ErrorEncountered { backend, error } => {
                let _ = writeln!(
                    stderr,
                    "{} Error in {} backend: {}",
                    "✗".bright_red(),
                    backend,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::DialogueStarted {
                emotion,
                num_exchanges,
                ..
            } => format!(
                "[{}] dialogue:start {} x{}",
                timestamp, emotion, num_exchanges
            ),
            LogEvent::TurnGenerated {
                turn,
                speaker,
                duration_secs,
                ..
            } => format!(
                "[{}] turn:{}:{} {:.1}s",
                timestamp, turn, speaker, duration_secs
            ),
            LogEvent::DialogueCompleted {
                turns,
                chars,
                duration_secs,
            } => format!(
                "[{}] dialogue:done:{} {}c {:.1}s",
                timestamp, turns, chars, duration_secs
            ),
            LogEvent::RemoteRequested { model, .. } => {
                format!("[{}] remote:start {}", timestamp, model)
            }
            LogEvent::RemoteCompleted {
                chars,
                duration_secs,
                ..
            } => format!(
                "[{}] remote:done {}c {:.1}s",
                timestamp, chars, duration_secs
            ),
            LogEvent::ErrorEncountered { backend, error } => {
                format!("[{}] error:{}:{}", timestamp, backend, error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}

/// Shorten to `max_chars` characters, marking the cut with `...`
pub(crate) fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        // Multi-byte characters must not be split
        assert_eq!(truncate("ééééé", 4), "é...");
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LogEvent::TurnGenerated {
            turn: 1,
            speaker: "Taylor".to_string(),
            text: "Sounds good to me".to_string(),
            duration_secs: 0.5,
        };
        let value = event.with_timestamp();
        assert_eq!(value["event"], "turn_generated");
        assert_eq!(value["speaker"], "Taylor");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_backend_serializes_snake_case() {
        let event = LogEvent::ErrorEncountered {
            backend: Backend::Remote,
            error: "boom".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""backend":"remote""#));
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_file_logger_writes_json_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("logs").join("events.jsonl");
        let logger = Logger::with_file(LogFormat::Compact, &path).unwrap();

        logger.log(&LogEvent::DialogueCompleted {
            turns: 7,
            chars: 120,
            duration_secs: 1.0,
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let line: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(line["event"], "dialogue_completed");
        assert_eq!(line["turns"], 7);
    }
}
