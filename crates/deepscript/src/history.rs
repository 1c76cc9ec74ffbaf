use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use colored::Colorize;

use deepscript_db::{script_title, Database, PromptFilter, PromptSummary, ScriptRecord};

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// List stored prompts, newest first
    List {
        /// Search prompt text
        #[arg(long)]
        search: Option<String>,

        /// Maximum number of prompts to show
        #[arg(long)]
        limit: Option<usize>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a prompt and every script generated for it
    Show {
        /// Prompt ID
        id: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn handle_history_command(action: HistoryAction, db: &Database) -> Result<()> {
    match action {
        HistoryAction::List {
            search,
            limit,
            json,
        } => {
            let filter = PromptFilter {
                search,
                limit,
                offset: None,
            };
            let summaries = db
                .prompts()
                .list(&filter)
                .context("Failed to list prompts")?;

            if json {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
            } else if summaries.is_empty() {
                println!("{}", "No prompts found.".dimmed());
            } else {
                print_prompts_table(&summaries);
            }
        }
        HistoryAction::Show { id, json } => {
            let prompt = db
                .prompts()
                .get(id)
                .context("Failed to load prompt")?
                .ok_or_else(|| anyhow::anyhow!("Prompt {} not found", id))?;
            let scripts = db
                .scripts()
                .list_for_prompt(id)
                .context("Failed to load scripts")?;

            if json {
                let detail = serde_json::json!({ "prompt": prompt, "scripts": scripts });
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                println!("{}", "=== Prompt Detail ===".bright_blue().bold());
                println!("{}  {}", "ID:".dimmed(), prompt.id);
                println!("{}  {}", "Created:".dimmed(), format_timestamp(&prompt.created_at));
                println!();
                println!("{}", "Prompt:".dimmed());
                println!("  {}", prompt.text);
                println!();
                print_scripts(&prompt.text, &scripts);
            }
        }
    }

    Ok(())
}

fn print_prompts_table(summaries: &[PromptSummary]) {
    println!(
        "{:<6} {:<18} {:<8} {}",
        "ID".dimmed(),
        "CREATED".dimmed(),
        "SCRIPTS".dimmed(),
        "PROMPT".dimmed(),
    );

    for s in summaries {
        let ts = s.prompt.created_at.format("%Y-%m-%d %H:%M").to_string();
        let preview: String = s.prompt.text.chars().take(50).collect();
        let prompt = if s.prompt.text.chars().count() > 50 {
            format!("{}...", preview)
        } else {
            preview
        };

        println!(
            "{:<6} {:<18} {:<8} {}",
            s.prompt.id, ts, s.script_count, prompt
        );
    }
}

fn print_scripts(prompt_text: &str, scripts: &[ScriptRecord]) {
    if scripts.is_empty() {
        println!("{}", "No scripts generated yet.".dimmed());
        return;
    }

    let title = script_title(prompt_text);
    for script in scripts {
        let backend = match script.backend.as_str() {
            "local" => script.backend.bright_cyan().to_string(),
            _ => script.backend.bright_magenta().to_string(),
        };
        println!(
            "{} #{} [{}] {}",
            title.bold(),
            script.id,
            backend,
            format_timestamp(&script.created_at).dimmed()
        );
        for line in script.generated_text.lines() {
            println!("  {}", line);
        }
        println!();
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp() {
        let ts = Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap();
        assert_eq!(format_timestamp(&ts), "2026-03-14 09:26:53 UTC");
    }

    #[test]
    fn test_created_line_shows_timestamp_not_display() {
        let db = Database::open_in_memory().unwrap();
        let prompt = db.prompts().create("Two strangers share an umbrella").unwrap();

        let created = format_timestamp(&prompt.created_at);
        assert!(!created.starts_with("Prompt from"));
        assert_eq!(
            created,
            prompt.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
        );
    }
}
