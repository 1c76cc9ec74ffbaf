//! Database layer for deepscript.
//!
//! Provides a unified `Database` struct that owns the SQLite connection
//! and provides access to the prompt and script stores.

mod prompts;
mod scripts;

pub use prompts::{PromptFilter, PromptRecord, PromptSummary, Prompts};
pub use scripts::{script_title, ScriptRecord, Scripts};

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::Mutex;

/// The main database struct that owns the SQLite connection.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create a database at the default location.
    ///
    /// The default location is `~/.local/share/deepscript/deepscript.db`.
    pub fn open() -> Result<Self, rusqlite::Error> {
        Self::open_at(&Self::default_path())
    }

    /// Open or create a database at a specific path.
    pub fn open_at(path: &std::path::Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get the default database path.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("deepscript")
            .join("deepscript.db")
    }

    /// Access the prompts store.
    pub fn prompts(&self) -> Prompts<'_> {
        let conn = self.conn.lock().expect("Database lock poisoned");
        Prompts::new(conn)
    }

    /// Access the scripts store.
    pub fn scripts(&self) -> Scripts<'_> {
        let conn = self.conn.lock().expect("Database lock poisoned");
        Scripts::new(conn)
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS prompts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS scripts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                prompt_id INTEGER NOT NULL REFERENCES prompts(id) ON DELETE CASCADE,
                generated_text TEXT NOT NULL,
                backend TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_prompts_created_at ON prompts(created_at DESC);
            CREATE INDEX IF NOT EXISTS idx_scripts_prompt_id ON scripts(prompt_id);
            "#,
        )
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_get_prompt() {
        let db = Database::open_in_memory().unwrap();

        let created = db.prompts().create("Two friends plan a road trip").unwrap();
        let retrieved = db.prompts().get(created.id).unwrap().unwrap();

        assert_eq!(retrieved.text, "Two friends plan a road trip");
        assert_eq!(retrieved.id, created.id);
        assert!(db.prompts().get(created.id + 1).unwrap().is_none());
    }

    #[test]
    fn test_prompt_display() {
        let db = Database::open_in_memory().unwrap();
        let prompt = db.prompts().create("hello").unwrap();

        let expected = format!("Prompt from {}", prompt.created_at.format("%Y-%m-%d %H:%M"));
        assert_eq!(prompt.to_string(), expected);
    }

    #[test]
    fn test_scripts_belong_to_prompt() {
        let db = Database::open_in_memory().unwrap();
        let prompt = db.prompts().create("A chef and a critic").unwrap();
        let other = db.prompts().create("Unrelated").unwrap();

        db.scripts()
            .create(prompt.id, "local", "Alex:A chef and a critic Taylor:...")
            .unwrap();
        db.scripts()
            .create(prompt.id, "remote", "CHEF: Taste this.")
            .unwrap();
        db.scripts().create(other.id, "remote", "X: y").unwrap();

        let scripts = db.scripts().list_for_prompt(prompt.id).unwrap();
        assert_eq!(scripts.len(), 2);
        assert_eq!(scripts[0].backend, "local");
        assert_eq!(scripts[1].generated_text, "CHEF: Taste this.");
        assert_eq!(db.scripts().count().unwrap(), 3);

        let fetched = db.scripts().get(scripts[1].id).unwrap().unwrap();
        assert_eq!(fetched, scripts[1]);
    }

    #[test]
    fn test_script_requires_existing_prompt() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.scripts().create(42, "local", "orphan").is_err());
        assert_eq!(db.scripts().count().unwrap(), 0);
    }

    #[test]
    fn test_delete_prompt_cascades_to_scripts() {
        let db = Database::open_in_memory().unwrap();
        let prompt = db.prompts().create("cascade me").unwrap();
        db.scripts().create(prompt.id, "local", "one").unwrap();
        db.scripts().create(prompt.id, "local", "two").unwrap();

        assert!(db.prompts().delete(prompt.id).unwrap());
        assert!(db.prompts().get(prompt.id).unwrap().is_none());
        assert_eq!(db.scripts().count().unwrap(), 0);

        // Deleting again returns false
        assert!(!db.prompts().delete(prompt.id).unwrap());
    }

    #[test]
    fn test_list_with_counts_and_filter() {
        let db = Database::open_in_memory().unwrap();
        let beach = db.prompts().create("A day at the beach").unwrap();
        let office = db.prompts().create("An office argument").unwrap();
        db.scripts().create(beach.id, "local", "s1").unwrap();
        db.scripts().create(beach.id, "remote", "s2").unwrap();

        let all = db.prompts().list(&PromptFilter::default()).unwrap();
        assert_eq!(all.len(), 2);
        // Newest first
        assert_eq!(all[0].prompt.id, office.id);
        assert_eq!(all[0].script_count, 0);
        assert_eq!(all[1].script_count, 2);

        let searched = db
            .prompts()
            .list(&PromptFilter {
                search: Some("beach".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].prompt.id, beach.id);

        let paged = db
            .prompts()
            .list(&PromptFilter {
                offset: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].prompt.id, beach.id);

        let limited = db
            .prompts()
            .list(&PromptFilter {
                limit: Some(1),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn test_search_treats_wildcards_literally() {
        let db = Database::open_in_memory().unwrap();
        let percent = db.prompts().create("Sales are up 100% this year").unwrap();
        db.prompts().create("Sales are up 1000 units").unwrap();
        let underscore = db.prompts().create("Open file a_b.txt").unwrap();
        db.prompts().create("Open file axb.txt").unwrap();
        let backslash = db.prompts().create(r"Path C:\temp").unwrap();

        let search = |text: &str| {
            db.prompts()
                .list(&PromptFilter {
                    search: Some(text.to_string()),
                    ..Default::default()
                })
                .unwrap()
                .into_iter()
                .map(|s| s.prompt.id)
                .collect::<Vec<_>>()
        };

        assert_eq!(search("100%"), vec![percent.id]);
        assert_eq!(search("a_b"), vec![underscore.id]);
        assert_eq!(search(r"C:\temp"), vec![backslash.id]);
        assert_eq!(search("%").len(), 1);
    }

    #[test]
    fn test_script_title_truncates_prompt() {
        assert_eq!(script_title("short"), "Script for 'short...'");
        let long = "x".repeat(80);
        assert_eq!(script_title(&long), format!("Script for '{}...'", "x".repeat(50)));
    }

    #[test]
    fn test_open_at_creates_parent_dirs() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deepscript.db");

        {
            let db = Database::open_at(&path).unwrap();
            db.prompts().create("persisted").unwrap();
        }

        let reopened = Database::open_at(&path).unwrap();
        let prompts = reopened.prompts().list(&PromptFilter::default()).unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].prompt.text, "persisted");
    }
}
