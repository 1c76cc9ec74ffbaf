//! Scripts store: generated text, each tied to one prompt.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;

use crate::parse_timestamp;

/// A stored script record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRecord {
    pub id: i64,
    pub prompt_id: i64,
    pub generated_text: String,
    /// "local" or "remote"
    pub backend: String,
    pub created_at: DateTime<Utc>,
}

/// Display title for a script, derived from its prompt's text.
pub fn script_title(prompt_text: &str) -> String {
    let head: String = prompt_text.chars().take(50).collect();
    format!("Script for '{}...'", head)
}

/// Scripts store with a borrowed connection.
pub struct Scripts<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Scripts<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Insert a script for an existing prompt.
    ///
    /// Fails with a constraint error when `prompt_id` does not exist.
    pub fn create(
        &self,
        prompt_id: i64,
        backend: &str,
        generated_text: &str,
    ) -> Result<ScriptRecord, rusqlite::Error> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO scripts (prompt_id, generated_text, backend, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![prompt_id, generated_text, backend, created_at.to_rfc3339()],
        )?;

        Ok(ScriptRecord {
            id: self.conn.last_insert_rowid(),
            prompt_id,
            generated_text: generated_text.to_string(),
            backend: backend.to_string(),
            created_at,
        })
    }

    /// Get a script by ID.
    pub fn get(&self, id: i64) -> Result<Option<ScriptRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, prompt_id, generated_text, backend, created_at FROM scripts WHERE id = ?1",
                params![id],
                Self::row_to_record,
            )
            .optional()
    }

    /// All scripts for a prompt, oldest first.
    pub fn list_for_prompt(&self, prompt_id: i64) -> Result<Vec<ScriptRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, prompt_id, generated_text, backend, created_at FROM scripts \
             WHERE prompt_id = ?1 ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![prompt_id], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }

        Ok(records)
    }

    /// Total number of stored scripts.
    pub fn count(&self) -> Result<usize, rusqlite::Error> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM scripts", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<ScriptRecord, rusqlite::Error> {
        let created_at_str: String = row.get(4)?;

        Ok(ScriptRecord {
            id: row.get(0)?,
            prompt_id: row.get(1)?,
            generated_text: row.get(2)?,
            backend: row.get(3)?,
            created_at: parse_timestamp(&created_at_str),
        })
    }
}
