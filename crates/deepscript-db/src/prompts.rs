//! Prompts store: the free-text requests clients submitted.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::sync::MutexGuard;

use crate::parse_timestamp;

/// A stored prompt record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub id: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Display for PromptRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Prompt from {}", self.created_at.format("%Y-%m-%d %H:%M"))
    }
}

/// A prompt together with how many scripts were generated for it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptSummary {
    #[serde(flatten)]
    pub prompt: PromptRecord,
    pub script_count: usize,
}

/// Filter options for listing prompts.
#[derive(Debug, Default, Clone)]
pub struct PromptFilter {
    pub search: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Prompts store with a borrowed connection.
pub struct Prompts<'db> {
    conn: MutexGuard<'db, Connection>,
}

impl<'db> Prompts<'db> {
    pub(crate) fn new(conn: MutexGuard<'db, Connection>) -> Self {
        Self { conn }
    }

    /// Insert a new prompt, stamped with the current time.
    pub fn create(&self, text: &str) -> Result<PromptRecord, rusqlite::Error> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO prompts (text, created_at) VALUES (?1, ?2)",
            params![text, created_at.to_rfc3339()],
        )?;

        Ok(PromptRecord {
            id: self.conn.last_insert_rowid(),
            text: text.to_string(),
            created_at,
        })
    }

    /// Get a prompt by ID.
    pub fn get(&self, id: i64) -> Result<Option<PromptRecord>, rusqlite::Error> {
        self.conn
            .query_row(
                "SELECT id, text, created_at FROM prompts WHERE id = ?1",
                params![id],
                Self::row_to_record,
            )
            .optional()
    }

    /// List prompts newest first, with their script counts.
    pub fn list(&self, filter: &PromptFilter) -> Result<Vec<PromptSummary>, rusqlite::Error> {
        let mut sql = String::from(
            "SELECT p.id, p.text, p.created_at, COUNT(s.id) \
             FROM prompts p LEFT JOIN scripts s ON s.prompt_id = p.id WHERE 1=1",
        );
        let mut param_values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(ref search) = filter.search {
            sql.push_str(" AND p.text LIKE ? ESCAPE '\\'");
            param_values.push(Box::new(format!("%{}%", escape_like(search))));
        }

        sql.push_str(" GROUP BY p.id ORDER BY p.created_at DESC, p.id DESC");

        // SQLite only accepts OFFSET after a LIMIT; -1 means unbounded
        match (filter.limit, filter.offset) {
            (Some(limit), _) => sql.push_str(&format!(" LIMIT {}", limit)),
            (None, Some(_)) => sql.push_str(" LIMIT -1"),
            (None, None) => {}
        }
        if let Some(offset) = filter.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        let params: Vec<&dyn rusqlite::ToSql> = param_values.iter().map(|p| p.as_ref()).collect();

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params.as_slice(), |row| {
            let prompt = Self::row_to_record(row)?;
            let script_count: i64 = row.get(3)?;
            Ok(PromptSummary {
                prompt,
                script_count: script_count as usize,
            })
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }

        Ok(summaries)
    }

    /// Delete a prompt by ID. Its scripts go with it.
    pub fn delete(&self, id: i64) -> Result<bool, rusqlite::Error> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM prompts WHERE id = ?1", params![id])?;
        Ok(rows_affected > 0)
    }

    fn row_to_record(row: &rusqlite::Row) -> Result<PromptRecord, rusqlite::Error> {
        let created_at_str: String = row.get(2)?;

        Ok(PromptRecord {
            id: row.get(0)?,
            text: row.get(1)?,
            created_at: parse_timestamp(&created_at_str),
        })
    }
}

/// Make `%`, `_` and the escape character itself match literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
