use anyhow::Result;
use rusqlite::{Connection, Row, params};
use uuid::Uuid;

use carelink_types::models::{Comment, JournalEntry, Mood};

use crate::models::{enum_col, timestamp_col};
use crate::{Database, OptionalExt};

const ENTRY_COLUMNS: &str = "e.id, e.recipient_id, e.content, e.mood, e.audio_url, e.created_at";

const COMMENT_SELECT: &str = "SELECT c.id, c.journal_entry_id, c.author_id, u.name, u.role, c.content, c.created_at
     FROM comments c
     JOIN users u ON u.id = c.author_id";

impl Database {
    // -- Journal entries --

    pub fn insert_journal_entry(
        &self,
        id: Uuid,
        recipient_id: i64,
        content: &str,
        mood: Mood,
        audio_url: Option<&str>,
    ) -> Result<JournalEntry> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO journal_entries (id, recipient_id, content, mood, audio_url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id.to_string(), recipient_id, content, mood.as_str(), audio_url],
            )?;
            query_entry(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Journal entry {} missing after insert", id))
        })
    }

    pub fn get_journal_entry(&self, id: Uuid) -> Result<Option<JournalEntry>> {
        self.with_conn(|conn| query_entry(conn, id))
    }

    /// Entries for one recipient, newest first.
    pub fn list_journal_entries(&self, recipient_id: i64) -> Result<Vec<JournalEntry>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM journal_entries e
                 WHERE e.recipient_id = ?1
                 ORDER BY e.created_at DESC, e.rowid DESC",
                ENTRY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([recipient_id], map_entry)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Entries of every recipient the caregiver is linked to, newest first.
    pub fn list_journal_entries_for_caregiver(&self, caregiver_id: i64) -> Result<Vec<JournalEntry>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM journal_entries e
                 JOIN caregiver_recipients cr ON cr.recipient_id = e.recipient_id
                 WHERE cr.caregiver_id = ?1
                 ORDER BY e.created_at DESC, e.rowid DESC",
                ENTRY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([caregiver_id], map_entry)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_journal_entry(
        &self,
        id: Uuid,
        content: Option<&str>,
        mood: Option<Mood>,
    ) -> Result<Option<JournalEntry>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE journal_entries
                 SET content = COALESCE(?2, content), mood = COALESCE(?3, mood)
                 WHERE id = ?1",
                params![id.to_string(), content, mood.map(Mood::as_str)],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_entry(conn, id)
        })
    }

    /// Comments on the entry go with it.
    pub fn delete_journal_entry(&self, id: Uuid) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM journal_entries WHERE id = ?1", [id.to_string()])?;
            Ok(deleted > 0)
        })
    }

    // -- Comments --

    pub fn insert_comment(&self, journal_entry_id: Uuid, author_id: i64, content: &str) -> Result<Comment> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (journal_entry_id, author_id, content) VALUES (?1, ?2, ?3)",
                params![journal_entry_id.to_string(), author_id, content],
            )?;
            let id = conn.last_insert_rowid();
            query_comment(conn, id)?
                .ok_or_else(|| anyhow::anyhow!("Comment {} missing after insert", id))
        })
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        self.with_conn(|conn| query_comment(conn, id))
    }

    /// Oldest first, optionally limited to one journal entry.
    pub fn list_comments(&self, journal_entry_id: Option<Uuid>) -> Result<Vec<Comment>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} WHERE (?1 IS NULL OR c.journal_entry_id = ?1)
                 ORDER BY c.created_at ASC, c.id ASC",
                COMMENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([journal_entry_id.map(|id| id.to_string())], map_comment)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_comment(&self, id: i64, content: Option<&str>) -> Result<Option<Comment>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE comments SET content = COALESCE(?2, content) WHERE id = ?1",
                params![id, content],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_comment(conn, id)
        })
    }

    pub fn delete_comment(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn query_entry(conn: &Connection, id: Uuid) -> Result<Option<JournalEntry>> {
    let sql = format!("SELECT {} FROM journal_entries e WHERE e.id = ?1", ENTRY_COLUMNS);
    conn.query_row(&sql, [id.to_string()], map_entry).optional()
}

fn query_comment(conn: &Connection, id: i64) -> Result<Option<Comment>> {
    let sql = format!("{} WHERE c.id = ?1", COMMENT_SELECT);
    conn.query_row(&sql, [id], map_comment).optional()
}

fn uuid_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn map_entry(row: &Row<'_>) -> rusqlite::Result<JournalEntry> {
    Ok(JournalEntry {
        id: uuid_col(row, 0)?,
        recipient_id: row.get(1)?,
        content: row.get(2)?,
        mood: enum_col(row, 3)?,
        audio_url: row.get(4)?,
        created_at: timestamp_col(row, 5)?,
    })
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        journal_entry_id: uuid_col(row, 1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        author_role: enum_col(row, 4)?,
        content: row.get(5)?,
        created_at: timestamp_col(row, 6)?,
    })
}
