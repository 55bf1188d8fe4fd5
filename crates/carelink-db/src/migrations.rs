use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            BEGIN;

            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                name        TEXT NOT NULL,
                role        TEXT NOT NULL CHECK (role IN ('caregiver', 'recipient')),
                created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE TABLE caregivers (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE
            );

            CREATE TABLE recipients (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id     INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
                age         INTEGER,
                condition   TEXT,
                likes       TEXT,
                dislikes    TEXT,
                phobias     TEXT,
                pet_peeves  TEXT
            );

            CREATE TABLE caregiver_recipients (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                caregiver_id  INTEGER NOT NULL REFERENCES caregivers(id) ON DELETE CASCADE,
                recipient_id  INTEGER NOT NULL REFERENCES recipients(id) ON DELETE CASCADE,
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                UNIQUE(caregiver_id, recipient_id)
            );

            CREATE INDEX idx_links_recipient
                ON caregiver_recipients(recipient_id);

            CREATE TABLE care_requests (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                caregiver_id  INTEGER NOT NULL REFERENCES caregivers(id) ON DELETE CASCADE,
                recipient_id  INTEGER NOT NULL REFERENCES recipients(id) ON DELETE CASCADE,
                status        TEXT NOT NULL DEFAULT 'pending'
                              CHECK (status IN ('pending', 'accepted', 'rejected')),
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                responded_at  TEXT
            );

            -- At most one open request per pair; answered ones may repeat
            CREATE UNIQUE INDEX uniq_pending_request
                ON care_requests(caregiver_id, recipient_id)
                WHERE status = 'pending';

            CREATE INDEX idx_requests_recipient
                ON care_requests(recipient_id, created_at);

            CREATE TABLE journal_entries (
                id            TEXT PRIMARY KEY,
                recipient_id  INTEGER NOT NULL REFERENCES recipients(id) ON DELETE CASCADE,
                content       TEXT NOT NULL,
                mood          TEXT NOT NULL,
                audio_url     TEXT,
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_journal_recipient
                ON journal_entries(recipient_id, created_at);

            CREATE TABLE comments (
                id                INTEGER PRIMARY KEY AUTOINCREMENT,
                journal_entry_id  TEXT NOT NULL REFERENCES journal_entries(id) ON DELETE CASCADE,
                author_id         INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                content           TEXT NOT NULL,
                created_at        TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_comments_entry
                ON comments(journal_entry_id, created_at);

            CREATE TABLE todos (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                title         TEXT NOT NULL,
                description   TEXT NOT NULL,
                due_date      TEXT NOT NULL,
                completed     INTEGER NOT NULL DEFAULT 0,
                recipient_id  INTEGER NOT NULL REFERENCES recipients(id) ON DELETE CASCADE,
                caregiver_id  INTEGER NOT NULL REFERENCES caregivers(id) ON DELETE CASCADE,
                priority      TEXT NOT NULL CHECK (priority IN ('low', 'medium', 'high')),
                created_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
                updated_at    TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
            );

            CREATE INDEX idx_todos_due ON todos(due_date);

            INSERT INTO schema_version (version) VALUES (1);

            COMMIT;
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }
}
