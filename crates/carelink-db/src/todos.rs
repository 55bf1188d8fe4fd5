use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row, params};

use carelink_types::models::{Todo, TodoPriority};

use crate::models::{NewTodo, TodoChanges, TodoFilter, enum_col, format_timestamp, timestamp_col};
use crate::{Database, OptionalExt};

const TODO_COLUMNS: &str = "id, title, description, due_date, completed, recipient_id, caregiver_id,
     priority, created_at, updated_at";

impl Database {
    pub fn insert_todo(&self, todo: &NewTodo<'_>) -> Result<Todo> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO todos (title, description, due_date, recipient_id, caregiver_id, priority)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    todo.title,
                    todo.description,
                    format_timestamp(todo.due_date),
                    todo.recipient_id,
                    todo.caregiver_id,
                    todo.priority.as_str()
                ],
            )?;
            let id = conn.last_insert_rowid();
            query_todo(conn, id)?.ok_or_else(|| anyhow!("Todo {} missing after insert", id))
        })
    }

    pub fn get_todo(&self, id: i64) -> Result<Option<Todo>> {
        self.with_conn(|conn| query_todo(conn, id))
    }

    /// Soonest due first.
    pub fn list_todos(&self, filter: &TodoFilter) -> Result<Vec<Todo>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM todos
                 WHERE (?1 IS NULL OR recipient_id = ?1)
                   AND (?2 IS NULL OR caregiver_id = ?2)
                   AND (?3 IS NULL OR priority = ?3)
                   AND (?4 IS NULL OR completed = ?4)
                 ORDER BY due_date ASC, id ASC",
                TODO_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![
                        filter.recipient_id,
                        filter.caregiver_id,
                        filter.priority.map(TodoPriority::as_str),
                        filter.completed
                    ],
                    map_todo,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn update_todo(&self, id: i64, changes: &TodoChanges<'_>) -> Result<Option<Todo>> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE todos SET
                    title       = COALESCE(?2, title),
                    description = COALESCE(?3, description),
                    due_date    = COALESCE(?4, due_date),
                    completed   = COALESCE(?5, completed),
                    priority    = COALESCE(?6, priority),
                    updated_at  = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![
                    id,
                    changes.title,
                    changes.description,
                    changes.due_date.map(format_timestamp),
                    changes.completed,
                    changes.priority.map(TodoPriority::as_str)
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            query_todo(conn, id)
        })
    }

    pub fn delete_todo(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM todos WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn query_todo(conn: &Connection, id: i64) -> Result<Option<Todo>> {
    let sql = format!("SELECT {} FROM todos WHERE id = ?1", TODO_COLUMNS);
    conn.query_row(&sql, [id], map_todo).optional()
}

fn map_todo(row: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        due_date: timestamp_col(row, 3)?,
        completed: row.get(4)?,
        recipient_id: row.get(5)?,
        caregiver_id: row.get(6)?,
        priority: enum_col(row, 7)?,
        created_at: timestamp_col(row, 8)?,
        updated_at: timestamp_col(row, 9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_types::models::UserRole;
    use chrono::{Duration, Utc};

    fn seed(db: &Database) -> (i64, i64) {
        let (_, c) = db
            .create_account("carol", "Carol", "hash", UserRole::Caregiver, None)
            .unwrap()
            .unwrap();
        let (_, r) = db
            .create_account("rita", "Rita", "hash", UserRole::Recipient, None)
            .unwrap()
            .unwrap();
        (c, r)
    }

    #[test]
    fn todos_sort_by_due_date_and_filter() {
        let db = Database::open_in_memory().unwrap();
        let (c, r) = seed(&db);
        let now = Utc::now();

        let later = db
            .insert_todo(&NewTodo {
                title: "pharmacy",
                description: "pick up refill",
                due_date: now + Duration::days(2),
                recipient_id: r,
                caregiver_id: c,
                priority: TodoPriority::High,
            })
            .unwrap();
        let sooner = db
            .insert_todo(&NewTodo {
                title: "walk",
                description: "around the block",
                due_date: now + Duration::hours(3),
                recipient_id: r,
                caregiver_id: c,
                priority: TodoPriority::Low,
            })
            .unwrap();
        assert!(!sooner.completed);

        let all = db.list_todos(&TodoFilter::default()).unwrap();
        assert_eq!(all.iter().map(|t| t.id).collect::<Vec<_>>(), vec![sooner.id, later.id]);

        let high = db
            .list_todos(&TodoFilter {
                priority: Some(TodoPriority::High),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(high.len(), 1);
        assert_eq!(high[0].id, later.id);

        db.update_todo(sooner.id, &TodoChanges {
            completed: Some(true),
            ..Default::default()
        })
        .unwrap();
        let done = db
            .list_todos(&TodoFilter {
                completed: Some(true),
                recipient_id: Some(r),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].title, "walk");
        assert!(db
            .list_todos(&TodoFilter {
                caregiver_id: Some(c + 1),
                ..Default::default()
            })
            .unwrap()
            .is_empty());
    }

    #[test]
    fn update_and_delete_missing_todo() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.update_todo(9, &TodoChanges::default()).unwrap().is_none());
        assert!(!db.delete_todo(9).unwrap());
        assert!(db.get_todo(9).unwrap().is_none());
    }
}
