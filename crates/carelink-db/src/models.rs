//! Row types and column helpers.
//!
//! Most queries map straight into `carelink_types` models; the types here
//! cover what the API models deliberately leave out (password hashes) and
//! the argument bundles for multi-field writes.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;

use carelink_types::models::{ParseEnumError, TodoPriority, User, UserRole, parse_timestamp};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub name: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
        }
    }
}

pub struct NewTodo<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub due_date: DateTime<Utc>,
    pub recipient_id: i64,
    pub caregiver_id: i64,
    pub priority: TodoPriority,
}

/// `None` fields are left unchanged.
#[derive(Default)]
pub struct TodoChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub due_date: Option<DateTime<Utc>>,
    pub completed: Option<bool>,
    pub priority: Option<TodoPriority>,
}

/// `None` fields do not filter.
#[derive(Default)]
pub struct TodoFilter {
    pub recipient_id: Option<i64>,
    pub caregiver_id: Option<i64>,
    pub priority: Option<TodoPriority>,
    pub completed: Option<bool>,
}

/// Same shape as the column defaults in the schema, so text order is time order.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn timestamp_col(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unparseable timestamp {:?}", raw).into(),
        )
    })
}

pub(crate) fn opt_timestamp_col(
    row: &Row<'_>,
    idx: usize,
) -> rusqlite::Result<Option<DateTime<Utc>>> {
    match row.get::<_, Option<String>>(idx)? {
        None => Ok(None),
        Some(_) => timestamp_col(row, idx).map(Some),
    }
}

pub(crate) fn enum_col<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = ParseEnumError>,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads the `username, name, role, created_at` block that profile queries
/// join in from `users`, starting at `start`.
pub(crate) fn joined_user(row: &Row<'_>, user_id: i64, start: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: user_id,
        username: row.get(start)?,
        name: row.get(start + 1)?,
        role: enum_col(row, start + 2)?,
        created_at: timestamp_col(row, start + 3)?,
    })
}
