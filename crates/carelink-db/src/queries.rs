use crate::models::{UserRow, enum_col, joined_user, timestamp_col};
use crate::{Database, OptionalExt};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row, params};

use carelink_types::api::{RecipientProfile, UpdateRecipientRequest};
use carelink_types::models::{Caregiver, Recipient, RecipientWithRequest, UserRole};

const CAREGIVER_SELECT: &str = "SELECT c.id, c.user_id, u.username, u.name, u.role, u.created_at
     FROM caregivers c
     JOIN users u ON u.id = c.user_id";

const RECIPIENT_SELECT: &str = "SELECT r.id, r.user_id, u.username, u.name, u.role, u.created_at,
            r.age, r.condition, r.likes, r.dislikes, r.phobias, r.pet_peeves
     FROM recipients r
     JOIN users u ON u.id = r.user_id";

impl Database {
    // -- Users --

    /// Create a user and its role profile in one transaction.
    ///
    /// Returns `None` if the username is taken, otherwise the user and the id
    /// of the caregiver or recipient row.
    pub fn create_account(
        &self,
        username: &str,
        name: &str,
        password_hash: &str,
        role: UserRole,
        recipient: Option<&RecipientProfile>,
    ) -> Result<Option<(UserRow, i64)>> {
        self.with_tx(|tx| -> Result<Option<(UserRow, i64)>> {
            let inserted = tx.execute(
                "INSERT INTO users (username, password, name, role) VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (username) DO NOTHING",
                params![username, password_hash, name, role.as_str()],
            )?;
            if inserted == 0 {
                return Ok(None);
            }
            let user_id = tx.last_insert_rowid();

            let profile_id = match role {
                UserRole::Caregiver => {
                    tx.execute("INSERT INTO caregivers (user_id) VALUES (?1)", [user_id])?;
                    tx.last_insert_rowid()
                }
                UserRole::Recipient => {
                    let p = recipient.cloned().unwrap_or_default();
                    tx.execute(
                        "INSERT INTO recipients (user_id, age, condition, likes, dislikes, phobias, pet_peeves)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![user_id, p.age, p.condition, p.likes, p.dislikes, p.phobias, p.pet_peeves],
                    )?;
                    tx.last_insert_rowid()
                }
            };

            let user = query_user_by_id(tx, user_id)?
                .ok_or_else(|| anyhow!("User {} missing after insert", user_id))?;
            Ok(Some((user, profile_id)))
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    /// Returns false if no user has that id.
    pub fn update_user_name(&self, user_id: i64, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET name = ?2 WHERE id = ?1",
                params![user_id, name],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Caregivers --

    pub fn caregiver_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| Ok(caregiver_exists(conn, id)?))
    }

    pub fn list_caregivers(&self) -> Result<Vec<Caregiver>> {
        self.with_conn(|conn| {
            let sql = format!("{} ORDER BY c.id DESC", CAREGIVER_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_caregiver)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_caregiver(&self, id: i64) -> Result<Option<Caregiver>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.id = ?1", CAREGIVER_SELECT);
            conn.query_row(&sql, [id], map_caregiver).optional()
        })
    }

    pub fn get_caregiver_by_user(&self, user_id: i64) -> Result<Option<Caregiver>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE c.user_id = ?1", CAREGIVER_SELECT);
            conn.query_row(&sql, [user_id], map_caregiver).optional()
        })
    }

    /// Caregivers linked to a recipient.
    pub fn list_caregivers_for_recipient(&self, recipient_id: i64) -> Result<Vec<Caregiver>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} JOIN caregiver_recipients cr ON cr.caregiver_id = c.id
                 WHERE cr.recipient_id = ?1
                 ORDER BY c.id ASC",
                CAREGIVER_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([recipient_id], map_caregiver)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Recipients --

    pub fn recipient_exists(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| Ok(recipient_exists(conn, id)?))
    }

    pub fn list_recipients(&self) -> Result<Vec<Recipient>> {
        self.with_conn(|conn| {
            let sql = format!("{} ORDER BY r.id DESC", RECIPIENT_SELECT);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], map_recipient)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every recipient, each paired with the latest request `caregiver_id`
    /// sent them (if any).
    pub fn list_recipients_with_requests(
        &self,
        caregiver_id: i64,
    ) -> Result<Vec<RecipientWithRequest>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT r.id, r.user_id, u.username, u.name, u.role, u.created_at,
                        r.age, r.condition, r.likes, r.dislikes, r.phobias, r.pet_peeves,
                        cr.id, cr.status
                 FROM recipients r
                 JOIN users u ON u.id = r.user_id
                 LEFT JOIN care_requests cr ON cr.id = (
                     SELECT MAX(id) FROM care_requests
                     WHERE recipient_id = r.id AND caregiver_id = ?1
                 )
                 ORDER BY r.id DESC",
            )?;
            let rows = stmt
                .query_map([caregiver_id], |row| {
                    let request_status = match row.get::<_, Option<String>>(13)? {
                        Some(_) => Some(enum_col(row, 13)?),
                        None => None,
                    };
                    Ok(RecipientWithRequest {
                        recipient: map_recipient(row)?,
                        request_id: row.get(12)?,
                        request_status,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Recipients linked to a caregiver.
    pub fn list_recipients_for_caregiver(&self, caregiver_id: i64) -> Result<Vec<Recipient>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{} JOIN caregiver_recipients cr ON cr.recipient_id = r.id
                 WHERE cr.caregiver_id = ?1
                 ORDER BY r.id ASC",
                RECIPIENT_SELECT
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([caregiver_id], map_recipient)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_recipient(&self, id: i64) -> Result<Option<Recipient>> {
        self.with_conn(|conn| query_recipient(conn, id))
    }

    pub fn get_recipient_by_user(&self, user_id: i64) -> Result<Option<Recipient>> {
        self.with_conn(|conn| {
            let sql = format!("{} WHERE r.user_id = ?1", RECIPIENT_SELECT);
            conn.query_row(&sql, [user_id], map_recipient).optional()
        })
    }

    /// Partial update; absent fields keep their value. `None` if no such recipient.
    pub fn update_recipient(
        &self,
        id: i64,
        changes: &UpdateRecipientRequest,
    ) -> Result<Option<Recipient>> {
        self.with_tx(|tx| -> Result<Option<Recipient>> {
            let changed = tx.execute(
                "UPDATE recipients SET
                    age        = COALESCE(?2, age),
                    condition  = COALESCE(?3, condition),
                    likes      = COALESCE(?4, likes),
                    dislikes   = COALESCE(?5, dislikes),
                    phobias    = COALESCE(?6, phobias),
                    pet_peeves = COALESCE(?7, pet_peeves)
                 WHERE id = ?1",
                params![
                    id,
                    changes.age,
                    changes.condition,
                    changes.likes,
                    changes.dislikes,
                    changes.phobias,
                    changes.pet_peeves
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }

            if let Some(name) = &changes.name {
                tx.execute(
                    "UPDATE users SET name = ?2 WHERE id = (SELECT user_id FROM recipients WHERE id = ?1)",
                    params![id, name],
                )?;
            }

            query_recipient(tx, id)
        })
    }
}

pub(crate) fn caregiver_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM caregivers WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )
}

pub(crate) fn recipient_exists(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM recipients WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password, name, role, created_at FROM users WHERE username = ?1",
    )?;

    stmt.query_row([username], map_user).optional()
}

fn query_user_by_id(conn: &Connection, id: i64) -> Result<Option<UserRow>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password, name, role, created_at FROM users WHERE id = ?1",
    )?;

    stmt.query_row([id], map_user).optional()
}

fn query_recipient(conn: &Connection, id: i64) -> Result<Option<Recipient>> {
    let sql = format!("{} WHERE r.id = ?1", RECIPIENT_SELECT);
    conn.query_row(&sql, [id], map_recipient).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        name: row.get(3)?,
        role: enum_col(row, 4)?,
        created_at: timestamp_col(row, 5)?,
    })
}

fn map_caregiver(row: &Row<'_>) -> rusqlite::Result<Caregiver> {
    let user_id: i64 = row.get(1)?;
    Ok(Caregiver {
        id: row.get(0)?,
        user_id,
        user: joined_user(row, user_id, 2)?,
    })
}

fn map_recipient(row: &Row<'_>) -> rusqlite::Result<Recipient> {
    let user_id: i64 = row.get(1)?;
    Ok(Recipient {
        id: row.get(0)?,
        user_id,
        user: joined_user(row, user_id, 2)?,
        age: row.get(6)?,
        condition: row.get(7)?,
        likes: row.get(8)?,
        dislikes: row.get(9)?,
        phobias: row.get(10)?,
        pet_peeves: row.get(11)?,
    })
}
