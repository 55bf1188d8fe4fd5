//! Care-request ledger and responder.
//!
//! A request starts `pending` and is answered exactly once. The answer is a
//! conditional update guarded on `status = 'pending'`, so when two responders
//! race only one of them changes the row; the other sees zero affected rows and
//! gets [`CareRequestError::AlreadyResponded`]. On acceptance the link is
//! created in the same transaction.

use rusqlite::{Connection, Row, params};
use thiserror::Error;
use tracing::info;

use carelink_types::models::{CareRequest, CareRequestStatus, Decision, ParseEnumError};

use crate::links::ensure_link_in;
use crate::models::{enum_col, opt_timestamp_col, timestamp_col};
use crate::queries::{caregiver_exists, recipient_exists};
use crate::{Database, OptionalExt, is_unique_violation};

#[derive(Debug, Error)]
pub enum CareRequestError {
    #[error("caregiver not found")]
    CaregiverNotFound,
    #[error("recipient not found")]
    RecipientNotFound,
    #[error("caregiver and recipient already linked")]
    AlreadyLinked,
    #[error("request already pending")]
    AlreadyPending,
    #[error("request not found")]
    NotFound,
    #[error("request already responded to")]
    AlreadyResponded,
    #[error(transparent)]
    InvalidStatus(#[from] ParseEnumError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for CareRequestError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(e.into())
    }
}

const CARE_REQUEST_COLUMNS: &str =
    "id, caregiver_id, recipient_id, status, created_at, updated_at, responded_at";

impl Database {
    /// Open a new pending request from a caregiver to a recipient.
    pub fn submit_care_request(
        &self,
        caregiver_id: i64,
        recipient_id: i64,
    ) -> Result<CareRequest, CareRequestError> {
        let request = self.with_tx(|tx| {
            if !caregiver_exists(tx, caregiver_id)? {
                return Err(CareRequestError::CaregiverNotFound);
            }
            if !recipient_exists(tx, recipient_id)? {
                return Err(CareRequestError::RecipientNotFound);
            }
            if link_exists(tx, caregiver_id, recipient_id)? {
                return Err(CareRequestError::AlreadyLinked);
            }
            if pending_exists(tx, caregiver_id, recipient_id)? {
                return Err(CareRequestError::AlreadyPending);
            }

            // IMMEDIATE already serializes submits; the partial unique index
            // is the schema-level backstop for the same rule.
            tx.execute(
                "INSERT INTO care_requests (caregiver_id, recipient_id, status) VALUES (?1, ?2, 'pending')",
                params![caregiver_id, recipient_id],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    CareRequestError::AlreadyPending
                } else {
                    e.into()
                }
            })?;

            let id = tx.last_insert_rowid();
            query_care_request(tx, id)?.ok_or(CareRequestError::NotFound)
        })?;

        info!(
            "Care request {} opened: caregiver {} -> recipient {}",
            request.id, caregiver_id, recipient_id
        );
        Ok(request)
    }

    /// All requests addressed to a recipient, newest first.
    ///
    /// `status_filter` is matched case-insensitively after trimming; blank
    /// means no filter, anything else unknown is `InvalidStatus`.
    pub fn list_care_requests_for_recipient(
        &self,
        recipient_id: i64,
        status_filter: Option<&str>,
    ) -> Result<Vec<CareRequest>, CareRequestError> {
        let status = match status_filter.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<CareRequestStatus>()?),
        };

        let rows = self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM care_requests
                 WHERE recipient_id = ?1 AND (?2 IS NULL OR status = ?2)
                 ORDER BY created_at DESC, id DESC",
                CARE_REQUEST_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(
                    params![recipient_id, status.map(CareRequestStatus::as_str)],
                    map_care_request,
                )?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        Ok(rows)
    }

    pub fn get_care_request(&self, id: i64) -> anyhow::Result<Option<CareRequest>> {
        self.with_conn(|conn| query_care_request(conn, id))
    }

    /// Move a pending request to its terminal state.
    pub fn respond_to_care_request(
        &self,
        request_id: i64,
        decision: Decision,
    ) -> Result<CareRequest, CareRequestError> {
        let updated = self.with_tx(|tx| {
            let current =
                query_care_request(tx, request_id)?.ok_or(CareRequestError::NotFound)?;
            if current.status.is_terminal() {
                return Err(CareRequestError::AlreadyResponded);
            }

            apply_decision(tx, request_id, decision)?;

            if decision == Decision::Accepted {
                ensure_link_in(tx, current.caregiver_id, current.recipient_id)?;
            }

            query_care_request(tx, request_id)?.ok_or(CareRequestError::NotFound)
        })?;

        info!(
            "Care request {} {}: caregiver {} / recipient {}",
            updated.id, updated.status, updated.caregiver_id, updated.recipient_id
        );
        Ok(updated)
    }
}

/// Compare-and-swap from `pending` to the decided status.
fn apply_decision(
    conn: &Connection,
    request_id: i64,
    decision: Decision,
) -> Result<(), CareRequestError> {
    let status = CareRequestStatus::from(decision);
    let changed = conn.execute(
        "UPDATE care_requests
         SET status = ?1,
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
             responded_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
         WHERE id = ?2 AND status = 'pending'",
        params![status.as_str(), request_id],
    )?;

    if changed == 0 {
        return Err(CareRequestError::AlreadyResponded);
    }
    Ok(())
}

fn link_exists(conn: &Connection, caregiver_id: i64, recipient_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM caregiver_recipients WHERE caregiver_id = ?1 AND recipient_id = ?2)",
        params![caregiver_id, recipient_id],
        |row| row.get(0),
    )
}

fn pending_exists(
    conn: &Connection,
    caregiver_id: i64,
    recipient_id: i64,
) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM care_requests
                       WHERE caregiver_id = ?1 AND recipient_id = ?2 AND status = 'pending')",
        params![caregiver_id, recipient_id],
        |row| row.get(0),
    )
}

fn query_care_request(conn: &Connection, id: i64) -> anyhow::Result<Option<CareRequest>> {
    let sql = format!("SELECT {} FROM care_requests WHERE id = ?1", CARE_REQUEST_COLUMNS);
    conn.query_row(&sql, [id], map_care_request).optional()
}

fn map_care_request(row: &Row<'_>) -> rusqlite::Result<CareRequest> {
    Ok(CareRequest {
        id: row.get(0)?,
        caregiver_id: row.get(1)?,
        recipient_id: row.get(2)?,
        status: enum_col(row, 3)?,
        created_at: timestamp_col(row, 4)?,
        updated_at: timestamp_col(row, 5)?,
        responded_at: opt_timestamp_col(row, 6)?,
    })
}
