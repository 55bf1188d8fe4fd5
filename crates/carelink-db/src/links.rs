use rusqlite::{Connection, Row, params};
use tracing::debug;

use carelink_types::models::CaregiverRecipientLink;

use crate::care_requests::CareRequestError;
use crate::models::timestamp_col;
use crate::queries::{caregiver_exists, recipient_exists};
use crate::Database;

impl Database {
    /// Link a caregiver to a recipient directly. Linking an already linked pair
    /// returns the existing link.
    pub fn ensure_link(
        &self,
        caregiver_id: i64,
        recipient_id: i64,
    ) -> Result<CaregiverRecipientLink, CareRequestError> {
        self.with_tx(|tx| {
            if !caregiver_exists(tx, caregiver_id)? {
                return Err(CareRequestError::CaregiverNotFound);
            }
            if !recipient_exists(tx, recipient_id)? {
                return Err(CareRequestError::RecipientNotFound);
            }
            Ok(ensure_link_in(tx, caregiver_id, recipient_id)?)
        })
    }
}

/// Find-or-create on the unique pair. The insert is a no-op when the row
/// exists, so concurrent callers never see a duplicate or a constraint error.
pub(crate) fn ensure_link_in(
    conn: &Connection,
    caregiver_id: i64,
    recipient_id: i64,
) -> rusqlite::Result<CaregiverRecipientLink> {
    let inserted = conn.execute(
        "INSERT INTO caregiver_recipients (caregiver_id, recipient_id) VALUES (?1, ?2)
         ON CONFLICT (caregiver_id, recipient_id) DO NOTHING",
        params![caregiver_id, recipient_id],
    )?;
    if inserted == 0 {
        debug!("Link {} -> {} already present", caregiver_id, recipient_id);
    }

    conn.query_row(
        "SELECT id, caregiver_id, recipient_id, created_at FROM caregiver_recipients
         WHERE caregiver_id = ?1 AND recipient_id = ?2",
        params![caregiver_id, recipient_id],
        map_link,
    )
}

fn map_link(row: &Row<'_>) -> rusqlite::Result<CaregiverRecipientLink> {
    Ok(CaregiverRecipientLink {
        id: row.get(0)?,
        caregiver_id: row.get(1)?,
        recipient_id: row.get(2)?,
        created_at: timestamp_col(row, 3)?,
    })
}
