use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;
use uuid::Uuid;

use carelink_types::api::{
    AcceptedJournalQuery, CreateJournalEntryRequest, JournalQuery, UpdateJournalEntryRequest,
};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

pub async fn create_entry(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateJournalEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("content is required"));
    }

    let entry = blocking(&state, move |db| {
        if !db.recipient_exists(req.recipient_id)? {
            return Err(ApiError::bad_request("recipient not found"));
        }
        let audio_url = req.audio_url.as_deref().filter(|u| !u.is_empty());
        Ok(db.insert_journal_entry(
            Uuid::new_v4(),
            req.recipient_id,
            &req.content,
            req.mood,
            audio_url,
        )?)
    })
    .await?;

    info!("Journal entry {} for recipient {}", entry.id, entry.recipient_id);
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /journal-entries: one recipient's entries, newest first.
pub async fn list_entries(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<JournalQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient_id = query
        .recipient_id
        .ok_or_else(|| ApiError::bad_request("recipientId is required"))?;

    let entries = blocking(&state, move |db| Ok(db.list_journal_entries(recipient_id)?)).await?;
    Ok(Json(entries))
}

/// GET /journal-entries/accepted: entries of every
/// recipient the caregiver is linked to.
pub async fn list_accepted_entries(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AcceptedJournalQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let caregiver_id = query
        .caregiver_id
        .ok_or_else(|| ApiError::bad_request("caregiverId is required"))?;

    let entries = blocking(&state, move |db| {
        Ok(db.list_journal_entries_for_caregiver(caregiver_id)?)
    })
    .await?;
    Ok(Json(entries))
}

pub async fn update_entry(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<UpdateJournalEntryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.content.is_none() && req.mood.is_none() {
        return Err(ApiError::bad_request("at least one field must be provided"));
    }
    if req.content.as_deref().is_some_and(|c| c.trim().is_empty()) {
        return Err(ApiError::bad_request("content must not be empty"));
    }

    let entry = blocking(&state, move |db| {
        db.update_journal_entry(id, req.content.as_deref(), req.mood)?
            .ok_or(ApiError::NotFound("journal entry not found"))
    })
    .await?;
    Ok(Json(entry))
}

pub async fn delete_entry(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    let deleted = blocking(&state, move |db| Ok(db.delete_journal_entry(id)?)).await?;
    if !deleted {
        return Err(ApiError::NotFound("journal entry not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
