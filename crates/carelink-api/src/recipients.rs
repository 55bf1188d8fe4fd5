use axum::{
    Extension, Json,
    extract::State,
    response::{IntoResponse, Response},
};

use carelink_types::api::{RecipientListQuery, UpdateRecipientRequest};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::Claims;

/// GET /recipients: with `?caregiverId=` each row also shows that
/// caregiver's latest request to the recipient.
pub async fn list_recipients(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecipientListQuery>,
) -> Result<Response, ApiError> {
    match query.caregiver_id {
        Some(caregiver_id) => {
            let rows = blocking(&state, move |db| {
                Ok(db.list_recipients_with_requests(caregiver_id)?)
            })
            .await?;
            Ok(Json(rows).into_response())
        }
        None => {
            let rows = blocking(&state, |db| Ok(db.list_recipients()?)).await?;
            Ok(Json(rows).into_response())
        }
    }
}

pub async fn get_recipient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = blocking(&state, move |db| {
        db.get_recipient(id)?
            .ok_or(ApiError::NotFound("recipient not found"))
    })
    .await?;
    Ok(Json(recipient))
}

pub async fn get_recipient_by_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let recipient = blocking(&state, move |db| {
        db.get_recipient_by_user(user_id)?
            .ok_or(ApiError::NotFound("recipient not found"))
    })
    .await?;
    Ok(Json(recipient))
}

/// PUT /recipients/{id}: the recipient edits their own profile.
pub async fn update_recipient(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(changes): ApiJson<UpdateRecipientRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if changes.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
        return Err(ApiError::bad_request("name must not be empty"));
    }

    let updated = blocking(&state, move |db| {
        let current = db
            .get_recipient(id)?
            .ok_or(ApiError::NotFound("recipient not found"))?;
        if current.user_id != claims.sub {
            return Err(ApiError::Forbidden("only the recipient can edit their profile"));
        }
        db.update_recipient(id, &changes)?
            .ok_or(ApiError::NotFound("recipient not found"))
    })
    .await?;
    Ok(Json(updated))
}

/// GET /caregivers/{id}/recipients: recipients linked to a caregiver.
pub async fn list_recipients_for_caregiver(
    State(state): State<AppState>,
    ApiPath(caregiver_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, move |db| {
        Ok(db.list_recipients_for_caregiver(caregiver_id)?)
    })
    .await?;
    Ok(Json(rows))
}
