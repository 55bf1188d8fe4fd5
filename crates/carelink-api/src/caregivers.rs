use axum::{Extension, Json, extract::State, response::IntoResponse};

use carelink_types::api::{UpdateNameRequest, UpdateNameResponse};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::Claims;

pub async fn list_caregivers(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, |db| Ok(db.list_caregivers()?)).await?;
    Ok(Json(rows))
}

/// GET /recipients/{id}/caregivers: caregivers linked to a recipient.
pub async fn list_caregivers_for_recipient(
    State(state): State<AppState>,
    ApiPath(recipient_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = blocking(&state, move |db| {
        Ok(db.list_caregivers_for_recipient(recipient_id)?)
    })
    .await?;
    Ok(Json(rows))
}

pub async fn get_caregiver_by_user(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let caregiver = blocking(&state, move |db| {
        db.get_caregiver_by_user(user_id)?
            .ok_or(ApiError::NotFound("caregiver not found"))
    })
    .await?;
    Ok(Json(caregiver))
}

/// PUT /caregivers/{id}: rename a user. The id is the user id.
pub async fn update_caregiver_name(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateNameRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }
    if user_id != claims.sub {
        return Err(ApiError::Forbidden("users can only rename themselves"));
    }

    let user = blocking(&state, move |db| {
        if !db.update_user_name(user_id, &name)? {
            return Err(ApiError::NotFound("user not found"));
        }
        db.get_user_by_id(user_id)?
            .ok_or(ApiError::NotFound("user not found"))
    })
    .await?;

    Ok(Json(UpdateNameResponse {
        id: user.id,
        name: user.name,
    }))
}
