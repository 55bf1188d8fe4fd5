use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use carelink_types::api::{CareRequestQuery, CreateCareRequest, CreateLinkRequest, RespondRequest};
use carelink_types::models::Decision;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::Claims;

/// POST /requests: a caregiver asks to look after a recipient.
pub async fn submit_request(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateCareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let created = blocking(&state, move |db| {
        let caregiver = db
            .get_caregiver(req.caregiver_id)?
            .ok_or_else(|| ApiError::bad_request("caregiver not found"))?;
        if caregiver.user_id != claims.sub {
            return Err(ApiError::Forbidden("requests can only be sent as yourself"));
        }
        Ok(db.submit_care_request(req.caregiver_id, req.recipient_id)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /recipients/{id}/requests: requests addressed to the caller.
pub async fn list_recipient_requests(
    State(state): State<AppState>,
    ApiPath(recipient_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<CareRequestQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = blocking(&state, move |db| {
        let recipient = db
            .get_recipient(recipient_id)?
            .ok_or(ApiError::NotFound("recipient not found"))?;
        if recipient.user_id != claims.sub {
            return Err(ApiError::Forbidden("only the recipient can view their requests"));
        }
        Ok(db.list_care_requests_for_recipient(recipient_id, query.status.as_deref())?)
    })
    .await?;

    Ok(Json(requests))
}

/// PATCH /requests/{id}: the recipient accepts or rejects.
pub async fn respond_to_request(
    State(state): State<AppState>,
    ApiPath(request_id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(body): ApiJson<RespondRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let decision: Decision = body
        .status
        .parse()
        .map_err(|_| ApiError::bad_request("status must be 'accepted' or 'rejected'"))?;

    let updated = blocking(&state, move |db| {
        let request = db
            .get_care_request(request_id)?
            .ok_or(ApiError::NotFound("request not found"))?;
        let recipient = db
            .get_recipient(request.recipient_id)?
            .ok_or(ApiError::NotFound("recipient not found"))?;
        if recipient.user_id != claims.sub {
            return Err(ApiError::Forbidden("only the recipient can respond to this request"));
        }
        Ok(db.respond_to_care_request(request_id, decision)?)
    })
    .await?;

    Ok(Json(updated))
}

/// POST /care-relationships: link a pair directly, without a request.
pub async fn create_link(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateLinkRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let link = blocking(&state, move |db| {
        Ok(db.ensure_link(req.caregiver_id, req.recipient_id)?)
    })
    .await?;

    Ok(Json(link))
}
