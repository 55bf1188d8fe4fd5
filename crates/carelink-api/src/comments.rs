use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};

use carelink_types::api::{CommentQuery, CreateCommentRequest, UpdateCommentRequest};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::Claims;

/// POST /comments: the author is always the caller.
pub async fn create_comment(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("content is required"));
    }

    let comment = blocking(&state, move |db| {
        if db.get_journal_entry(req.journal_entry_id)?.is_none() {
            return Err(ApiError::bad_request("journal entry not found"));
        }
        Ok(db.insert_comment(req.journal_entry_id, claims.sub, &content)?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /comments: oldest first, optionally for one entry.
pub async fn list_comments(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<CommentQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = blocking(&state, move |db| Ok(db.list_comments(query.journal_entry_id)?)).await?;
    Ok(Json(comments))
}

pub async fn get_comment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = blocking(&state, move |db| {
        db.get_comment(id)?.ok_or(ApiError::NotFound("comment not found"))
    })
    .await?;
    Ok(Json(comment))
}

pub async fn update_comment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = req.content.map(|c| c.trim().to_string());
    if content.as_deref().is_some_and(str::is_empty) {
        return Err(ApiError::bad_request("content must not be empty"));
    }

    let comment = blocking(&state, move |db| {
        let current = db.get_comment(id)?.ok_or(ApiError::NotFound("comment not found"))?;
        if current.author_id != claims.sub {
            return Err(ApiError::Forbidden("only the author can edit a comment"));
        }
        db.update_comment(id, content.as_deref())?
            .ok_or(ApiError::NotFound("comment not found"))
    })
    .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    Extension(claims): Extension<Claims>,
) -> Result<StatusCode, ApiError> {
    blocking(&state, move |db| {
        let current = db.get_comment(id)?.ok_or(ApiError::NotFound("comment not found"))?;
        if current.author_id != claims.sub {
            return Err(ApiError::Forbidden("only the author can delete a comment"));
        }
        if !db.delete_comment(id)? {
            return Err(ApiError::NotFound("comment not found"));
        }
        Ok(())
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
