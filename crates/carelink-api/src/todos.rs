use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};

use carelink_db::models::{NewTodo, TodoChanges, TodoFilter};
use carelink_types::api::{CreateTodoRequest, TodoQuery, UpdateTodoRequest};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery};

fn parse_due_date(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| ApiError::bad_request("invalid dueDate; must be RFC3339"))
}

fn parse_completed(raw: &str) -> Result<bool, ApiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ApiError::bad_request("completed must be 'true' or 'false'")),
    }
}

pub async fn create_todo(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CreateTodoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }
    let due_date = parse_due_date(&req.due_date)?;

    let todo = blocking(&state, move |db| {
        if !db.recipient_exists(req.recipient_id)? {
            return Err(ApiError::bad_request("recipient not found"));
        }
        if !db.caregiver_exists(req.caregiver_id)? {
            return Err(ApiError::bad_request("caregiver not found"));
        }
        Ok(db.insert_todo(&NewTodo {
            title: req.title.trim(),
            description: &req.description,
            due_date,
            recipient_id: req.recipient_id,
            caregiver_id: req.caregiver_id,
            priority: req.priority,
        })?)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(todo)))
}

/// GET /todos: every filter is optional; ordered by due date.
pub async fn list_todos(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<TodoQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = TodoFilter {
        recipient_id: query.recipient_id,
        caregiver_id: query.caregiver_id,
        priority: query
            .priority
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(str::parse)
            .transpose()?,
        completed: query
            .completed
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .map(parse_completed)
            .transpose()?,
    };

    let todos = blocking(&state, move |db| Ok(db.list_todos(&filter)?)).await?;
    Ok(Json(todos))
}

pub async fn get_todo(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let todo = blocking(&state, move |db| {
        db.get_todo(id)?.ok_or(ApiError::NotFound("todo not found"))
    })
    .await?;
    Ok(Json(todo))
}

pub async fn update_todo(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(req): ApiJson<UpdateTodoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    let due_date = req.due_date.as_deref().map(parse_due_date).transpose()?;

    let todo = blocking(&state, move |db| {
        let changes = TodoChanges {
            title: req.title.as_deref().map(str::trim),
            description: req.description.as_deref(),
            due_date,
            completed: req.completed,
            priority: req.priority,
        };
        db.update_todo(id, &changes)?
            .ok_or(ApiError::NotFound("todo not found"))
    })
    .await?;
    Ok(Json(todo))
}

pub async fn delete_todo(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    let deleted = blocking(&state, move |db| Ok(db.delete_todo(id)?)).await?;
    if !deleted {
        return Err(ApiError::NotFound("todo not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}
