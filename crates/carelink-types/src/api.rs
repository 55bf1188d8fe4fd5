use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Mood, TodoPriority, User, UserRole};

// -- JWT Claims --

/// JWT claims issued at login/signup and checked by the auth middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub username: String,
    pub role: UserRole,
    pub exp: usize,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignupRequest {
    pub username: String,
    pub name: String,
    pub password: String,
    pub role: UserRole,
    pub caregiver: Option<CaregiverProfile>,
    pub recipient: Option<RecipientProfile>,
}

/// Caregivers carry no profile fields yet; the object marks the role.
#[derive(Debug, Default, Deserialize)]
pub struct CaregiverProfile {}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientProfile {
    pub age: Option<i64>,
    pub condition: Option<String>,
    pub likes: Option<String>,
    pub dislikes: Option<String>,
    pub phobias: Option<String>,
    pub pet_peeves: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

// -- Care requests --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCareRequest {
    pub caregiver_id: i64,
    pub recipient_id: i64,
}

/// Body of `PATCH /requests/{id}`. Kept as a string so an unknown decision is
/// reported as a validation error rather than a body rejection.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RespondRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CareRequestQuery {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateLinkRequest {
    pub caregiver_id: i64,
    pub recipient_id: i64,
}

// -- Recipients / caregivers --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientListQuery {
    pub caregiver_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateNameRequest {
    pub name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRecipientRequest {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub condition: Option<String>,
    pub likes: Option<String>,
    pub dislikes: Option<String>,
    pub phobias: Option<String>,
    pub pet_peeves: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateNameResponse {
    pub id: i64,
    pub name: String,
}

// -- Journal --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateJournalEntryRequest {
    pub recipient_id: i64,
    pub content: String,
    pub mood: Mood,
    pub audio_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateJournalEntryRequest {
    pub content: Option<String>,
    pub mood: Option<Mood>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalQuery {
    pub recipient_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedJournalQuery {
    pub caregiver_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

// -- Comments --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCommentRequest {
    pub journal_entry_id: Uuid,
    pub content: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentQuery {
    pub journal_entry_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateCommentRequest {
    pub content: Option<String>,
}

// -- Todos --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateTodoRequest {
    pub title: String,
    pub description: String,
    /// RFC 3339
    pub due_date: String,
    pub recipient_id: i64,
    pub caregiver_id: i64,
    pub priority: TodoPriority,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateTodoRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<TodoPriority>,
}

/// Filters are strings so bad values get a specific 400 message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoQuery {
    pub recipient_id: Option<i64>,
    pub caregiver_id: Option<i64>,
    pub priority: Option<String>,
    pub completed: Option<String>,
}
