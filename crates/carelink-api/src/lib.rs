pub mod auth;
pub mod care_requests;
pub mod caregivers;
pub mod comments;
pub mod error;
pub mod extract;
pub mod journal;
pub mod middleware;
pub mod recipients;
pub mod todos;
pub mod uploads;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{get, patch, post, put},
};
use tower_http::services::ServeDir;
use tracing::error;

use carelink_db::Database;

pub use auth::{AppState, AppStateInner};
pub use error::ApiError;

/// Build the full HTTP surface. CORS and tracing layers are added by the binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .with_state(state.clone());

    let protected_routes = Router::new()
        // Care requests and links
        .route("/requests", post(care_requests::submit_request))
        .route("/requests/{id}", patch(care_requests::respond_to_request))
        .route("/recipients/{id}/requests", get(care_requests::list_recipient_requests))
        .route("/care-relationships", post(care_requests::create_link))
        // Recipients
        .route("/recipients", get(recipients::list_recipients))
        .route(
            "/recipients/{id}",
            get(recipients::get_recipient).put(recipients::update_recipient),
        )
        .route("/recipients/user/{user_id}", get(recipients::get_recipient_by_user))
        .route("/caregivers/{id}/recipients", get(recipients::list_recipients_for_caregiver))
        // Caregivers
        .route("/caregivers", get(caregivers::list_caregivers))
        .route("/caregivers/{id}", put(caregivers::update_caregiver_name))
        .route("/caregivers/user/{user_id}", get(caregivers::get_caregiver_by_user))
        .route("/recipients/{id}/caregivers", get(caregivers::list_caregivers_for_recipient))
        // Journal
        .route("/journal-entries", post(journal::create_entry).get(journal::list_entries))
        .route("/journal-entries/accepted", get(journal::list_accepted_entries))
        .route(
            "/journal-entries/{id}",
            put(journal::update_entry).delete(journal::delete_entry),
        )
        .route(
            "/audio",
            post(uploads::upload_audio).layer(DefaultBodyLimit::max(uploads::MAX_AUDIO_SIZE)),
        )
        // Comments
        .route("/comments", post(comments::create_comment).get(comments::list_comments))
        .route(
            "/comments/{id}",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        // Todos
        .route("/todos", post(todos::create_todo).get(todos::list_todos))
        .route(
            "/todos/{id}",
            get(todos::get_todo).put(todos::update_todo).delete(todos::delete_todo),
        )
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth))
        .with_state(state.clone());

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .nest_service("/uploads", ServeDir::new(&state.upload_dir))
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
}
