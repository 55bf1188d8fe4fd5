use std::io::ErrorKind;

use axum::{Json, body::Bytes, extract::State, http::StatusCode, response::IntoResponse};
use tokio::io::AsyncWriteExt;
use tracing::{error, info};

use carelink_types::api::UploadResponse;

use crate::auth::AppState;
use crate::error::ApiError;

/// 50 MB upload limit for recordings
pub const MAX_AUDIO_SIZE: usize = 50 * 1024 * 1024;

const NAME_ATTEMPTS: usize = 10;

/// POST /audio: accepts a raw recording body, stores it under the upload
/// directory with a random name and returns its public URL.
pub async fn upload_audio(
    State(state): State<AppState>,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::bad_request("audio body is empty"));
    }

    tokio::fs::create_dir_all(&state.upload_dir).await.map_err(|e| {
        error!("Failed to create upload directory: {}", e);
        ApiError::Internal(e.into())
    })?;

    for _ in 0..NAME_ATTEMPTS {
        let name = format!("{}.mp4", hex::encode(rand::random::<[u8; 8]>()));
        let path = state.upload_dir.join(&name);

        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                error!("Failed to create {}: {}", path.display(), e);
                return Err(ApiError::Internal(e.into()));
            }
        };

        // tokio's File finishes the last write in the background until flushed
        let written = match file.write_all(&bytes).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            error!("Failed to write {}: {}", path.display(), e);
            let _ = tokio::fs::remove_file(&path).await;
            return Err(ApiError::Internal(e.into()));
        }

        info!("Stored audio {} ({} bytes)", name, bytes.len());
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                url: format!("/uploads/{}", name),
            }),
        ));
    }

    Err(ApiError::Internal(anyhow::anyhow!(
        "no free upload name after {} attempts",
        NAME_ATTEMPTS
    )))
}
