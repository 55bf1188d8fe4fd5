use std::path::PathBuf;
use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::info;

use carelink_db::Database;
use carelink_types::api::{AuthResponse, Claims, LoginRequest, SignupRequest};
use carelink_types::models::{User, UserRole};

use crate::blocking;
use crate::error::ApiError;
use crate::extract::ApiJson;

const TOKEN_TTL_DAYS: i64 = 7;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = normalize_username(&req.username);

    // Validate input
    if username.len() < 3 || username.len() > 32 {
        return Err(ApiError::bad_request("username must be 3 to 32 characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(ApiError::bad_request(
            "username may only contain letters, digits, '_', '.' and '-'",
        ));
    }
    if req.password.len() < 8 {
        return Err(ApiError::bad_request("password must be at least 8 characters"));
    }
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    // The profile object must match the role
    match req.role {
        UserRole::Caregiver => {
            if req.caregiver.is_none() {
                return Err(ApiError::bad_request(
                    "caregiver object is required when role is caregiver",
                ));
            }
            if req.recipient.is_some() {
                return Err(ApiError::bad_request(
                    "recipient object must not be provided when role is caregiver",
                ));
            }
        }
        UserRole::Recipient => {
            if req.recipient.is_none() {
                return Err(ApiError::bad_request(
                    "recipient object is required when role is recipient",
                ));
            }
            if req.caregiver.is_some() {
                return Err(ApiError::bad_request(
                    "caregiver object must not be provided when role is recipient",
                ));
            }
        }
    }

    let role = req.role;
    let password = req.password;
    let profile = req.recipient;
    let account_name = username.clone();
    let user: User = blocking(&state, move |db| {
        let password_hash = hash_password(&password)?;
        let (row, _) = db
            .create_account(&account_name, &name, &password_hash, role, profile.as_ref())?
            .ok_or_else(|| ApiError::Conflict("username already exists".into()))?;
        Ok(row.into())
    })
    .await?;

    info!("New {} account: {}", user.role.as_str(), user.username);

    let token = create_token(&state.jwt_secret, &user)?;
    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = normalize_username(&req.username);
    let password = req.password;

    let user: User = blocking(&state, move |db| {
        let row = db
            .get_user_by_username(&username)?
            .ok_or(ApiError::Unauthorized("invalid username or password"))?;

        // Verify password
        let parsed_hash = PasswordHash::new(&row.password)
            .map_err(|e| ApiError::Internal(anyhow::anyhow!("Stored hash unreadable: {}", e)))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .map_err(|_| ApiError::Unauthorized("invalid username or password"))?;

        Ok(row.into())
    })
    .await?;

    let token = create_token(&state.jwt_secret, &user)?;
    Ok(Json(AuthResponse { token, user }))
}

fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Hash with Argon2id and a fresh salt.
fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))
}

pub fn create_token(secret: &str, user: &User) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user.id,
        username: user.username.clone(),
        role: user.role,
        exp: (chrono::Utc::now() + chrono::Duration::days(TOKEN_TTL_DAYS)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| ApiError::Unauthorized("invalid or expired token"))
}
