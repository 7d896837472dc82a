//! Axum route handlers for signup, login and logout.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::validation;
use crate::errors::{AppError, AppJson};
use crate::models::user::{NewUser, UserRow};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub phone_num: Option<String>,
    #[serde(default)]
    pub profile_pic: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub message: String,
    #[serde(rename = "userId")]
    pub user_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserRow,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// POST /api/auth/signup
pub async fn handle_signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), AppError> {
    let username = validation::required("username", &req.username)?;
    let name = validation::required("name", &req.name)?;
    let email = validation::email(&req.email)?;
    validation::password(&req.password)?;

    let password_hash = state
        .hasher
        .hash_password(&req.password)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

    let user = state
        .users
        .create_user(NewUser {
            username,
            name,
            email,
            password_hash,
            phone_num: validation::optional(req.phone_num.as_deref()),
            profile_pic: validation::optional(req.profile_pic.as_deref()),
        })
        .await?;

    info!("User {} signed up as '{}'", user.user_id, user.username);
    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            message: "User created".to_string(),
            user_id: user.user_id,
        }),
    ))
}

/// POST /api/auth/login
///
/// Unknown email and wrong password produce the same 401.
pub async fn handle_login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let invalid = || AppError::Unauthorized("Invalid credentials".to_string());

    let email = validation::email(&req.email)?;
    let user = state
        .users
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    let matches = state
        .hasher
        .verify_password(&req.password, &user.password_hash)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
    if !matches {
        warn!("Failed login for user {}", user.user_id);
        return Err(invalid());
    }

    let token = state
        .jwt
        .issue(user.user_id)
        .map_err(|e| AppError::Internal(e.into()))?;

    info!("User {} logged in", user.user_id);
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user,
    }))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; the client drops its copy.
pub async fn handle_logout() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "Logout successful".to_string(),
    })
}
