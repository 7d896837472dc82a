use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::auth::{validation, AuthUser};
use crate::errors::{AppError, AppJson};
use crate::models::user::{ProfileUpdate, UserRow};
use crate::state::AppState;

/// Body of `PUT /api/profile/:user_id`. Omitted fields are left alone; an
/// empty `phone_num` or `profile_pic` clears the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_num: Option<String>,
    pub profile_pic: Option<String>,
}

impl UpdateProfileRequest {
    fn into_update(self) -> Result<ProfileUpdate, AppError> {
        Ok(ProfileUpdate {
            name: self
                .name
                .map(|n| validation::required("name", &n))
                .transpose()?,
            email: self.email.map(|e| validation::email(&e)).transpose()?,
            phone_num: self
                .phone_num
                .map(|p| validation::optional(Some(p.as_str()))),
            profile_pic: self
                .profile_pic
                .map(|p| validation::optional(Some(p.as_str()))),
        })
    }
}

/// GET /api/profile/:user_id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<UserRow>, AppError> {
    auth.ensure_self(user_id)?;
    let user = state
        .users
        .find_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;
    Ok(Json(user))
}

/// PUT /api/profile/:user_id
pub async fn handle_update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
    AppJson(req): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserRow>, AppError> {
    auth.ensure_self(user_id)?;
    let update = req.into_update()?;

    let user = state
        .users
        .update_profile(user_id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;

    info!("Updated profile of user {user_id}");
    Ok(Json(user))
}
