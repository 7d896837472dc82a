use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::state::AppState;

/// The caller identified by a valid `Authorization: Bearer <token>` header.
/// Rejects with 401 so clients can tell "log in again" apart from 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub user_id: i64,
}

impl AuthUser {
    /// Path/body user ids must match the token subject.
    pub fn ensure_self(&self, user_id: i64) -> Result<(), AppError> {
        if self.user_id == user_id {
            Ok(())
        } else {
            Err(AppError::Forbidden)
        }
    }

    pub fn ensure_owner(&self, resume: &ResumeRow) -> Result<(), AppError> {
        self.ensure_self(resume.user_id)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                AppError::Unauthorized("Authorization header must be a bearer token".to_string())
            })?;

        let claims = state
            .jwt
            .verify(token)
            .map_err(|e| AppError::Unauthorized(e.to_string()))?;

        Ok(AuthUser {
            user_id: claims.sub,
        })
    }
}
