use std::sync::Arc;

use crate::auth::{JwtService, PasswordHasher};
use crate::config::Config;
use crate::store::{ResumeRepository, UserRepository};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Resume headers and section tables. Postgres in production, in-memory
    /// when no `DATABASE_URL` is configured.
    pub resumes: Arc<dyn ResumeRepository>,
    pub users: Arc<dyn UserRepository>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub jwt: Arc<JwtService>,
    pub config: Config,
}
