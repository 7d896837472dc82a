pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::auth::handlers as auth;
use crate::profile::handlers as profile;
use crate::resume::handlers as resume;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Accounts
        .route("/api/auth/signup", post(auth::handle_signup))
        .route("/api/auth/login", post(auth::handle_login))
        .route("/api/auth/logout", post(auth::handle_logout))
        .route(
            "/api/profile/:user_id",
            get(profile::handle_get_profile).put(profile::handle_update_profile),
        )
        // Resume lifecycle
        .route("/api/resume/create", post(resume::handle_create_resume))
        .route("/api/resume/:user_id", get(resume::handle_list_resumes))
        .route("/api/resume/open/:resume_id", get(resume::handle_open_resume))
        .route(
            "/api/resume/data/:resume_id",
            get(resume::handle_get_resume_data).put(resume::handle_save_resume_data),
        )
        .route(
            "/api/resume/form/:resume_id",
            get(resume::handle_get_resume_form),
        )
        .route(
            "/api/resume/duplicate/:resume_id",
            post(resume::handle_duplicate_resume),
        )
        .route(
            "/api/resume/delete/:resume_id",
            post(resume::handle_delete_resume),
        )
        .route(
            "/api/resume/download/:resume_id",
            get(resume::handle_download_resume),
        )
        // Dashboard
        .route("/api/dashboard/:user_id", get(resume::handle_list_resumes))
        .route(
            "/api/dashboard/search/:user_id/:title",
            get(resume::handle_search_resumes),
        )
        // Per-section form endpoints
        .route("/api/form/clear-education", post(resume::handle_clear_education))
        .route("/api/form/clear-experience", post(resume::handle_clear_experience))
        .route("/api/form/clear-projects", post(resume::handle_clear_projects))
        .route(
            "/api/form/clear-certifications",
            post(resume::handle_clear_certifications),
        )
        .route("/api/form/about", post(resume::handle_save_about))
        .route("/api/form/education", post(resume::handle_add_education))
        .route("/api/form/experience", post(resume::handle_add_experience))
        .route("/api/form/projects", post(resume::handle_add_project))
        .route(
            "/api/form/certifications",
            post(resume::handle_add_certification),
        )
        .with_state(state)
}
