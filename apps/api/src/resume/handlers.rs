use axum::{
    extract::{Path, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{validation, AuthUser};
use crate::errors::{AppError, AppJson};
use crate::models::resume::ResumeRow;
use crate::models::section::{
    ListSection, NewCertification, NewEducation, NewExperience, NewProject,
};
use crate::resume::aggregate::{get_complete_resume, ResumeDocument};
use crate::resume::form::{
    null_as_default, CertificationForm, EducationForm, ExperienceForm, FormDocument, ProjectForm,
};
use crate::resume::render::render_resume_markdown;
use crate::resume::save::{
    clear_list_section, lock_existing_resume, save_resume, upsert_about, AboutOutcome, SaveReport,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateResumeRequest {
    pub user_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
}

#[derive(Debug, Serialize)]
pub struct CreateResumeResponse {
    pub message: String,
    #[serde(rename = "resumeId")]
    pub resume_id: i64,
}

#[derive(Debug, Serialize)]
pub struct DuplicateResumeResponse {
    pub message: String,
    #[serde(rename = "newId")]
    pub new_id: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub cleared: u64,
}

#[derive(Debug, Deserialize)]
pub struct ResumeRef {
    pub resume_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct AboutRequest {
    pub resume_id: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub about_text: String,
}

/// One list-section entry addressed to a resume. Entry fields sit next to
/// `resume_id` at the top level of the body.
#[derive(Debug, Deserialize)]
pub struct SectionEntryRequest<T> {
    pub resume_id: i64,
    #[serde(flatten)]
    pub entry: T,
}

fn message(text: impl Into<String>) -> Json<MessageResponse> {
    Json(MessageResponse {
        message: text.into(),
    })
}

/// Loads the header and rejects resumes owned by someone else.
async fn owned_resume(
    state: &AppState,
    auth: AuthUser,
    resume_id: i64,
) -> Result<ResumeRow, AppError> {
    let resume = state
        .resumes
        .find_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    auth.ensure_owner(&resume)?;
    Ok(resume)
}

// ────────────────────────────────────────────────────────────────────────────
// Resume lifecycle
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/resume/create
pub async fn handle_create_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<CreateResumeRequest>,
) -> Result<(StatusCode, Json<CreateResumeResponse>), AppError> {
    auth.ensure_self(req.user_id)?;
    let title = validation::required("title", &req.title)?;

    let resume = state.resumes.create_resume(req.user_id, &title).await?;
    info!("User {} created resume {}", req.user_id, resume.resume_id);

    Ok((
        StatusCode::CREATED,
        Json(CreateResumeResponse {
            message: "Resume created".to_string(),
            resume_id: resume.resume_id,
        }),
    ))
}

/// GET /api/resume/:user_id and GET /api/dashboard/:user_id
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    auth.ensure_self(user_id)?;
    Ok(Json(state.resumes.list_active_resumes(user_id).await?))
}

/// GET /api/dashboard/search/:user_id/:title
pub async fn handle_search_resumes(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((user_id, title)): Path<(i64, String)>,
) -> Result<Json<Vec<ResumeRow>>, AppError> {
    auth.ensure_self(user_id)?;
    let fragment = title.trim();
    if fragment.is_empty() {
        return Ok(Json(state.resumes.list_active_resumes(user_id).await?));
    }
    Ok(Json(state.resumes.search_resumes(user_id, fragment).await?))
}

/// GET /api/resume/open/:resume_id
pub async fn handle_open_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(resume_id): Path<i64>,
) -> Result<Json<ResumeRow>, AppError> {
    Ok(Json(owned_resume(&state, auth, resume_id).await?))
}

/// POST /api/resume/duplicate/:resume_id
///
/// Copies the header only; the copy starts with empty sections.
pub async fn handle_duplicate_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(resume_id): Path<i64>,
) -> Result<(StatusCode, Json<DuplicateResumeResponse>), AppError> {
    owned_resume(&state, auth, resume_id).await?;

    let copy = state
        .resumes
        .duplicate_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;
    info!("Duplicated resume {resume_id} as {}", copy.resume_id);

    Ok((
        StatusCode::CREATED,
        Json(DuplicateResumeResponse {
            message: "Resume duplicated".to_string(),
            new_id: copy.resume_id,
        }),
    ))
}

/// POST /api/resume/delete/:resume_id
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(resume_id): Path<i64>,
) -> Result<Json<MessageResponse>, AppError> {
    owned_resume(&state, auth, resume_id).await?;

    if !state.resumes.soft_delete_resume(resume_id).await? {
        return Err(AppError::NotFound(format!("Resume {resume_id} not found")));
    }
    info!("Soft-deleted resume {resume_id}");
    Ok(message("Resume deleted"))
}

// ────────────────────────────────────────────────────────────────────────────
// Whole-document read / save / export
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/resume/data/:resume_id
pub async fn handle_get_resume_data(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(resume_id): Path<i64>,
) -> Result<Json<ResumeDocument>, AppError> {
    owned_resume(&state, auth, resume_id).await?;
    Ok(Json(
        get_complete_resume(state.resumes.as_ref(), resume_id).await?,
    ))
}

/// GET /api/resume/form/:resume_id
///
/// The stored document mapped into editor form state, ready to send back
/// through `PUT /api/resume/data/:resume_id`.
pub async fn handle_get_resume_form(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(resume_id): Path<i64>,
) -> Result<Json<FormDocument>, AppError> {
    owned_resume(&state, auth, resume_id).await?;
    let doc = get_complete_resume(state.resumes.as_ref(), resume_id).await?;
    Ok(Json(FormDocument::from_document(&doc)))
}

/// PUT /api/resume/data/:resume_id
pub async fn handle_save_resume_data(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(resume_id): Path<i64>,
    AppJson(form): AppJson<FormDocument>,
) -> Result<Json<SaveReport>, AppError> {
    owned_resume(&state, auth, resume_id).await?;
    Ok(Json(
        save_resume(state.resumes.as_ref(), resume_id, &form).await?,
    ))
}

/// GET /api/resume/download/:resume_id
pub async fn handle_download_resume(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(resume_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    owned_resume(&state, auth, resume_id).await?;
    let doc = get_complete_resume(state.resumes.as_ref(), resume_id).await?;

    let disposition = format!(
        "attachment; filename=\"{}.md\"",
        download_file_stem(&doc.header.title)
    );
    Ok((
        [
            (CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        render_resume_markdown(&doc),
    ))
}

/// ASCII-only file name derived from the resume title.
fn download_file_stem(title: &str) -> String {
    let stem: String = title
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if stem.trim_matches('_').is_empty() {
        "resume".to_string()
    } else {
        stem
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Per-section form endpoints
// ────────────────────────────────────────────────────────────────────────────

async fn clear_section(
    state: &AppState,
    auth: AuthUser,
    resume_id: i64,
    section: ListSection,
) -> Result<Json<ClearResponse>, AppError> {
    owned_resume(state, auth, resume_id).await?;

    let mut writer = state.resumes.begin_write().await?;
    lock_existing_resume(writer.as_mut(), resume_id).await?;
    let cleared = clear_list_section(writer.as_mut(), resume_id, section).await?;
    writer.commit().await?;

    info!("Cleared {cleared} {} rows of resume {resume_id}", section.table());
    Ok(Json(ClearResponse {
        message: format!("{} cleared", section.label()),
        cleared,
    }))
}

/// POST /api/form/clear-education
pub async fn handle_clear_education(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<ResumeRef>,
) -> Result<Json<ClearResponse>, AppError> {
    clear_section(&state, auth, req.resume_id, ListSection::Education).await
}

/// POST /api/form/clear-experience
pub async fn handle_clear_experience(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<ResumeRef>,
) -> Result<Json<ClearResponse>, AppError> {
    clear_section(&state, auth, req.resume_id, ListSection::Experience).await
}

/// POST /api/form/clear-projects
pub async fn handle_clear_projects(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<ResumeRef>,
) -> Result<Json<ClearResponse>, AppError> {
    clear_section(&state, auth, req.resume_id, ListSection::Projects).await
}

/// POST /api/form/clear-certifications
pub async fn handle_clear_certifications(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<ResumeRef>,
) -> Result<Json<ClearResponse>, AppError> {
    clear_section(&state, auth, req.resume_id, ListSection::Certifications).await
}

/// POST /api/form/about
///
/// 201 when a row was inserted, 200 when updated in place or skipped.
pub async fn handle_save_about(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<AboutRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    owned_resume(&state, auth, req.resume_id).await?;

    let mut writer = state.resumes.begin_write().await?;
    lock_existing_resume(writer.as_mut(), req.resume_id).await?;
    let outcome = upsert_about(writer.as_mut(), req.resume_id, &req.about_text).await?;
    writer.commit().await?;

    Ok(match outcome {
        AboutOutcome::Skipped => (StatusCode::OK, message("About text is empty, skipped")),
        AboutOutcome::Updated => (StatusCode::OK, message("About updated")),
        AboutOutcome::Inserted => (StatusCode::CREATED, message("About saved")),
    })
}

/// A validated list-section entry ready to insert.
enum SectionEntry {
    Education(NewEducation),
    Experience(NewExperience),
    Project(NewProject),
    Certification(NewCertification),
}

/// Inserts one entry in its own unit of work. `Ok(None)` means the entry was
/// blank and nothing is written. Ownership is checked before validation
/// errors surface.
async fn insert_entry(
    state: &AppState,
    auth: AuthUser,
    resume_id: i64,
    section: ListSection,
    entry: Result<Option<SectionEntry>, AppError>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    owned_resume(state, auth, resume_id).await?;

    let Some(entry) = entry? else {
        return Ok((
            StatusCode::OK,
            message(format!("{} entry is empty, skipped", section.label())),
        ));
    };

    let mut writer = state.resumes.begin_write().await?;
    lock_existing_resume(writer.as_mut(), resume_id).await?;
    let id = match &entry {
        SectionEntry::Education(e) => writer.insert_education(resume_id, e).await?,
        SectionEntry::Experience(e) => writer.insert_experience(resume_id, e).await?,
        SectionEntry::Project(e) => writer.insert_project(resume_id, e).await?,
        SectionEntry::Certification(e) => writer.insert_certification(resume_id, e).await?,
    };
    writer.commit().await?;

    info!("Inserted {} row {id} for resume {resume_id}", section.table());
    Ok((
        StatusCode::CREATED,
        message(format!("{} saved", section.label())),
    ))
}

/// POST /api/form/education
pub async fn handle_add_education(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<SectionEntryRequest<EducationForm>>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let entry = if req.entry.is_blank() {
        Ok(None)
    } else {
        req.entry.normalize().map(|e| Some(SectionEntry::Education(e)))
    };
    insert_entry(&state, auth, req.resume_id, ListSection::Education, entry).await
}

/// POST /api/form/experience
pub async fn handle_add_experience(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<SectionEntryRequest<ExperienceForm>>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let entry = if req.entry.is_blank() {
        Ok(None)
    } else {
        req.entry.normalize().map(|e| Some(SectionEntry::Experience(e)))
    };
    insert_entry(&state, auth, req.resume_id, ListSection::Experience, entry).await
}

/// POST /api/form/projects
pub async fn handle_add_project(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<SectionEntryRequest<ProjectForm>>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let entry = if req.entry.is_blank() {
        Ok(None)
    } else {
        req.entry.normalize().map(|e| Some(SectionEntry::Project(e)))
    };
    insert_entry(&state, auth, req.resume_id, ListSection::Projects, entry).await
}

/// POST /api/form/certifications
pub async fn handle_add_certification(
    State(state): State<AppState>,
    auth: AuthUser,
    AppJson(req): AppJson<SectionEntryRequest<CertificationForm>>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    let entry = if req.entry.is_blank() {
        Ok(None)
    } else {
        req.entry.normalize().map(|e| Some(SectionEntry::Certification(e)))
    };
    insert_entry(&state, auth, req.resume_id, ListSection::Certifications, entry).await
}
