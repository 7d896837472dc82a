//! Resume aggregation: header plus the five section collections, assembled
//! into the single document the editor and preview consume.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::models::section::{
    AboutInfoRow, CertificationRow, EducationRow, ExperienceRow, ProjectRow,
};
use crate::store::ResumeRepository;

/// Denormalised resume. Header columns are flattened to the top level; list
/// sections are always arrays (possibly empty), `about` is the single active
/// row or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeDocument {
    #[serde(flatten)]
    pub header: ResumeRow,
    pub about: Option<AboutInfoRow>,
    pub education: Vec<EducationRow>,
    pub experience: Vec<ExperienceRow>,
    pub projects: Vec<ProjectRow>,
    pub certifications: Vec<CertificationRow>,
}

/// Loads the header, then the five active-section collections concurrently.
///
/// The header lookup does not filter on `is_deleted`; the flag is carried in
/// the document. Any failing fetch aborts the whole aggregation.
pub async fn get_complete_resume(
    repo: &dyn ResumeRepository,
    resume_id: i64,
) -> Result<ResumeDocument, AppError> {
    let header = repo
        .find_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))?;

    let (about, education, experience, projects, certifications) = tokio::try_join!(
        repo.fetch_about(resume_id),
        repo.fetch_education(resume_id),
        repo.fetch_experience(resume_id),
        repo.fetch_projects(resume_id),
        repo.fetch_certifications(resume_id),
    )?;

    debug!(
        "Aggregated resume {resume_id}: {} education, {} experience, {} projects, {} certifications",
        education.len(),
        experience.len(),
        projects.len(),
        certifications.len()
    );

    Ok(ResumeDocument {
        header,
        about,
        education,
        experience,
        projects,
        certifications,
    })
}
