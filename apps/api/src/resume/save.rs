//! Resume save workflow.
//!
//! Flow: validate + normalise the whole form → open one `SectionWriter` →
//!       lock header → clear the four list sections → upsert About →
//!       insert education, experience, projects, certifications → commit.
//!
//! List sections are replaced wholesale (clear, then fresh inserts); About is
//! updated in place. Everything runs in one unit of work, so a failure at any
//! step leaves the previously saved resume untouched.

use std::collections::HashMap;

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::resume::ResumeRow;
use crate::models::section::{
    ListSection, NewCertification, NewEducation, NewExperience, NewProject,
};
use crate::resume::form::{
    CertificationForm, EducationForm, ExperienceForm, FormDocument, ProjectForm,
};
use crate::store::{ResumeRepository, SectionWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AboutOutcome {
    Skipped,
    Updated,
    Inserted,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SectionCounts {
    pub cleared: u64,
    pub inserted: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SaveReport {
    pub resume_id: i64,
    pub renamed: bool,
    pub about: AboutOutcome,
    pub education: SectionCounts,
    pub experience: SectionCounts,
    pub projects: SectionCounts,
    pub certifications: SectionCounts,
}

impl SaveReport {
    fn counts_mut(&mut self, section: ListSection) -> &mut SectionCounts {
        match section {
            ListSection::Education => &mut self.education,
            ListSection::Experience => &mut self.experience,
            ListSection::Projects => &mut self.projects,
            ListSection::Certifications => &mut self.certifications,
        }
    }
}

/// The form after validation: blank rows dropped, fields normalised.
#[derive(Debug, Default)]
struct PreparedForm {
    education: Vec<NewEducation>,
    experience: Vec<NewExperience>,
    projects: Vec<NewProject>,
    certifications: Vec<NewCertification>,
    skipped: HashMap<ListSection, usize>,
}

impl PreparedForm {
    fn skipped(&self, section: ListSection) -> usize {
        self.skipped.get(&section).copied().unwrap_or(0)
    }
}

/// Normalises the non-blank entries of one list section, counting blanks.
fn prepare_section<F, N>(
    entries: &[F],
    section: ListSection,
    is_blank: impl Fn(&F) -> bool,
    normalize: impl Fn(&F) -> Result<N, AppError>,
    skipped: &mut HashMap<ListSection, usize>,
) -> Result<Vec<N>, AppError> {
    let mut prepared = Vec::with_capacity(entries.len());
    for entry in entries {
        if is_blank(entry) {
            *skipped.entry(section).or_default() += 1;
        } else {
            prepared.push(normalize(entry)?);
        }
    }
    Ok(prepared)
}

fn prepare(form: &FormDocument) -> Result<PreparedForm, AppError> {
    let mut skipped = HashMap::new();
    Ok(PreparedForm {
        education: prepare_section(
            &form.education,
            ListSection::Education,
            EducationForm::is_blank,
            EducationForm::normalize,
            &mut skipped,
        )?,
        experience: prepare_section(
            &form.experience,
            ListSection::Experience,
            ExperienceForm::is_blank,
            ExperienceForm::normalize,
            &mut skipped,
        )?,
        projects: prepare_section(
            &form.projects,
            ListSection::Projects,
            ProjectForm::is_blank,
            ProjectForm::normalize,
            &mut skipped,
        )?,
        certifications: prepare_section(
            &form.certifications,
            ListSection::Certifications,
            CertificationForm::is_blank,
            CertificationForm::normalize,
            &mut skipped,
        )?,
        skipped,
    })
}

/// Soft-deletes every active row of one list section.
pub async fn clear_list_section(
    writer: &mut dyn SectionWriter,
    resume_id: i64,
    section: ListSection,
) -> Result<u64, AppError> {
    Ok(writer.clear_section(resume_id, section).await?)
}

/// About is singular: blank text is ignored, an active row is updated in
/// place, otherwise a new row is inserted.
pub async fn upsert_about(
    writer: &mut dyn SectionWriter,
    resume_id: i64,
    about_text: &str,
) -> Result<AboutOutcome, AppError> {
    if about_text.trim().is_empty() {
        return Ok(AboutOutcome::Skipped);
    }
    match writer.active_about(resume_id).await? {
        Some(existing) => {
            writer.update_about(existing.about_id, about_text).await?;
            Ok(AboutOutcome::Updated)
        }
        None => {
            writer.insert_about(resume_id, about_text).await?;
            Ok(AboutOutcome::Inserted)
        }
    }
}

/// Locks the header inside `writer`, failing with NotFound if it is absent.
pub async fn lock_existing_resume(
    writer: &mut dyn SectionWriter,
    resume_id: i64,
) -> Result<ResumeRow, AppError> {
    writer
        .lock_resume(resume_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Resume {resume_id} not found")))
}

/// Replaces all section data of one resume with the contents of `form`.
///
/// Ownership of `resume_id` is the caller's responsibility. Validation errors
/// are raised before the store is touched; store errors roll back every step.
pub async fn save_resume(
    repo: &dyn ResumeRepository,
    resume_id: i64,
    form: &FormDocument,
) -> Result<SaveReport, AppError> {
    let prepared = prepare(form)?;

    let mut writer = repo.begin_write().await?;
    let header = lock_existing_resume(writer.as_mut(), resume_id).await?;

    let mut report = SaveReport {
        resume_id,
        renamed: false,
        about: AboutOutcome::Skipped,
        education: SectionCounts::default(),
        experience: SectionCounts::default(),
        projects: SectionCounts::default(),
        certifications: SectionCounts::default(),
    };

    let title = form.title.trim();
    if !title.is_empty() && title != header.title {
        writer.rename_resume(resume_id, title).await?;
        report.renamed = true;
    }

    for section in ListSection::ALL {
        let cleared = clear_list_section(writer.as_mut(), resume_id, section).await?;
        let counts = report.counts_mut(section);
        counts.cleared = cleared;
        counts.skipped = prepared.skipped(section);
    }

    report.about = upsert_about(writer.as_mut(), resume_id, &form.about_text).await?;

    for entry in &prepared.education {
        writer.insert_education(resume_id, entry).await?;
    }
    report.education.inserted = prepared.education.len();

    for entry in &prepared.experience {
        writer.insert_experience(resume_id, entry).await?;
    }
    report.experience.inserted = prepared.experience.len();

    for entry in &prepared.projects {
        writer.insert_project(resume_id, entry).await?;
    }
    report.projects.inserted = prepared.projects.len();

    for entry in &prepared.certifications {
        writer.insert_certification(resume_id, entry).await?;
    }
    report.certifications.inserted = prepared.certifications.len();

    writer.commit().await.map_err(|e| {
        warn!("Commit failed for resume {resume_id}: {e}");
        AppError::from(e)
    })?;

    info!(
        "Saved resume {resume_id}: about={:?}, education {}/{}, experience {}/{}, projects {}/{}, certifications {}/{} (inserted/cleared)",
        report.about,
        report.education.inserted,
        report.education.cleared,
        report.experience.inserted,
        report.experience.cleared,
        report.projects.inserted,
        report.projects.cleared,
        report.certifications.inserted,
        report.certifications.cleared,
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::NewUser;
    use crate::resume::aggregate::get_complete_resume;
    use crate::resume::form::{CertificationForm, EducationForm, ExperienceForm, ProjectForm};
    use crate::store::{MemoryStore, UserRepository};

    async fn store_with_resume() -> (MemoryStore, i64) {
        let store = MemoryStore::new();
        let user = store
            .create_user(NewUser {
                username: "jdoe".to_string(),
                name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                password_hash: "hash".to_string(),
                phone_num: None,
                profile_pic: None,
            })
            .await
            .unwrap();
        let resume = store.create_resume(user.user_id, "SWE Resume").await.unwrap();
        (store, resume.resume_id)
    }

    fn education(institution: &str, degree: &str) -> EducationForm {
        EducationForm {
            institution_name: institution.to_string(),
            degree: degree.to_string(),
            ..Default::default()
        }
    }

    fn full_form() -> FormDocument {
        FormDocument {
            title: String::new(),
            about_text: "Backend engineer".to_string(),
            education: vec![education("XYZ U", "BSc")],
            experience: vec![ExperienceForm {
                job_title: "Engineer".to_string(),
                company_name: "Acme".to_string(),
                start_date_ex: "2021-01-04".to_string(),
                description: "Built things".to_string(),
                ..Default::default()
            }],
            projects: vec![ProjectForm {
                project_name: "Tracker".to_string(),
                tech_stack: "Rust".to_string(),
                ..Default::default()
            }],
            certifications: vec![CertificationForm {
                cert_name: "CKA".to_string(),
                issuer: "CNCF".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_empty_education_list_clears_section() {
        let (store, resume_id) = store_with_resume().await;
        save_resume(&store, resume_id, &full_form()).await.unwrap();

        let form = FormDocument {
            education: vec![],
            ..full_form()
        };
        let report = save_resume(&store, resume_id, &form).await.unwrap();

        assert_eq!(report.education.cleared, 1);
        assert_eq!(report.education.inserted, 0);
        assert!(store.fetch_education(resume_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_institution_without_degree_is_persisted() {
        let (store, resume_id) = store_with_resume().await;
        let form = FormDocument {
            education: vec![education("MIT", "")],
            ..Default::default()
        };
        save_resume(&store, resume_id, &form).await.unwrap();

        let rows = store.fetch_education(resume_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].institution_name.as_deref(), Some("MIT"));
        assert_eq!(rows[0].degree, None);
        assert_eq!(rows[0].grade_type, "percentage");
    }

    #[tokio::test]
    async fn test_blank_education_entry_is_skipped() {
        let (store, resume_id) = store_with_resume().await;
        let form = FormDocument {
            education: vec![education("", "")],
            ..Default::default()
        };
        let report = save_resume(&store, resume_id, &form).await.unwrap();

        assert_eq!(report.education.skipped, 1);
        assert!(store.fetch_education(resume_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_skip_rules_for_other_sections() {
        let (store, resume_id) = store_with_resume().await;
        let form = FormDocument {
            experience: vec![
                ExperienceForm {
                    description: "no title, no company".to_string(),
                    ..Default::default()
                },
                ExperienceForm {
                    company_name: "Acme".to_string(),
                    ..Default::default()
                },
            ],
            projects: vec![ProjectForm {
                tech_stack: "Rust".to_string(),
                ..Default::default()
            }],
            certifications: vec![CertificationForm {
                issuer: "AWS".to_string(),
                ..Default::default()
            }],
            ..Default::default()
        };
        let report = save_resume(&store, resume_id, &form).await.unwrap();

        assert_eq!(report.experience.inserted, 1);
        assert_eq!(report.experience.skipped, 1);
        assert_eq!(report.projects.skipped, 1);
        assert_eq!(report.certifications.skipped, 1);
        let experience = store.fetch_experience(resume_id).await.unwrap();
        assert_eq!(experience[0].company_name.as_deref(), Some("Acme"));
        assert_eq!(experience[0].job_title, None);
    }

    #[tokio::test]
    async fn test_saving_twice_is_idempotent() {
        let (store, resume_id) = store_with_resume().await;
        let form = full_form();

        save_resume(&store, resume_id, &form).await.unwrap();
        let first = get_complete_resume(&store, resume_id).await.unwrap();
        let report = save_resume(&store, resume_id, &form).await.unwrap();
        let second = get_complete_resume(&store, resume_id).await.unwrap();

        assert_eq!(report.about, AboutOutcome::Updated);
        assert_eq!(first.education.len(), second.education.len());
        assert_eq!(first.experience.len(), second.experience.len());
        assert_eq!(first.projects.len(), second.projects.len());
        assert_eq!(first.certifications.len(), second.certifications.len());
        assert_eq!(
            crate::resume::form::FormDocument::from_document(&first),
            crate::resume::form::FormDocument::from_document(&second)
        );
    }

    #[tokio::test]
    async fn test_about_upsert_keeps_single_row() {
        let (store, resume_id) = store_with_resume().await;
        let form = FormDocument {
            about_text: "Hello".to_string(),
            ..Default::default()
        };

        let first = save_resume(&store, resume_id, &form).await.unwrap();
        let second = save_resume(&store, resume_id, &form).await.unwrap();

        assert_eq!(first.about, AboutOutcome::Inserted);
        assert_eq!(second.about, AboutOutcome::Updated);
        let about = store.fetch_about(resume_id).await.unwrap().unwrap();
        assert_eq!(about.about_text, "Hello");

        let mut writer = store.begin_write().await.unwrap();
        let active = writer.active_about(resume_id).await.unwrap();
        assert_eq!(active.map(|a| a.about_id), Some(about.about_id));
    }

    #[tokio::test]
    async fn test_blank_about_is_skipped_and_keeps_existing_text() {
        let (store, resume_id) = store_with_resume().await;
        let with_about = FormDocument {
            about_text: "Hello".to_string(),
            ..Default::default()
        };
        save_resume(&store, resume_id, &with_about).await.unwrap();

        let blank = FormDocument {
            about_text: "   ".to_string(),
            ..Default::default()
        };
        let report = save_resume(&store, resume_id, &blank).await.unwrap();

        assert_eq!(report.about, AboutOutcome::Skipped);
        let about = store.fetch_about(resume_id).await.unwrap().unwrap();
        assert_eq!(about.about_text, "Hello");
    }

    #[tokio::test]
    async fn test_invalid_date_rejected_without_side_effects() {
        let (store, resume_id) = store_with_resume().await;
        save_resume(&store, resume_id, &full_form()).await.unwrap();

        let mut form = full_form();
        form.education = vec![EducationForm {
            institution_name: "Other U".to_string(),
            start_date_edu: "September".to_string(),
            ..Default::default()
        }];
        let err = save_resume(&store, resume_id, &form).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        let rows = store.fetch_education(resume_id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].institution_name.as_deref(), Some("XYZ U"));
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_earlier_clears() {
        let (store, resume_id) = store_with_resume().await;
        save_resume(&store, resume_id, &full_form()).await.unwrap();
        let before = get_complete_resume(&store, resume_id).await.unwrap();

        store
            .fail_inserts_into(Some(ListSection::Certifications))
            .await;
        let mut form = full_form();
        form.about_text = "Changed".to_string();
        form.experience.clear();
        let err = save_resume(&store, resume_id, &form).await.unwrap_err();
        store.fail_inserts_into(None).await;

        assert!(matches!(err, AppError::Database(_)));
        let after = get_complete_resume(&store, resume_id).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_unknown_resume_is_not_found() {
        let (store, _) = store_with_resume().await;
        let err = save_resume(&store, 999, &full_form()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_title_change_renames_resume() {
        let (store, resume_id) = store_with_resume().await;
        let form = FormDocument {
            title: "  Platform Resume ".to_string(),
            ..Default::default()
        };
        let report = save_resume(&store, resume_id, &form).await.unwrap();

        assert!(report.renamed);
        let header = store.find_resume(resume_id).await.unwrap().unwrap();
        assert_eq!(header.title, "Platform Resume");
    }

    #[tokio::test]
    async fn test_reloaded_form_saves_back_unchanged() {
        let (store, resume_id) = store_with_resume().await;
        save_resume(&store, resume_id, &full_form()).await.unwrap();
        let doc = get_complete_resume(&store, resume_id).await.unwrap();

        let form = FormDocument::from_document(&doc);
        save_resume(&store, resume_id, &form).await.unwrap();
        let reloaded = get_complete_resume(&store, resume_id).await.unwrap();

        assert_eq!(FormDocument::from_document(&reloaded), form);
        assert_eq!(reloaded.header.title, "SWE Resume");
    }

    #[tokio::test]
    async fn test_skip_counts_land_on_their_own_section() {
        let (store, resume_id) = store_with_resume().await;
        let form = FormDocument {
            education: vec![education("", ""), education("", ""), education("MIT", "")],
            experience: vec![],
            projects: vec![ProjectForm::default()],
            certifications: vec![CertificationForm::default(); 3],
            ..Default::default()
        };
        let report = save_resume(&store, resume_id, &form).await.unwrap();

        assert_eq!(report.education.skipped, 2);
        assert_eq!(report.education.inserted, 1);
        assert_eq!(report.experience.skipped, 0);
        assert_eq!(report.projects.skipped, 1);
        assert_eq!(report.certifications.skipped, 3);
    }

    #[tokio::test]
    async fn test_lock_existing_resume_returns_header() {
        let (store, resume_id) = store_with_resume().await;
        let mut writer = store.begin_write().await.unwrap();

        let header = lock_existing_resume(writer.as_mut(), resume_id).await.unwrap();
        assert_eq!(header.resume_id, resume_id);
        assert_eq!(header.title, "SWE Resume");

        let err = lock_existing_resume(writer.as_mut(), 999).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
