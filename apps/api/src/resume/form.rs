//! The editor's in-memory document, exactly as the client sends it: every
//! field is a string and blank entries are allowed. Normalisation into
//! insert payloads happens here, before anything touches the store.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::AppError;
use crate::models::section::{
    GradeType, NewCertification, NewEducation, NewExperience, NewProject,
};
use crate::resume::aggregate::ResumeDocument;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// `null` reads as the field's default, so rows echoed back from the
/// aggregated document (where absent values are `null`) are accepted.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EducationForm {
    #[serde(deserialize_with = "null_as_default")]
    pub institution_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub degree: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_date_edu: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end_date_edu: String,
    #[serde(deserialize_with = "null_as_default")]
    pub grade_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub grade_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceForm {
    #[serde(deserialize_with = "null_as_default")]
    pub job_title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub company_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_date_ex: String,
    #[serde(deserialize_with = "null_as_default")]
    pub end_date_ex: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectForm {
    #[serde(deserialize_with = "null_as_default")]
    pub project_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tech_stack: String,
    #[serde(deserialize_with = "null_as_default")]
    pub proj_desc: String,
    #[serde(deserialize_with = "null_as_default")]
    pub proj_link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CertificationForm {
    #[serde(deserialize_with = "null_as_default")]
    pub cert_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub issuer: String,
}

/// Whole-resume form payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDocument {
    /// Renames the resume when non-blank.
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub about_text: String,
    #[serde(deserialize_with = "null_as_default")]
    pub education: Vec<EducationForm>,
    #[serde(deserialize_with = "null_as_default")]
    pub experience: Vec<ExperienceForm>,
    #[serde(deserialize_with = "null_as_default")]
    pub projects: Vec<ProjectForm>,
    #[serde(deserialize_with = "null_as_default")]
    pub certifications: Vec<CertificationForm>,
}

impl FormDocument {
    /// Editor state for a brand-new resume: one blank row per list section.
    pub fn blank(title: &str) -> Self {
        Self {
            title: title.to_string(),
            about_text: String::new(),
            education: vec![EducationForm::default()],
            experience: vec![ExperienceForm::default()],
            projects: vec![ProjectForm::default()],
            certifications: vec![CertificationForm::default()],
        }
    }

    /// Populates the editor from a stored document. Empty lists get one blank
    /// placeholder row so the editor always shows an input group; blank rows
    /// are skipped again on save.
    pub fn from_document(doc: &ResumeDocument) -> Self {
        let mut form = Self::blank(&doc.header.title);
        form.about_text = doc
            .about
            .as_ref()
            .map(|a| a.about_text.clone())
            .unwrap_or_default();

        if !doc.education.is_empty() {
            form.education = doc
                .education
                .iter()
                .map(|e| EducationForm {
                    institution_name: text(&e.institution_name),
                    degree: text(&e.degree),
                    start_date_edu: date(e.start_date_edu),
                    end_date_edu: date(e.end_date_edu),
                    grade_type: e.grade_type.clone(),
                    grade_value: text(&e.grade_value),
                })
                .collect();
        }
        if !doc.experience.is_empty() {
            form.experience = doc
                .experience
                .iter()
                .map(|e| ExperienceForm {
                    job_title: text(&e.job_title),
                    company_name: text(&e.company_name),
                    start_date_ex: date(e.start_date_ex),
                    end_date_ex: date(e.end_date_ex),
                    description: text(&e.description),
                })
                .collect();
        }
        if !doc.projects.is_empty() {
            form.projects = doc
                .projects
                .iter()
                .map(|p| ProjectForm {
                    project_name: p.project_name.clone(),
                    tech_stack: text(&p.tech_stack),
                    proj_desc: text(&p.proj_desc),
                    proj_link: text(&p.proj_link),
                })
                .collect();
        }
        if !doc.certifications.is_empty() {
            form.certifications = doc
                .certifications
                .iter()
                .map(|c| CertificationForm {
                    cert_name: c.cert_name.clone(),
                    issuer: text(&c.issuer),
                })
                .collect();
        }
        form
    }
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn date(value: Option<NaiveDate>) -> String {
    value
        .map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_default()
}

// ────────────────────────────────────────────────────────────────────────────
// Normalisation
// ────────────────────────────────────────────────────────────────────────────

/// Blank or whitespace-only → `None`, otherwise the trimmed value.
pub fn optional_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Blank → `None`; `YYYY-MM-DD` → date; anything else is rejected.
pub fn optional_date(field: &str, raw: &str) -> Result<Option<NaiveDate>, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(Some)
        .map_err(|_| AppError::Validation(format!("{field} must be a YYYY-MM-DD date, got '{trimmed}'")))
}

fn check_date_order(
    start_field: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), AppError> {
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(AppError::Validation(format!(
                "{start_field} must not be after the end date"
            )));
        }
    }
    Ok(())
}

impl EducationForm {
    /// Skip rule: both institution and degree blank.
    pub fn is_blank(&self) -> bool {
        self.institution_name.trim().is_empty() && self.degree.trim().is_empty()
    }

    pub fn normalize(&self) -> Result<NewEducation, AppError> {
        let start_date_edu = optional_date("start_date_edu", &self.start_date_edu)?;
        let end_date_edu = optional_date("end_date_edu", &self.end_date_edu)?;
        check_date_order("start_date_edu", start_date_edu, end_date_edu)?;
        let grade_type = if self.grade_type.trim().is_empty() {
            GradeType::default()
        } else {
            GradeType::parse(&self.grade_type).ok_or_else(|| {
                AppError::Validation(format!(
                    "grade_type must be one of percentage, cgpa, gpa, grade; got '{}'",
                    self.grade_type.trim()
                ))
            })?
        };
        Ok(NewEducation {
            institution_name: optional_text(&self.institution_name),
            degree: optional_text(&self.degree),
            start_date_edu,
            end_date_edu,
            grade_type,
            grade_value: optional_text(&self.grade_value),
        })
    }
}

impl ExperienceForm {
    /// Skip rule: both job title and company blank.
    pub fn is_blank(&self) -> bool {
        self.job_title.trim().is_empty() && self.company_name.trim().is_empty()
    }

    pub fn normalize(&self) -> Result<NewExperience, AppError> {
        let start_date_ex = optional_date("start_date_ex", &self.start_date_ex)?;
        let end_date_ex = optional_date("end_date_ex", &self.end_date_ex)?;
        check_date_order("start_date_ex", start_date_ex, end_date_ex)?;
        Ok(NewExperience {
            job_title: optional_text(&self.job_title),
            company_name: optional_text(&self.company_name),
            start_date_ex,
            end_date_ex,
            description: optional_text(&self.description),
        })
    }
}

impl ProjectForm {
    pub fn is_blank(&self) -> bool {
        self.project_name.trim().is_empty()
    }

    /// Callers check `is_blank` first; a blank name is rejected here.
    pub fn normalize(&self) -> Result<NewProject, AppError> {
        let project_name = optional_text(&self.project_name)
            .ok_or_else(|| AppError::Validation("project_name cannot be empty".to_string()))?;
        Ok(NewProject {
            project_name,
            tech_stack: optional_text(&self.tech_stack),
            proj_desc: optional_text(&self.proj_desc),
            proj_link: optional_text(&self.proj_link),
        })
    }
}

impl CertificationForm {
    pub fn is_blank(&self) -> bool {
        self.cert_name.trim().is_empty()
    }

    pub fn normalize(&self) -> Result<NewCertification, AppError> {
        let cert_name = optional_text(&self.cert_name)
            .ok_or_else(|| AppError::Validation("cert_name cannot be empty".to_string()))?;
        Ok(NewCertification {
            cert_name,
            issuer: optional_text(&self.issuer),
        })
    }
}
