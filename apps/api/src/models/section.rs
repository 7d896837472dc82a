use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ────────────────────────────────────────────────────────────────────────────
// Persisted rows (one table per section, all soft-deletable)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AboutInfoRow {
    pub about_id: i64,
    pub resume_id: i64,
    pub about_text: String,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct EducationRow {
    pub education_id: i64,
    pub resume_id: i64,
    pub institution_name: Option<String>,
    pub degree: Option<String>,
    pub start_date_edu: Option<NaiveDate>,
    pub end_date_edu: Option<NaiveDate>,
    pub grade_type: String,
    pub grade_value: Option<String>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ExperienceRow {
    pub experience_id: i64,
    pub resume_id: i64,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub start_date_ex: Option<NaiveDate>,
    pub end_date_ex: Option<NaiveDate>,
    pub description: Option<String>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ProjectRow {
    pub project_id: i64,
    pub resume_id: i64,
    pub project_name: String,
    pub tech_stack: Option<String>,
    pub proj_desc: Option<String>,
    pub proj_link: Option<String>,
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CertificationRow {
    pub cert_id: i64,
    pub resume_id: i64,
    pub cert_name: String,
    pub issuer: Option<String>,
    pub is_deleted: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Normalised insert payloads (blank strings already mapped to None)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradeType {
    #[default]
    Percentage,
    Cgpa,
    Gpa,
    Grade,
}

impl GradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeType::Percentage => "percentage",
            GradeType::Cgpa => "cgpa",
            GradeType::Gpa => "gpa",
            GradeType::Grade => "grade",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "percentage" => Some(GradeType::Percentage),
            "cgpa" => Some(GradeType::Cgpa),
            "gpa" => Some(GradeType::Gpa),
            "grade" => Some(GradeType::Grade),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewEducation {
    pub institution_name: Option<String>,
    pub degree: Option<String>,
    pub start_date_edu: Option<NaiveDate>,
    pub end_date_edu: Option<NaiveDate>,
    pub grade_type: GradeType,
    pub grade_value: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewExperience {
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub start_date_ex: Option<NaiveDate>,
    pub end_date_ex: Option<NaiveDate>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProject {
    pub project_name: String,
    pub tech_stack: Option<String>,
    pub proj_desc: Option<String>,
    pub proj_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCertification {
    pub cert_name: String,
    pub issuer: Option<String>,
}

/// The four multi-valued sections. About is singular and handled by upsert,
/// so it has no "clear" operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListSection {
    Education,
    Experience,
    Projects,
    Certifications,
}

impl ListSection {
    /// Clear order used by the save workflow.
    pub const ALL: [ListSection; 4] = [
        ListSection::Education,
        ListSection::Experience,
        ListSection::Projects,
        ListSection::Certifications,
    ];

    pub fn table(&self) -> &'static str {
        match self {
            ListSection::Education => "education",
            ListSection::Experience => "experience",
            ListSection::Projects => "projects",
            ListSection::Certifications => "certifications",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ListSection::Education => "Education",
            ListSection::Experience => "Experience",
            ListSection::Projects => "Projects",
            ListSection::Certifications => "Certifications",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_type_parse_is_case_insensitive() {
        assert_eq!(GradeType::parse(" CGPA "), Some(GradeType::Cgpa));
        assert_eq!(GradeType::parse("Percentage"), Some(GradeType::Percentage));
        assert_eq!(GradeType::parse("stars"), None);
    }

    #[test]
    fn test_grade_type_defaults_to_percentage() {
        assert_eq!(GradeType::default().as_str(), "percentage");
    }

    #[test]
    fn test_list_sections_clear_in_form_order() {
        let tables: Vec<_> = ListSection::ALL.iter().map(|s| s.table()).collect();
        assert_eq!(
            tables,
            vec!["education", "experience", "projects", "certifications"]
        );
    }
}
