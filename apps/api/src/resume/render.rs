use chrono::NaiveDate;

use crate::resume::aggregate::ResumeDocument;

/// Renders a resume document as print-ready markdown. Sections without
/// entries are omitted entirely.
pub fn render_resume_markdown(doc: &ResumeDocument) -> String {
    let mut md = format!("# {}\n\n", doc.header.title);

    if let Some(about) = &doc.about {
        md.push_str("## About\n\n");
        md.push_str(about.about_text.trim());
        md.push_str("\n\n");
    }

    if !doc.experience.is_empty() {
        md.push_str("## Experience\n\n");
        for exp in &doc.experience {
            let heading = join_present(&[exp.job_title.as_deref(), exp.company_name.as_deref()], " — ");
            md.push_str(&format!("### {heading}\n"));
            if let Some(range) = date_range(exp.start_date_ex, exp.end_date_ex) {
                md.push_str(&format!("*{range}*\n"));
            }
            if let Some(description) = &exp.description {
                md.push('\n');
                md.push_str(description.trim());
                md.push('\n');
            }
            md.push('\n');
        }
    }

    if !doc.education.is_empty() {
        md.push_str("## Education\n\n");
        for edu in &doc.education {
            let heading = join_present(&[edu.degree.as_deref(), edu.institution_name.as_deref()], ", ");
            md.push_str(&format!("### {heading}\n"));
            if let Some(range) = date_range(edu.start_date_edu, edu.end_date_edu) {
                md.push_str(&format!("*{range}*\n"));
            }
            if let Some(grade) = &edu.grade_value {
                md.push_str(&format!("- **{}:** {grade}\n", grade_label(&edu.grade_type)));
            }
            md.push('\n');
        }
    }

    if !doc.projects.is_empty() {
        md.push_str("## Projects\n\n");
        for proj in &doc.projects {
            md.push_str(&format!("### {}\n", proj.project_name));
            if let Some(stack) = &proj.tech_stack {
                md.push_str(&format!("- **Tech:** {stack}\n"));
            }
            if let Some(link) = &proj.proj_link {
                md.push_str(&format!("- **Link:** {link}\n"));
            }
            if let Some(desc) = &proj.proj_desc {
                md.push('\n');
                md.push_str(desc.trim());
                md.push('\n');
            }
            md.push('\n');
        }
    }

    if !doc.certifications.is_empty() {
        md.push_str("## Certifications\n\n");
        for cert in &doc.certifications {
            match &cert.issuer {
                Some(issuer) => md.push_str(&format!("- {} ({issuer})\n", cert.cert_name)),
                None => md.push_str(&format!("- {}\n", cert.cert_name)),
            }
        }
        md.push('\n');
    }

    md
}

fn join_present(parts: &[Option<&str>], sep: &str) -> String {
    parts.iter().flatten().copied().collect::<Vec<_>>().join(sep)
}

fn date_range(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Option<String> {
    let fmt = |d: NaiveDate| d.format("%b %Y").to_string();
    match (start, end) {
        (Some(s), Some(e)) => Some(format!("{} – {}", fmt(s), fmt(e))),
        (Some(s), None) => Some(format!("{} – Present", fmt(s))),
        (None, Some(e)) => Some(fmt(e)),
        (None, None) => None,
    }
}

fn grade_label(grade_type: &str) -> &'static str {
    match grade_type {
        "cgpa" => "CGPA",
        "gpa" => "GPA",
        "grade" => "Grade",
        _ => "Percentage",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::ResumeRow;
    use crate::models::section::{AboutInfoRow, CertificationRow, ExperienceRow};
    use chrono::Utc;

    fn doc() -> ResumeDocument {
        ResumeDocument {
            header: ResumeRow {
                resume_id: 1,
                user_id: 1,
                title: "SWE Resume".to_string(),
                is_deleted: false,
                created_at: Utc::now(),
            },
            about: None,
            education: vec![],
            experience: vec![],
            projects: vec![],
            certifications: vec![],
        }
    }

    #[test]
    fn test_empty_document_renders_title_only() {
        assert_eq!(render_resume_markdown(&doc()), "# SWE Resume\n\n");
    }

    #[test]
    fn test_experience_with_open_end_date_reads_present() {
        let mut d = doc();
        d.experience.push(ExperienceRow {
            experience_id: 2,
            resume_id: 1,
            job_title: Some("Engineer".to_string()),
            company_name: Some("Acme".to_string()),
            start_date_ex: NaiveDate::from_ymd_opt(2021, 3, 1),
            end_date_ex: None,
            description: None,
            is_deleted: false,
        });

        let md = render_resume_markdown(&d);
        assert!(md.contains("## Experience"));
        assert!(md.contains("### Engineer — Acme"));
        assert!(md.contains("Mar 2021 – Present"));
        assert!(!md.contains("## Education"));
    }

    #[test]
    fn test_about_and_certifications_sections() {
        let mut d = doc();
        d.about = Some(AboutInfoRow {
            about_id: 3,
            resume_id: 1,
            about_text: "  Hello  ".to_string(),
            is_deleted: false,
        });
        d.certifications.push(CertificationRow {
            cert_id: 4,
            resume_id: 1,
            cert_name: "CKA".to_string(),
            issuer: Some("CNCF".to_string()),
            is_deleted: false,
        });

        let md = render_resume_markdown(&d);
        assert!(md.contains("## About\n\nHello\n"));
        assert!(md.contains("- CKA (CNCF)"));
    }

    #[test]
    fn test_join_present_skips_missing_parts() {
        assert_eq!(join_present(&[None, Some("Acme")], " — "), "Acme");
        assert_eq!(join_present(&[Some("BSc"), Some("MIT")], ", "), "BSc, MIT");
    }
}
