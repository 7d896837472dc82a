//! In-process backend used when no `DATABASE_URL` is configured, and by the
//! test-suite. A `SectionWriter` holds the table lock for its whole lifetime
//! and restores the snapshot taken at `begin_write` unless committed, which
//! gives the same all-or-nothing behaviour as a Postgres transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::resume::ResumeRow;
use crate::models::section::{
    AboutInfoRow, CertificationRow, EducationRow, ExperienceRow, ListSection, NewCertification,
    NewEducation, NewExperience, NewProject, ProjectRow,
};
use crate::models::user::{NewUser, ProfileUpdate, UserRow};
use crate::store::{
    ResumeRepository, SectionWriter, StoreError, StoreResult, UserRepository,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    last_id: i64,
    users: Vec<UserRow>,
    resumes: Vec<ResumeRow>,
    about: Vec<AboutInfoRow>,
    education: Vec<EducationRow>,
    experience: Vec<ExperienceRow>,
    projects: Vec<ProjectRow>,
    certifications: Vec<CertificationRow>,
    #[cfg(test)]
    failing_section: Option<ListSection>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn resume_exists(&self, resume_id: i64) -> bool {
        self.resumes.iter().any(|r| r.resume_id == resume_id)
    }

    fn require_resume(&self, resume_id: i64) -> StoreResult<()> {
        if self.resume_exists(resume_id) {
            Ok(())
        } else {
            Err(StoreError::MissingReference(format!(
                "Resume {resume_id} not found"
            )))
        }
    }

    #[cfg(test)]
    fn check_injected_failure(&self, section: ListSection) -> StoreResult<()> {
        if self.failing_section == Some(section) {
            return Err(StoreError::Database(sqlx::Error::Protocol(format!(
                "injected failure inserting into {}",
                section.table()
            ))));
        }
        Ok(())
    }

    #[cfg(not(test))]
    fn check_injected_failure(&self, _section: ListSection) -> StoreResult<()> {
        Ok(())
    }

    fn email_taken(&self, email: &str, except_user: Option<i64>) -> bool {
        self.users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email) && Some(u.user_id) != except_user)
    }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every insert into `section` fail until reset with `None`.
    #[cfg(test)]
    pub async fn fail_inserts_into(&self, section: Option<ListSection>) {
        self.tables.lock().await.failing_section = section;
    }

    /// All rows of `section` for a resume, soft-deleted ones included.
    #[cfg(test)]
    pub async fn raw_row_count(&self, resume_id: i64, section: ListSection) -> usize {
        let t = self.tables.lock().await;
        match section {
            ListSection::Education => t.education.iter().filter(|r| r.resume_id == resume_id).count(),
            ListSection::Experience => t.experience.iter().filter(|r| r.resume_id == resume_id).count(),
            ListSection::Projects => t.projects.iter().filter(|r| r.resume_id == resume_id).count(),
            ListSection::Certifications => t
                .certifications
                .iter()
                .filter(|r| r.resume_id == resume_id)
                .count(),
        }
    }
}

#[async_trait]
impl ResumeRepository for MemoryStore {
    async fn create_resume(&self, user_id: i64, title: &str) -> StoreResult<ResumeRow> {
        let mut t = self.tables.lock().await;
        if !t.users.iter().any(|u| u.user_id == user_id) {
            return Err(StoreError::MissingReference(format!(
                "User {user_id} not found"
            )));
        }
        let row = ResumeRow {
            resume_id: t.next_id(),
            user_id,
            title: title.to_string(),
            is_deleted: false,
            created_at: Utc::now(),
        };
        t.resumes.push(row.clone());
        Ok(row)
    }

    async fn list_active_resumes(&self, user_id: i64) -> StoreResult<Vec<ResumeRow>> {
        let t = self.tables.lock().await;
        Ok(t.resumes
            .iter()
            .filter(|r| r.user_id == user_id && !r.is_deleted)
            .cloned()
            .collect())
    }

    async fn search_resumes(&self, user_id: i64, fragment: &str) -> StoreResult<Vec<ResumeRow>> {
        let needle = fragment.to_lowercase();
        let t = self.tables.lock().await;
        Ok(t.resumes
            .iter()
            .filter(|r| {
                r.user_id == user_id && !r.is_deleted && r.title.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn find_resume(&self, resume_id: i64) -> StoreResult<Option<ResumeRow>> {
        let t = self.tables.lock().await;
        Ok(t.resumes.iter().find(|r| r.resume_id == resume_id).cloned())
    }

    async fn duplicate_resume(&self, resume_id: i64) -> StoreResult<Option<ResumeRow>> {
        let mut t = self.tables.lock().await;
        let Some(source) = t.resumes.iter().find(|r| r.resume_id == resume_id).cloned() else {
            return Ok(None);
        };
        let row = ResumeRow {
            resume_id: t.next_id(),
            user_id: source.user_id,
            title: format!("{} (Copy)", source.title),
            is_deleted: false,
            created_at: Utc::now(),
        };
        t.resumes.push(row.clone());
        Ok(Some(row))
    }

    async fn soft_delete_resume(&self, resume_id: i64) -> StoreResult<bool> {
        let mut t = self.tables.lock().await;
        match t.resumes.iter_mut().find(|r| r.resume_id == resume_id) {
            Some(row) => {
                row.is_deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn fetch_about(&self, resume_id: i64) -> StoreResult<Option<AboutInfoRow>> {
        let t = self.tables.lock().await;
        Ok(t.about
            .iter()
            .find(|r| r.resume_id == resume_id && !r.is_deleted)
            .cloned())
    }

    async fn fetch_education(&self, resume_id: i64) -> StoreResult<Vec<EducationRow>> {
        let t = self.tables.lock().await;
        Ok(t.education
            .iter()
            .filter(|r| r.resume_id == resume_id && !r.is_deleted)
            .cloned()
            .collect())
    }

    async fn fetch_experience(&self, resume_id: i64) -> StoreResult<Vec<ExperienceRow>> {
        let t = self.tables.lock().await;
        Ok(t.experience
            .iter()
            .filter(|r| r.resume_id == resume_id && !r.is_deleted)
            .cloned()
            .collect())
    }

    async fn fetch_projects(&self, resume_id: i64) -> StoreResult<Vec<ProjectRow>> {
        let t = self.tables.lock().await;
        Ok(t.projects
            .iter()
            .filter(|r| r.resume_id == resume_id && !r.is_deleted)
            .cloned()
            .collect())
    }

    async fn fetch_certifications(&self, resume_id: i64) -> StoreResult<Vec<CertificationRow>> {
        let t = self.tables.lock().await;
        Ok(t.certifications
            .iter()
            .filter(|r| r.resume_id == resume_id && !r.is_deleted)
            .cloned()
            .collect())
    }

    async fn begin_write(&self) -> StoreResult<Box<dyn SectionWriter>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let snapshot = guard.clone();
        Ok(Box::new(MemorySectionWriter {
            guard,
            snapshot: Some(snapshot),
        }))
    }
}

pub struct MemorySectionWriter {
    guard: OwnedMutexGuard<Tables>,
    /// Pre-transaction state; `None` once committed.
    snapshot: Option<Tables>,
}

impl Drop for MemorySectionWriter {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.guard = snapshot;
        }
    }
}

#[async_trait]
impl SectionWriter for MemorySectionWriter {
    async fn lock_resume(&mut self, resume_id: i64) -> StoreResult<Option<ResumeRow>> {
        Ok(self
            .guard
            .resumes
            .iter()
            .find(|r| r.resume_id == resume_id)
            .cloned())
    }

    async fn rename_resume(&mut self, resume_id: i64, title: &str) -> StoreResult<()> {
        if let Some(row) = self
            .guard
            .resumes
            .iter_mut()
            .find(|r| r.resume_id == resume_id)
        {
            row.title = title.to_string();
        }
        Ok(())
    }

    async fn clear_section(&mut self, resume_id: i64, section: ListSection) -> StoreResult<u64> {
        fn mark<T>(rows: &mut [T], matches: impl Fn(&T) -> bool, flag: impl Fn(&mut T)) -> u64 {
            let mut count = 0;
            for row in rows.iter_mut().filter(|r| matches(r)) {
                flag(row);
                count += 1;
            }
            count
        }

        let t = &mut *self.guard;
        let cleared = match section {
            ListSection::Education => mark(
                &mut t.education,
                |r| r.resume_id == resume_id && !r.is_deleted,
                |r| r.is_deleted = true,
            ),
            ListSection::Experience => mark(
                &mut t.experience,
                |r| r.resume_id == resume_id && !r.is_deleted,
                |r| r.is_deleted = true,
            ),
            ListSection::Projects => mark(
                &mut t.projects,
                |r| r.resume_id == resume_id && !r.is_deleted,
                |r| r.is_deleted = true,
            ),
            ListSection::Certifications => mark(
                &mut t.certifications,
                |r| r.resume_id == resume_id && !r.is_deleted,
                |r| r.is_deleted = true,
            ),
        };
        Ok(cleared)
    }

    async fn active_about(&mut self, resume_id: i64) -> StoreResult<Option<AboutInfoRow>> {
        Ok(self
            .guard
            .about
            .iter()
            .find(|r| r.resume_id == resume_id && !r.is_deleted)
            .cloned())
    }

    async fn update_about(&mut self, about_id: i64, about_text: &str) -> StoreResult<()> {
        if let Some(row) = self.guard.about.iter_mut().find(|r| r.about_id == about_id) {
            row.about_text = about_text.to_string();
        }
        Ok(())
    }

    async fn insert_about(&mut self, resume_id: i64, about_text: &str) -> StoreResult<i64> {
        let t = &mut *self.guard;
        t.require_resume(resume_id)?;
        let about_id = t.next_id();
        t.about.push(AboutInfoRow {
            about_id,
            resume_id,
            about_text: about_text.to_string(),
            is_deleted: false,
        });
        Ok(about_id)
    }

    async fn insert_education(
        &mut self,
        resume_id: i64,
        entry: &NewEducation,
    ) -> StoreResult<i64> {
        let t = &mut *self.guard;
        t.require_resume(resume_id)?;
        t.check_injected_failure(ListSection::Education)?;
        let education_id = t.next_id();
        t.education.push(EducationRow {
            education_id,
            resume_id,
            institution_name: entry.institution_name.clone(),
            degree: entry.degree.clone(),
            start_date_edu: entry.start_date_edu,
            end_date_edu: entry.end_date_edu,
            grade_type: entry.grade_type.as_str().to_string(),
            grade_value: entry.grade_value.clone(),
            is_deleted: false,
        });
        Ok(education_id)
    }

    async fn insert_experience(
        &mut self,
        resume_id: i64,
        entry: &NewExperience,
    ) -> StoreResult<i64> {
        let t = &mut *self.guard;
        t.require_resume(resume_id)?;
        t.check_injected_failure(ListSection::Experience)?;
        let experience_id = t.next_id();
        t.experience.push(ExperienceRow {
            experience_id,
            resume_id,
            job_title: entry.job_title.clone(),
            company_name: entry.company_name.clone(),
            start_date_ex: entry.start_date_ex,
            end_date_ex: entry.end_date_ex,
            description: entry.description.clone(),
            is_deleted: false,
        });
        Ok(experience_id)
    }

    async fn insert_project(&mut self, resume_id: i64, entry: &NewProject) -> StoreResult<i64> {
        let t = &mut *self.guard;
        t.require_resume(resume_id)?;
        t.check_injected_failure(ListSection::Projects)?;
        let project_id = t.next_id();
        t.projects.push(ProjectRow {
            project_id,
            resume_id,
            project_name: entry.project_name.clone(),
            tech_stack: entry.tech_stack.clone(),
            proj_desc: entry.proj_desc.clone(),
            proj_link: entry.proj_link.clone(),
            is_deleted: false,
        });
        Ok(project_id)
    }

    async fn insert_certification(
        &mut self,
        resume_id: i64,
        entry: &NewCertification,
    ) -> StoreResult<i64> {
        let t = &mut *self.guard;
        t.require_resume(resume_id)?;
        t.check_injected_failure(ListSection::Certifications)?;
        let cert_id = t.next_id();
        t.certifications.push(CertificationRow {
            cert_id,
            resume_id,
            cert_name: entry.cert_name.clone(),
            issuer: entry.issuer.clone(),
            is_deleted: false,
        });
        Ok(cert_id)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let mut writer = self;
        writer.snapshot = None;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRow> {
        let mut t = self.tables.lock().await;
        if t.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::Conflict("username".to_string()));
        }
        if t.email_taken(&user.email, None) {
            return Err(StoreError::Conflict("email".to_string()));
        }
        let row = UserRow {
            user_id: t.next_id(),
            username: user.username,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            phone_num: user.phone_num,
            profile_pic: user.profile_pic,
            created_at: Utc::now(),
        };
        t.users.push(row.clone());
        Ok(row)
    }

    async fn find_user(&self, user_id: i64) -> StoreResult<Option<UserRow>> {
        let t = self.tables.lock().await;
        Ok(t.users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        let t = self.tables.lock().await;
        Ok(t.users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> StoreResult<Option<UserRow>> {
        let mut t = self.tables.lock().await;
        if let Some(email) = &update.email {
            if t.email_taken(email, Some(user_id)) {
                return Err(StoreError::Conflict("email".to_string()));
            }
        }
        let Some(user) = t.users.iter_mut().find(|u| u.user_id == user_id) else {
            return Ok(None);
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(phone_num) = update.phone_num {
            user.phone_num = phone_num;
        }
        if let Some(profile_pic) = update.profile_pic {
            user.profile_pic = profile_pic;
        }
        Ok(Some(user.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            phone_num: None,
            profile_pic: None,
        }
    }

    fn cert(name: &str) -> NewCertification {
        NewCertification {
            cert_name: name.to_string(),
            issuer: None,
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        store.create_user(new_user("a", "a@example.com")).await.unwrap();
        let err = store
            .create_user(new_user("b", "A@Example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(ref f) if f == "email"));
    }

    #[tokio::test]
    async fn test_create_resume_requires_existing_user() {
        let store = MemoryStore::new();
        let err = store.create_resume(42, "Ghost").await.unwrap_err();
        assert!(matches!(err, StoreError::MissingReference(_)));
    }

    #[tokio::test]
    async fn test_dropped_writer_rolls_back() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a", "a@example.com")).await.unwrap();
        let resume = store.create_resume(user.user_id, "R").await.unwrap();

        let mut writer = store.begin_write().await.unwrap();
        writer.insert_certification(resume.resume_id, &cert("AWS SA")).await.unwrap();
        drop(writer);

        assert!(store.fetch_certifications(resume.resume_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear_counts_only_active_rows_and_keeps_them_stored() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a", "a@example.com")).await.unwrap();
        let resume = store.create_resume(user.user_id, "R").await.unwrap();

        let mut writer = store.begin_write().await.unwrap();
        writer.insert_certification(resume.resume_id, &cert("One")).await.unwrap();
        writer.insert_certification(resume.resume_id, &cert("Two")).await.unwrap();
        writer.commit().await.unwrap();

        let mut writer = store.begin_write().await.unwrap();
        let first = writer
            .clear_section(resume.resume_id, ListSection::Certifications)
            .await
            .unwrap();
        let second = writer
            .clear_section(resume.resume_id, ListSection::Certifications)
            .await
            .unwrap();
        writer.commit().await.unwrap();

        assert_eq!(first, 2);
        assert_eq!(second, 0);
        assert!(store.fetch_certifications(resume.resume_id).await.unwrap().is_empty());
        assert_eq!(
            store
                .raw_row_count(resume.resume_id, ListSection::Certifications)
                .await,
            2
        );
    }

    #[tokio::test]
    async fn test_duplicate_copies_header_only() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a", "a@example.com")).await.unwrap();
        let resume = store.create_resume(user.user_id, "SWE").await.unwrap();

        let copy = store.duplicate_resume(resume.resume_id).await.unwrap().unwrap();
        assert_eq!(copy.title, "SWE (Copy)");
        assert_eq!(copy.user_id, user.user_id);
        assert_ne!(copy.resume_id, resume.resume_id);
        assert!(store.duplicate_resume(9999).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_skips_deleted() {
        let store = MemoryStore::new();
        let user = store.create_user(new_user("a", "a@example.com")).await.unwrap();
        store.create_resume(user.user_id, "Backend Engineer").await.unwrap();
        let gone = store.create_resume(user.user_id, "Backend Old").await.unwrap();
        store.create_resume(user.user_id, "Designer").await.unwrap();
        store.soft_delete_resume(gone.resume_id).await.unwrap();

        let hits = store.search_resumes(user.user_id, "backend").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Backend Engineer");
    }

    #[tokio::test]
    async fn test_profile_update_clears_phone_and_rejects_taken_email() {
        let store = MemoryStore::new();
        let mut first = new_user("a", "a@example.com");
        first.phone_num = Some("555".to_string());
        let a = store.create_user(first).await.unwrap();
        store.create_user(new_user("b", "b@example.com")).await.unwrap();

        let updated = store
            .update_profile(
                a.user_id,
                ProfileUpdate {
                    phone_num: Some(None),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.phone_num, None);
        assert_eq!(updated.name, "Test User");

        let err = store
            .update_profile(
                a.user_id,
                ProfileUpdate {
                    email: Some("b@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
