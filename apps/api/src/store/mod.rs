//! Persistence seam. Handlers and workflows only see these traits; the
//! concrete backend (Postgres or in-memory) is chosen once in `main`.
//!
//! Reads go through `ResumeRepository` directly. Every mutation of section
//! data goes through a `SectionWriter`, which is one unit of work: dropping
//! it without calling `commit` discards everything written through it.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::resume::ResumeRow;
use crate::models::section::{
    AboutInfoRow, CertificationRow, EducationRow, ExperienceRow, ListSection, NewCertification,
    NewEducation, NewExperience, NewProject, ProjectRow,
};
use crate::models::user::{NewUser, ProfileUpdate, UserRow};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique constraint violated; carries the offending field.
    #[error("{0} already exists")]
    Conflict(String),

    /// Foreign key target does not exist.
    #[error("{0}")]
    MissingReference(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait ResumeRepository: Send + Sync {
    async fn create_resume(&self, user_id: i64, title: &str) -> StoreResult<ResumeRow>;

    /// Non-deleted resumes of a user, oldest first.
    async fn list_active_resumes(&self, user_id: i64) -> StoreResult<Vec<ResumeRow>>;

    /// Case-insensitive title substring search over non-deleted resumes.
    async fn search_resumes(&self, user_id: i64, fragment: &str) -> StoreResult<Vec<ResumeRow>>;

    /// Header lookup. Does not filter on `is_deleted`.
    async fn find_resume(&self, resume_id: i64) -> StoreResult<Option<ResumeRow>>;

    /// Copies the header only (same owner, title suffixed with " (Copy)").
    async fn duplicate_resume(&self, resume_id: i64) -> StoreResult<Option<ResumeRow>>;

    /// Returns false when the resume does not exist.
    async fn soft_delete_resume(&self, resume_id: i64) -> StoreResult<bool>;

    async fn fetch_about(&self, resume_id: i64) -> StoreResult<Option<AboutInfoRow>>;
    async fn fetch_education(&self, resume_id: i64) -> StoreResult<Vec<EducationRow>>;
    async fn fetch_experience(&self, resume_id: i64) -> StoreResult<Vec<ExperienceRow>>;
    async fn fetch_projects(&self, resume_id: i64) -> StoreResult<Vec<ProjectRow>>;
    async fn fetch_certifications(&self, resume_id: i64) -> StoreResult<Vec<CertificationRow>>;

    async fn begin_write(&self) -> StoreResult<Box<dyn SectionWriter>>;
}

/// One transaction over the resume and section tables.
#[async_trait]
pub trait SectionWriter: Send {
    /// Locks the header row until commit/rollback. `None` if it does not exist.
    async fn lock_resume(&mut self, resume_id: i64) -> StoreResult<Option<ResumeRow>>;

    async fn rename_resume(&mut self, resume_id: i64, title: &str) -> StoreResult<()>;

    /// Soft-deletes every active row of `section`; returns how many were marked.
    async fn clear_section(&mut self, resume_id: i64, section: ListSection) -> StoreResult<u64>;

    async fn active_about(&mut self, resume_id: i64) -> StoreResult<Option<AboutInfoRow>>;
    async fn update_about(&mut self, about_id: i64, about_text: &str) -> StoreResult<()>;
    async fn insert_about(&mut self, resume_id: i64, about_text: &str) -> StoreResult<i64>;

    async fn insert_education(&mut self, resume_id: i64, entry: &NewEducation)
        -> StoreResult<i64>;
    async fn insert_experience(
        &mut self,
        resume_id: i64,
        entry: &NewExperience,
    ) -> StoreResult<i64>;
    async fn insert_project(&mut self, resume_id: i64, entry: &NewProject) -> StoreResult<i64>;
    async fn insert_certification(
        &mut self,
        resume_id: i64,
        entry: &NewCertification,
    ) -> StoreResult<i64>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRow>;
    async fn find_user(&self, user_id: i64) -> StoreResult<Option<UserRow>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>>;
    async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> StoreResult<Option<UserRow>>;
}
