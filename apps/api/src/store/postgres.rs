//! PostgreSQL backend. Every section read filters `is_deleted = FALSE` and
//! orders by primary key, which is insertion order for `BIGSERIAL` ids.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;

use crate::models::resume::ResumeRow;
use crate::models::section::{
    AboutInfoRow, CertificationRow, EducationRow, ExperienceRow, ListSection, NewCertification,
    NewEducation, NewExperience, NewProject, ProjectRow,
};
use crate::models::user::{NewUser, ProfileUpdate, UserRow};
use crate::store::{
    ResumeRepository, SectionWriter, StoreError, StoreResult, UserRepository,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Translates constraint violations into domain errors; everything else stays
/// a database error.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("email") => "email",
                Some(c) if c.contains("username") => "username",
                _ => "record",
            };
            return StoreError::Conflict(field.to_string());
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::MissingReference(
                db_err
                    .constraint()
                    .map(|c| format!("Referenced row missing ({c})"))
                    .unwrap_or_else(|| "Referenced row missing".to_string()),
            );
        }
    }
    StoreError::Database(err)
}

/// Escapes LIKE wildcards so user input matches literally.
fn like_pattern(fragment: &str) -> String {
    let escaped = fragment
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl ResumeRepository for PgStore {
    async fn create_resume(&self, user_id: i64, title: &str) -> StoreResult<ResumeRow> {
        sqlx::query_as::<_, ResumeRow>(
            "INSERT INTO resumes (user_id, title, is_deleted) VALUES ($1, $2, FALSE) RETURNING *",
        )
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match map_write_error(e) {
            StoreError::MissingReference(_) => {
                StoreError::MissingReference(format!("User {user_id} not found"))
            }
            other => other,
        })
    }

    async fn list_active_resumes(&self, user_id: i64) -> StoreResult<Vec<ResumeRow>> {
        Ok(sqlx::query_as::<_, ResumeRow>(
            "SELECT * FROM resumes WHERE user_id = $1 AND is_deleted = FALSE ORDER BY resume_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn search_resumes(&self, user_id: i64, fragment: &str) -> StoreResult<Vec<ResumeRow>> {
        Ok(sqlx::query_as::<_, ResumeRow>(
            r#"
            SELECT * FROM resumes
            WHERE user_id = $1 AND is_deleted = FALSE AND title ILIKE $2
            ORDER BY resume_id
            "#,
        )
        .bind(user_id)
        .bind(like_pattern(fragment))
        .fetch_all(&self.pool)
        .await?)
    }

    async fn find_resume(&self, resume_id: i64) -> StoreResult<Option<ResumeRow>> {
        Ok(
            sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE resume_id = $1")
                .bind(resume_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn duplicate_resume(&self, resume_id: i64) -> StoreResult<Option<ResumeRow>> {
        Ok(sqlx::query_as::<_, ResumeRow>(
            r#"
            INSERT INTO resumes (user_id, title, is_deleted)
            SELECT user_id, title || ' (Copy)', FALSE FROM resumes WHERE resume_id = $1
            RETURNING *
            "#,
        )
        .bind(resume_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn soft_delete_resume(&self, resume_id: i64) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE resumes SET is_deleted = TRUE WHERE resume_id = $1")
            .bind(resume_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn fetch_about(&self, resume_id: i64) -> StoreResult<Option<AboutInfoRow>> {
        Ok(sqlx::query_as::<_, AboutInfoRow>(
            r#"
            SELECT * FROM about_info
            WHERE resume_id = $1 AND is_deleted = FALSE
            ORDER BY about_id
            LIMIT 1
            "#,
        )
        .bind(resume_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn fetch_education(&self, resume_id: i64) -> StoreResult<Vec<EducationRow>> {
        Ok(sqlx::query_as::<_, EducationRow>(
            "SELECT * FROM education WHERE resume_id = $1 AND is_deleted = FALSE ORDER BY education_id",
        )
        .bind(resume_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn fetch_experience(&self, resume_id: i64) -> StoreResult<Vec<ExperienceRow>> {
        Ok(sqlx::query_as::<_, ExperienceRow>(
            "SELECT * FROM experience WHERE resume_id = $1 AND is_deleted = FALSE ORDER BY experience_id",
        )
        .bind(resume_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn fetch_projects(&self, resume_id: i64) -> StoreResult<Vec<ProjectRow>> {
        Ok(sqlx::query_as::<_, ProjectRow>(
            "SELECT * FROM projects WHERE resume_id = $1 AND is_deleted = FALSE ORDER BY project_id",
        )
        .bind(resume_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn fetch_certifications(&self, resume_id: i64) -> StoreResult<Vec<CertificationRow>> {
        Ok(sqlx::query_as::<_, CertificationRow>(
            "SELECT * FROM certifications WHERE resume_id = $1 AND is_deleted = FALSE ORDER BY cert_id",
        )
        .bind(resume_id)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn begin_write(&self) -> StoreResult<Box<dyn SectionWriter>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSectionWriter { tx }))
    }
}

/// Section writer backed by one Postgres transaction. Dropping it without
/// `commit` rolls the transaction back.
pub struct PgSectionWriter {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl SectionWriter for PgSectionWriter {
    async fn lock_resume(&mut self, resume_id: i64) -> StoreResult<Option<ResumeRow>> {
        Ok(
            sqlx::query_as::<_, ResumeRow>("SELECT * FROM resumes WHERE resume_id = $1 FOR UPDATE")
                .bind(resume_id)
                .fetch_optional(&mut *self.tx)
                .await?,
        )
    }

    async fn rename_resume(&mut self, resume_id: i64, title: &str) -> StoreResult<()> {
        sqlx::query("UPDATE resumes SET title = $1 WHERE resume_id = $2")
            .bind(title)
            .bind(resume_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn clear_section(&mut self, resume_id: i64, section: ListSection) -> StoreResult<u64> {
        // Table name comes from a closed enum, never from user input.
        let sql = format!(
            "UPDATE {} SET is_deleted = TRUE WHERE resume_id = $1 AND is_deleted = FALSE",
            section.table()
        );
        let result = sqlx::query(&sql)
            .bind(resume_id)
            .execute(&mut *self.tx)
            .await?;
        debug!(
            "Cleared {} {} rows for resume {resume_id}",
            result.rows_affected(),
            section.table()
        );
        Ok(result.rows_affected())
    }

    async fn active_about(&mut self, resume_id: i64) -> StoreResult<Option<AboutInfoRow>> {
        Ok(sqlx::query_as::<_, AboutInfoRow>(
            r#"
            SELECT * FROM about_info
            WHERE resume_id = $1 AND is_deleted = FALSE
            ORDER BY about_id
            LIMIT 1
            "#,
        )
        .bind(resume_id)
        .fetch_optional(&mut *self.tx)
        .await?)
    }

    async fn update_about(&mut self, about_id: i64, about_text: &str) -> StoreResult<()> {
        sqlx::query("UPDATE about_info SET about_text = $1 WHERE about_id = $2")
            .bind(about_text)
            .bind(about_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn insert_about(&mut self, resume_id: i64, about_text: &str) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO about_info (resume_id, about_text) VALUES ($1, $2) RETURNING about_id",
        )
        .bind(resume_id)
        .bind(about_text)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)
    }

    async fn insert_education(
        &mut self,
        resume_id: i64,
        entry: &NewEducation,
    ) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO education
                (resume_id, institution_name, degree, start_date_edu, end_date_edu,
                 grade_type, grade_value)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING education_id
            "#,
        )
        .bind(resume_id)
        .bind(&entry.institution_name)
        .bind(&entry.degree)
        .bind(entry.start_date_edu)
        .bind(entry.end_date_edu)
        .bind(entry.grade_type.as_str())
        .bind(&entry.grade_value)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)
    }

    async fn insert_experience(
        &mut self,
        resume_id: i64,
        entry: &NewExperience,
    ) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO experience
                (resume_id, job_title, company_name, start_date_ex, end_date_ex, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING experience_id
            "#,
        )
        .bind(resume_id)
        .bind(&entry.job_title)
        .bind(&entry.company_name)
        .bind(entry.start_date_ex)
        .bind(entry.end_date_ex)
        .bind(&entry.description)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)
    }

    async fn insert_project(&mut self, resume_id: i64, entry: &NewProject) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO projects (resume_id, project_name, tech_stack, proj_desc, proj_link)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING project_id
            "#,
        )
        .bind(resume_id)
        .bind(&entry.project_name)
        .bind(&entry.tech_stack)
        .bind(&entry.proj_desc)
        .bind(&entry.proj_link)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)
    }

    async fn insert_certification(
        &mut self,
        resume_id: i64,
        entry: &NewCertification,
    ) -> StoreResult<i64> {
        sqlx::query_scalar::<_, i64>(
            "INSERT INTO certifications (resume_id, cert_name, issuer) VALUES ($1, $2, $3) RETURNING cert_id",
        )
        .bind(resume_id)
        .bind(&entry.cert_name)
        .bind(&entry.issuer)
        .fetch_one(&mut *self.tx)
        .await
        .map_err(map_write_error)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRow> {
        sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (username, name, email, password_hash, phone_num, profile_pic)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&user.username)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.phone_num)
        .bind(&user.profile_pic)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)
    }

    async fn find_user(&self, user_id: i64) -> StoreResult<Option<UserRow>> {
        Ok(
            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRow>> {
        Ok(
            sqlx::query_as::<_, UserRow>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn update_profile(
        &self,
        user_id: i64,
        update: ProfileUpdate,
    ) -> StoreResult<Option<UserRow>> {
        let ProfileUpdate {
            name,
            email,
            phone_num,
            profile_pic,
        } = update;
        sqlx::query_as::<_, UserRow>(
            r#"
            UPDATE users SET
                name        = COALESCE($2, name),
                email       = COALESCE($3, email),
                phone_num   = CASE WHEN $4 THEN $5 ELSE phone_num END,
                profile_pic = CASE WHEN $6 THEN $7 ELSE profile_pic END
            WHERE user_id = $1
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(email)
        .bind(phone_num.is_some())
        .bind(phone_num.flatten())
        .bind(profile_pic.is_some())
        .bind(profile_pic.flatten())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_write_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("swe"), "%swe%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    /// Needs a live database:
    /// DATABASE_URL=postgres://... cargo test -- --ignored
    #[tokio::test]
    #[ignore]
    async fn test_postgres_save_round_trip() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let pool = crate::db::create_pool(&url, 2).await.unwrap();
        crate::db::apply_schema(&pool).await.unwrap();
        let store = PgStore::new(pool);

        let suffix = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        let user = store
            .create_user(NewUser {
                username: format!("pg-test-{suffix}"),
                name: "PG Test".to_string(),
                email: format!("pg-test-{suffix}@example.com"),
                password_hash: "x".to_string(),
                phone_num: None,
                profile_pic: None,
            })
            .await
            .unwrap();
        let resume = store.create_resume(user.user_id, "PG Resume").await.unwrap();

        let mut writer = store.begin_write().await.unwrap();
        writer
            .insert_certification(
                resume.resume_id,
                &NewCertification {
                    cert_name: "CKA".to_string(),
                    issuer: None,
                },
            )
            .await
            .unwrap();
        writer.commit().await.unwrap();

        let mut writer = store.begin_write().await.unwrap();
        let cleared = writer
            .clear_section(resume.resume_id, ListSection::Certifications)
            .await
            .unwrap();
        assert_eq!(cleared, 1);
        drop(writer); // rollback

        let certs = store.fetch_certifications(resume.resume_id).await.unwrap();
        assert_eq!(certs.len(), 1);
        assert_eq!(certs[0].cert_name, "CKA");
    }
}
