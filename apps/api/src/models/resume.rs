use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Resume header. Section rows hang off `resume_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ResumeRow {
    pub resume_id: i64,
    pub user_id: i64,
    pub title: String,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}
