use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// A registered account. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserRow {
    pub user_id: i64,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone_num: Option<String>,
    pub profile_pic: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone_num: Option<String>,
    pub profile_pic: Option<String>,
}

/// Partial profile update. `None` keeps the stored value; for the nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone_num: Option<Option<String>>,
    pub profile_pic: Option<Option<String>>,
}
