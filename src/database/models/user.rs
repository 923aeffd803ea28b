use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Full users row; only fetched for credential checks.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub pengusul: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a users row; never carries the password hash.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserSummary {
    pub id: i32,
    pub username: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub pengusul: Option<String>,
    pub created_at: DateTime<Utc>,
}
