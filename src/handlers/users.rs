//! Admin-only user management.

use axum::extract::Path;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::auth::password;
use crate::database::manager::DatabaseManager;
use crate::database::models::UserSummary;
use crate::database::query_builder::{bind_value, build_update};
use crate::error::ApiError;
use crate::middleware::auth::AuthUser;
use crate::middleware::response::{ApiResponse, ApiResult};

const USER_COLUMNS: &str = "id, username, name, email, role, pengusul, created_at";

/// GET /api/users
pub async fn list(Extension(user): Extension<AuthUser>) -> ApiResult<Vec<UserSummary>> {
    user.require_admin()?;
    let pool = DatabaseManager::pool().await?;

    let sql = format!("SELECT {} FROM users", USER_COLUMNS);
    let users = sqlx::query_as::<_, UserSummary>(&sql).fetch_all(&pool).await?;

    Ok(ApiResponse::success(users))
}

/// GET /api/users/:id
pub async fn get(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> ApiResult<UserSummary> {
    user.require_admin()?;
    let pool = DatabaseManager::pool().await?;

    let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
    let found = sqlx::query_as::<_, UserSummary>(&sql)
        .bind(id)
        .fetch_optional(&pool)
        .await?;

    found
        .map(ApiResponse::success)
        .ok_or_else(|| ApiError::not_found("user not found"))
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub pengusul: Option<String>,
}

/// POST /api/users
pub async fn create(
    Extension(user): Extension<AuthUser>,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<UserSummary> {
    user.require_admin()?;

    let username = req.username.filter(|s| !s.is_empty());
    let name = req.name.filter(|s| !s.is_empty());
    let email = req.email.filter(|s| !s.is_empty());
    let plain_password = req.password.filter(|s| !s.is_empty());
    let (Some(username), Some(name), Some(email), Some(plain_password)) =
        (username, name, email, plain_password)
    else {
        return Err(ApiError::bad_request(
            "username, name, email and password are required",
        ));
    };

    let role = req.role.unwrap_or_else(|| "user".to_string());
    let hashed = password::hash_password(&plain_password)?;

    let pool = DatabaseManager::pool().await?;
    let sql = format!(
        "INSERT INTO users (username, name, email, password, role, pengusul) \
         VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
        USER_COLUMNS
    );
    let created = sqlx::query_as::<_, UserSummary>(&sql)
        .bind(&username)
        .bind(&name)
        .bind(&email)
        .bind(&hashed)
        .bind(&role)
        .bind(&req.pengusul)
        .fetch_one(&pool)
        .await
        .map_err(|err| match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::conflict("username or email already in use")
            }
            _ => ApiError::from(err),
        })?;

    Ok(ApiResponse::created(created))
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub pengusul: Option<String>,
}

/// PUT /api/users/:id - partial update; password is re-hashed when supplied.
pub async fn update(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(req): Json<UpdateUserRequest>,
) -> ApiResult<Value> {
    user.require_admin()?;

    let mut fields = Map::new();
    for (key, value) in [
        ("username", req.username),
        ("name", req.name),
        ("email", req.email),
        ("role", req.role),
        ("pengusul", req.pengusul),
    ] {
        if let Some(value) = value.filter(|s| !s.is_empty()) {
            fields.insert(key.to_string(), Value::String(value));
        }
    }
    if let Some(plain_password) = req.password.filter(|s| !s.is_empty()) {
        fields.insert(
            "password".to_string(),
            Value::String(password::hash_password(&plain_password)?),
        );
    }
    if fields.is_empty() {
        return Err(ApiError::bad_request("no fields to update"));
    }

    let pool = DatabaseManager::pool().await?;
    let (sql, params) = build_update("users", &fields, Value::from(id))?;
    let mut query = sqlx::query(&sql);
    for param in &params {
        query = bind_value(query, param);
    }
    let result = query.execute(&pool).await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("user not found"));
    }

    // Merged view of the changed fields; the password hash stays private
    fields.remove("password");
    fields.insert("id".to_string(), Value::from(id));
    Ok(ApiResponse::success(Value::Object(fields)))
}

/// DELETE /api/users/:id
pub async fn delete(
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> ApiResult<Value> {
    user.require_admin()?;
    let pool = DatabaseManager::pool().await?;

    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(id)
        .execute(&pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(ApiError::not_found("user not found"));
    }

    Ok(ApiResponse::success(Value::Null).with_message("user deleted"))
}
