//! POST /api/auth/login - credential check and token issuance.

use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::{self, password, Claims};
use crate::config;
use crate::database::manager::DatabaseManager;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::types::Role;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

pub async fn login_post(Json(req): Json<LoginRequest>) -> ApiResult<Value> {
    let pool = DatabaseManager::pool().await?;

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&req.email)
        .fetch_optional(&pool)
        .await?;
    let Some(user) = user else {
        return Err(ApiError::invalid_credentials("unknown email"));
    };

    if !password::verify_password(&req.password, &user.password)? {
        return Err(ApiError::invalid_credentials("wrong password"));
    }

    // Unknown role strings fall back to the least-privileged role
    let role = user.role.parse::<Role>().unwrap_or(Role::User);
    let claims = Claims::new(user.id, role, user.pengusul.clone());
    let token = auth::generate_jwt(&claims, &config::config().security.jwt_secret)?;

    Ok(ApiResponse::success(json!({
        "token": token,
        "user": {
            "id": user.id,
            "username": user.username,
            "name": user.name,
            "email": user.email,
            "role": user.role,
            "pengusul": user.pengusul,
        },
    })))
}
