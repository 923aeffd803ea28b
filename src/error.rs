// HTTP API Error Types
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    BadRequest(String),

    // 400 Bad Request (duplicate unique key; the original API reported
    // conflicts as plain bad input, and clients depend on that)
    Conflict(String),

    // 401 Unauthorized
    Unauthenticated(String),
    InvalidCredentials(String),

    // 403 Forbidden
    InvalidToken(String),
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    ExhaustedIdSpace(String),
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::BadRequest(_) => 400,
            ApiError::Conflict(_) => 400,
            ApiError::Unauthenticated(_) => 401,
            ApiError::InvalidCredentials(_) => 401,
            ApiError::InvalidToken(_) => 403,
            ApiError::Forbidden(_) => 403,
            ApiError::NotFound(_) => 404,
            ApiError::ExhaustedIdSpace(_) => 500,
            ApiError::Internal(_) => 500,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Unauthenticated(msg)
            | ApiError::InvalidCredentials(msg)
            | ApiError::InvalidToken(msg)
            | ApiError::Forbidden(msg)
            | ApiError::NotFound(msg)
            | ApiError::ExhaustedIdSpace(msg)
            | ApiError::Internal(msg) => msg,
        }
    }

    /// Convert to the JSON error envelope
    pub fn to_json(&self) -> Value {
        json!({
            "data": Value::Null,
            "errorMessage": self.message(),
            "isSuccess": false,
        })
    }
}

// Static constructor methods
impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        ApiError::Unauthenticated(message.into())
    }

    pub fn invalid_credentials(message: impl Into<String>) -> Self {
        ApiError::InvalidCredentials(message.into())
    }

    pub fn invalid_token(message: impl Into<String>) -> Self {
        ApiError::InvalidToken(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn exhausted_id_space(message: impl Into<String>) -> Self {
        ApiError::ExhaustedIdSpace(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Internal(message.into())
    }
}

// Convert other error types to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => ApiError::not_found("record not found"),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                ApiError::conflict("duplicate value for a unique field")
            }
            _ => {
                // Don't expose internal SQL errors to clients
                tracing::error!("SQLx error: {}", err);
                ApiError::internal("database error occurred")
            }
        }
    }
}

impl From<crate::database::manager::DatabaseError> for ApiError {
    fn from(err: crate::database::manager::DatabaseError) -> Self {
        match err {
            crate::database::manager::DatabaseError::ConfigMissing(key) => {
                tracing::error!("Missing configuration: {}", key);
                ApiError::internal("server configuration error")
            }
            crate::database::manager::DatabaseError::Sqlx(sqlx_err) => sqlx_err.into(),
        }
    }
}

impl From<crate::auth::JwtError> for ApiError {
    fn from(err: crate::auth::JwtError) -> Self {
        tracing::error!("JWT error: {}", err);
        ApiError::internal("failed to issue token")
    }
}

impl From<argon2::password_hash::Error> for ApiError {
    fn from(err: argon2::password_hash::Error) -> Self {
        tracing::error!("Password hash error: {}", err);
        ApiError::internal("failed to process password")
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.to_json())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(ApiError::bad_request("x").status_code(), 400);
        assert_eq!(ApiError::conflict("x").status_code(), 400);
        assert_eq!(ApiError::unauthenticated("x").status_code(), 401);
        assert_eq!(ApiError::invalid_credentials("x").status_code(), 401);
        assert_eq!(ApiError::invalid_token("x").status_code(), 403);
        assert_eq!(ApiError::forbidden("x").status_code(), 403);
        assert_eq!(ApiError::not_found("x").status_code(), 404);
        assert_eq!(ApiError::exhausted_id_space("x").status_code(), 500);
        assert_eq!(ApiError::internal("x").status_code(), 500);
    }

    #[test]
    fn error_envelope_shape() {
        let body = ApiError::forbidden("access denied").to_json();
        assert_eq!(body["data"], Value::Null);
        assert_eq!(body["errorMessage"], "access denied");
        assert_eq!(body["isSuccess"], false);
    }
}
