use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};

use crate::auth::{self, Claims};
use crate::config;
use crate::error::ApiError;
use crate::types::Role;

/// Authenticated caller context extracted from the bearer token and
/// threaded to handlers through request extensions.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
    pub pengusul: Option<String>,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Admin gate for the user-management routes.
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::forbidden("admin access required"))
        }
    }

    /// Ownership rule: admins see every row; everyone else only rows
    /// whose pengusul equals their own claim. A missing pengusul on
    /// either side never matches.
    pub fn owns(&self, record_pengusul: Option<&str>) -> bool {
        if self.is_admin() {
            return true;
        }
        match (self.pengusul.as_deref(), record_pengusul) {
            (Some(mine), Some(theirs)) => mine == theirs,
            _ => false,
        }
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            role: claims.role,
            pengusul: claims.pengusul,
        }
    }
}

/// Bearer-token middleware: 401 when no token is supplied, 403 when the
/// supplied token fails verification.
pub async fn jwt_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = headers
        .get("authorization")
        .ok_or_else(|| ApiError::unauthenticated("missing bearer token"))?;

    let token = parse_bearer_header(header.to_str().unwrap_or("")).map_err(ApiError::invalid_token)?;

    let secret = &config::config().security.jwt_secret;
    let claims = auth::verify_jwt(&token, secret).map_err(ApiError::invalid_token)?;

    request.extensions_mut().insert(AuthUser::from(claims));

    Ok(next.run(request).await)
}

fn parse_bearer_header(value: &str) -> Result<String, String> {
    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.to_string()),
        Some(_) => Err("empty bearer token".to_string()),
        None => Err("Authorization header must use the Bearer scheme".to_string()),
    }
}
