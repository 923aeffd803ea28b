use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::types::Role;

pub mod password;

/// Claim payload carried by every bearer token: who the caller is and
/// which pengusul scope their records live under.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: i32,
    pub role: Role,
    pub pengusul: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(id: i32, role: Role, pengusul: Option<String>) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            id,
            role,
            pengusul,
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug)]
pub enum JwtError {
    TokenGeneration(String),
    InvalidSecret,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::TokenGeneration(msg) => write!(f, "JWT generation error: {}", msg),
            JwtError::InvalidSecret => write!(f, "Invalid JWT secret"),
        }
    }
}

impl std::error::Error for JwtError {}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let header = Header::default();

    encode(&header, claims, &encoding_key).map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Verify signature and expiry, returning the embedded claims.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    if secret.is_empty() {
        return Err("JWT secret not configured".to_string());
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| format!("Invalid token: {}", e))?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trips_claims() {
        let claims = Claims::new(7, Role::User, Some("P1".to_string()));
        let token = generate_jwt(&claims, SECRET).unwrap();

        let decoded = verify_jwt(&token, SECRET).unwrap();
        assert_eq!(decoded.id, 7);
        assert_eq!(decoded.role, Role::User);
        assert_eq!(decoded.pengusul.as_deref(), Some("P1"));
        assert_eq!(decoded.exp, claims.exp);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = Claims::new(1, Role::Admin, None);
        let token = generate_jwt(&claims, SECRET).unwrap();
        assert!(verify_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims = Claims::new(1, Role::User, Some("P1".to_string()));
        claims.iat -= 86_400 * 3;
        claims.exp = claims.iat + 60;
        let token = generate_jwt(&claims, SECRET).unwrap();
        assert!(verify_jwt(&token, SECRET).is_err());
    }

    #[test]
    fn empty_secret_refuses_to_sign() {
        let claims = Claims::new(1, Role::User, None);
        assert!(matches!(
            generate_jwt(&claims, ""),
            Err(JwtError::InvalidSecret)
        ));
    }
}
