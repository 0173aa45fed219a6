use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config;
use crate::database::models::User;

pub mod password;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub username: String,
    pub is_admin: bool,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(username: String, is_admin: bool) -> Self {
        let now = Utc::now();
        let expiry_hours = config::config().security.jwt_expiry_hours;
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            username,
            is_admin,
            exp,
            iat: now.timestamp(),
        }
    }
}

impl From<&User> for Claims {
    fn from(user: &User) -> Self {
        Claims::new(user.username.clone(), user.is_admin)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),

    #[error("Invalid JWT secret")]
    InvalidSecret,
}

fn secret() -> Result<&'static str, JwtError> {
    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }
    Ok(secret)
}

pub fn generate_jwt(claims: &Claims) -> Result<String, JwtError> {
    let encoding_key = EncodingKey::from_secret(secret()?.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

/// Signed token for `user`
pub fn create_token(user: &User) -> Result<String, JwtError> {
    generate_jwt(&Claims::from(user))
}

/// Verify signature and expiry, returning the claims
pub fn validate_jwt(token: &str) -> Result<Claims, JwtError> {
    let decoding_key = DecodingKey::from_secret(secret()?.as_bytes());

    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(is_admin: bool) -> User {
        User {
            username: "test".into(),
            first_name: "T".into(),
            last_name: "U".into(),
            email: "t@u.com".into(),
            is_admin,
        }
    }

    #[test]
    fn token_carries_username_and_admin_flag() {
        let token = create_token(&user(true)).unwrap();
        let claims = validate_jwt(&token).unwrap();
        assert_eq!(claims.username, "test");
        assert!(claims.is_admin);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn tampered_token_is_rejected() {
        let token = create_token(&user(false)).unwrap();
        let mut tampered = token.clone();
        tampered.push('x');
        assert!(matches!(validate_jwt(&tampered), Err(JwtError::InvalidToken(_))));
    }

    #[test]
    fn token_signed_with_other_key_is_rejected() {
        let claims = Claims::new("test".into(), true);
        let forged = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"some-other-secret"),
        )
        .unwrap();
        assert!(validate_jwt(&forged).is_err());
    }
}
