use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Token claims issued by the store's identity provider.
#[derive(Debug, Deserialize, Serialize)]
pub struct Claims {
    /// Staff person id.
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub person_id: Uuid,
    pub role: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let secret = std::env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

        decode_token(token, &secret)
    }
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let person_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid person id in token".into()))?;

    Ok(AuthUser {
        person_id,
        role: decoded.claims.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token_for(sub: &str, secret: &str, ttl: Duration) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            role: "cashier".into(),
            exp: (Utc::now() + ttl).timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_person() {
        let person = Uuid::new_v4();
        let token = token_for(&person.to_string(), "s3cret", Duration::hours(1));
        let user = decode_token(&token, "s3cret").unwrap();
        assert_eq!(user.person_id, person);
        assert_eq!(user.role, "cashier");
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let token = token_for(&Uuid::new_v4().to_string(), "s3cret", Duration::hours(1));
        assert!(matches!(
            decode_token(&token, "other"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let token = token_for(&Uuid::new_v4().to_string(), "s3cret", Duration::hours(-2));
        assert!(decode_token(&token, "s3cret").is_err());
    }

    #[test]
    fn non_uuid_subject_is_unauthorized() {
        let token = token_for("not-a-uuid", "s3cret", Duration::hours(1));
        assert!(matches!(
            decode_token(&token, "s3cret"),
            Err(AppError::Unauthorized(_))
        ));
    }
}
