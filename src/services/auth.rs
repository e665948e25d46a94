use crate::{
    config::settings::JwtSettings,
    database::connection::DbPool,
    models::{
        auth::Claims,
        user::{User, UserError},
    },
};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("JWT secret is not configured")]
    MissingSecret,
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
}

pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_hours: i64,
}

impl AuthService {
    pub fn new(settings: &JwtSettings) -> Result<Self, AuthError> {
        if settings.secret.is_empty() {
            return Err(AuthError::MissingSecret);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 30;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            ttl_hours: settings.ttl_hours,
        })
    }

    pub fn generate_token(&self, user: &User) -> Result<String, AuthError> {
        let claims = Claims::new(user.id, user.email.clone(), user.user_role, self.ttl_hours);
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    pub async fn authenticate_user(
        &self,
        pool: &DbPool,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, UserError> {
        User::authenticate(pool, email, password).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::user::{UserRole, UserStatus};
    use chrono::Utc;
    use uuid::Uuid;

    fn settings(secret: &str, ttl_hours: i64) -> JwtSettings {
        JwtSettings {
            secret: secret.to_string(),
            ttl_hours,
        }
    }

    fn user(role: UserRole) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            fullname: "Baraka Mwangi".to_string(),
            email: "baraka@example.com".to_string(),
            phone: None,
            password_hash: String::new(),
            user_role: role,
            status: UserStatus::Active,
            chama_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn token_round_trip_keeps_identity_and_role() {
        let service = AuthService::new(&settings(SECRET, 24)).unwrap();
        let admin = user(UserRole::Admin);

        let token = service.generate_token(&admin).unwrap();
        let claims = service.verify_token(&token).unwrap();

        assert_eq!(claims.sub, admin.id);
        assert_eq!(claims.email, admin.email);
        assert_eq!(claims.role, UserRole::Admin);
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let issuer = AuthService::new(&settings("another-secret-another-secret-xx", 24)).unwrap();
        let verifier = AuthService::new(&settings(SECRET, 24)).unwrap();

        let token = issuer.generate_token(&user(UserRole::Member)).unwrap();
        assert!(verifier.verify_token(&token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let service = AuthService::new(&settings(SECRET, -1)).unwrap();
        let token = service.generate_token(&user(UserRole::Member)).unwrap();
        assert!(service.verify_token(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let service = AuthService::new(&settings(SECRET, 24)).unwrap();
        assert!(service.verify_token("not.a.jwt").is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(
            AuthService::new(&settings("", 24)),
            Err(AuthError::MissingSecret)
        ));
    }
}
