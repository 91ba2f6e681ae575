//! Credential primitives: bcrypt password hashing, HS256 access tokens and
//! opaque refresh tokens.
//!
//! Refresh tokens are random 256-bit values handed to the client once; only
//! their SHA-256 digest is persisted.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::{AppConfig, MIN_JWT_SECRET_LEN};
use crate::models::user::Role;

const REFRESH_TOKEN_BYTES: usize = 32;

/// Crypto error types
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("JWT secret is missing")]
    MissingSecret,
    #[error("JWT secret must be at least 32 bytes")]
    WeakSecret,
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error("token encoding failed: {0}")]
    Encoding(#[source] jsonwebtoken::errors::Error),
    #[error("invalid token: {0}")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
}

/// Signing secret, wiped from memory once the keys are derived.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
struct SigningSecret(Vec<u8>);

impl SigningSecret {
    fn new(secret: &str) -> Result<Self, CryptoError> {
        if secret.len() < MIN_JWT_SECRET_LEN {
            return Err(CryptoError::WeakSecret);
        }
        Ok(Self(secret.as_bytes().to_vec()))
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

/// A freshly minted access token.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub expires_in: i64,
}

/// Issues and verifies HS256 access tokens.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    access_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(
        secret: &str,
        issuer: impl Into<String>,
        audience: impl Into<String>,
        access_ttl: Duration,
    ) -> Result<Self, CryptoError> {
        let secret = SigningSecret::new(secret)?;
        let issuer = issuer.into();
        let audience = audience.into();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[issuer.as_str()]);
        validation.set_audience(&[audience.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(&secret.0),
            decoding_key: DecodingKey::from_secret(&secret.0),
            validation,
            issuer,
            audience,
            access_ttl,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, CryptoError> {
        let secret = config
            .jwt_secret
            .as_deref()
            .ok_or(CryptoError::MissingSecret)?;
        Self::new(
            secret,
            config.jwt_issuer.clone(),
            config.jwt_audience.clone(),
            Duration::minutes(config.access_token_ttl_minutes),
        )
    }

    pub fn issue(&self, user_id: Uuid, username: &str, role: Role) -> Result<AccessToken, CryptoError> {
        self.issue_at(user_id, username, role, Utc::now())
    }

    fn issue_at(
        &self,
        user_id: Uuid,
        username: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, CryptoError> {
        let expires_at = now + self.access_ttl;
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(CryptoError::Encoding)?;

        Ok(AccessToken {
            token,
            expires_at,
            expires_in: self.access_ttl.num_seconds(),
        })
    }

    /// Verifies signature, expiry, issuer and audience.
    pub fn verify(&self, token: &str) -> Result<Claims, CryptoError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(CryptoError::InvalidToken)
    }
}

/// Hashes a password with bcrypt on the blocking pool.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, CryptoError> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| CryptoError::Hashing(e.to_string()))?
        .map_err(|e| CryptoError::Hashing(e.to_string()))
}

/// Checks a password against a bcrypt hash. Malformed hashes never match.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}

/// Generates an opaque URL-safe refresh token.
pub fn generate_refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    let token = URL_SAFE_NO_PAD.encode(bytes);
    bytes.zeroize();
    token
}

/// Hex SHA-256 digest under which a refresh token is stored.
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Constant-time string comparison.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-that-is-at-least-32-bytes!";

    fn issuer() -> TokenIssuer {
        TokenIssuer::new(SECRET, "hotel-api", "hotel-admin", Duration::minutes(60)).unwrap()
    }

    #[test]
    fn issued_token_verifies_with_claims() {
        let issuer = issuer();
        let user_id = Uuid::new_v4();

        let access = issuer.issue(user_id, "frontdesk", Role::Receptionist).unwrap();
        assert_eq!(access.expires_in, 3600);

        let claims = issuer.verify(&access.token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.username, "frontdesk");
        assert_eq!(claims.role, Role::Receptionist);
        assert_eq!(claims.iss, "hotel-api");
        assert_eq!(claims.aud, "hotel-admin");
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = issuer();
        let issued = Utc::now() - Duration::hours(2);
        let access = issuer
            .issue_at(Uuid::new_v4(), "admin", Role::Admin, issued)
            .unwrap();

        assert!(matches!(
            issuer.verify(&access.token),
            Err(CryptoError::InvalidToken(_))
        ));
    }

    #[test]
    fn token_from_other_audience_or_secret_is_rejected() {
        let other_audience = TokenIssuer::new(SECRET, "hotel-api", "someone-else", Duration::minutes(5))
            .unwrap();
        let token = other_audience
            .issue(Uuid::new_v4(), "admin", Role::Admin)
            .unwrap()
            .token;
        assert!(issuer().verify(&token).is_err());

        let other_secret = TokenIssuer::new(
            "another-secret-that-is-at-least-32-bytes",
            "hotel-api",
            "hotel-admin",
            Duration::minutes(5),
        )
        .unwrap();
        let token = other_secret
            .issue(Uuid::new_v4(), "admin", Role::Admin)
            .unwrap()
            .token;
        assert!(issuer().verify(&token).is_err());
    }

    #[test]
    fn short_secret_is_refused() {
        assert!(matches!(
            TokenIssuer::new("short", "a", "b", Duration::minutes(5)),
            Err(CryptoError::WeakSecret)
        ));
    }

    #[tokio::test]
    async fn password_hash_roundtrip() {
        let hash = hash_password("s3cret-pass", 4).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("s3cret-pass", &hash).await);
        assert!(!verify_password("wrong", &hash).await);
        assert!(!verify_password("s3cret-pass", "not-a-bcrypt-hash").await);
    }

    #[test]
    fn refresh_tokens_are_random_and_hashed() {
        let a = generate_refresh_token();
        let b = generate_refresh_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);

        let digest = hash_refresh_token(&a);
        assert_eq!(digest.len(), 64);
        assert!(constant_time_eq(&digest, &hash_refresh_token(&a)));
        assert!(!constant_time_eq(&digest, &hash_refresh_token(&b)));
    }
}
