//! Authentication ports: bearer tokens, password hashing and token revocation.

use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub user_id: Uuid,
    pub email: String,
    /// Unique per issued token; the handle used to revoke it.
    pub token_id: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

impl TokenClaims {
    /// Time left before the token expires on its own, zero if already past.
    pub fn remaining_lifetime(&self, now_unix: i64) -> Duration {
        Duration::from_secs(self.exp.saturating_sub(now_unix).max(0) as u64)
    }
}

/// Token service trait for issuing and checking access tokens.
pub trait TokenService: Send + Sync {
    /// Issue an access token for a user.
    fn generate_token(&self, user_id: Uuid, email: &str) -> Result<String, AuthError>;

    /// Validate and decode a token.
    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError>;

    /// Lifetime of newly issued tokens.
    fn expiration_seconds(&self) -> i64;
}

/// Password hashing service.
pub trait PasswordService: Send + Sync {
    /// Hash a plain text password.
    fn hash(&self, password: &str) -> Result<String, AuthError>;

    /// Verify a password against a hash.
    fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError>;

    /// Whether `hash` was made with other settings and should be replaced
    /// the next time the plain password is at hand.
    fn needs_rehash(&self, _hash: &str) -> bool {
        false
    }
}

/// Revoked token ids, kept until the token would have expired anyway.
#[async_trait]
pub trait RevocationList: Send + Sync {
    /// Remember `token_id` as revoked for `ttl`.
    async fn revoke(&self, token_id: &str, ttl: Duration) -> Result<(), AuthError>;

    async fn is_revoked(&self, token_id: &str) -> Result<bool, AuthError>;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing authorization header")]
    MissingAuth,

    #[error("Hashing error: {0}")]
    HashingError(String),

    #[error("Revocation store error: {0}")]
    Store(String),
}
