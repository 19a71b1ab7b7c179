//! Credentials and access tokens.
//!
//! - Passwords are hashed with Argon2id (random salt, PHC string output).
//! - Access tokens are HS256 JWTs carrying the user id and role.
//!
//! Token verification can be relaxed for debugging: with `AUTH_ENABLED=false`
//! tokens are decoded without checking the signature or expiry.

use std::{fmt, sync::LazyLock};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{TimeDelta, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, dangerous, decode, encode,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::Config, error::AppError, models::user::Role};

/// JWT claims carried by access tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub role: Role,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiry (seconds since epoch)
    pub exp: i64,
}

/// Signing and verification keys plus token policy.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
    verify: bool,
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys")
            .field("ttl_hours", &self.ttl_hours)
            .field("verify", &self.verify)
            .finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_hours: i64, verify: bool) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
            verify,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.jwt_secret, config.jwt_ttl_hours, config.auth_enabled)
    }

    /// Issue a signed access token for a user.
    ///
    /// Fails with `Internal` when the configured lifetime does not fit a
    /// timestamp.
    pub fn issue(&self, user_id: Uuid, role: Role) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = TimeDelta::try_hours(self.ttl_hours)
            .and_then(|ttl| now.checked_add_signed(ttl))
            .ok_or_else(|| {
                AppError::Internal(format!("token lifetime out of range: {}h", self.ttl_hours))
            })?;
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, AppError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
    }

    /// Decode a token and return its claims.
    ///
    /// # Errors
    ///
    /// `Unauthorized` when the token is malformed, or, with verification on,
    /// when the signature is wrong or the token has expired.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let decoded = if self.verify {
            decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
        } else {
            // Neither signature nor `exp` is checked here
            dangerous::insecure_decode::<Claims>(token)
        };

        decoded
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "rejected access token");
                AppError::Unauthorized
            })
    }
}

/// Hash a password with Argon2id on the blocking thread pool.
pub async fn hash_password(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("failed to hash password: {e}")))
    })
    .await
    .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
}

/// Hash checked when a login names an unknown email, so that case costs
/// the same Argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(b"no such user", &salt)
        .map(|hash| hash.to_string())
        .ok()
});

/// Check a password against a stored PHC hash string.
///
/// `stored_hash` is `None` when no account matched; the password is then
/// checked against a dummy hash and the result is always `Ok(false)`.
/// Returns `Ok(false)` for a wrong password; an unparsable stored hash is an
/// internal error.
pub async fn verify_password(
    password: String,
    stored_hash: Option<String>,
) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || {
        let Some(stored_hash) = stored_hash else {
            if let Some(parsed) = DUMMY_HASH.as_deref().and_then(|h| PasswordHash::new(h).ok()) {
                let _ = Argon2::default().verify_password(password.as_bytes(), &parsed);
            }
            return Ok(false);
        };

        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| AppError::Internal(format!("stored password hash is invalid: {e}")))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await
    .map_err(|e| AppError::Internal(format!("hashing task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn test_issued_token_verifies() {
        let keys = JwtKeys::new(SECRET, 24, true);
        let user_id = Uuid::new_v4();

        let token = keys.issue(user_id, Role::Admin).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.exp - claims.iat, 24 * 3600);
    }

    #[test]
    fn test_token_from_other_secret_is_rejected() {
        let issuer = JwtKeys::new("someone-else", 24, true);
        let keys = JwtKeys::new(SECRET, 24, true);

        let token = issuer.issue(Uuid::new_v4(), Role::User).unwrap();
        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let keys = JwtKeys::new(SECRET, 24, true);
        let now = Utc::now().timestamp();
        let token = keys
            .sign(&Claims {
                sub: Uuid::new_v4(),
                role: Role::User,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();

        assert!(matches!(keys.verify(&token), Err(AppError::Unauthorized)));
    }

    #[test]
    fn test_debug_mode_accepts_unverified_tokens() {
        let issuer = JwtKeys::new("someone-else", 24, true);
        let keys = JwtKeys::new(SECRET, 24, false);
        let user_id = Uuid::new_v4();
        let now = Utc::now().timestamp();

        let foreign = issuer.issue(user_id, Role::User).unwrap();
        assert_eq!(keys.verify(&foreign).unwrap().sub, user_id);

        let expired = keys
            .sign(&Claims {
                sub: user_id,
                role: Role::User,
                iat: now - 7200,
                exp: now - 3600,
            })
            .unwrap();
        assert_eq!(keys.verify(&expired).unwrap().sub, user_id);
    }

    #[test]
    fn test_garbage_token_is_rejected_even_in_debug_mode() {
        let keys = JwtKeys::new(SECRET, 24, false);
        assert!(matches!(
            keys.verify("not-a-jwt"),
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_password_hash_verifies_only_original() {
        let hash = hash_password("hunter2hunter2".to_string()).await.unwrap();
        assert!(hash.starts_with("$argon2id$"));

        assert!(
            verify_password("hunter2hunter2".to_string(), Some(hash.clone()))
                .await
                .unwrap()
        );
        assert!(
            !verify_password("wrong password".to_string(), Some(hash))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_corrupt_stored_hash_is_internal_error() {
        let result =
            verify_password("whatever".to_string(), Some("plaintext".to_string())).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_unknown_account_runs_dummy_check_and_fails() {
        let dummy = DUMMY_HASH.as_deref().unwrap();
        assert!(dummy.starts_with("$argon2id$"));

        assert!(
            !verify_password("no such user".to_string(), None)
                .await
                .unwrap()
        );
    }

    #[test]
    fn test_out_of_range_lifetime_is_an_error_not_a_panic() {
        let keys = JwtKeys::new(SECRET, i64::MAX, true);
        assert!(matches!(
            keys.issue(Uuid::new_v4(), Role::User),
            Err(AppError::Internal(_))
        ));
    }
}
