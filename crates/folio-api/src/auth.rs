//! Password authentication.
//!
//! A single admin password, stored as an argon2 PHC string. Mutating
//! requests carry the password in the `Authorization` header; `POST
//! /login` lets a client check it up front.

use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use axum::extract::{Request, State};
use axum::http::Method;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ApiState;
use crate::response::ApiError;

pub const NOT_AUTHORIZED: &str = "Not authorized to perform this action";
pub const BAD_PASSWORD: &str = "Bad password";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid password hash: {0}")]
    InvalidHash(String),

    #[error("failed to hash password: {0}")]
    Hash(String),
}

/// Checks passwords against the configured hash.
#[derive(Clone)]
pub struct Authenticator {
    hash: Arc<str>,
}

impl Authenticator {
    /// Fails if `phc` is not a well-formed PHC string.
    pub fn new(phc: &str) -> Result<Self, AuthError> {
        PasswordHash::new(phc).map_err(|e| AuthError::InvalidHash(e.to_string()))?;
        Ok(Self { hash: Arc::from(phc) })
    }

    pub fn verify(&self, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.hash) else {
            return false;
        };
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn check(&self, password: String) -> bool {
        let this = self.clone();
        tokio::task::spawn_blocking(move || this.verify(&password))
            .await
            .unwrap_or(false)
    }
}

/// Hash `password` into a PHC string with default argon2 parameters.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    hash_password_with(&Argon2::default(), password)
}

pub fn hash_password_with(argon2: &Argon2<'_>, password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Middleware guarding every non-GET route it is layered on.
pub async fn require_auth(State(state): State<ApiState>, req: Request, next: Next) -> Response {
    if matches!(req.method(), &Method::GET | &Method::HEAD | &Method::OPTIONS) {
        return next.run(req).await;
    }

    let Some(header) = req.headers().get(AUTHORIZATION) else {
        debug!(method = %req.method(), uri = %req.uri(), "missing authorization header");
        return ApiError::Unauthorized(NOT_AUTHORIZED).into_response();
    };
    let password = header.to_str().unwrap_or_default().to_string();
    if password.is_empty() {
        return ApiError::Unauthorized(NOT_AUTHORIZED).into_response();
    }
    if !state.auth.check(password).await {
        warn!(method = %req.method(), uri = %req.uri(), "rejected bad password");
        return ApiError::Unauthorized(BAD_PASSWORD).into_response();
    }
    next.run(req).await
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use argon2::{Algorithm, Params, Version};

    /// Argon2 with the cheapest parameters, for fast tests.
    pub(crate) fn cheap_hash(password: &str) -> String {
        let params = Params::new(Params::MIN_M_COST, 1, 1, None).unwrap();
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        hash_password_with(&argon2, password).unwrap()
    }

    #[test]
    fn verifies_the_right_password_only() {
        let auth = Authenticator::new(&cheap_hash("s3cret")).unwrap();
        assert!(auth.verify("s3cret"));
        assert!(!auth.verify("s3cret "));
        assert!(!auth.verify(""));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(cheap_hash("same"), cheap_hash("same"));
    }

    #[test]
    fn rejects_malformed_hash() {
        assert!(matches!(
            Authenticator::new("not-a-phc-string"),
            Err(AuthError::InvalidHash(_))
        ));
    }

    #[tokio::test]
    async fn check_runs_off_the_runtime() {
        let auth = Authenticator::new(&cheap_hash("pw")).unwrap();
        assert!(auth.check("pw".to_string()).await);
        assert!(!auth.check("nope".to_string()).await);
    }
}
