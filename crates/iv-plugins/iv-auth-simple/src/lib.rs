//! # iv-auth-simple
//!
//! Argon2-based implementation of `AuthProvider`: password verification
//! against stored hashes and opaque in-memory bearer sessions. Sessions
//! do not survive a restart; the salt rotates with the process.

use std::collections::HashMap;
use std::sync::RwLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use async_trait::async_trait;
use iv_core::error::{AppError, Result};
use iv_core::models::Session;
use iv_core::traits::AuthProvider;
use sha2::{Digest, Sha256};

struct Account {
    user_id: String,
    password_hash: String,
}

pub struct SimpleAuthProvider {
    /// Secret salt mixed into token derivation (rotates on restart)
    session_salt: String,
    accounts: HashMap<String, Account>,
    /// token -> user id
    sessions: RwLock<HashMap<String, String>>,
}

impl SimpleAuthProvider {
    /// Accepts a salt string (e.g., from an environment variable).
    pub fn new(salt: &str) -> Self {
        Self {
            session_salt: salt.to_string(),
            accounts: HashMap::new(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Registers an account with an already-hashed password.
    pub fn with_account(mut self, username: &str, user_id: &str, password_hash: &str) -> Self {
        self.accounts.insert(
            username.to_string(),
            Account {
                user_id: user_id.to_string(),
                password_hash: password_hash.to_string(),
            },
        );
        self
    }

    /// Hashes a plaintext password for storage (Argon2id, random salt).
    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
    }

    /// Mints an opaque session token: sha-256 over the process salt plus
    /// fresh OS entropy, hex encoded.
    fn mint_token(&self) -> Result<String> {
        let mut entropy = [0u8; 32];
        getrandom::getrandom(&mut entropy)
            .map_err(|e| AppError::Internal(format!("entropy unavailable: {e}")))?;
        let mut hasher = Sha256::new();
        hasher.update(self.session_salt.as_bytes());
        hasher.update(entropy);
        Ok(hex::encode(hasher.finalize()))
    }
}

#[async_trait]
impl AuthProvider for SimpleAuthProvider {
    async fn sign_in(&self, username: &str, password: &str) -> Result<Session> {
        // Same error for unknown user and bad password; don't leak which.
        let denied = || AppError::Unauthenticated("invalid credentials".into());

        let account = self.accounts.get(username).ok_or_else(denied)?;
        let parsed = PasswordHash::new(&account.password_hash)
            .map_err(|e| AppError::Internal(format!("stored hash unparsable: {e}")))?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .map_err(|_| denied())?;

        let token = self.mint_token()?;
        self.sessions
            .write()
            .map_err(|_| AppError::Internal("session table poisoned".into()))?
            .insert(token.clone(), account.user_id.clone());
        Ok(Session { token, user_id: account.user_id.clone() })
    }

    async fn current_user(&self, token: &str) -> Result<String> {
        self.sessions
            .read()
            .map_err(|_| AppError::Internal("session table poisoned".into()))?
            .get(token)
            .cloned()
            .ok_or_else(|| AppError::Unauthenticated("invalid or expired session".into()))
    }

    async fn sign_out(&self, token: &str) -> Result<()> {
        self.sessions
            .write()
            .map_err(|_| AppError::Internal("session table poisoned".into()))?
            .remove(token);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> SimpleAuthProvider {
        let hash = SimpleAuthProvider::hash_password("hunter2").unwrap();
        SimpleAuthProvider::new("test-salt").with_account("alice", "user-alice", &hash)
    }

    #[tokio::test]
    async fn sign_in_opens_a_resolvable_session() {
        let auth = provider();
        let session = auth.sign_in("alice", "hunter2").await.unwrap();
        assert_eq!(session.user_id, "user-alice");
        assert_eq!(auth.current_user(&session.token).await.unwrap(), "user-alice");
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let auth = provider();
        let wrong_pw = auth.sign_in("alice", "letmein").await.unwrap_err();
        let no_user = auth.sign_in("mallory", "hunter2").await.unwrap_err();
        assert_eq!(wrong_pw.to_string(), no_user.to_string());
        assert!(matches!(wrong_pw, AppError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn sign_out_invalidates_and_is_idempotent() {
        let auth = provider();
        let session = auth.sign_in("alice", "hunter2").await.unwrap();
        auth.sign_out(&session.token).await.unwrap();
        assert!(auth.current_user(&session.token).await.is_err());
        auth.sign_out(&session.token).await.unwrap();
    }

    #[tokio::test]
    async fn tokens_are_unique_per_sign_in() {
        let auth = provider();
        let a = auth.sign_in("alice", "hunter2").await.unwrap();
        let b = auth.sign_in("alice", "hunter2").await.unwrap();
        assert_ne!(a.token, b.token);
    }
}
