//! Credential hashing behind a trait so the exchange service never sees
//! plaintext handling details.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::models::{LedgerError, LedgerResult};

pub trait CredentialVerifier: Send + Sync {
    /// Hash a plaintext password for storage.
    fn hash_password(&self, password: &str) -> LedgerResult<String>;

    /// Check a plaintext password against a stored hash. Returns
    /// `Ok(false)` on mismatch; `Err` only when the stored hash is
    /// malformed.
    fn verify_password(&self, password: &str, password_hash: &str) -> LedgerResult<bool>;
}

/// Argon2id-backed verifier used in production.
#[derive(Debug, Default, Clone)]
pub struct ArgonVerifier;

impl CredentialVerifier for ArgonVerifier {
    fn hash_password(&self, password: &str) -> LedgerResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| LedgerError::Validation(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    fn verify_password(&self, password: &str, password_hash: &str) -> LedgerResult<bool> {
        let parsed_hash = PasswordHash::new(password_hash)
            .map_err(|e| LedgerError::Validation(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }
}

/// Identity "hashing" for tests that seed many accounts and should not
/// pay the Argon2 cost per fixture.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub(crate) struct PlainVerifier;

#[cfg(test)]
impl CredentialVerifier for PlainVerifier {
    fn hash_password(&self, password: &str) -> LedgerResult<String> {
        Ok(password.to_string())
    }

    fn verify_password(&self, password: &str, password_hash: &str) -> LedgerResult<bool> {
        Ok(password == password_hash)
    }
}
