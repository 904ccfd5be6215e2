//! Salted password hashing.
//!
//! New hashes are bcrypt. Verification also accepts Argon2 PHC strings so
//! operators can provision accounts with either tool.

use std::sync::OnceLock;

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};

use crate::error::{AuthError, AuthResult};

/// Work factor used when none is configured.
pub const DEFAULT_COST: u32 = 12;

const MIN_COST: u32 = 4;
const MAX_COST: u32 = 31;

/// Hashes and verifies passwords. Both operations are CPU-heavy by design;
/// callers on an async runtime should run them on a blocking thread.
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: OnceLock<String>,
}

impl PasswordHasher {
    /// Creates a hasher with the given bcrypt cost, clamped to 4..=31.
    pub fn new(cost: u32) -> Self {
        Self {
            cost: cost.clamp(MIN_COST, MAX_COST),
            dummy_hash: OnceLock::new(),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, password: &str) -> AuthResult<String> {
        bcrypt::hash(password, self.cost).map_err(|e| AuthError::Hash(e.to_string()))
    }

    /// Checks `password` against a stored bcrypt or Argon2 hash.
    pub fn verify(&self, hash: &str, password: &str) -> AuthResult<bool> {
        if hash.starts_with("$argon2") {
            let parsed =
                PasswordHash::new(hash).map_err(|e| AuthError::Hash(format!("invalid argon2 hash: {e}")))?;
            return Ok(Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok());
        }

        if hash.starts_with("$2") {
            return bcrypt::verify(password, hash).map_err(|e| AuthError::Hash(e.to_string()));
        }

        Err(AuthError::Hash("unrecognised password hash format".to_string()))
    }

    /// Spends one verification against a throwaway hash of the configured
    /// cost. Used when there is no account to check so that a miss takes
    /// as long as a wrong password.
    pub fn verify_dummy(&self, password: &str) {
        let hash = self
            .dummy_hash
            .get_or_init(|| bcrypt::hash("not-a-real-account", self.cost).unwrap_or_default());
        let _ = bcrypt::verify(password, hash);
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_COST)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher as _, SaltString};

    fn fast() -> PasswordHasher {
        PasswordHasher::new(MIN_COST)
    }

    #[test]
    fn bcrypt_hash_verifies_only_the_original_password() {
        let hasher = fast();
        let hash = hasher.hash("jumat-berkah").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(hasher.verify(&hash, "jumat-berkah").unwrap());
        assert!(!hasher.verify(&hash, "jumat-berkah ").unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = fast();
        assert_ne!(hasher.hash("same").unwrap(), hasher.hash("same").unwrap());
    }

    #[test]
    fn argon2_hashes_are_accepted() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"infaq", &salt)
            .unwrap()
            .to_string();
        let hasher = fast();
        assert!(hasher.verify(&hash, "infaq").unwrap());
        assert!(!hasher.verify(&hash, "sedekah").unwrap());
    }

    #[test]
    fn plaintext_in_hash_column_is_an_error_not_a_match() {
        let hasher = fast();
        assert!(matches!(hasher.verify("admin123", "admin123"), Err(AuthError::Hash(_))));
    }

    #[test]
    fn cost_is_clamped() {
        assert_eq!(PasswordHasher::new(0).cost(), MIN_COST);
        assert_eq!(PasswordHasher::new(99).cost(), MAX_COST);
        assert_eq!(PasswordHasher::default().cost(), 12);
    }

    #[test]
    fn dummy_verification_does_not_panic() {
        let hasher = fast();
        hasher.verify_dummy("anything");
        hasher.verify_dummy("anything else");
    }
}
