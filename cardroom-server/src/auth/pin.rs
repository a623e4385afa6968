//! PIN hashing
//!
//! Argon2id hashes for the 4-digit manual check-in PIN. The PIN space is
//! tiny, so a memory-hard hash plus per-hash salt is the floor, not a
//! luxury.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::password_hash::rand_core::OsRng;
use argon2::Argon2;

use crate::utils::{AppError, AppResult};

/// Hash a PIN for storage
pub fn hash_pin(pin: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(pin.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("Failed to hash PIN: {e}")))
}

/// Verify a PIN against a stored hash
pub fn verify_pin(pin: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(pin.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_pin("1234").unwrap();
        assert!(verify_pin("1234", &hash));
        assert!(!verify_pin("4321", &hash));
    }

    #[test]
    fn test_garbage_hash() {
        assert!(!verify_pin("1234", "not-a-hash"));
    }
}
