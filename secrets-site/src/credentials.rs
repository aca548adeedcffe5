//! Password hashing and verification.
//!
//! Digests are Argon2id PHC strings (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`)
//! with a fresh random salt per call, so hashing the same password twice never
//! yields the same digest. Verification reads the salt and parameters back out
//! of the stored digest and compares in constant time.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to hash password: {0}")]
    Hash(argon2::password_hash::Error),
}

pub fn hash_password(plaintext: &str) -> Result<String, CredentialError> {
    let salt = SaltString::generate(&mut OsRng);
    let digest = Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(CredentialError::Hash)?;
    Ok(digest.to_string())
}

/// Returns `false` for a wrong password and for a digest that cannot be parsed.
pub fn verify_password(plaintext: &str, digest: &str) -> bool {
    let parsed = match PasswordHash::new(digest) {
        Ok(parsed) => parsed,
        Err(err) => {
            debug!(error = %err, "stored digest is malformed; treating as mismatch");
            return false;
        }
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use anyhow::Result;

    use super::{hash_password, verify_password};

    #[test]
    fn same_password_hashes_to_different_digests() -> Result<()> {
        let first = hash_password("pw1")?;
        let second = hash_password("pw1")?;

        assert_ne!(first, second);
        assert!(verify_password("pw1", &first));
        assert!(verify_password("pw1", &second));
        Ok(())
    }

    #[test]
    fn digest_never_contains_plaintext() -> Result<()> {
        let digest = hash_password("correct horse battery staple")?;
        assert!(digest.starts_with("$argon2id$"));
        assert!(!digest.contains("correct horse"));
        Ok(())
    }

    #[test]
    fn altered_password_fails_verification() -> Result<()> {
        let digest = hash_password("pw1")?;
        assert!(!verify_password("pw2", &digest));
        assert!(!verify_password("pw1 ", &digest));
        assert!(!verify_password("", &digest));
        Ok(())
    }

    #[test]
    fn malformed_digest_is_a_mismatch() {
        assert!(!verify_password("pw1", ""));
        assert!(!verify_password("pw1", "pw1"));
        assert!(!verify_password("pw1", "pbkdf2:sha256:260000$abc$def"));
        assert!(!verify_password("pw1", "$argon2id$v=19$m=19456,t=2,p=1$broken"));
    }

    #[test]
    fn empty_password_round_trips() -> Result<()> {
        let digest = hash_password("")?;
        assert!(verify_password("", &digest));
        assert!(!verify_password(" ", &digest));
        Ok(())
    }
}
