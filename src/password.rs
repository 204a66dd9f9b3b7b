//! PBKDF2-HMAC-SHA256 password hashes.
//!
//! Stored as `pbkdf2_sha256$<iterations>$<salt hex>$<hash hex>` so the round
//! count can be raised later without invalidating existing hashes.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;
use thiserror::Error;

const ALGORITHM: &str = "pbkdf2_sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("random number generator failure: {0}")]
    Rng(#[from] getrandom::Error),
    #[error("iteration count must be positive")]
    ZeroIterations,
}

pub fn hash_password(password: &str, iterations: u32) -> Result<String, PasswordError> {
    if iterations == 0 {
        return Err(PasswordError::ZeroIterations);
    }

    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt)?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

    Ok(format!(
        "{ALGORITHM}${iterations}${}${}",
        hex::encode(salt),
        hex::encode(hash)
    ))
}

/// Malformed stored hashes never verify.
#[must_use]
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some(ALGORITHM), Some(iterations), Some(salt), Some(expected), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    if iterations == 0 || expected.len() != HASH_LEN {
        return false;
    }

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

    hash.iter()
        .zip(expected.iter())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_own_hash() {
        let encoded = hash_password("hunter22", 1_000).unwrap();
        assert!(encoded.starts_with("pbkdf2_sha256$1000$"));
        assert!(verify_password("hunter22", &encoded));
        assert!(!verify_password("hunter23", &encoded));
    }

    #[test]
    fn salts_differ() {
        let a = hash_password("same", 10).unwrap();
        let b = hash_password("same", 10).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "md5$1$00$00"));
        assert!(!verify_password("x", "pbkdf2_sha256$0$00$00"));
        assert!(!verify_password("x", "pbkdf2_sha256$10$zz$00"));
        assert!(!verify_password("x", "pbkdf2_sha256$10$00$00$extra"));
    }

    #[test]
    fn zero_iterations_is_an_error() {
        assert!(matches!(
            hash_password("x", 0),
            Err(PasswordError::ZeroIterations)
        ));
    }
}
