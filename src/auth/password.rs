use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

/// Hash a plaintext password into an argon2 PHC string.
pub fn hash(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hash: {e}"))?;
    Ok(hash.to_string())
}

/// Check a plaintext password against a stored hash.
///
/// `Ok(false)` is a wrong password; `Err` means the stored hash is unusable.
pub fn verify(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed =
        PasswordHash::new(stored).map_err(|e| anyhow::anyhow!("stored hash malformed: {e}"))?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_verifies_original_password() {
        let hashed = hash("longenough1").expect("hash");
        assert!(verify("longenough1", &hashed).expect("verify"));
    }

    #[test]
    fn verify_rejects_other_password() {
        let hashed = hash("longenough1").expect("hash");
        assert!(!verify("longenough2", &hashed).expect("verify"));
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash("longenough1").expect("hash");
        let b = hash("longenough1").expect("hash");
        assert_ne!(a, b);
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(verify("anything", "not-a-phc-string").is_err());
    }
}
